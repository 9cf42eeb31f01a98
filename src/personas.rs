//! Fixed persona registry.
//!
//! Each persona is an instruction template that gets prefixed to the learner's
//! input before it is sent to the completion endpoint. Templates are embedded
//! at compile time from `prompts/*.md` and never change at runtime.

const PROMPT_SEPARATOR: &str = "\n\n";

#[derive(Debug, PartialEq, Eq)]
pub struct Persona {
    name: &'static str,
    template: &'static str,
}

impl Persona {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Instruction text without the trailing newline an editor may leave in
    /// the prompt file.
    pub fn template(&self) -> &'static str {
        self.template.trim_end()
    }

    /// Builds `template + "\n\n" + user_input`. Callers reject blank input
    /// before getting here.
    pub fn compose_prompt(&self, user_input: &str) -> String {
        let template = self.template();
        let mut prompt =
            String::with_capacity(template.len() + PROMPT_SEPARATOR.len() + user_input.len());
        prompt.push_str(template);
        prompt.push_str(PROMPT_SEPARATOR);
        prompt.push_str(user_input);
        prompt
    }
}

static PERSONAS: [Persona; 5] = [
    Persona {
        name: "Vocabulary Builder",
        template: include_str!("../prompts/vocabulary_builder.md"),
    },
    Persona {
        name: "Grammar Coach",
        template: include_str!("../prompts/grammar_coach.md"),
    },
    Persona {
        name: "Conversation Partner",
        template: include_str!("../prompts/conversation_partner.md"),
    },
    Persona {
        name: "Pronunciation Guide",
        template: include_str!("../prompts/pronunciation_guide.md"),
    },
    Persona {
        name: "Progress Monitor",
        template: include_str!("../prompts/progress_monitor.md"),
    },
];

pub fn all() -> &'static [Persona] {
    &PERSONAS
}

pub fn names() -> impl Iterator<Item = &'static str> {
    PERSONAS.iter().map(Persona::name)
}

/// Resolves a user-typed persona name. Matching ignores case and surrounding
/// whitespace, and accepts `-` or `_` in place of spaces (`grammar-coach`).
pub fn find(query: &str) -> Option<&'static Persona> {
    let wanted = normalize(query);
    if wanted.is_empty() {
        return None;
    }

    PERSONAS
        .iter()
        .find(|persona| normalize(persona.name) == wanted)
}

fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| match ch {
            '-' | '_' => ' ',
            other => other.to_ascii_lowercase(),
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

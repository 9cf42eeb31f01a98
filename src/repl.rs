use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use tracing::{info, warn};

use crate::model_gateway::ModelGateway;
use crate::personas::{self, Persona};

const FAILURE_NOTICE: &str = "Failed to get a response from the agent.";
const EMPTY_INPUT_NOTICE: &str = "Input cannot be empty!";
const TURN_SEPARATOR: &str = "----------------------------------------";

#[derive(Debug, PartialEq, Eq)]
enum MenuChoice {
    Persona(&'static Persona),
    Exit,
    Invalid,
}

fn parse_menu_choice(raw: &str) -> MenuChoice {
    let choice = raw.trim();
    let all = personas::all();

    if let Ok(number) = choice.parse::<usize>() {
        return match number {
            n if (1..=all.len()).contains(&n) => MenuChoice::Persona(&all[n - 1]),
            n if n == all.len() + 1 => MenuChoice::Exit,
            _ => MenuChoice::Invalid,
        };
    }

    if choice.eq_ignore_ascii_case("exit") || choice.eq_ignore_ascii_case("quit") {
        return MenuChoice::Exit;
    }

    personas::find(choice).map_or(MenuChoice::Invalid, MenuChoice::Persona)
}

/// Reads one line without its terminator. `None` means stdin is closed.
fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn prompt(output: &mut impl Write, text: &str) -> Result<()> {
    write!(output, "{text} ")?;
    output.flush().context("Failed to flush stdout")
}

fn print_menu(output: &mut impl Write) -> Result<()> {
    writeln!(output, "Select an agent:")?;
    for (idx, name) in personas::names().enumerate() {
        writeln!(output, "  {}) {}", idx + 1, name)?;
    }
    writeln!(output, "  --------")?;
    writeln!(output, "  {}) Exit", personas::all().len() + 1)?;
    Ok(())
}

/// Keeps asking until the learner types something other than whitespace.
fn read_user_input(
    persona: &Persona,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Option<String>> {
    loop {
        prompt(
            output,
            &format!("Enter your input for the {}:", persona.name()),
        )?;
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        if line.trim().is_empty() {
            writeln!(output, "{EMPTY_INPUT_NOTICE}")?;
            continue;
        }
        return Ok(Some(line));
    }
}

async fn run_turn<G: ModelGateway>(
    gateway: &G,
    persona: &Persona,
    user_input: &str,
    output: &mut impl Write,
) -> Result<()> {
    writeln!(output, "\nProcessing...\n")?;
    output.flush().context("Failed to flush stdout")?;

    let full_prompt = persona.compose_prompt(user_input);
    info!(
        persona = persona.name(),
        prompt_len = full_prompt.len(),
        "running persona turn"
    );

    match gateway.complete(&full_prompt).await {
        Ok(text) if !text.is_empty() => {
            writeln!(output, "{} Output:\n", persona.name())?;
            writeln!(output, "{text}")?;
        }
        Ok(_) => {
            warn!(persona = persona.name(), "completion returned empty text");
            writeln!(output, "{FAILURE_NOTICE}")?;
        }
        Err(err) => {
            warn!(
                persona = persona.name(),
                kind = err.kind(),
                error = %err,
                "completion failed"
            );
            writeln!(output, "{FAILURE_NOTICE}")?;
        }
    }

    writeln!(output, "\n{TURN_SEPARATOR}\n")?;
    Ok(())
}

/// Menu loop over arbitrary input/output so it can be driven from tests.
pub async fn run_session<G: ModelGateway>(
    gateway: &G,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<()> {
    writeln!(output, "Welcome to the Language Learning Buddy!")?;
    writeln!(output, "model: {}\n", gateway.model_name())?;

    loop {
        print_menu(output)?;
        prompt(output, ">")?;
        let Some(line) = read_line(input)? else {
            break;
        };

        let persona = match parse_menu_choice(&line) {
            MenuChoice::Persona(persona) => persona,
            MenuChoice::Exit => break,
            MenuChoice::Invalid => {
                writeln!(
                    output,
                    "Unknown choice '{}'. Pick a number from the list.\n",
                    line.trim()
                )?;
                continue;
            }
        };

        let Some(user_input) = read_user_input(persona, input, output)? else {
            break;
        };
        run_turn(gateway, persona, &user_input, output).await?;
    }

    writeln!(output, "Goodbye!")?;
    Ok(())
}

pub async fn run_repl<G: ModelGateway>(gateway: &G) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_session(gateway, &mut stdin.lock(), &mut stdout.lock()).await
}

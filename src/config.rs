use std::env;

const DEFAULT_COMPLETION_URL: &str = "http://localhost:11434/v1/completions";
const DEFAULT_MODEL: &str = "llama3.1:latest";
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub completion_url: String,
    pub model: String,
    pub model_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    fn from_env_with(mut get_var: impl FnMut(&str) -> Option<String>) -> Self {
        let completion_url = parse_non_empty(get_var("OLLAMA_API_URL").as_deref())
            .unwrap_or_else(|| DEFAULT_COMPLETION_URL.to_string());
        let model = parse_non_empty(get_var("MODEL_NAME").as_deref())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let model_timeout_secs = parse_model_timeout_secs(get_var("MODEL_TIMEOUT_SECS").as_deref());

        Self {
            completion_url,
            model,
            model_timeout_secs,
        }
    }
}

fn parse_non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_positive_u64(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_model_timeout_secs(raw: Option<&str>) -> u64 {
    parse_positive_u64(raw, DEFAULT_MODEL_TIMEOUT_SECS)
}

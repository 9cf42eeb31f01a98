use serde::Serialize;
use std::error::Error;
use std::fmt;

pub const MAX_TOKENS: u32 = 500;
pub const TEMPERATURE: f64 = 0.7;

/// Body of one `POST` to the completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

/// Why a completion exchange produced no text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The endpoint answered with a non-success status.
    ServerError { status: u16, body: String },
    /// The request went out but no usable response came back.
    NoResponse { detail: String },
    /// The request could not be built or sent, or the reply had the wrong shape.
    RequestError { detail: String },
}

impl CompletionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServerError { .. } => "server_error",
            Self::NoResponse { .. } => "no_response",
            Self::RequestError { .. } => "request_error",
        }
    }
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerError { status, body } => {
                write!(f, "Model request failed with status {}: {}", status, body)
            }
            Self::NoResponse { detail } => write!(f, "No response received: {}", detail),
            Self::RequestError { detail } => write!(f, "Request error: {}", detail),
        }
    }
}

impl Error for CompletionError {}

pub type CompletionResult = std::result::Result<String, CompletionError>;

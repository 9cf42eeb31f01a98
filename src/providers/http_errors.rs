use std::error::Error as StdError;
use std::io::ErrorKind;

use crate::model::CompletionError;

fn error_chain_matches(
    err: &(dyn StdError + 'static),
    io_kind: ErrorKind,
    needle: &str,
) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == io_kind
        {
            return true;
        }

        if source.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }

        current = source.source();
    }

    false
}

/// Flattens an error and its sources into `outer: inner: ...`.
fn describe_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        let text = source.to_string();
        if parts.last() != Some(&text) {
            parts.push(text);
        }
        current = source.source();
    }
    parts.join(": ")
}

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::ConnectionRefused, "connection refused")
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::TimedOut, "timed out")
}

/// Sorts a failed `send()` into "never left" and "left but nothing came back".
pub(crate) fn send_error(err: reqwest::Error, api_url: &str, timeout_secs: u64) -> CompletionError {
    if err.is_builder() {
        return CompletionError::RequestError {
            detail: format!("Could not build request for '{}': {}", api_url, err),
        };
    }

    let transport = describe_chain(&err);

    if err.is_timeout() || error_chain_has_timeout(&err) {
        return CompletionError::NoResponse {
            detail: format!(
                "Model request timed out after {}s while calling '{}': {}. \
                 Increase MODEL_TIMEOUT_SECS or check model responsiveness.",
                timeout_secs, api_url, transport
            ),
        };
    }

    if err.is_connect() {
        let detail = if error_chain_has_connection_refused(&err) {
            format!(
                "Connection refused by completion API at '{}': {}. \
                 Ensure the model server is running and OLLAMA_API_URL is correct.",
                api_url, transport
            )
        } else {
            format!(
                "Failed to connect to completion API at '{}': {}. \
                 Check OLLAMA_API_URL and network connectivity.",
                api_url, transport
            )
        };
        return CompletionError::NoResponse { detail };
    }

    CompletionError::NoResponse {
        detail: format!("Failed to call completion API at '{}': {}", api_url, transport),
    }
}

/// The status line arrived but the body could not be read to the end.
pub(crate) fn body_read_error(err: reqwest::Error, api_url: &str) -> CompletionError {
    CompletionError::NoResponse {
        detail: format!(
            "Response body from '{}' was interrupted: {}",
            api_url,
            describe_chain(&err)
        ),
    }
}

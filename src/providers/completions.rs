use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::model::{CompletionError, CompletionRequest, CompletionResult};
use crate::providers::http_errors::{body_read_error, send_error};

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

fn first_choice_text(body: &str) -> CompletionResult {
    let parsed: CompletionResponse =
        serde_json::from_str(body).map_err(|err| CompletionError::RequestError {
            detail: format!("Failed to parse completion response: {}", err),
        })?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.text.trim().to_string())
        .ok_or_else(|| CompletionError::RequestError {
            detail: "Completion response contained no choices".to_string(),
        })
}

/// Performs exactly one completion exchange. Never panics; every way the
/// exchange can go wrong comes back as a [`CompletionError`].
pub async fn complete(client: &Client, cfg: &Config, prompt: &str) -> CompletionResult {
    let api_url = cfg.completion_url.as_str();
    let body = CompletionRequest::new(cfg.model.as_str(), prompt);
    debug!(
        api_url = %api_url,
        model = %cfg.model,
        prompt_len = prompt.len(),
        "sending completion request"
    );

    let response = client
        .post(api_url)
        .timeout(Duration::from_secs(cfg.model_timeout_secs))
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            warn!(
                api_url = %api_url,
                model = %cfg.model,
                error = %err,
                "completion request failed"
            );
            send_error(err, api_url, cfg.model_timeout_secs)
        })?;

    let status = response.status();
    if !status.is_success() {
        let response_body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string());
        warn!(
            api_url = %api_url,
            model = %cfg.model,
            status = %status,
            response_body_len = response_body.len(),
            "completion endpoint returned non-success status"
        );
        return Err(CompletionError::ServerError {
            status: status.as_u16(),
            body: response_body,
        });
    }

    let response_body = response
        .text()
        .await
        .map_err(|err| body_read_error(err, api_url))?;
    let text = first_choice_text(&response_body)?;
    debug!(
        model = %cfg.model,
        response_len = text.len(),
        "received completion response"
    );
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::{complete, first_choice_text};
    use crate::config::Config;
    use crate::model::CompletionError;
    use reqwest::Client;
    use serde_json::{Value, json};
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = stream.read(&mut chunk).expect("read should succeed");
            if read == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..read]);

            if let Some(header_end) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serves one canned HTTP response and hands back the raw request it saw.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept should succeed");
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream
                .write_all(response.as_bytes())
                .expect("write should succeed");
            request
        });
        (format!("http://{}/v1/completions", addr), server)
    }

    fn test_config(completion_url: impl Into<String>) -> Config {
        Config {
            completion_url: completion_url.into(),
            model: "llama3.1:latest".to_string(),
            model_timeout_secs: 5,
        }
    }

    fn request_body(raw_request: &str) -> Value {
        let (_, body) = raw_request
            .split_once("\r\n\r\n")
            .expect("request should have a body");
        serde_json::from_str(body).expect("request body should be JSON")
    }

    #[tokio::test]
    async fn complete_returns_trimmed_first_choice() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"text":"  hello  "},{"text":"ignored"}]}"#,
        );
        let cfg = test_config(url);

        let result = complete(&Client::new(), &cfg, "Say hello").await;

        assert_eq!(result, Ok("hello".to_string()));
        server.join().expect("server thread should join");
    }

    #[tokio::test]
    async fn complete_posts_json_with_fixed_generation_parameters() {
        let (url, server) = serve_once("200 OK", r#"{"choices":[{"text":"ok"}]}"#);
        let cfg = test_config(url);

        let result = complete(&Client::new(), &cfg, "Grammar please\n\nwhat is a verb?").await;
        assert!(result.is_ok(), "unexpected result: {result:?}");

        let raw_request = server.join().expect("server thread should join");
        let head = raw_request.to_ascii_lowercase();
        assert!(head.starts_with("post /v1/completions "), "unexpected request: {raw_request}");
        assert!(
            head.contains("content-type: application/json"),
            "unexpected request: {raw_request}"
        );
        assert_eq!(
            request_body(&raw_request),
            json!({
                "model": "llama3.1:latest",
                "prompt": "Grammar please\n\nwhat is a verb?",
                "max_tokens": 500,
                "temperature": 0.7,
            })
        );
    }

    #[tokio::test]
    async fn complete_classifies_non_success_status_as_server_error() {
        let (url, server) = serve_once(
            "500 Internal Server Error",
            r#"{"error":"model crashed"}"#,
        );
        let cfg = test_config(url);

        let result = complete(&Client::new(), &cfg, "hi").await;

        assert_eq!(
            result,
            Err(CompletionError::ServerError {
                status: 500,
                body: r#"{"error":"model crashed"}"#.to_string(),
            })
        );
        server.join().expect("server thread should join");
    }

    #[tokio::test]
    async fn complete_classifies_refused_connection_as_no_response() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        drop(listener);
        let cfg = test_config(format!("http://{}/v1/completions", addr));

        let result = complete(&Client::new(), &cfg, "hi").await;

        assert!(
            matches!(result, Err(CompletionError::NoResponse { .. })),
            "unexpected result: {result:?}"
        );
    }

    #[tokio::test]
    async fn complete_classifies_malformed_endpoint_as_request_error() {
        let cfg = test_config("::not-a-url::");

        let result = complete(&Client::new(), &cfg, "hi").await;

        assert!(
            matches!(result, Err(CompletionError::RequestError { .. })),
            "unexpected result: {result:?}"
        );
    }

    #[tokio::test]
    async fn complete_classifies_unexpected_shape_as_request_error() {
        let (url, server) = serve_once("200 OK", r#"{"message":{"content":"hi"}}"#);
        let cfg = test_config(url);

        let result = complete(&Client::new(), &cfg, "hi").await;

        assert!(
            matches!(result, Err(CompletionError::RequestError { .. })),
            "unexpected result: {result:?}"
        );
        server.join().expect("server thread should join");
    }

    #[tokio::test]
    async fn complete_classifies_truncated_body_as_no_response() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept should succeed");
            read_request(&mut stream);
            let partial = r#"{"choices":[{"te"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 500\r\n\r\n{}",
                partial
            );
            stream
                .write_all(response.as_bytes())
                .expect("write should succeed");
        });
        let cfg = test_config(format!("http://{}/v1/completions", addr));

        let result = complete(&Client::new(), &cfg, "hi").await;

        match result {
            Err(CompletionError::NoResponse { detail }) => {
                assert!(detail.contains("interrupted"), "unexpected detail: {detail}");
            }
            other => panic!("expected NoResponse, got {other:?}"),
        }
        server.join().expect("server thread should join");
    }

    #[test]
    fn first_choice_text_rejects_empty_choices() {
        match first_choice_text(r#"{"choices":[]}"#) {
            Err(CompletionError::RequestError { detail }) => {
                assert!(detail.contains("no choices"), "unexpected detail: {detail}");
            }
            other => panic!("expected RequestError, got {other:?}"),
        }
    }

    #[test]
    fn first_choice_text_rejects_non_json_bodies() {
        assert!(matches!(
            first_choice_text("<html>bad gateway</html>"),
            Err(CompletionError::RequestError { .. })
        ));
    }

    #[test]
    fn first_choice_text_ignores_extra_fields() {
        let body = r#"{"id":"cmpl-1","object":"text_completion","choices":[{"index":0,"text":"\nBonjour\n","finish_reason":"stop"}]}"#;
        assert_eq!(first_choice_text(body), Ok("Bonjour".to_string()));
    }
}

//! Hosted text-generation-inference backend.

use super::Generator;
use crate::error::{ReactorError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Generator backed by a text-generation-inference HTTP endpoint.
pub struct TgiGenerator {
    http: reqwest::Client,
    endpoint: Url,
    model: String,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct TgiRequest<'a> {
    inputs: &'a str,
    parameters: TgiParameters<'a>,
}

#[derive(Debug, Serialize)]
struct TgiParameters<'a> {
    max_new_tokens: u32,
    #[serde(skip_serializing_if = "no_stops")]
    stop: &'a [String],
    return_full_text: bool,
}

fn no_stops(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TgiResponse {
    Many(Vec<GeneratedText>),
    One(GeneratedText),
    Error { error: String },
}

impl TgiGenerator {
    /// Create a generator for `model` served under `base_url`.
    pub fn new(
        base_url: &str,
        model: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: model_endpoint(base_url, model)?,
            model: model.to_string(),
            token,
        })
    }
}

/// `{base_url}/models/{model}`, with the model id split on `/`.
fn model_endpoint(base_url: &str, model: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).map_err(|e| {
        ReactorError::Config(format!("Invalid base URL '{}': {}", base_url, e))
    })?;

    url.path_segments_mut()
        .map_err(|_| {
            ReactorError::Config(format!("Base URL '{}' cannot have a path", base_url))
        })?
        .pop_if_empty()
        .push("models")
        .extend(model.split('/'));

    Ok(url)
}

/// Generated text from a finished HTTP exchange.
fn check_response(status: reqwest::StatusCode, body: &str) -> Result<String> {
    if !status.is_success() {
        return Err(ReactorError::Transport(format!(
            "Endpoint returned {}: {}",
            status,
            body.trim()
        )));
    }
    parse_response(body)
}

fn parse_response(body: &str) -> Result<String> {
    let response: TgiResponse = serde_json::from_str(body)
        .map_err(|e| ReactorError::Transport(format!("Unexpected response body: {}", e)))?;

    match response {
        TgiResponse::Many(items) => items
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .ok_or_else(|| ReactorError::Transport("Empty generation response".to_string())),
        TgiResponse::One(g) => Ok(g.generated_text),
        TgiResponse::Error { error } => Err(ReactorError::Transport(error)),
    }
}

#[async_trait]
impl Generator for TgiGenerator {
    #[instrument(skip(self, prompt, stop), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str, max_tokens: u32, stop: &[String]) -> Result<String> {
        let request = TgiRequest {
            inputs: prompt,
            parameters: TgiParameters {
                max_new_tokens: max_tokens,
                stop,
                return_full_text: false,
            },
        };

        let mut builder = self.http.post(self.endpoint.clone()).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            ReactorError::Transport(format!("Request to {} failed: {}", self.endpoint, e))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ReactorError::Transport(format!("Failed to read response: {}", e)))?;

        let text = check_response(status, &body)?;
        debug!("Generated {} characters", text.len());
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_endpoint() {
        let url = model_endpoint(
            "https://api-inference.huggingface.co",
            "meta-llama/Llama-3.3-70B-Instruct",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api-inference.huggingface.co/models/meta-llama/Llama-3.3-70B-Instruct"
        );

        let url = model_endpoint("http://localhost:8080/api/", "tiny").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/models/tiny");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            model_endpoint("not a url", "m"),
            Err(ReactorError::Config(_))
        ));
    }

    #[test]
    fn test_request_omits_empty_stop() {
        let request = TgiRequest {
            inputs: "hi",
            parameters: TgiParameters {
                max_new_tokens: 10,
                stop: &[],
                return_full_text: false,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["parameters"].get("stop").is_none());

        let stop = vec!["Observation:".to_string()];
        let request = TgiRequest {
            inputs: "hi",
            parameters: TgiParameters {
                max_new_tokens: 10,
                stop: &stop,
                return_full_text: false,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["parameters"]["stop"][0], "Observation:");
        assert_eq!(json["parameters"]["max_new_tokens"], 10);
    }

    #[test]
    fn test_error_status_is_transport() {
        let err = check_response(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "{\"error\": \"Model is overloaded\"}\n",
        )
        .unwrap_err();
        match err {
            ReactorError::Transport(msg) => {
                assert!(msg.contains("503"));
                assert!(msg.contains("Model is overloaded"));
            }
            other => panic!("Expected Transport, got {:?}", other),
        }
    }

    #[test]
    fn test_error_body_with_ok_status_is_transport() {
        assert!(matches!(
            check_response(reqwest::StatusCode::OK, r#"{"error": "Rate limit reached"}"#),
            Err(ReactorError::Transport(msg)) if msg == "Rate limit reached"
        ));
        assert_eq!(
            check_response(reqwest::StatusCode::OK, r#"[{"generated_text": "ok"}]"#).unwrap(),
            "ok"
        );
    }

    #[test]
    fn test_parse_response_shapes() {
        assert_eq!(
            parse_response(r#"[{"generated_text": "Thought: ok"}]"#).unwrap(),
            "Thought: ok"
        );
        assert_eq!(parse_response(r#"{"generated_text": "x"}"#).unwrap(), "x");
        assert!(matches!(
            parse_response(r#"{"error": "Model is loading"}"#),
            Err(ReactorError::Transport(msg)) if msg == "Model is loading"
        ));
        assert!(parse_response("[]").is_err());
        assert!(parse_response("<html>").is_err());
    }
}

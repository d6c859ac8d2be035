//! Text generation backends.
//!
//! Every backend exposes the same capability: continue a prompt for at most
//! `max_tokens` tokens, optionally stopping at the first of several literal
//! stop strings.

mod openai;
mod tgi;

pub use openai::{create_client_with_timeout, OpenAIGenerator};
pub use tgi::TgiGenerator;

use crate::config::{InferenceProvider, Settings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Trait for text generation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a continuation of `prompt`.
    ///
    /// Backends pass `stop` to the endpoint but are not required to strip it
    /// from the result; callers apply [`truncate_at_stop`].
    async fn generate(&self, prompt: &str, max_tokens: u32, stop: &[String]) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Cut `text` at the earliest occurrence of any stop string.
///
/// The stop string itself is excluded. Empty stop strings are ignored.
pub fn truncate_at_stop<'a>(text: &'a str, stop: &[String]) -> &'a str {
    let cut = stop
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min();

    match cut {
        Some(idx) => &text[..idx],
        None => text,
    }
}

/// Build the configured backend.
pub fn from_settings(settings: &Settings, token: Option<String>) -> Result<Arc<dyn Generator>> {
    let inference = &settings.inference;
    let timeout = Duration::from_secs(inference.timeout_secs);

    let generator: Arc<dyn Generator> = match inference.provider {
        InferenceProvider::Tgi => Arc::new(TgiGenerator::new(
            &inference.base_url,
            &inference.model,
            token,
            timeout,
        )?),
        InferenceProvider::OpenAI => Arc::new(OpenAIGenerator::new(
            &inference.base_url,
            &inference.model,
            token,
            timeout,
        )?),
    };

    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_truncate_excludes_stop() {
        let text = "Thought: look it up\nAction: {}\nObservation: made up";
        assert_eq!(
            truncate_at_stop(text, &stops(&["Observation:"])),
            "Thought: look it up\nAction: {}\n"
        );
    }

    #[test]
    fn test_truncate_uses_earliest_stop() {
        let text = "a STOP2 b STOP1 c";
        assert_eq!(truncate_at_stop(text, &stops(&["STOP1", "STOP2"])), "a ");
    }

    #[test]
    fn test_truncate_without_match_or_stops() {
        assert_eq!(truncate_at_stop("plain", &stops(&["x"])), "plain");
        assert_eq!(truncate_at_stop("plain", &[]), "plain");
        assert_eq!(truncate_at_stop("plain", &stops(&[""])), "plain");
    }

    #[test]
    fn test_truncate_at_start() {
        assert_eq!(truncate_at_stop("Observation: x", &stops(&["Observation:"])), "");
    }

    #[test]
    fn test_from_settings_builds_each_provider() {
        let mut settings = Settings::default();
        let tgi = from_settings(&settings, None).unwrap();
        assert_eq!(tgi.model(), "meta-llama/Llama-3.3-70B-Instruct");

        settings.inference.provider = InferenceProvider::OpenAI;
        settings.inference.base_url = "http://localhost:8000/v1".to_string();
        settings.inference.model = "local".to_string();
        let openai = from_settings(&settings, Some("sk-test".to_string())).unwrap();
        assert_eq!(openai.model(), "local");
    }
}

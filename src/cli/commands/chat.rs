//! Chat command: one round trip through the chat completions endpoint.
//!
//! Unlike `ask`, the provider applies the model's chat template.

use super::load_prompts;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{InferenceProvider, Settings};
use crate::generation::OpenAIGenerator;
use crate::transcript::ConversationTurn;
use anyhow::Result;
use std::time::Duration;

/// Run the chat command.
pub async fn run_chat(
    message: &str,
    system: Option<String>,
    max_tokens: u32,
    settings: &Settings,
    token: Option<String>,
) -> Result<()> {
    preflight::check(Operation::Generate, settings, token.as_deref())?;

    let system = match system {
        Some(s) => s,
        None => load_prompts(settings)?.agent.chat_system,
    };

    let client = OpenAIGenerator::new(
        &chat_base_url(settings),
        &settings.inference.model,
        token,
        Duration::from_secs(settings.inference.timeout_secs),
    )?;

    let turns = [ConversationTurn::system(system), ConversationTurn::user(message)];

    let spinner = Output::spinner("Waiting for reply...");
    let reply = client.chat(&turns, max_tokens).await;
    spinner.finish_and_clear();

    println!("{}", reply?.trim());
    Ok(())
}

/// OpenAI-compatible base URL for the configured endpoint.
///
/// Text-generation-inference serves the chat API per model under `/v1`.
fn chat_base_url(settings: &Settings) -> String {
    let base = settings.inference.base_url.trim_end_matches('/');
    match settings.inference.provider {
        InferenceProvider::Tgi => format!("{}/models/{}/v1", base, settings.inference.model),
        InferenceProvider::OpenAI => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_base_url() {
        let mut settings = Settings::default();
        assert_eq!(
            chat_base_url(&settings),
            "https://api-inference.huggingface.co/models/meta-llama/Llama-3.3-70B-Instruct/v1"
        );

        settings.inference.provider = InferenceProvider::OpenAI;
        settings.inference.base_url = "http://localhost:8000/v1/".to_string();
        assert_eq!(chat_base_url(&settings), "http://localhost:8000/v1");
    }
}

//! OpenAI-compatible backend.
//!
//! Uses the legacy `/completions` endpoint for raw prompt continuation, since
//! the agent renders its own chat template, and `/chat/completions` for plain
//! chat where the provider renders the template.

use super::Generator;
use crate::error::{ReactorError, Result};
use crate::template::OBSERVATION_LABEL;
use crate::transcript::{ConversationTurn, Role};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, CreateCompletionRequestArgs, Prompt, Stop,
};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// The completions API accepts at most this many stop sequences.
const MAX_STOP_SEQUENCES: usize = 4;

/// Create an OpenAI-compatible client with a custom timeout.
pub fn create_client_with_timeout(
    base_url: &str,
    token: Option<&str>,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let mut config = OpenAIConfig::new().with_api_base(base_url.trim_end_matches('/'));
    if let Some(token) = token {
        config = config.with_api_key(token);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Generator backed by an OpenAI-compatible API.
pub struct OpenAIGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIGenerator {
    pub fn new(
        base_url: &str,
        model: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(base_url, token.as_deref(), timeout)?,
            model: model.to_string(),
        })
    }

    /// Send turns to the chat endpoint and return the reply text.
    #[allow(deprecated)]
    #[instrument(skip(self, turns), fields(model = %self.model, turns = turns.len()))]
    pub async fn chat(&self, turns: &[ConversationTurn], max_tokens: u32) -> Result<String> {
        let messages = turns
            .iter()
            .map(to_chat_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(max_tokens)
            .build()
            .map_err(|e| ReactorError::OpenAI(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ReactorError::Transport(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ReactorError::Transport("No response from model".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

fn to_chat_message(turn: &ConversationTurn) -> Result<ChatCompletionRequestMessage> {
    let build_err = |e: async_openai::error::OpenAIError| ReactorError::OpenAI(e.to_string());

    let message = match turn.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(turn.content.clone())
            .build()
            .map_err(build_err)?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(turn.content.clone())
            .build()
            .map_err(build_err)?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(turn.content.clone())
            .build()
            .map_err(build_err)?
            .into(),
        // No tool_call_id exists for text-protocol actions, so results go back as user text.
        Role::Tool => ChatCompletionRequestUserMessageArgs::default()
            .content(format!("{} {}", OBSERVATION_LABEL, turn.content))
            .build()
            .map_err(build_err)?
            .into(),
    };

    Ok(message)
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip(self, prompt, stop), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str, max_tokens: u32, stop: &[String]) -> Result<String> {
        let mut args = CreateCompletionRequestArgs::default();
        args.model(&self.model)
            .prompt(Prompt::String(prompt.to_string()))
            .max_tokens(max_tokens);

        if !stop.is_empty() {
            if stop.len() > MAX_STOP_SEQUENCES {
                warn!(
                    "Endpoint accepts {} stop sequences, {} given; the rest are applied locally",
                    MAX_STOP_SEQUENCES,
                    stop.len()
                );
            }
            let sent: Vec<String> = stop.iter().take(MAX_STOP_SEQUENCES).cloned().collect();
            args.stop(Stop::StringArray(sent));
        }

        let request = args
            .build()
            .map_err(|e| ReactorError::OpenAI(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .completions()
            .create(request)
            .await
            .map_err(|e| ReactorError::Transport(format!("Completion API error: {}", e)))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| ReactorError::Transport("No completion returned".to_string()))?;

        debug!("Generated {} characters", text.len());
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

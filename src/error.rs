//! Error types for Reactor.

use thiserror::Error;

/// Library-level error type for Reactor operations.
#[derive(Error, Debug)]
pub enum ReactorError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The generation endpoint was unreachable or returned an error.
    #[error("Generation transport error: {0}")]
    Transport(String),

    /// No single well-formed action block could be found in generated text.
    #[error("Malformed action: {0}")]
    MalformedAction(String),

    /// The model asked for a tool that is not registered.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool failed: {0}")]
    ToolFailed(String),

    #[error("Chat template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Agent error: {0}")]
    Agent(String),
}

/// Result type alias for Reactor operations.
pub type Result<T> = std::result::Result<T, ReactorError>;

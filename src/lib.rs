//! Reactor - single-step tool-augmented prompting
//!
//! A small library and CLI for the ReAct prompting pattern against hosted
//! text-generation endpoints: the model reasons, emits one JSON action, the
//! action runs as a local tool, and the model is asked again with the tool's
//! observation in context to produce a final answer.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `credentials` - API token discovery
//! - `transcript` - Conversation turns
//! - `template` - Chat formatting conventions (special tokens)
//! - `generation` - Text generation backends
//! - `tools` - Local tool registry
//! - `agent` - Action parsing and the run state machine
//!
//! # Example
//!
//! ```rust,no_run
//! use reactor::agent::Agent;
//! use reactor::config::Settings;
//! use reactor::generation;
//! use reactor::tools::ToolRegistry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let generator = generation::from_settings(&settings, std::env::var("HF_TOKEN").ok())?;
//!     let agent = Agent::new(generator, ToolRegistry::with_defaults());
//!
//!     let response = agent.run("What's the weather in London?").await?;
//!     println!("{}", response.content);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod generation;
pub mod template;
pub mod tools;
pub mod transcript;

pub use error::{ReactorError, Result};

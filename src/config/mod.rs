//! Configuration module for Reactor.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts};
pub use settings::{
    AgentSettings, GeneralSettings, InferenceProvider, InferenceSettings, PromptSettings,
    Settings,
};

//! CLI command implementations.

mod ask;
mod call_tool;
mod chat;
mod config;
mod doctor;
mod generate;
mod render;

pub use ask::run_ask;
pub use call_tool::{run_call_tool, run_tools};
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use generate::run_generate;
pub use render::run_render;

use crate::agent::Agent;
use crate::config::{Prompts, Settings};
use crate::generation;
use crate::tools::ToolRegistry;
use anyhow::Result;

/// Prompts with the configured overrides and variables.
fn load_prompts(settings: &Settings) -> Result<Prompts> {
    Ok(Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?)
}

/// Build an agent from settings with the built-in tools.
fn build_agent(settings: &Settings, token: Option<String>) -> Result<Agent> {
    let prompts = load_prompts(settings)?;
    let generator = generation::from_settings(settings, token)?;

    Ok(Agent::from_settings(
        generator,
        ToolRegistry::with_defaults(),
        &settings.agent,
        &prompts,
    )?)
}

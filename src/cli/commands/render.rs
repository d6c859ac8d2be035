//! Render command: show the first prompt without calling the endpoint.

use super::load_prompts;
use crate::agent::render_system_prompt;
use crate::config::Settings;
use crate::tools::ToolRegistry;
use crate::transcript::ConversationTurn;
use anyhow::Result;

/// Run the render command.
pub fn run_render(query: &str, settings: &Settings) -> Result<()> {
    println!("{}", render_initial_prompt(query, settings)?);
    Ok(())
}

/// Prompt for the first generation, built from settings alone.
fn render_initial_prompt(query: &str, settings: &Settings) -> Result<String> {
    let prompts = load_prompts(settings)?;
    let system = render_system_prompt(&prompts, &ToolRegistry::with_defaults());
    let turns = [ConversationTurn::system(system), ConversationTurn::user(query)];
    Ok(settings.agent.template.render(&turns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_needs_no_endpoint() {
        let mut settings = Settings::default();
        settings.inference.base_url = "not a url".to_string();

        let prompt = render_initial_prompt("Weather in Oslo?", &settings).unwrap();
        assert!(prompt.starts_with("<|begin_of_text|><|start_header_id|>system"));
        assert!(prompt.contains("get_weather: Get the current weather"));
        assert!(prompt.ends_with("<|start_header_id|>assistant<|end_header_id|>\n\n"));
    }
}

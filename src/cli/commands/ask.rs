//! Ask command implementation.

use super::build_agent;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    query: &str,
    model: Option<String>,
    max_iterations: Option<usize>,
    show_transcript: bool,
    mut settings: Settings,
    token: Option<String>,
) -> Result<()> {
    if let Some(model) = model {
        settings.inference.model = model;
    }
    if let Some(max) = max_iterations {
        settings.agent.max_iterations = max;
    }

    if let Err(e) = preflight::check(Operation::Generate, &settings, token.as_deref()) {
        Output::error(&format!("{}", e));
        Output::info("Run 'reactor doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let agent = build_agent(&settings, token)?;
    let spinner = Output::spinner("Thinking...");

    match agent.run(query).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.content);

            if !response.tool_calls.is_empty() {
                Output::header(&format!("Tool calls ({})", response.tool_calls.len()));
                for call in &response.tool_calls {
                    Output::list_item(&format!("{} -> {}", call, call.result.trim()));
                }
                println!();
            }

            if show_transcript {
                Output::header("Transcript");
                for turn in response.transcript.turns() {
                    Output::turn(turn);
                }
                println!();
            }

            Output::info(&format!(
                "Completed with {} generation(s)",
                response.generations
            ));
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Run failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

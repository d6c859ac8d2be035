//! Generate command: raw prompt continuation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::generation::{self, truncate_at_stop};
use anyhow::Result;

/// Run the generate command.
pub async fn run_generate(
    prompt: &str,
    max_tokens: u32,
    stop: &[String],
    settings: &Settings,
    token: Option<String>,
) -> Result<()> {
    preflight::check(Operation::Generate, settings, token.as_deref())?;

    if stop.is_empty() {
        Output::warning(&format!(
            "No --stop given; generation runs until {} tokens are used",
            max_tokens
        ));
    }

    let generator = generation::from_settings(settings, token)?;
    let spinner = Output::spinner("Generating...");
    let result = generator.generate(prompt, max_tokens, stop).await;
    spinner.finish_and_clear();

    let text = result?;
    println!("{}", truncate_at_stop(&text, stop));
    Ok(())
}

//! Reactor CLI entry point.

use anyhow::Result;
use clap::Parser;
use reactor::cli::{commands, Cli, Commands};
use reactor::config::Settings;
use reactor::credentials;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("reactor={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Export the API token before any backend is created. A broken token
    // source only matters to commands that generate; doctor reports it.
    let credential = credentials::load_token(&settings);
    let token = match &credential {
        Ok(found) => found.as_ref().map(|(t, _)| t.clone()),
        Err(e) => {
            warn!("Ignoring API token: {}", e);
            None
        }
    };

    match &cli.command {
        Commands::Ask {
            query,
            model,
            max_iterations,
            transcript,
        } => {
            commands::run_ask(query, model.clone(), *max_iterations, *transcript, settings, token)
                .await?;
        }

        Commands::Render { query } => {
            commands::run_render(query, &settings)?;
        }

        Commands::Generate {
            prompt,
            max_tokens,
            stop,
        } => {
            commands::run_generate(prompt, *max_tokens, stop, &settings, token).await?;
        }

        Commands::Chat {
            message,
            system,
            max_tokens,
        } => {
            commands::run_chat(message, system.clone(), *max_tokens, &settings, token).await?;
        }

        Commands::Tools => {
            commands::run_tools()?;
        }

        Commands::CallTool { name, args } => {
            commands::run_call_tool(name, args)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, &credential)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings)?;
        }
    }

    Ok(())
}

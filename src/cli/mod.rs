//! CLI module for Reactor.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{content_preview, Output};

use clap::{Parser, Subcommand};

/// Reactor - single-step tool-augmented prompting
///
/// Renders a ReAct prompt, lets a hosted model choose one tool call, runs the
/// tool locally and asks the model for the final answer.
#[derive(Parser, Debug)]
#[command(name = "reactor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question, letting the model call one tool
    Ask {
        /// The question to ask
        query: String,

        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum action rounds before the final answer
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Print the full transcript after the answer
        #[arg(long)]
        transcript: bool,
    },

    /// Print the prompt the first generation would receive
    Render {
        /// The question to render
        query: String,
    },

    /// Run raw text generation against the configured endpoint
    Generate {
        /// Prompt text, sent as-is
        prompt: String,

        /// Maximum new tokens
        #[arg(long, default_value = "200")]
        max_tokens: u32,

        /// Stop sequence (repeatable)
        #[arg(long)]
        stop: Vec<String>,
    },

    /// Send one message through the chat completions endpoint
    Chat {
        /// The message to send
        message: String,

        /// System prompt (defaults to the configured chat prompt)
        #[arg(long)]
        system: Option<String>,

        /// Maximum new tokens
        #[arg(long, default_value = "200")]
        max_tokens: u32,
    },

    /// List registered tools
    Tools,

    /// Execute a registered tool locally
    CallTool {
        /// Tool name
        name: String,

        /// Tool argument as key=value (repeatable)
        #[arg(short, long = "arg")]
        args: Vec<String>,
    },

    /// Check configuration and credentials
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,
}

//! Doctor command - verify configuration and credentials.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::credentials::TokenSource;
use crate::error::Result;
use crate::tools::ToolRegistry;
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Outcome of token discovery at startup.
pub type TokenLoad = Result<Option<(String, TokenSource)>>;

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, token: &TokenLoad) -> anyhow::Result<()> {
    Output::header("Reactor Doctor");
    println!();

    let checks = vec![
        check_config(settings),
        check_token(settings, token),
        check_agent(settings),
        check_tools(),
    ];

    for check in &checks {
        check.print();
    }
    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!("{} error(s), {} warning(s)", errors, warnings));
        anyhow::bail!("doctor found {} problem(s)", errors);
    }
    if warnings > 0 {
        Output::warning(&format!("{} warning(s)", warnings));
    } else {
        Output::success("All checks passed.");
    }
    Ok(())
}

fn check_config(settings: &Settings) -> CheckResult {
    match settings.validate() {
        Ok(()) => CheckResult::ok(
            "Config",
            &format!(
                "{} via {} ({})",
                settings.inference.model, settings.inference.provider, settings.inference.base_url
            ),
        ),
        Err(e) => CheckResult::error(
            "Config",
            &e.to_string(),
            "Edit the file shown by 'reactor config path'",
        ),
    }
}

fn check_token(settings: &Settings, token: &TokenLoad) -> CheckResult {
    let var = &settings.inference.token_env;
    match token {
        Err(e) => CheckResult::error(
            "Token",
            &e.to_string(),
            "Fix or remove the token file, or set the token in the environment",
        ),
        Ok(Some((_, TokenSource::Environment))) => {
            CheckResult::ok("Token", &format!("found in ${}", var))
        }
        Ok(Some((_, TokenSource::File(path)))) => CheckResult::ok(
            "Token",
            &format!("read from {} and exported as ${}", path.display(), var),
        ),
        Ok(None) if preflight::requires_token(&settings.inference.base_url) => CheckResult::error(
            "Token",
            "not found",
            &format!("export {}=... or set inference.token_file", var),
        ),
        Ok(None) => CheckResult::warning(
            "Token",
            "not found",
            "fine for local servers that do not require authentication",
        ),
    }
}

fn check_agent(settings: &Settings) -> CheckResult {
    let agent = &settings.agent;
    if agent.stop_sequences.is_empty() {
        return CheckResult::warning(
            "Agent",
            "no stop sequences configured",
            "the action step will run to max_tokens and invent its own observation",
        );
    }
    CheckResult::ok(
        "Agent",
        &format!(
            "{} template, stop {:?}, {} round(s)",
            agent.template, agent.stop_sequences, agent.max_iterations
        ),
    )
}

fn check_tools() -> CheckResult {
    let registry = ToolRegistry::with_defaults();
    CheckResult::ok("Tools", &registry.names().join(", "))
}

//! Pre-flight checks before network operations.
//!
//! Validates that the endpoint configuration and credentials are usable
//! before a run that would otherwise fail on its first request.

use crate::config::Settings;
use crate::error::{ReactorError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Generation and chat need a reachable endpoint and, for hosted APIs, a token.
    Generate,
    /// Rendering prompts and running tools locally need nothing external.
    Local,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings, token: Option<&str>) -> Result<()> {
    match operation {
        Operation::Generate => {
            settings.validate()?;
            check_token(settings, token)?;
        }
        Operation::Local => {}
    }
    Ok(())
}

/// Hosted endpoints reject anonymous requests; local servers usually do not.
fn check_token(settings: &Settings, token: Option<&str>) -> Result<()> {
    if token.is_some_and(|t| !t.is_empty()) || !requires_token(&settings.inference.base_url) {
        return Ok(());
    }

    let file_hint = settings
        .token_file()
        .map(|p| format!(" or write it to {}", p.display()))
        .unwrap_or_default();

    Err(ReactorError::Config(format!(
        "No API token found for {}. Set ${}{}",
        settings.inference.base_url, settings.inference.token_env, file_hint
    )))
}

/// Whether the endpoint is a known hosted API.
pub fn requires_token(base_url: &str) -> bool {
    url::Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .is_some_and(|host| host.ends_with("huggingface.co") || host.ends_with("openai.com"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_has_no_requirements() {
        assert!(check(Operation::Local, &Settings::default(), None).is_ok());
    }

    #[test]
    fn test_hosted_endpoint_needs_token() {
        let settings = Settings::default();
        assert!(check(Operation::Generate, &settings, None).is_err());
        assert!(check(Operation::Generate, &settings, Some("hf_x")).is_ok());
    }

    #[test]
    fn test_local_endpoint_without_token() {
        let mut settings = Settings::default();
        settings.inference.base_url = "http://127.0.0.1:8080".to_string();
        assert!(check(Operation::Generate, &settings, None).is_ok());
        assert!(!requires_token("http://localhost:8000/v1"));
        assert!(requires_token("https://router.huggingface.co/v1"));
    }
}

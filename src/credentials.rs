//! API token discovery.
//!
//! The token is taken from the configured environment variable when set, otherwise
//! read from the token file and exported into the process environment so that
//! every backend created afterwards sees the same credential.

use crate::config::Settings;
use crate::error::{ReactorError, Result};
use std::path::Path;
use tracing::{debug, info};

/// Where the active token came from.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenSource {
    Environment,
    File(std::path::PathBuf),
}

/// Resolve the API token, exporting it from the token file if needed.
///
/// Returns `Ok(None)` when neither source provides a token; unauthenticated
/// endpoints (a local server, for example) still work in that case.
pub fn load_token(settings: &Settings) -> Result<Option<(String, TokenSource)>> {
    let var = &settings.inference.token_env;

    if let Ok(token) = std::env::var(var) {
        if !token.trim().is_empty() {
            debug!("Using token from ${}", var);
            return Ok(Some((token.trim().to_string(), TokenSource::Environment)));
        }
    }

    let Some(path) = settings.token_file() else {
        return Ok(None);
    };
    if !path.exists() {
        debug!("Token file {:?} does not exist", path);
        return Ok(None);
    }

    let token = read_token_file(&path)?;
    std::env::set_var(var, &token);
    info!("Exported token from {:?} as ${}", path, var);
    Ok(Some((token, TokenSource::File(path))))
}

/// Read a token from a file, ignoring surrounding whitespace.
pub fn read_token_file(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)?;
    let token = content.trim();
    if token.is_empty() {
        return Err(ReactorError::Config(format!(
            "Token file {:?} is empty",
            path
        )));
    }
    Ok(token.to_string())
}

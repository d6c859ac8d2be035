//! Built-in weather tool.
//!
//! Returns a canned forecast so runs are reproducible without a weather API.

use super::Arguments;
use crate::error::{ReactorError, Result};

/// Report the weather for `location`.
pub fn get_weather(args: &Arguments) -> Result<String> {
    let location = args
        .get("location")
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .ok_or_else(|| {
            ReactorError::ToolFailed("get_weather requires a 'location' argument".to_string())
        })?;

    Ok(format!(
        "the weather in {} is sunny with low temperatures.",
        location
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_location() {
        let err = get_weather(&Arguments::new()).unwrap_err();
        assert!(matches!(err, ReactorError::ToolFailed(_)));
    }

    #[test]
    fn test_location_is_trimmed() {
        let mut args = Arguments::new();
        args.insert("location".to_string(), "  Oslo ".to_string());
        assert_eq!(
            get_weather(&args).unwrap(),
            "the weather in Oslo is sunny with low temperatures."
        );
    }
}

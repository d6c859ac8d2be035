//! Extraction of action blocks and final answers from generated text.

use crate::error::{ReactorError, Result};
use crate::tools::{Arguments, ToolInvocationRequest};
use serde_json::Value;
use tracing::debug;

/// Find the single action block in `text`.
///
/// Returns `None` when there is no block, more than one, or the block is not
/// shaped like `{"action": "...", "action_input": {...}}`.
pub fn parse_tool_request(text: &str) -> Option<ToolInvocationRequest> {
    match try_parse_tool_request(text) {
        Ok(request) => Some(request),
        Err(e) => {
            debug!("No tool request: {}", e);
            None
        }
    }
}

/// Like [`parse_tool_request`], but reports why nothing was found.
pub fn try_parse_tool_request(text: &str) -> Result<ToolInvocationRequest> {
    let mut blocks: Vec<serde_json::Map<String, Value>> = json_objects(text)
        .into_iter()
        .filter(|obj| obj.contains_key("action"))
        .collect();

    let block = match blocks.len() {
        0 => {
            return Err(ReactorError::MalformedAction(
                "no action block found".to_string(),
            ))
        }
        1 => blocks.remove(0),
        n => {
            return Err(ReactorError::MalformedAction(format!(
                "found {} action blocks, expected exactly one",
                n
            )))
        }
    };

    let tool_name = block
        .get("action")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ReactorError::MalformedAction("'action' must be a non-empty string".to_string())
        })?
        .to_string();

    let input = block
        .get("action_input")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            ReactorError::MalformedAction("'action_input' must be an object".to_string())
        })?;

    let arguments: Arguments = input
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect();

    Ok(ToolInvocationRequest::new(tool_name, arguments))
}

/// Every top-level JSON object embedded in `text`, in order.
fn json_objects(text: &str) -> Vec<serde_json::Map<String, Value>> {
    let mut objects = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('{') {
        let start = pos + offset;
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();

        match stream.next() {
            Some(Ok(Value::Object(map))) => {
                objects.push(map);
                pos = start + stream.byte_offset();
            }
            _ => pos = start + 1,
        }
    }

    objects
}

/// Text following the last `marker`, trimmed; the whole text if the marker is absent.
pub fn extract_final_answer(text: &str, marker: &str) -> String {
    let answer = match text.rfind(marker) {
        Some(idx) if !marker.is_empty() => &text[idx + marker.len()..],
        _ => text,
    };
    answer.trim().to_string()
}

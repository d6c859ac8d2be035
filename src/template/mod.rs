//! Chat formatting conventions.
//!
//! Each model family is conditioned on its own set of special tokens around
//! role segments. Rendering a transcript with the wrong convention makes the
//! model run past the intended stopping point, so every delimiter lives in
//! [`Marker`] and every layout decision in [`ChatTemplate`].

use crate::error::{ReactorError, Result};
use crate::transcript::{ConversationTurn, Role};
use serde::{Deserialize, Serialize};

/// Label that precedes a tool result inside the assistant segment.
pub const OBSERVATION_LABEL: &str = "Observation:";

/// Special tokens used by the supported templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    BeginOfText,
    StartHeader,
    EndHeader,
    EndOfTurn,
    ImStart,
    ImEnd,
}

impl Marker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Marker::BeginOfText => "<|begin_of_text|>",
            Marker::StartHeader => "<|start_header_id|>",
            Marker::EndHeader => "<|end_header_id|>",
            Marker::EndOfTurn => "<|eot_id|>",
            Marker::ImStart => "<|im_start|>",
            Marker::ImEnd => "<|im_end|>",
        }
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported chat formatting conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatTemplate {
    /// Llama 3 header-id convention.
    #[default]
    Llama3,
    /// `<|im_start|>` / `<|im_end|>` convention (Qwen, many fine-tunes).
    ChatMl,
}

impl std::str::FromStr for ChatTemplate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llama3" | "llama-3" => Ok(ChatTemplate::Llama3),
            "chatml" => Ok(ChatTemplate::ChatMl),
            _ => Err(format!("Unknown chat template: {}", s)),
        }
    }
}

impl std::fmt::Display for ChatTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatTemplate::Llama3 => write!(f, "llama3"),
            ChatTemplate::ChatMl => write!(f, "chatml"),
        }
    }
}

impl ChatTemplate {
    /// Marker that terminates a turn; used as the stop for final answers.
    pub fn end_of_turn(&self) -> &'static str {
        match self {
            ChatTemplate::Llama3 => Marker::EndOfTurn.as_str(),
            ChatTemplate::ChatMl => Marker::ImEnd.as_str(),
        }
    }

    fn preamble(&self) -> &'static str {
        match self {
            ChatTemplate::Llama3 => Marker::BeginOfText.as_str(),
            ChatTemplate::ChatMl => "",
        }
    }

    fn header(&self, role: Role) -> String {
        match self {
            ChatTemplate::Llama3 => format!(
                "{}{}{}\n\n",
                Marker::StartHeader,
                role,
                Marker::EndHeader
            ),
            ChatTemplate::ChatMl => format!("{}{}\n", Marker::ImStart, role),
        }
    }

    fn close(&self) -> String {
        match self {
            ChatTemplate::Llama3 => Marker::EndOfTurn.to_string(),
            ChatTemplate::ChatMl => format!("{}\n", Marker::ImEnd),
        }
    }

    /// Serialize turns into a generation prompt.
    ///
    /// System and user turns become closed segments. Assistant and tool turns
    /// share one assistant segment, with tool results written as observations.
    /// The output always ends inside an open assistant segment.
    pub fn render(&self, messages: &[ConversationTurn]) -> Result<String> {
        let first = messages.first().ok_or_else(|| {
            ReactorError::Template("cannot render an empty transcript".to_string())
        })?;
        if !matches!(first.role, Role::System | Role::User) {
            return Err(ReactorError::Template(format!(
                "{} template cannot start with a {} turn",
                self, first.role
            )));
        }

        let mut out = String::from(self.preamble());
        let mut open = false;

        for turn in messages {
            match turn.role {
                Role::System | Role::User => {
                    if open {
                        out.push_str(&self.close());
                        open = false;
                    }
                    out.push_str(&self.header(turn.role));
                    out.push_str(&turn.content);
                    out.push_str(&self.close());
                }
                Role::Assistant => {
                    if !open {
                        out.push_str(&self.header(Role::Assistant));
                        open = true;
                    }
                    out.push_str(&turn.content);
                }
                Role::Tool => {
                    if !open {
                        out.push_str(&self.header(Role::Assistant));
                        open = true;
                    }
                    out.push_str(&format_observation(&turn.content));
                }
            }
        }

        if !open {
            out.push_str(&self.header(Role::Assistant));
        }

        Ok(out)
    }
}

fn format_observation(result: &str) -> String {
    format!("{} {}\n", OBSERVATION_LABEL, result.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<ConversationTurn> {
        vec![
            ConversationTurn::system("Be brief."),
            ConversationTurn::user("Weather in London?"),
        ]
    }

    #[test]
    fn test_llama3_generation_prompt() {
        let prompt = ChatTemplate::Llama3.render(&base()).unwrap();
        assert_eq!(
            prompt,
            "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\nBe brief.<|eot_id|>\
             <|start_header_id|>user<|end_header_id|>\n\nWeather in London?<|eot_id|>\
             <|start_header_id|>assistant<|end_header_id|>\n\n"
        );
    }

    #[test]
    fn test_chatml_generation_prompt() {
        let prompt = ChatTemplate::ChatMl.render(&base()).unwrap();
        assert!(prompt.starts_with("<|im_start|>system\nBe brief.<|im_end|>\n"));
        assert!(prompt.ends_with("<|im_start|>assistant\n"));
    }

    #[test]
    fn test_tool_result_continues_assistant_segment() {
        let mut turns = base();
        turns.push(ConversationTurn::assistant("Thought: check\nAction: {}\n"));
        turns.push(ConversationTurn::tool("sunny, 15°C"));

        let prompt = ChatTemplate::Llama3.render(&turns).unwrap();
        assert!(prompt.ends_with(
            "<|start_header_id|>assistant<|end_header_id|>\n\nThought: check\nAction: {}\nObservation: sunny, 15°C\n"
        ));
        assert_eq!(prompt.matches("assistant<|end_header_id|>").count(), 1);
    }

    #[test]
    fn test_earlier_assistant_turn_is_closed() {
        let mut turns = base();
        turns.push(ConversationTurn::assistant("It is sunny."));
        turns.push(ConversationTurn::user("And tomorrow?"));

        let prompt = ChatTemplate::ChatMl.render(&turns).unwrap();
        assert!(prompt.contains("<|im_start|>assistant\nIt is sunny.<|im_end|>\n"));
        assert!(prompt.ends_with("And tomorrow?<|im_end|>\n<|im_start|>assistant\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let turns = base();
        assert_eq!(
            ChatTemplate::Llama3.render(&turns).unwrap(),
            ChatTemplate::Llama3.render(&turns).unwrap()
        );
    }

    #[test]
    fn test_unsupported_first_role() {
        let turns = vec![ConversationTurn::assistant("hi")];
        assert!(matches!(
            ChatTemplate::Llama3.render(&turns),
            Err(ReactorError::Template(_))
        ));
        assert!(ChatTemplate::ChatMl.render(&[]).is_err());
    }

    #[test]
    fn test_end_of_turn_markers() {
        assert_eq!(ChatTemplate::Llama3.end_of_turn(), "<|eot_id|>");
        assert_eq!(ChatTemplate::ChatMl.end_of_turn(), "<|im_end|>");
        assert_eq!("ChatML".parse::<ChatTemplate>().unwrap(), ChatTemplate::ChatMl);
    }
}

//! ReAct agent: text-protocol tool calling over a raw generation endpoint.
//!
//! The model is asked to emit one JSON action block per step. Generation stops
//! before the observation, the tool runs locally, its result is appended to
//! the transcript, and the model is asked again for the final answer.

mod action;
mod runner;

pub use action::{extract_final_answer, parse_tool_request, try_parse_tool_request};
pub use runner::{
    render_system_prompt, Agent, AgentResponse, RunOutcome, RunState, ToolCallRecord,
};

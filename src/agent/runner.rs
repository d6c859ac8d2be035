//! Agent runner: a small state machine around two generations and one tool call.
//!
//! ```text
//! START -> AWAITING_ACTION -> ACTION_PARSED -> TOOL_EXECUTED -> FINALIZED
//!                 |                                               ^
//!                 +-------------- no action block ----------------+
//! ```
//!
//! With `max_iterations > 1`, `TOOL_EXECUTED` returns to `AWAITING_ACTION`
//! until the round budget is spent.

use super::action::{extract_final_answer, parse_tool_request};
use crate::config::{AgentSettings, Prompts};
use crate::error::{ReactorError, Result};
use crate::generation::{truncate_at_stop, Generator};
use crate::template::ChatTemplate;
use crate::tools::{ToolInvocationRequest, ToolRegistry};
use crate::transcript::{ConversationTurn, Role, Transcript};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Where an interaction currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Start,
    AwaitingAction { round: usize },
    ActionParsed { round: usize, request: ToolInvocationRequest },
    ToolExecuted { round: usize },
    Finalized { answer: String },
}

/// Agent that answers a query, consulting at most one tool per round.
pub struct Agent {
    generator: Arc<dyn Generator>,
    tools: ToolRegistry,
    template: ChatTemplate,
    system_prompt: String,
    max_tokens: u32,
    final_max_tokens: u32,
    stop_sequences: Vec<String>,
    final_answer_marker: String,
    max_iterations: usize,
}

impl Agent {
    /// Create an agent with default settings and prompts.
    pub fn new(generator: Arc<dyn Generator>, tools: ToolRegistry) -> Self {
        Self::assemble(generator, tools, &AgentSettings::default(), &Prompts::default())
    }

    /// Create an agent from configuration.
    ///
    /// Fails with [`ReactorError::Config`] on settings the loop cannot run with,
    /// such as `max_iterations = 0`.
    pub fn from_settings(
        generator: Arc<dyn Generator>,
        tools: ToolRegistry,
        settings: &AgentSettings,
        prompts: &Prompts,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self::assemble(generator, tools, settings, prompts))
    }

    fn assemble(
        generator: Arc<dyn Generator>,
        tools: ToolRegistry,
        settings: &AgentSettings,
        prompts: &Prompts,
    ) -> Self {
        let system_prompt = render_system_prompt(prompts, &tools);

        Self {
            generator,
            tools,
            template: settings.template,
            system_prompt,
            max_tokens: settings.max_tokens,
            final_max_tokens: settings.final_max_tokens,
            stop_sequences: settings.stop_sequences.clone(),
            final_answer_marker: settings.final_answer_marker.clone(),
            max_iterations: settings.max_iterations,
        }
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set the chat template.
    pub fn with_template(mut self, template: ChatTemplate) -> Self {
        self.template = template;
        self
    }

    /// Set maximum action rounds; at least one round is required.
    pub fn with_max_iterations(mut self, max: usize) -> Result<Self> {
        if max == 0 {
            return Err(ReactorError::Config(
                "agent.max_iterations must be at least 1".to_string(),
            ));
        }
        self.max_iterations = max;
        Ok(self)
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Serialize a transcript with the configured template.
    fn render_prompt(&self, transcript: &Transcript) -> Result<String> {
        self.template.render(transcript.turns())
    }

    fn open(&self, transcript: &mut Transcript, query: &str) {
        if transcript.is_empty() {
            transcript.push(ConversationTurn::system(self.system_prompt.clone()));
        }
        transcript.push(ConversationTurn::user(query));
    }

    /// Run the agent on a fresh transcript.
    pub async fn run(&self, query: &str) -> Result<AgentResponse> {
        let mut transcript = Transcript::new();
        let outcome = self.run_in(&mut transcript, query).await?;

        Ok(AgentResponse {
            content: outcome.content,
            tool_calls: outcome.tool_calls,
            generations: outcome.generations,
            run_id: outcome.run_id,
            transcript,
        })
    }

    /// Run the agent, appending to a caller-owned transcript.
    ///
    /// On error the transcript keeps every turn produced before the failure.
    #[instrument(skip(self, transcript), fields(model = %self.generator.model()))]
    pub async fn run_in(&self, transcript: &mut Transcript, query: &str) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        info!("Starting run {}", run_id);

        let mut state = RunState::Start;
        let mut ctx = RunContext::default();

        let answer = loop {
            if let RunState::Finalized { answer } = state {
                break answer;
            }
            debug!("Run {} state: {:?}", run_id, state);
            state = self.step(state, transcript, query, &mut ctx).await?;
        };

        info!(
            "Run {} finished after {} generation(s), {} tool call(s)",
            run_id,
            ctx.generations,
            ctx.tool_calls.len()
        );

        Ok(RunOutcome {
            content: answer,
            tool_calls: ctx.tool_calls,
            generations: ctx.generations,
            run_id,
        })
    }

    async fn step(
        &self,
        state: RunState,
        transcript: &mut Transcript,
        query: &str,
        ctx: &mut RunContext,
    ) -> Result<RunState> {
        match state {
            RunState::Start => {
                self.open(transcript, query);
                Ok(RunState::AwaitingAction { round: 1 })
            }

            RunState::AwaitingAction { round } => {
                if self.stop_sequences.is_empty() {
                    warn!(
                        "No stop sequences configured; the action step may overrun the observation"
                    );
                }

                let text = self
                    .generate(transcript, self.max_tokens, &self.stop_sequences, ctx)
                    .await?;
                transcript.push(ConversationTurn::assistant(text.clone()));

                match parse_tool_request(&text) {
                    Some(request) => Ok(RunState::ActionParsed { round, request }),
                    None => {
                        debug!("Round {} produced no action; finalizing", round);
                        self.finalize(transcript, ctx).await
                    }
                }
            }

            RunState::ActionParsed { round, request } => {
                let result = self.tools.execute(&request)?;
                transcript.push(ConversationTurn::tool(result.output.clone()));

                ctx.tool_calls.push(ToolCallRecord {
                    name: request.tool_name.clone(),
                    arguments: serde_json::to_string(&request.arguments)?,
                    result: result.output,
                });

                Ok(RunState::ToolExecuted { round })
            }

            RunState::ToolExecuted { round } if round < self.max_iterations => {
                Ok(RunState::AwaitingAction { round: round + 1 })
            }

            RunState::ToolExecuted { .. } => self.finalize(transcript, ctx).await,

            finalized @ RunState::Finalized { .. } => Ok(finalized),
        }
    }

    /// Generate the final answer over the current transcript.
    async fn finalize(
        &self,
        transcript: &mut Transcript,
        ctx: &mut RunContext,
    ) -> Result<RunState> {
        let stop = vec![self.template.end_of_turn().to_string()];
        let text = self
            .generate(transcript, self.final_max_tokens, &stop, ctx)
            .await?;
        transcript.push(ConversationTurn::assistant(text.clone()));

        let answer = self.final_answer(transcript, &text);
        if answer.is_empty() {
            return Err(ReactorError::Agent(
                "Model produced an empty final answer".to_string(),
            ));
        }

        Ok(RunState::Finalized { answer })
    }

    async fn generate(
        &self,
        transcript: &Transcript,
        max_tokens: u32,
        stop: &[String],
        ctx: &mut RunContext,
    ) -> Result<String> {
        let prompt = self.render_prompt(transcript)?;
        ctx.generations += 1;
        debug!(
            "Generation {} ({} prompt chars, max {} tokens)",
            ctx.generations,
            prompt.len(),
            max_tokens
        );

        let raw = self.generator.generate(&prompt, max_tokens, stop).await?;
        Ok(truncate_at_stop(&raw, stop).to_string())
    }

    /// Answer text from the final generation, or from the latest assistant
    /// step of the same segment that already wrote the marker.
    fn final_answer(&self, transcript: &Transcript, generated: &str) -> String {
        let marker = self.final_answer_marker.as_str();
        if marker.is_empty() || generated.contains(marker) {
            return extract_final_answer(generated, marker);
        }

        let earlier = transcript
            .turns()
            .iter()
            .rev()
            .take_while(|t| t.role != Role::User)
            .filter(|t| t.role == Role::Assistant)
            .find(|t| t.content.contains(marker));

        match earlier {
            Some(turn) => extract_final_answer(&turn.content, marker),
            None => generated.trim().to_string(),
        }
    }
}

/// System prompt with the registry's tools filled in.
pub fn render_system_prompt(prompts: &Prompts, tools: &ToolRegistry) -> String {
    let mut vars = HashMap::new();
    vars.insert("tools".to_string(), tools.describe());
    vars.insert("tool_names".to_string(), tools.names().join(", "));
    prompts.render_with_custom(&prompts.agent.system, &vars)
}

#[derive(Default)]
struct RunContext {
    generations: usize,
    tool_calls: Vec<ToolCallRecord>,
}

/// Result of [`Agent::run_in`]; the transcript stays with the caller.
#[derive(Debug)]
pub struct RunOutcome {
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub generations: usize,
    pub run_id: Uuid,
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final answer text.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of generation calls made.
    pub generations: usize,
    pub run_id: Uuid,
    /// Every turn of the interaction.
    pub transcript: Transcript,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Arguments;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Generator that replays canned outputs and records what it was asked.
    struct ScriptedGenerator {
        outputs: Mutex<VecDeque<String>>,
        calls: Mutex<Vec<(String, u32, Vec<String>)>>,
    }

    impl ScriptedGenerator {
        fn new(outputs: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.iter().map(|s| s.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, u32, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, max_tokens: u32, stop: &[String]) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), max_tokens, stop.to_vec()));
            self.outputs
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ReactorError::Transport("script exhausted".to_string()))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    const WEATHER_ACTION: &str = "Thought: I need the weather.\nAction:\n```\n{\"action\": \"get_weather\", \"action_input\": {\"location\": \"London\"}}\n```\nObservation: it is raining frogs";

    fn stub_weather() -> ToolRegistry {
        ToolRegistry::new().with_tool("get_weather", "Weather lookup", |_: &Arguments| {
            Ok("sunny, 15°C".to_string())
        })
    }

    #[tokio::test]
    async fn test_weather_round_trip() {
        let generator = ScriptedGenerator::new(&[
            WEATHER_ACTION,
            "Thought: I now know the final answer\nFinal Answer: It is sunny and 15°C in London.<|eot_id|>",
        ]);
        let agent = Agent::new(generator.clone(), stub_weather());

        let response = agent.run("What's the weather in London?").await.unwrap();
        assert_eq!(response.content, "It is sunny and 15°C in London.");
        assert_eq!(response.generations, 2);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "get_weather");
        assert_eq!(response.tool_calls[0].arguments, r#"{"location":"London"}"#);

        let calls = generator.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].2, vec!["Observation:".to_string()]);
        assert_eq!(calls[1].2, vec!["<|eot_id|>".to_string()]);
        // The hallucinated observation is cut; the real one is injected.
        assert!(!calls[1].0.contains("raining frogs"));
        assert!(calls[1].0.contains("Observation: sunny, 15°C\n"));

        let roles: Vec<_> = response.transcript.turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
    }

    #[tokio::test]
    async fn test_no_action_skips_tool() {
        let generator = ScriptedGenerator::new(&[
            "Thought: I can answer directly.",
            "\nFinal Answer: Paris.",
        ]);
        let agent = Agent::new(generator.clone(), stub_weather());

        let response = agent.run("Capital of France?").await.unwrap();
        assert_eq!(response.content, "Paris.");
        assert!(response.tool_calls.is_empty());
        assert_eq!(generator.calls().len(), 2);
        assert!(!response.transcript.has_role(Role::Tool));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fatal() {
        let generator = ScriptedGenerator::new(&[
            "Action:\n{\"action\": \"get_stock_price\", \"action_input\": {\"ticker\": \"ACME\"}}\n",
            "Final Answer: should never be generated",
        ]);
        let agent = Agent::new(generator.clone(), ToolRegistry::with_defaults());

        let mut transcript = Transcript::new();
        let err = agent
            .run_in(&mut transcript, "Price of ACME?")
            .await
            .unwrap_err();

        assert!(matches!(err, ReactorError::UnknownTool(ref name) if name == "get_stock_price"));
        assert_eq!(generator.calls().len(), 1);
        // The partial transcript is left with the caller.
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.last().unwrap().role, Role::Assistant);
    }

    #[test]
    fn test_transport_error_propagates() {
        let generator = ScriptedGenerator::new(&[]);
        let agent = Agent::new(generator, stub_weather());
        assert!(matches!(
            tokio_test::block_on(agent.run("hello")),
            Err(ReactorError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_marker_from_action_step_is_used() {
        let generator = ScriptedGenerator::new(&["Final Answer: 42", "<|eot_id|>"]);
        let agent = Agent::new(generator, stub_weather());

        let response = agent.run("Meaning of life?").await.unwrap();
        assert_eq!(response.content, "42");
    }

    #[tokio::test]
    async fn test_continuation_after_earlier_answer_is_dropped() {
        let generator = ScriptedGenerator::new(&["Final Answer: 42", "\nQuestion: next?"]);
        let agent = Agent::new(generator, stub_weather());

        let response = agent.run("Meaning of life?").await.unwrap();
        assert_eq!(response.content, "42");
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let settings = AgentSettings {
            max_iterations: 0,
            ..AgentSettings::default()
        };
        let result = Agent::from_settings(
            ScriptedGenerator::new(&[]),
            stub_weather(),
            &settings,
            &Prompts::default(),
        );
        assert!(matches!(result, Err(ReactorError::Config(_))));

        let agent = Agent::new(ScriptedGenerator::new(&[]), stub_weather());
        assert!(matches!(
            agent.with_max_iterations(0),
            Err(ReactorError::Config(_))
        ));
    }

    #[test]
    fn test_from_settings_uses_configured_rounds() {
        let settings = AgentSettings {
            max_iterations: 3,
            ..AgentSettings::default()
        };
        let agent = Agent::from_settings(
            ScriptedGenerator::new(&[]),
            stub_weather(),
            &settings,
            &Prompts::default(),
        )
        .unwrap();
        assert_eq!(agent.max_iterations, 3);
    }

    #[tokio::test]
    async fn test_empty_final_answer_is_error() {
        let generator = ScriptedGenerator::new(&["Thought: hmm", "   "]);
        let agent = Agent::new(generator, stub_weather());
        assert!(matches!(agent.run("?").await, Err(ReactorError::Agent(_))));
    }

    #[tokio::test]
    async fn test_multiple_rounds_when_allowed() {
        let generator = ScriptedGenerator::new(&[
            WEATHER_ACTION,
            "Thought: check Paris too\n{\"action\": \"get_weather\", \"action_input\": {\"location\": \"Paris\"}}\n",
            "Final Answer: Sunny in both.",
        ]);
        let agent = Agent::new(generator.clone(), stub_weather())
            .with_max_iterations(2)
            .unwrap();

        let response = agent.run("London and Paris?").await.unwrap();
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.generations, 3);
        assert_eq!(response.content, "Sunny in both.");

        let calls = generator.calls();
        assert_eq!(calls[1].2, vec!["Observation:".to_string()]);
        assert_eq!(calls[2].2, vec!["<|eot_id|>".to_string()]);
    }

    #[tokio::test]
    async fn test_chatml_agent_stops_at_im_end() {
        let generator = ScriptedGenerator::new(&[
            WEATHER_ACTION,
            "Final Answer: Mild.<|im_end|>\n<|im_start|>user\nhallucinated",
        ]);
        let agent = Agent::new(generator.clone(), stub_weather())
            .with_template(ChatTemplate::ChatMl)
            .with_system_prompt("Use tools.");

        let response = agent.run("Weather?").await.unwrap();
        assert_eq!(response.content, "Mild.");

        let calls = generator.calls();
        assert!(calls[0].0.starts_with("<|im_start|>system\nUse tools.<|im_end|>\n"));
        assert_eq!(calls[1].2, vec!["<|im_end|>".to_string()]);
    }

    #[test]
    fn test_render_prompt_is_pure() {
        let agent = Agent::new(ScriptedGenerator::new(&[]), ToolRegistry::with_defaults());
        let mut transcript = Transcript::new();
        agent.open(&mut transcript, "What's the weather in London?");
        assert_eq!(
            agent.render_prompt(&transcript).unwrap(),
            agent.render_prompt(&transcript).unwrap()
        );
    }

    #[test]
    fn test_system_prompt_lists_tools() {
        let agent = Agent::new(ScriptedGenerator::new(&[]), ToolRegistry::with_defaults());
        assert!(agent.system_prompt().contains("get_weather: Get the current weather"));
        assert!(!agent.system_prompt().contains("{{tools}}"));
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "get_weather".to_string(),
            arguments: r#"{"location":"London"}"#.to_string(),
            result: "sunny".to_string(),
        };
        assert_eq!(format!("{}", record), r#"get_weather({"location":"London"})"#);
    }
}

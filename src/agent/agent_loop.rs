use futures::stream::Stream;
use serde::Serialize;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::context::{ContextRequirements, ContextStore};
use super::decision::{PlannerDecision, tool_call_record};
use super::prompt::{failure_feedback, success_feedback, system_prompt};
use crate::llm::{GenerationSettings, LLMClient};
use crate::session::{ConversationHistory, Message};
use crate::tool::{JsonMap, LocalTransport, ToolInvoker, ToolRegistry, ToolResult};

/// Configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model, token budget, and temperature for planner calls
    pub generation: GenerationSettings,
    /// Maximum number of planner calls in one run
    pub max_steps: u32,
    /// Characters of result JSON kept in success feedback
    pub feedback_limit: usize,
    /// Consecutive repeats of one tool that stop the run
    pub stall_threshold: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            generation: GenerationSettings {
                model: "gemini-2.0-flash".to_string(),
                max_tokens: 8192,
                temperature: Some(0.2),
            },
            max_steps: 20,
            feedback_limit: 2000,
            stall_threshold: 3,
        }
    }
}

/// Where a run stands. Everything but `Running` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Running,
    /// The planner returned a final answer
    FinalAnswered,
    /// The same tool was chosen too many times in a row
    StalledStop,
    /// The step ceiling was reached
    StepLimitStop,
    /// The planner's output was not a usable decision
    UndecidedStop,
    /// The planner itself could not be reached
    PlannerFailed,
    /// The caller cancelled the run
    Cancelled,
}

impl AgentState {
    pub fn is_terminal(self) -> bool {
        self != AgentState::Running
    }
}

/// Per-run counters used by the step and stall guards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopState {
    /// 1-based number of the last step taken
    pub step: u32,
    /// Tool chosen by the most recent tool call
    pub last_tool_name: Option<String>,
    /// Consecutive repeats of `last_tool_name` after its first call
    pub same_tool_streak: u32,
}

impl LoopState {
    /// Records a tool-call decision and returns the updated streak.
    pub fn observe_tool(&mut self, tool: &str) -> u32 {
        if self.last_tool_name.as_deref() == Some(tool) {
            self.same_tool_streak += 1;
        } else {
            self.same_tool_streak = 0;
            self.last_tool_name = Some(tool.to_string());
        }
        self.same_tool_streak
    }
}

/// One executed tool call.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub step: u32,
    pub tool: String,
    /// Arguments after context injection
    pub args: JsonMap,
    pub result: ToolResult,
}

/// The final state of a run. History and context stay inspectable.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub state: AgentState,
    /// User-visible result: the final answer or the reason the run stopped
    pub message: String,
    pub steps: u32,
    pub tool_calls: Vec<ToolCallRecord>,
    pub history: ConversationHistory,
    pub context: ContextStore,
}

impl AgentOutcome {
    pub fn is_final(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Events from the agent during execution.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// The planner is about to be consulted
    StepStarted { step: u32 },
    /// A tool is being called
    ToolCall { step: u32, tool: String, args: Value },
    /// A tool result was received
    ToolResult { step: u32, tool: String, result: ToolResult },
    /// The run ended
    Finished { outcome: Box<AgentOutcome> },
}

/// A stream of agent events.
pub type AgentStream = Pin<Box<dyn Stream<Item = AgentEvent> + Send>>;

/// The in-flight state of one run, owned by its caller.
#[derive(Debug)]
pub struct AgentRun {
    history: ConversationHistory,
    context: ContextStore,
    loop_state: LoopState,
    state: AgentState,
    message: String,
    tool_calls: Vec<ToolCallRecord>,
}

impl AgentRun {
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    fn finish(&mut self, state: AgentState, message: impl Into<String>) {
        self.state = state;
        self.message = message.into();
        info!(
            run = %self.history.id,
            step = self.loop_state.step,
            ?state,
            "Agent run finished"
        );
    }

    pub fn into_outcome(self) -> AgentOutcome {
        AgentOutcome {
            state: self.state,
            message: self.message,
            steps: self.loop_state.step,
            tool_calls: self.tool_calls,
            history: self.history,
            context: self.context,
        }
    }
}

/// The agent that turns one command into a sequence of tool calls.
#[derive(Clone)]
pub struct Agent {
    llm_client: Arc<dyn LLMClient>,
    invoker: ToolInvoker,
    catalog: Arc<str>,
    requirements: Arc<ContextRequirements>,
    config: AgentConfig,
}

impl Agent {
    /// Creates a new agent.
    ///
    /// `catalog` is the tool listing shown to the planner, usually
    /// [`ToolRegistry::describe`].
    pub fn new(
        llm_client: Arc<dyn LLMClient>,
        invoker: ToolInvoker,
        catalog: impl Into<Arc<str>>,
        config: AgentConfig,
    ) -> Self {
        Self {
            llm_client,
            invoker,
            catalog: catalog.into(),
            requirements: Arc::new(ContextRequirements::default()),
            config,
        }
    }

    /// Creates an agent that runs the registry's tools in-process.
    pub fn with_registry(
        llm_client: Arc<dyn LLMClient>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        let catalog = registry.describe();
        let invoker = ToolInvoker::new(Arc::new(LocalTransport::new(registry)));
        Self::new(llm_client, invoker, catalog, config)
    }

    /// Replaces the context requirements table.
    pub fn with_requirements(mut self, requirements: ContextRequirements) -> Self {
        self.requirements = Arc::new(requirements);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    /// Seeds a fresh run for `command`.
    pub fn start(&self, command: &str) -> AgentRun {
        let mut history = ConversationHistory::new();
        history.push(Message::new_system(system_prompt(&self.catalog, command)));
        history.push(Message::new_user(command));
        info!(run = %history.id, %command, "Starting agent run");

        AgentRun {
            history,
            context: ContextStore::new(self.requirements.clone()),
            loop_state: LoopState::default(),
            state: AgentState::Running,
            message: String::new(),
            tool_calls: Vec::new(),
        }
    }

    /// Runs `command` until a terminal state.
    pub async fn run(&self, command: &str) -> AgentOutcome {
        self.run_with_cancel(command, CancellationToken::new()).await
    }

    /// Runs `command`, checking `cancel` before every planner call.
    pub async fn run_with_cancel(&self, command: &str, cancel: CancellationToken) -> AgentOutcome {
        let mut run = self.start(command);
        while !run.is_finished() {
            self.advance(&mut run, &cancel).await;
        }
        run.into_outcome()
    }

    /// Runs `command`, yielding events per step and a final `Finished`.
    pub fn stream(&self, command: impl Into<String>, cancel: CancellationToken) -> AgentStream {
        let agent = self.clone();
        let command = command.into();

        let stream = async_stream::stream! {
            let mut run = agent.start(&command);
            while !run.is_finished() {
                if !cancel.is_cancelled() {
                    yield AgentEvent::StepStarted { step: run.loop_state.step + 1 };
                }
                if let Some(record) = agent.advance(&mut run, &cancel).await {
                    yield AgentEvent::ToolCall {
                        step: record.step,
                        tool: record.tool.clone(),
                        args: Value::Object(record.args.clone()),
                    };
                    yield AgentEvent::ToolResult {
                        step: record.step,
                        tool: record.tool,
                        result: record.result,
                    };
                }
            }
            yield AgentEvent::Finished { outcome: Box::new(run.into_outcome()) };
        };

        Box::pin(stream)
    }

    /// Takes one step. Returns the tool call it executed, if any.
    pub async fn advance(
        &self,
        run: &mut AgentRun,
        cancel: &CancellationToken,
    ) -> Option<ToolCallRecord> {
        if run.is_finished() {
            return None;
        }
        if cancel.is_cancelled() {
            run.finish(AgentState::Cancelled, "The run was cancelled.");
            return None;
        }

        run.loop_state.step += 1;
        let step = run.loop_state.step;
        debug!(run = %run.history.id, step, "Calling planner");

        let input = self
            .config
            .generation
            .input(run.history.messages().to_vec(), true);
        let raw = match self.llm_client.complete(input).await {
            Ok(output) => output.text,
            Err(error) => {
                warn!(step, %error, "Planner call failed");
                run.finish(AgentState::PlannerFailed, format!("Model call failed: {}", error));
                return None;
            }
        };

        let (tool, args) = match PlannerDecision::parse(&raw) {
            PlannerDecision::FinalAnswer { text } => {
                run.finish(AgentState::FinalAnswered, text);
                return None;
            }
            PlannerDecision::Undecided { message } => {
                warn!(step, raw = %raw, "Planner output was not a usable decision");
                run.finish(AgentState::UndecidedStop, message);
                return None;
            }
            PlannerDecision::ToolCall { tool, args } => (tool, args),
        };

        let args = run.context.inject(&tool, args);
        run.history
            .push(Message::new_assistant(tool_call_record(&tool, &args)));

        info!(step, tool = %tool, "Agent requested tool execution");
        let result = self.invoker.invoke(&tool, args.clone()).await;

        let feedback = match &result {
            ToolResult::Success(payload) => {
                run.context.merge(payload);
                success_feedback(&tool, payload, self.config.feedback_limit)
            }
            ToolResult::Failure(message) => failure_feedback(&tool, message),
        };
        run.history.push(Message::new_tool_feedback(feedback));

        let record = ToolCallRecord {
            step,
            tool: tool.clone(),
            args,
            result,
        };
        run.tool_calls.push(record.clone());

        let streak = run.loop_state.observe_tool(&tool);
        if streak >= self.config.stall_threshold {
            warn!(step, tool = %tool, streak, "Same tool chosen repeatedly");
            run.finish(
                AgentState::StalledStop,
                format!(
                    "Stopped: the tool {} was chosen {} times in a row without progress.",
                    tool,
                    streak + 1
                ),
            );
        } else if step >= self.config.max_steps {
            warn!(step, "Step limit reached");
            run.finish(
                AgentState::StepLimitStop,
                format!("Stopped: reached the maximum of {} steps.", self.config.max_steps),
            );
        }

        Some(record)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

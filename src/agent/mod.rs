pub mod agent_loop;
pub mod context;
pub mod decision;
pub mod prompt;


pub use agent_loop::{
    Agent, AgentConfig, AgentEvent, AgentOutcome, AgentRun, AgentState, AgentStream, LoopState,
    ToolCallRecord,
};
pub use context::{ContextRequirements, ContextStore, derive_fields};
pub use decision::PlannerDecision;

//! Codeloom agent runtime: the turn orchestrator, session manager and
//! per-session event bus.

pub mod bus;
pub mod manager;
pub mod orchestrator;
pub mod prompts;
pub mod tokens;

pub use bus::{BusSubscriber, EventBus};
pub use manager::{SessionError, SessionHandle, SessionManager};
pub use orchestrator::{Orchestrator, TurnOptions, MAX_ROUNDS};
pub use prompts::{command_directory, system_prompt_for, CommandInfo, DEFAULT_SYSTEM_PROMPT};
pub use tokens::{ContextCount, TokenCounter};

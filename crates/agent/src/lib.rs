//! The agent control loop of autoclaw.
//!
//! The agent follows a **Plan → Authorize → Act → Observe** cycle:
//!
//! 1. **Plan**: assemble the prompt and ask the backend for one proposal
//! 2. **Recover** a structured proposal from whatever text came back
//! 3. **Authorize**: continuous mode, a pre-authorized count, or the operator
//! 4. **Act**: dispatch the command through the plugin hooks
//! 5. **Observe**: append the result line to history and summary memory
//!
//! The loop runs until the operator exits, the continuous-mode ceiling is
//! reached or the console closes.

pub mod budget;
pub mod cycle_log;
pub mod gate;
pub mod hooks;
pub mod loop_runner;
pub mod prompt;
pub mod recovery;
pub mod state;
pub mod timeout;

#[cfg(test)]
mod test_helpers;

pub use budget::{TokenBudget, guard_result, over_budget_notice};
pub use cycle_log::CycleLog;
pub use gate::{AuthorizationGate, GateDecision, GateInput, InputFormatError};
pub use hooks::{HookPipeline, run_hook};
pub use loop_runner::{AgentLoop, CycleOutcome, LoopExit, UNABLE_TO_EXECUTE, resolve_path_args};
pub use recovery::{Recovered, Technique, recover, recover_offline};
pub use state::AgentState;
pub use timeout::TimeoutProvider;

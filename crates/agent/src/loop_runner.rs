//! The agent control loop.
//!
//! One cycle:
//!
//! 1. bump the cycle counter, stop at the continuous-mode ceiling
//! 2. call the backend with the assembled prompt
//! 3. recover a proposal from the reply
//! 4. post-planning hook
//! 5. resolve path-like arguments against the workspace
//! 6. authorization gate
//! 7. dispatch (pre-command hook, registry, budget guard, post-command hook);
//!    the auto-steps counter drops as soon as the registry has run
//! 8. append the result line to history
//!
//! Cycles run strictly one after another. A failing backend, plugin or
//! console aborts only the current cycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use autoclaw_config::AppConfig;
use autoclaw_core::command::{CommandArgs, CommandContext, CommandResult};
use autoclaw_core::console::OperatorConsole;
use autoclaw_core::error::ConsoleError;
use autoclaw_core::event::{DomainEvent, EventBus};
use autoclaw_core::message::Message;
use autoclaw_core::plugin::PluginList;
use autoclaw_core::proposal::{Invocation, Thoughts};
use autoclaw_core::provider::{Provider, ProviderRequest};
use autoclaw_core::tokenizer::{HeuristicTokenizer, Tokenizer};
use autoclaw_core::Error;
use autoclaw_security::{PathValidationError, Workspace};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::budget::{TokenBudget, guard_result};
use crate::cycle_log::CycleLog;
use crate::gate::{AuthorizationGate, GateDecision};
use crate::hooks::HookPipeline;
use crate::prompt;
use crate::recovery::recover;
use crate::state::AgentState;
use crate::timeout::TimeoutProvider;

/// History line recorded when a cycle produced no result.
pub const UNABLE_TO_EXECUTE: &str = "Unable to execute command";

/// Argument keys that name files or directories.
pub const PATH_LIKE_ARGS: [&str; 3] = ["filename", "directory", "clone_path"];

/// How a single cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A result line was appended to history
    Completed { result: String },
    /// The operator asked to stop
    Exit,
    /// Continuous mode hit its ceiling before calling the backend
    CeilingReached,
    /// The cycle failed part-way; nothing was appended for it
    Aborted(Error),
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    OperatorExit,
    CeilingReached { cycles: u64 },
    ConsoleClosed,
}

impl LoopExit {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::OperatorExit => "operator exit",
            Self::CeilingReached { .. } => "continuous limit reached",
            Self::ConsoleClosed => "console closed",
        }
    }
}

/// The core agent loop that orchestrates backend calls, plugins, the
/// operator and command dispatch.
pub struct AgentLoop {
    /// Backend, wrapped in the configured timeout
    provider: Arc<dyn Provider>,

    model: String,

    temperature: f32,

    /// Context window of `model`
    token_limit: usize,

    budget_margin: usize,

    /// Cycle ceiling in continuous mode (0 = unlimited)
    continuous_limit: u64,

    hooks: HookPipeline,

    gate: AuthorizationGate,

    console: Arc<dyn OperatorConsole>,

    tokenizer: Arc<dyn Tokenizer>,

    workspace: Workspace,

    event_bus: Arc<EventBus>,

    cycle_log: Option<CycleLog>,
}

impl AgentLoop {
    /// Create a loop using the fast model of `config`.
    pub fn new(
        provider: Arc<dyn Provider>,
        config: &AppConfig,
        console: Arc<dyn OperatorConsole>,
        workspace: Workspace,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let timeout = Duration::from_secs(config.backend_timeout_secs);
        Self {
            provider: Arc::new(TimeoutProvider::new(provider, timeout)),
            model: config.fast_llm_model.clone(),
            temperature: config.temperature,
            token_limit: config.fast_token_limit,
            budget_margin: config.agent_loop.budget_margin,
            continuous_limit: config.agent_loop.continuous_limit,
            hooks: HookPipeline::empty(),
            gate: AuthorizationGate::new(&config.agent_loop),
            console,
            tokenizer: Arc::new(HeuristicTokenizer),
            workspace,
            event_bus,
            cycle_log: None,
        }
    }

    /// Attach the run's plugin list.
    pub fn with_plugins(mut self, plugins: PluginList) -> Self {
        self.hooks = HookPipeline::new(plugins);
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Mirror every cycle to files in `log`.
    pub fn with_cycle_log(mut self, log: CycleLog) -> Self {
        self.cycle_log = Some(log);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run cycles until the operator exits, the ceiling is reached or the
    /// console closes.
    pub async fn run(&self, state: &mut AgentState) -> LoopExit {
        info!(
            ai_name = %state.ai_name,
            model = %self.model,
            continuous = self.gate.is_continuous(),
            plugins = self.hooks.plugins().len(),
            "Starting agent loop"
        );

        loop {
            match self.run_cycle(state).await {
                CycleOutcome::Completed { .. } => {}
                CycleOutcome::Exit => return self.finish(state.cycle, LoopExit::OperatorExit),
                CycleOutcome::CeilingReached => {
                    let cycles = state.cycle.saturating_sub(1);
                    return self.finish(cycles, LoopExit::CeilingReached { cycles });
                }
                CycleOutcome::Aborted(Error::Console(ConsoleError::Closed)) => {
                    return self.finish(state.cycle, LoopExit::ConsoleClosed);
                }
                CycleOutcome::Aborted(e) => {
                    error!(cycle = state.cycle, error = %e, "Cycle aborted");
                    self.console.warn(&format!("Cycle {} aborted: {e}", state.cycle));
                    self.event_bus.publish(DomainEvent::CycleAborted {
                        cycle: state.cycle,
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }
    }

    fn finish(&self, cycles: u64, exit: LoopExit) -> LoopExit {
        info!(cycles, reason = exit.reason(), "Agent loop finished");
        self.event_bus.publish(DomainEvent::LoopFinished {
            cycles,
            reason: exit.reason().to_string(),
            timestamp: Utc::now(),
        });
        exit
    }

    /// Run exactly one cycle.
    pub async fn run_cycle(&self, state: &mut AgentState) -> CycleOutcome {
        state.cycle += 1;
        let cycle = state.cycle;

        if self.gate.is_continuous() && self.continuous_limit > 0 && cycle > self.continuous_limit {
            self.console
                .say("Continuous Limit Reached: ", &self.continuous_limit.to_string());
            return CycleOutcome::CeilingReached;
        }

        self.event_bus.publish(DomainEvent::CycleStarted {
            cycle,
            timestamp: Utc::now(),
        });
        debug!(cycle, history = state.history.len(), "Cycle started");

        match self.cycle_body(state, cycle).await {
            Ok(outcome) => outcome,
            Err(e) => CycleOutcome::Aborted(e),
        }
    }

    async fn cycle_body(&self, state: &mut AgentState, cycle: u64) -> Result<CycleOutcome, Error> {
        // ── Plan ──
        let messages = prompt::assemble(
            &state.system_prompt,
            &state.summary_memory,
            &state.history,
            self.tokenizer.as_ref(),
            &self.model,
            self.token_limit,
        );
        let request = ProviderRequest::new(&self.model, messages).with_temperature(self.temperature);
        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage {
            debug!(cycle, tokens = usage.total_tokens, model = %response.model, "Backend replied");
        }
        state.history.push(Message::assistant(&response.content));

        let recovered = recover(&response.content, Some(self.provider.as_ref()), &self.model).await;
        if let Some(log) = &self.cycle_log {
            log.history(cycle, &state.history).await;
            log.reply(cycle, &recovered.to_value()).await;
        }

        let proposal = self.hooks.post_planning(recovered.proposal).await?;

        let invocation = proposal.as_ref().map(|p| {
            self.show_thoughts(&state.ai_name, &p.thoughts);
            self.prepare(cycle, &p.command)
        });
        self.show_next_action(invocation.as_ref());

        // ── Authorize ──
        let decision = self
            .gate
            .decide(
                state,
                proposal.as_ref(),
                self.console.as_ref(),
                self.provider.as_ref(),
                &self.model,
            )
            .await?;
        if let Some(log) = &self.cycle_log {
            let input = match &decision {
                GateDecision::Authorize => "GENERATE NEXT COMMAND JSON",
                GateDecision::Feedback(text) => text.as_str(),
                GateDecision::Exit => "EXIT",
            };
            log.user_input(cycle, input).await;
        }

        // ── Act ──
        let result = match decision {
            GateDecision::Exit => return Ok(CycleOutcome::Exit),
            GateDecision::Feedback(text) => Some(format!("Human feedback: {text}")),
            GateDecision::Authorize => match invocation {
                None => None,
                Some(inv) if inv.is_error_sentinel() => Some(format!(
                    "Command {} threw the following error: {}",
                    inv.name,
                    Value::Object(inv.args)
                )),
                Some(inv) => Some(self.dispatch(state, inv).await?),
            },
        };

        // ── Observe ──
        let line = result.unwrap_or_else(|| UNABLE_TO_EXECUTE.to_string());
        state.history.push(Message::system(&line));
        self.console.say("SYSTEM: ", &line);
        state.remember(&line);

        Ok(CycleOutcome::Completed { result: line })
    }

    /// Resolve path arguments; a failure turns the invocation into an error
    /// sentinel so it is reported instead of dispatched.
    fn prepare(&self, cycle: u64, command: &Invocation) -> Invocation {
        if command.is_error_sentinel() {
            return command.clone();
        }
        match resolve_path_args(&self.workspace, &command.args) {
            Ok(args) => Invocation::new(command.name.clone(), args),
            Err(e) => {
                warn!(cycle, command = %command.name, "Rejected command arguments: {e}");
                let mut args = CommandArgs::new();
                args.insert("reason".into(), Value::String(e.to_string()));
                Invocation::new("Error:", args)
            }
        }
    }

    async fn dispatch(&self, state: &mut AgentState, invocation: Invocation) -> Result<String, Error> {
        let invocation = self.hooks.pre_command(invocation).await?;
        let ctx = CommandContext {
            workspace_root: self.workspace.root().to_path_buf(),
            cycle: state.cycle,
        };

        let start = Instant::now();
        let result: CommandResult = state
            .registry
            .execute(&invocation.name, &invocation.args, &ctx)
            .await
            .into();
        let duration_ms = start.elapsed().as_millis() as u64;
        // Counted once the registry has run, even if a later hook fails
        state.next_action_count = state.next_action_count.saturating_sub(1);

        info!(
            cycle = state.cycle,
            command = %invocation.name,
            success = result.is_success(),
            duration_ms,
            "Command dispatched"
        );
        self.event_bus.publish(DomainEvent::CommandExecuted {
            cycle: state.cycle,
            command: invocation.name.clone(),
            success: result.is_success(),
            duration_ms,
            timestamp: Utc::now(),
        });

        let budget = TokenBudget {
            model: self.model.clone(),
            token_limit: self.token_limit,
            margin: self.budget_margin,
        };
        let line = guard_result(
            &invocation.name,
            &result.to_text(),
            &state.summary_memory,
            self.tokenizer.as_ref(),
            &budget,
        );
        let line = self.hooks.post_command(&invocation.name, line).await?;
        Ok(line)
    }

    fn show_thoughts(&self, ai_name: &str, thoughts: &Thoughts) {
        let name = ai_name.to_uppercase();
        self.console.say(&format!("{name} THOUGHTS: "), &thoughts.text);
        self.console.say("REASONING: ", &thoughts.reasoning);

        let plan = thoughts.plan_lines();
        if !plan.is_empty() {
            self.console.say("PLAN: ", "");
            for line in plan {
                self.console.say("-  ", &line);
            }
        }

        self.console.say("CRITICISM: ", &thoughts.criticism);
        if !thoughts.speak.is_empty() {
            self.console.say(&format!("{name} SAYS: "), &thoughts.speak);
        }
    }

    fn show_next_action(&self, invocation: Option<&Invocation>) {
        let text = match invocation {
            Some(inv) => format!(
                "COMMAND = {}  ARGUMENTS = {}",
                inv.name,
                Value::Object(inv.args.clone())
            ),
            None => "COMMAND = None  ARGUMENTS = None".to_string(),
        };
        self.console.say("NEXT ACTION: ", &text);
    }
}

/// Resolve path-like arguments against the workspace root.
///
/// A `directory` of `""` or `"/"` means the root itself. Non-string values
/// are left alone.
pub fn resolve_path_args(workspace: &Workspace, args: &CommandArgs) -> Result<CommandArgs, PathValidationError> {
    let mut resolved = args.clone();
    for key in PATH_LIKE_ARGS {
        let Some(raw) = args.get(key).and_then(Value::as_str) else {
            continue;
        };
        let path = if key == "directory" && (raw.is_empty() || raw == "/") {
            workspace.root().to_path_buf()
        } else {
            workspace.resolve(raw)?
        };
        resolved.insert(key.into(), Value::String(path.to_string_lossy().into_owned()));
    }
    Ok(resolved)
}

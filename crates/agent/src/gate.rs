//! Authorization gate: decides whether a cycle's proposed command runs.
//!
//! In continuous mode every cycle is authorized. In interactive mode the
//! operator is asked whenever the auto-steps counter is zero; a positive
//! counter bypasses the prompt. The counter itself is only decremented by
//! the loop, after a real dispatch.

use autoclaw_config::LoopConfig;
use autoclaw_core::Error;
use autoclaw_core::console::OperatorConsole;
use autoclaw_core::message::Message;
use autoclaw_core::proposal::{AssistantProposal, Thoughts};
use autoclaw_core::provider::{Provider, ProviderRequest};
use tracing::{debug, info};

use crate::state::AgentState;

/// What the cycle should do after the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Dispatch the proposed command
    Authorize,
    /// Skip dispatch; record this text as human feedback
    Feedback(String),
    /// Terminate the loop
    Exit,
}

/// One parsed line of operator input.
#[derive(Debug, Clone, PartialEq)]
pub enum GateInput {
    Authorize,
    AuthorizeN(u64),
    SelfFeedback,
    Exit,
    Feedback(String),
    Invalid(InputFormatError),
}

/// Operator input that cannot be acted on; the gate re-prompts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputFormatError {
    #[error("Invalid input format.")]
    Empty,

    #[error("Invalid input format. Please enter '{key} -N' where N is the number of continuous tasks.")]
    BadCount { key: String },
}

#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    continuous: bool,
    authorise_key: String,
    exit_key: String,
    self_feedback_key: String,
}

impl AuthorizationGate {
    pub fn new(config: &LoopConfig) -> Self {
        Self {
            continuous: config.continuous_mode,
            authorise_key: config.authorise_key.to_lowercase(),
            exit_key: config.exit_key.to_lowercase(),
            self_feedback_key: config.self_feedback_key.to_lowercase(),
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn authorise_key(&self) -> &str {
        &self.authorise_key
    }

    /// Whether a self-feedback critique approves the plan: its first word is
    /// the authorise key.
    fn accepts(&self, critique: &str) -> bool {
        critique
            .split_whitespace()
            .next()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .is_some_and(|word| word == self.authorise_key)
    }

    /// Interpret one line of operator input. Pure.
    pub fn parse_input(&self, line: &str) -> GateInput {
        let trimmed = line.trim();
        let lowered = trimmed.to_lowercase();

        if lowered.is_empty() {
            return GateInput::Invalid(InputFormatError::Empty);
        }
        if lowered == self.authorise_key {
            return GateInput::Authorize;
        }
        if lowered == self.self_feedback_key {
            return GateInput::SelfFeedback;
        }
        if let Some(count) = lowered.strip_prefix(&format!("{} ", self.authorise_key)) {
            return match count.trim().parse::<i64>() {
                Ok(n) => GateInput::AuthorizeN(n.unsigned_abs()),
                Err(_) => GateInput::Invalid(InputFormatError::BadCount {
                    key: self.authorise_key.clone(),
                }),
            };
        }
        if lowered == self.exit_key {
            return GateInput::Exit;
        }
        GateInput::Feedback(trimmed.to_string())
    }

    /// Decide the fate of this cycle's proposal.
    ///
    /// May prompt the operator repeatedly and, for self-feedback, call the
    /// backend once. Console and backend failures abort the cycle.
    pub async fn decide(
        &self,
        state: &mut AgentState,
        proposal: Option<&AssistantProposal>,
        console: &dyn OperatorConsole,
        backend: &dyn Provider,
        model: &str,
    ) -> Result<GateDecision, Error> {
        if self.continuous || state.next_action_count > 0 {
            return Ok(GateDecision::Authorize);
        }

        console.say(
            "",
            &format!(
                "Enter '{key}' to authorise command, '{key} -N' to run N continuous commands, \
                 '{sf}' to run self-feedback commands or '{exit}' to exit program, or enter feedback for {name}...",
                key = self.authorise_key,
                sf = self.self_feedback_key,
                exit = self.exit_key,
                name = state.ai_name,
            ),
        );

        loop {
            let line = console.read_line("Input:").await?;
            match self.parse_input(&line) {
                GateInput::Invalid(e) => {
                    console.warn(&e.to_string());
                }
                GateInput::Authorize => {
                    console.say("-=-=-=-=-=-=-= COMMAND AUTHORISED BY USER -=-=-=-=-=-=-=", "");
                    return Ok(GateDecision::Authorize);
                }
                GateInput::AuthorizeN(n) => {
                    info!(steps = n, "Operator authorised continuous steps");
                    state.next_action_count = n;
                    return Ok(GateDecision::Authorize);
                }
                GateInput::SelfFeedback => {
                    console.say(
                        "-=-=-=-=-=-=-= THOUGHTS, REASONING, PLAN AND CRITICISM WILL NOW BE VERIFIED BY AGENT -=-=-=-=-=-=-=",
                        "",
                    );
                    let empty = Thoughts::default();
                    let thoughts = proposal.map(|p| &p.thoughts).unwrap_or(&empty);
                    let critique = self_feedback(backend, model, &state.ai_role, thoughts).await?;
                    console.say("SELF FEEDBACK: ", &critique);
                    if self.accepts(&critique) {
                        return Ok(GateDecision::Authorize);
                    }
                    return Ok(GateDecision::Feedback(critique));
                }
                GateInput::Exit => {
                    console.say("Exiting...", "");
                    return Ok(GateDecision::Exit);
                }
                GateInput::Feedback(text) => {
                    debug!(len = text.len(), "Operator gave feedback");
                    return Ok(GateDecision::Feedback(text));
                }
            }
        }
    }
}

/// Ask the backend to critique the agent's own thoughts.
async fn self_feedback(
    backend: &dyn Provider,
    model: &str,
    ai_role: &str,
    thoughts: &Thoughts,
) -> Result<String, Error> {
    let prompt = format!(
        "Below is a message from an AI agent with the role of {ai_role}. Please review the provided \
         Thought, Reasoning, Plan, and Criticism. If these elements accurately contribute to the \
         successful execution of the assumed role, respond with the letter 'Y' followed by a space, \
         and then explain why it is effective. If the provided information is not suitable for \
         achieving the role's objectives, please provide one or more sentences addressing the issue \
         and suggesting a resolution.\n{}{}{}{}",
        thoughts.text, thoughts.reasoning, thoughts.plan, thoughts.criticism
    );
    let request = ProviderRequest::new(model, vec![Message::user(prompt)]);
    Ok(backend.complete(request).await?.content)
}

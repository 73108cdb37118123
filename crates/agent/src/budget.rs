//! Budget guard: keeps oversized command output out of the context window.

use autoclaw_core::tokenizer::Tokenizer;

/// Window limits a result must fit into.
#[derive(Debug, Clone)]
pub struct TokenBudget {
    pub model: String,
    pub token_limit: usize,
    /// Reserve for everything else in the next request
    pub margin: usize,
}

/// Render a command result as its history line, unless it is too large.
///
/// When `count(output) + count(summary) + margin` exceeds the limit the
/// output is discarded and replaced by a fixed notice telling the model not
/// to repeat the call; the notice depends only on the command name.
pub fn guard_result(
    command: &str,
    output: &str,
    summary: &str,
    tokenizer: &dyn Tokenizer,
    budget: &TokenBudget,
) -> String {
    let needed = tokenizer.count(output, &budget.model) + tokenizer.count(summary, &budget.model) + budget.margin;
    if needed > budget.token_limit {
        tracing::warn!(command, needed, limit = budget.token_limit, "Command output exceeds token budget");
        return over_budget_notice(command);
    }
    format!("Command {command} returned: {output}")
}

pub fn over_budget_notice(command: &str) -> String {
    format!(
        "Failure: command {command} returned too much output. Do not execute this command again with the same arguments."
    )
}

//! Per-run agent state.

use autoclaw_config::{AiSettings, AppConfig};
use autoclaw_core::command::CommandRegistry;
use autoclaw_core::message::History;
use std::sync::Arc;

use crate::prompt::{self, INITIAL_SUMMARY};

/// Everything one run owns. Created once, mutated only by the loop.
pub struct AgentState {
    pub ai_name: String,
    pub ai_role: String,

    /// Built once from the identity and the command set
    pub system_prompt: String,

    /// Append-only conversation history
    pub history: History,

    /// Rolling summary of recent results, bounded by `summary_memory_limit`
    pub summary_memory: String,

    /// Cycles that may still run without asking the operator
    pub next_action_count: u64,

    /// Index of the current cycle, starting at 1
    pub cycle: u64,

    pub registry: Arc<CommandRegistry>,
    pub config: Arc<AppConfig>,
}

impl AgentState {
    pub fn new(settings: &AiSettings, registry: Arc<CommandRegistry>, config: Arc<AppConfig>) -> Self {
        Self {
            ai_name: settings.ai_name.clone(),
            ai_role: settings.ai_role.clone(),
            system_prompt: prompt::system_prompt(settings, &registry),
            history: History::new(),
            summary_memory: INITIAL_SUMMARY.to_string(),
            next_action_count: 0,
            cycle: 0,
            registry,
            config,
        }
    }

    /// Append a result line to the summary memory, dropping the oldest text
    /// beyond the configured character limit.
    pub fn remember(&mut self, line: &str) {
        if !self.summary_memory.is_empty() {
            self.summary_memory.push('\n');
        }
        self.summary_memory.push_str(line);

        let limit = self.config.agent_loop.summary_memory_limit;
        let excess = self.summary_memory.chars().count().saturating_sub(limit);
        if excess > 0 {
            let cut = self
                .summary_memory
                .char_indices()
                .nth(excess)
                .map_or(self.summary_memory.len(), |(i, _)| i);
            self.summary_memory.drain(..cut);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(limit: usize) -> AgentState {
        let mut config = AppConfig::default();
        config.agent_loop.summary_memory_limit = limit;
        AgentState::new(&AiSettings::default(), Arc::new(CommandRegistry::new()), Arc::new(config))
    }

    #[test]
    fn starts_with_initial_summary() {
        let s = state(100);
        assert_eq!(s.summary_memory, INITIAL_SUMMARY);
        assert_eq!(s.next_action_count, 0);
        assert!(s.history.is_empty());
        assert!(s.system_prompt.contains("Entrepreneur-GPT"));
    }

    #[test]
    fn summary_keeps_newest_text() {
        let mut s = state(20);
        s.remember("Command a returned: 1");
        s.remember("Command b returned: 2");
        assert_eq!(s.summary_memory, "ommand b returned: 2");
    }

    #[test]
    fn summary_truncation_respects_char_boundaries() {
        let mut s = state(5);
        s.remember("héllo wörld");
        assert_eq!(s.summary_memory, "wörld");
    }
}

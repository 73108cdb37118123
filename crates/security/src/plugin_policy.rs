//! Plugin policy: decides which discovered plugins may load.
//!
//! Rules, in order:
//! - a name on the denylist is refused
//! - a name on the allowlist is admitted
//! - anything else needs the operator's confirmation

use autoclaw_config::PluginsConfig;
use tracing::debug;

/// Outcome of checking a plugin name against the policy.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginDecision {
    Allowed,
    Denied { reason: String },
    /// Not listed anywhere; ask the operator
    NeedsConfirmation,
}

#[derive(Debug, Clone, Default)]
pub struct PluginPolicy {
    allowlist: Vec<String>,
    denylist: Vec<String>,
}

impl PluginPolicy {
    pub fn new(allowlist: Vec<String>, denylist: Vec<String>) -> Self {
        Self { allowlist, denylist }
    }

    pub fn from_config(config: &PluginsConfig) -> Self {
        Self::new(config.allowlist.clone(), config.denylist.clone())
    }

    pub fn check(&self, plugin_name: &str) -> PluginDecision {
        debug!(plugin = plugin_name, "Checking whether plugin may load");
        if self.denylist.iter().any(|p| p == plugin_name) {
            return PluginDecision::Denied {
                reason: format!("Plugin '{plugin_name}' is on the denylist"),
            };
        }
        if self.allowlist.iter().any(|p| p == plugin_name) {
            return PluginDecision::Allowed;
        }
        PluginDecision::NeedsConfirmation
    }
}

/// Whether an operator's answer to a load confirmation admits the plugin.
pub fn confirmation_admits(answer: &str, authorise_key: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(authorise_key)
}

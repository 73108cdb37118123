//! Plugin hook pipeline.
//!
//! For a hook point, the plugins that declare it are applied in list order,
//! each receiving the previous one's output. An error from any handler
//! stops the chain and is returned to the caller unchanged.

use autoclaw_core::error::PluginError;
use autoclaw_core::plugin::{HookValue, Plugin, PluginList};
use autoclaw_core::proposal::{AssistantProposal, Invocation};
use std::sync::Arc;
use tracing::debug;

/// Thread `value` through every plugin that handles its hook point.
///
/// The point is taken from the value itself. With no participating
/// plugins the value is returned unchanged.
pub async fn run_hook(plugins: &[Arc<dyn Plugin>], value: HookValue) -> Result<HookValue, PluginError> {
    let point = value.point();
    let mut value = value;
    for plugin in plugins.iter().filter(|p| p.handles(point)) {
        debug!(plugin = plugin.name(), %point, "Running plugin hook");
        value = plugin.apply(value).await?;
        if value.point() != point {
            return Err(PluginError {
                plugin: plugin.name().to_string(),
                point: point.to_string(),
                reason: format!("returned a value for {}", value.point()),
            });
        }
    }
    Ok(value)
}

/// Typed access to the three hook points of a cycle.
#[derive(Clone)]
pub struct HookPipeline {
    plugins: PluginList,
}

impl HookPipeline {
    pub fn new(plugins: PluginList) -> Self {
        Self { plugins }
    }

    pub fn empty() -> Self {
        Self::new(Arc::from(Vec::<Arc<dyn Plugin>>::new()))
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    pub async fn post_planning(
        &self,
        proposal: Option<AssistantProposal>,
    ) -> Result<Option<AssistantProposal>, PluginError> {
        match run_hook(&self.plugins, HookValue::PostPlanning(proposal)).await? {
            HookValue::PostPlanning(proposal) => Ok(proposal),
            other => Err(mismatch("post_planning", &other)),
        }
    }

    pub async fn pre_command(&self, invocation: Invocation) -> Result<Invocation, PluginError> {
        match run_hook(&self.plugins, HookValue::PreCommand(invocation)).await? {
            HookValue::PreCommand(invocation) => Ok(invocation),
            other => Err(mismatch("pre_command", &other)),
        }
    }

    pub async fn post_command(&self, command: &str, result: String) -> Result<String, PluginError> {
        let value = HookValue::PostCommand {
            command: command.to_string(),
            result,
        };
        match run_hook(&self.plugins, value).await? {
            HookValue::PostCommand { result, .. } => Ok(result),
            other => Err(mismatch("post_command", &other)),
        }
    }
}

// run_hook already rejects a changed point, so this only guards the match.
fn mismatch(point: &str, got: &HookValue) -> PluginError {
    PluginError {
        plugin: "<pipeline>".into(),
        point: point.into(),
        reason: format!("unexpected {} value", got.point()),
    }
}

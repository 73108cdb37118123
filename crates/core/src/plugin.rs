//! Plugin trait: opt-in extensions that observe and transform each cycle.
//!
//! A plugin declares, per hook point, whether it participates. The loop
//! never inspects plugins beyond these flags: loading, allow/deny checks and
//! ordering happen before the run and the list is read-only afterwards.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use crate::error::PluginError;
use crate::proposal::{AssistantProposal, Invocation};

/// A named moment in the cycle where plugins may transform data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// After the reply is recovered, before authorization
    PostPlanning,
    /// Immediately before dispatch
    PreCommand,
    /// After dispatch, before the result reaches the history
    PostCommand,
}

impl HookPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostPlanning => "post_planning",
            Self::PreCommand => "pre_command",
            Self::PostCommand => "post_command",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value threaded through a hook chain.
#[derive(Debug, Clone, PartialEq)]
pub enum HookValue {
    /// `None` means no actionable proposal this cycle.
    PostPlanning(Option<AssistantProposal>),
    PreCommand(Invocation),
    PostCommand { command: String, result: String },
}

impl HookValue {
    pub fn point(&self) -> HookPoint {
        match self {
            Self::PostPlanning(_) => HookPoint::PostPlanning,
            Self::PreCommand(_) => HookPoint::PreCommand,
            Self::PostCommand { .. } => HookPoint::PostCommand,
        }
    }
}

/// The core Plugin trait.
///
/// Every handler defaults to the identity transformation and every
/// capability flag defaults to `false`, so a plugin only implements the
/// points it cares about.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn description(&self) -> &str {
        ""
    }

    fn can_handle_post_planning(&self) -> bool {
        false
    }

    fn can_handle_pre_command(&self) -> bool {
        false
    }

    fn can_handle_post_command(&self) -> bool {
        false
    }

    /// Transform (or replace) the recovered proposal.
    async fn post_planning(
        &self,
        proposal: Option<AssistantProposal>,
    ) -> Result<Option<AssistantProposal>, PluginError> {
        Ok(proposal)
    }

    /// Rewrite the invocation about to be dispatched.
    async fn pre_command(&self, invocation: Invocation) -> Result<Invocation, PluginError> {
        Ok(invocation)
    }

    /// Rewrite the result text of `command`.
    async fn post_command(&self, _command: &str, result: String) -> Result<String, PluginError> {
        Ok(result)
    }

    /// Whether this plugin participates at `point`.
    fn handles(&self, point: HookPoint) -> bool {
        match point {
            HookPoint::PostPlanning => self.can_handle_post_planning(),
            HookPoint::PreCommand => self.can_handle_pre_command(),
            HookPoint::PostCommand => self.can_handle_post_command(),
        }
    }

    /// Route a hook value to the matching handler.
    async fn apply(&self, value: HookValue) -> Result<HookValue, PluginError> {
        Ok(match value {
            HookValue::PostPlanning(proposal) => HookValue::PostPlanning(self.post_planning(proposal).await?),
            HookValue::PreCommand(invocation) => HookValue::PreCommand(self.pre_command(invocation).await?),
            HookValue::PostCommand { command, result } => {
                let result = self.post_command(&command, result).await?;
                HookValue::PostCommand { command, result }
            }
        })
    }
}

/// The ordered, immutable plugin list of a run.
pub type PluginList = Arc<[Arc<dyn Plugin>]>;

//! Security module for autoclaw: workspace sandboxing and plugin policy.
//!
//! Provides:
//! - **Workspace**: resolves file-like command arguments under a run-scoped root
//! - **Plugin policy**: allow/deny-list decision for discovered plugins

pub mod plugin_policy;
pub mod workspace;

pub use plugin_policy::{PluginDecision, PluginPolicy, confirmation_admits};
pub use workspace::{PathValidationError, Workspace};

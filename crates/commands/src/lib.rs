//! Built-in command implementations for autoclaw.
//!
//! Commands give the agent its hands: read and write workspace files,
//! list directories, and (when enabled) run shell commands.

pub mod file_ops;
pub mod shell;

use async_trait::async_trait;
use autoclaw_config::CommandsConfig;
use autoclaw_core::command::{Command, CommandArgs, CommandContext, CommandRegistry};
use autoclaw_core::error::CommandError;
use serde_json::Value;
use std::path::PathBuf;

pub use file_ops::{AppendToFileCommand, ListFilesCommand, ReadFileCommand, WriteFileCommand};
pub use shell::ExecuteShellCommand;

/// Create the registry of built-in commands.
///
/// `execute_shell` is only registered when `allow_shell` is set.
pub fn default_registry(config: &CommandsConfig) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(Box::new(ReadFileCommand));
    registry.register(Box::new(WriteFileCommand));
    registry.register(Box::new(AppendToFileCommand));
    registry.register(Box::new(ListFilesCommand));
    registry.register(Box::new(DoNothingCommand));
    if config.allow_shell {
        registry.register(Box::new(ExecuteShellCommand::new(config.shell_allowlist.clone())));
    }
    registry
}

/// A no-op the model can pick when it wants to wait.
pub struct DoNothingCommand;

#[async_trait]
impl Command for DoNothingCommand {
    fn name(&self) -> &str {
        "do_nothing"
    }

    fn label(&self) -> &str {
        "Do Nothing"
    }

    fn signature(&self) -> &[(&'static str, &'static str)] {
        &[]
    }

    async fn execute(&self, _args: &CommandArgs, _ctx: &CommandContext) -> Result<Value, CommandError> {
        Ok(Value::String("No action performed.".into()))
    }
}

/// Fetch a required string argument.
pub(crate) fn str_arg<'a>(args: &'a CommandArgs, key: &str) -> Result<&'a str, CommandError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| CommandError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// Fetch a path argument. Relative paths are taken from the workspace root.
pub(crate) fn path_arg(args: &CommandArgs, key: &str, ctx: &CommandContext) -> Result<PathBuf, CommandError> {
    let raw = PathBuf::from(str_arg(args, key)?);
    Ok(if raw.is_absolute() { raw } else { ctx.workspace_root.join(raw) })
}

//! Shell command: run a program inside the workspace.
//!
//! Only registered when `[commands] allow_shell` is set, and then only for
//! programs on the allowlist.

use async_trait::async_trait;
use autoclaw_core::command::{Command, CommandArgs, CommandContext};
use autoclaw_core::error::CommandError;
use serde_json::Value;
use tokio::process::Command as Process;
use tracing::{debug, warn};

use crate::str_arg;

pub struct ExecuteShellCommand {
    /// If non-empty, only these programs may start.
    allowed_programs: Vec<String>,
}

impl ExecuteShellCommand {
    pub fn new(allowed_programs: Vec<String>) -> Self {
        Self { allowed_programs }
    }

    fn is_allowed(&self, command_line: &str) -> bool {
        if self.allowed_programs.is_empty() {
            return true;
        }
        let program = command_line.split_whitespace().next().unwrap_or("");
        self.allowed_programs.iter().any(|a| a == program)
    }
}

#[async_trait]
impl Command for ExecuteShellCommand {
    fn name(&self) -> &str {
        "execute_shell"
    }

    fn label(&self) -> &str {
        "Execute Shell Command, non-interactive commands only"
    }

    fn signature(&self) -> &[(&'static str, &'static str)] {
        &[("command_line", "command_line")]
    }

    async fn execute(&self, args: &CommandArgs, ctx: &CommandContext) -> Result<Value, CommandError> {
        let command_line = str_arg(args, "command_line")?;

        if !self.is_allowed(command_line) {
            return Err(CommandError::PermissionDenied {
                command: self.name().into(),
                reason: format!(
                    "'{}' is not in the shell allowlist",
                    command_line.split_whitespace().next().unwrap_or("")
                ),
            });
        }

        debug!(command_line, cwd = %ctx.workspace_root.display(), "Executing shell command");

        let output = if cfg!(target_os = "windows") {
            Process::new("cmd")
                .args(["/C", command_line])
                .current_dir(&ctx.workspace_root)
                .output()
                .await
        } else {
            Process::new("sh")
                .args(["-c", command_line])
                .current_dir(&ctx.workspace_root)
                .output()
                .await
        }
        .map_err(|e| CommandError::ExecutionFailed {
            command: self.name().into(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            warn!(command_line, exit_code = output.status.code().unwrap_or(-1), "Shell command failed");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(Value::String(format!("STDOUT:\n{stdout}\nSTDERR:\n{stderr}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ctx() -> CommandContext {
        CommandContext {
            workspace_root: std::env::temp_dir(),
            cycle: 1,
        }
    }

    fn line(text: &str) -> CommandArgs {
        let mut args = CommandArgs::new();
        args.insert("command_line".into(), Value::String(text.into()));
        args
    }

    #[test]
    fn allowlist_check() {
        let cmd = ExecuteShellCommand::new(vec!["ls".into(), "git".into()]);
        assert!(cmd.is_allowed("ls -la"));
        assert!(cmd.is_allowed("git status"));
        assert!(!cmd.is_allowed("rm -rf /"));
    }

    #[test]
    fn empty_allowlist_allows_all() {
        assert!(ExecuteShellCommand::new(vec![]).is_allowed("anything goes"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn echo_runs_in_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CommandContext {
            workspace_root: PathBuf::from(dir.path()),
            cycle: 1,
        };
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let out = ExecuteShellCommand::new(vec![])
            .execute(&line("ls"), &ctx)
            .await
            .unwrap();
        let text = out.as_str().unwrap();
        assert!(text.starts_with("STDOUT:\n"));
        assert!(text.contains("marker.txt"));
    }

    #[tokio::test]
    async fn blocked_program() {
        let result = ExecuteShellCommand::new(vec!["ls".into()])
            .execute(&line("rm -rf /"), &ctx())
            .await;
        assert!(matches!(result, Err(CommandError::PermissionDenied { .. })));
    }
}

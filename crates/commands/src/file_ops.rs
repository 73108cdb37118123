//! File commands: read, write, append and list inside the workspace.
//!
//! Path arguments reach these commands already resolved against the
//! workspace sandbox. I/O failures are returned as `ExecutionFailed` so the
//! model sees them as failure text in the next cycle.

use async_trait::async_trait;
use autoclaw_core::command::{Command, CommandArgs, CommandContext};
use autoclaw_core::error::CommandError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{path_arg, str_arg};

fn failed(command: &str, e: impl std::fmt::Display) -> CommandError {
    CommandError::ExecutionFailed {
        command: command.into(),
        reason: e.to_string(),
    }
}

async fn ensure_parent(command: &str, path: &Path) -> Result<(), CommandError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| failed(command, e))?;
    }
    Ok(())
}

pub struct ReadFileCommand;

#[async_trait]
impl Command for ReadFileCommand {
    fn name(&self) -> &str {
        "read_file"
    }

    fn label(&self) -> &str {
        "Read file"
    }

    fn signature(&self) -> &[(&'static str, &'static str)] {
        &[("filename", "filename")]
    }

    async fn execute(&self, args: &CommandArgs, ctx: &CommandContext) -> Result<Value, CommandError> {
        let path = path_arg(args, "filename", ctx)?;
        debug!(path = %path.display(), "Reading file");
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| failed(self.name(), e))?;
        Ok(Value::String(content))
    }
}

pub struct WriteFileCommand;

#[async_trait]
impl Command for WriteFileCommand {
    fn name(&self) -> &str {
        "write_file"
    }

    fn label(&self) -> &str {
        "Write to file"
    }

    fn signature(&self) -> &[(&'static str, &'static str)] {
        &[("filename", "filename"), ("text", "text")]
    }

    async fn execute(&self, args: &CommandArgs, ctx: &CommandContext) -> Result<Value, CommandError> {
        let path = path_arg(args, "filename", ctx)?;
        let text = str_arg(args, "text")?;
        ensure_parent(self.name(), &path).await?;
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| failed(self.name(), e))?;
        Ok(Value::String("File written to successfully.".into()))
    }
}

pub struct AppendToFileCommand;

#[async_trait]
impl Command for AppendToFileCommand {
    fn name(&self) -> &str {
        "append_to_file"
    }

    fn label(&self) -> &str {
        "Append to file"
    }

    fn signature(&self) -> &[(&'static str, &'static str)] {
        &[("filename", "filename"), ("text", "text")]
    }

    async fn execute(&self, args: &CommandArgs, ctx: &CommandContext) -> Result<Value, CommandError> {
        use tokio::io::AsyncWriteExt;

        let path = path_arg(args, "filename", ctx)?;
        let text = str_arg(args, "text")?;
        ensure_parent(self.name(), &path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| failed(self.name(), e))?;
        file.write_all(text.as_bytes())
            .await
            .map_err(|e| failed(self.name(), e))?;
        Ok(Value::String("Text appended successfully.".into()))
    }
}

/// Recursively list files under a directory, skipping dotfiles.
pub struct ListFilesCommand;

#[async_trait]
impl Command for ListFilesCommand {
    fn name(&self) -> &str {
        "list_files"
    }

    fn label(&self) -> &str {
        "List Files in Directory"
    }

    fn signature(&self) -> &[(&'static str, &'static str)] {
        &[("directory", "directory")]
    }

    async fn execute(&self, args: &CommandArgs, ctx: &CommandContext) -> Result<Value, CommandError> {
        let dir = path_arg(args, "directory", ctx)?;
        let mut found = Vec::new();
        let mut pending: Vec<PathBuf> = vec![dir];

        while let Some(current) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current)
                .await
                .map_err(|e| failed(self.name(), e))?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| failed(self.name(), e))? {
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| failed(self.name(), e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else {
                    let shown = path.strip_prefix(&ctx.workspace_root).unwrap_or(&path);
                    found.push(shown.to_string_lossy().replace('\\', "/"));
                }
            }
        }

        found.sort();
        Ok(Value::Array(found.into_iter().map(Value::String).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(root: &Path) -> CommandContext {
        CommandContext {
            workspace_root: root.to_path_buf(),
            cycle: 1,
        }
    }

    fn args(pairs: &[(&str, &str)]) -> CommandArgs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path());

        WriteFileCommand
            .execute(&args(&[("filename", "notes/plan.txt"), ("text", "step one")]), &ctx)
            .await
            .unwrap();
        let out = ReadFileCommand
            .execute(&args(&[("filename", "notes/plan.txt")]), &ctx)
            .await
            .unwrap();
        assert_eq!(out, Value::String("step one".into()));
    }

    #[tokio::test]
    async fn append_extends_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path());

        for chunk in ["a", "b"] {
            AppendToFileCommand
                .execute(&args(&[("filename", "log.txt"), ("text", chunk)]), &ctx)
                .await
                .unwrap();
        }
        assert_eq!(std::fs::read_to_string(dir.path().join("log.txt")).unwrap(), "ab");
    }

    #[tokio::test]
    async fn read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReadFileCommand
            .execute(&args(&[("filename", "absent.txt")]), &ctx(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn write_requires_text() {
        let dir = tempfile::tempdir().unwrap();
        let err = WriteFileCommand
            .execute(&args(&[("filename", "x.txt")]), &ctx(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn list_skips_dotfiles_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), "").unwrap();
        std::fs::write(dir.path().join(".hidden"), "").unwrap();

        let root = dir.path().to_string_lossy().to_string();
        let out = ListFilesCommand
            .execute(&args(&[("directory", &root)]), &ctx(dir.path()))
            .await
            .unwrap();
        assert_eq!(out, serde_json::json!(["a.txt", "sub/b.txt"]));
    }
}

//! Per-cycle transcript files.
//!
//! Each cycle may leave up to three files in the log directory, named by the
//! zero-padded cycle index:
//!
//! - `NNN_full_message_history.json`
//! - `NNN_assistant_reply.json`
//! - `NNN_user_input.txt`
//!
//! Write failures are logged and otherwise ignored.

use autoclaw_core::message::History;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct CycleLog {
    dir: PathBuf,
}

impl CycleLog {
    /// Log into `base/<run id>`, created on first write.
    pub fn for_run(base: impl AsRef<Path>, ai_name: &str) -> Self {
        let run_id = format!(
            "{}_{}",
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            ai_name.replace(|c: char| !c.is_alphanumeric(), "_")
        );
        Self::new(base.as_ref().join(run_id))
    }

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn history(&self, cycle: u64, history: &History) {
        match serde_json::to_string_pretty(history) {
            Ok(text) => self.write(cycle, "full_message_history.json", text).await,
            Err(e) => warn!(cycle, "Failed to serialize history: {e}"),
        }
    }

    pub async fn reply(&self, cycle: u64, reply: &Value) {
        match serde_json::to_string_pretty(reply) {
            Ok(text) => self.write(cycle, "assistant_reply.json", text).await,
            Err(e) => warn!(cycle, "Failed to serialize reply: {e}"),
        }
    }

    pub async fn user_input(&self, cycle: u64, input: &str) {
        self.write(cycle, "user_input.txt", input.to_string()).await;
    }

    async fn write(&self, cycle: u64, suffix: &str, contents: String) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), "Failed to create cycle log directory: {e}");
            return;
        }
        let path = self.dir.join(format!("{cycle:03}_{suffix}"));
        if let Err(e) = tokio::fs::write(&path, contents).await {
            warn!(path = %path.display(), "Failed to write cycle log: {e}");
        }
    }
}

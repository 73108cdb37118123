//! Command trait: the abstraction over agent capabilities.
//!
//! Commands are what give the agent the ability to act: read and write
//! workspace files, list directories, run shell commands. Each cycle the
//! model proposes exactly one command by name with a JSON argument map.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use crate::error::CommandError;

/// Arguments of a command invocation, as proposed by the model.
pub type CommandArgs = Map<String, Value>;

/// Per-invocation context handed to a command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Sandbox root of the run
    pub workspace_root: PathBuf,

    /// Index of the cycle issuing the command
    pub cycle: u64,
}

/// Outcome of a dispatch: a success payload or a failure descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    Success(Value),
    Failure(String),
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Render the outcome as the single line the model will read.
    ///
    /// String payloads are used verbatim; any other payload is serialized.
    pub fn to_text(&self) -> String {
        match self {
            Self::Success(Value::String(s)) => s.clone(),
            Self::Success(Value::Null) => "None".into(),
            Self::Success(other) => other.to_string(),
            Self::Failure(reason) => reason.clone(),
        }
    }
}

impl From<Result<Value, CommandError>> for CommandResult {
    fn from(result: Result<Value, CommandError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(CommandError::NotFound(name)) => Self::Failure(format!(
                "Unknown command '{name}'. Please refer to the 'COMMANDS' list for available \
                 commands and only respond in the specified JSON format."
            )),
            Err(e) => Self::Failure(format!("Error: {e}")),
        }
    }
}

/// The core Command trait.
#[async_trait]
pub trait Command: Send + Sync {
    /// The unique name the model uses to invoke this command (e.g., "read_file").
    fn name(&self) -> &str;

    /// Short human-readable label shown in the command list (e.g., "Read file").
    fn label(&self) -> &str;

    /// Argument signature shown to the model, as `(name, placeholder)` pairs.
    fn signature(&self) -> &[(&'static str, &'static str)];

    /// Execute the command with the given arguments.
    async fn execute(&self, args: &CommandArgs, ctx: &CommandContext) -> Result<Value, CommandError>;

    /// Render the line describing this command in the system prompt.
    fn describe(&self) -> String {
        let args = self
            .signature()
            .iter()
            .map(|(name, placeholder)| format!("\"{name}\": \"<{placeholder}>\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}: \"{}\", args: {}", self.label(), self.name(), args)
    }
}

/// A registry of available commands, ordered by name.
pub struct CommandRegistry {
    commands: BTreeMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, command: Box<dyn Command>) {
        let name = command.name().to_string();
        self.commands.insert(name, command);
    }

    /// Get a command by name.
    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    /// Execute a command by name.
    pub async fn execute(
        &self,
        name: &str,
        args: &CommandArgs,
        ctx: &CommandContext,
    ) -> Result<Value, CommandError> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| CommandError::NotFound(name.to_string()))?;
        command.execute(args, ctx).await
    }

    /// List all registered command names.
    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(|s| s.as_str()).collect()
    }

    /// Prompt lines for every registered command.
    pub fn descriptions(&self) -> Vec<String> {
        self.commands.values().map(|c| c.describe()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

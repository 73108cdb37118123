//! # autoclaw core
//!
//! Domain types, collaborator traits, and error definitions for the autoclaw
//! agent loop. The loop itself lives in `autoclaw-agent`. Each collaborator
//! it talks to (backend, command registry, plugins, tokenizer and operator
//! console) is defined here as a trait so it can be swapped or mocked.

pub mod command;
pub mod console;
pub mod error;
pub mod event;
pub mod message;
pub mod plugin;
pub mod proposal;
pub mod provider;
pub mod tokenizer;

// Re-export key types at crate root for ergonomics
pub use command::{Command, CommandArgs, CommandContext, CommandRegistry, CommandResult};
pub use console::OperatorConsole;
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{History, Message, Role};
pub use plugin::{HookPoint, HookValue, Plugin, PluginList};
pub use proposal::{AssistantProposal, Invocation, SchemaViolation, Thoughts};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use tokenizer::{HeuristicTokenizer, Tokenizer};

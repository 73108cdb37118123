//! The model's structured reply for one cycle.
//!
//! The backend is asked to answer with a JSON object of the shape
//!
//! ```json
//! {
//!   "thoughts": { "text": "", "reasoning": "", "plan": "", "criticism": "", "speak": "" },
//!   "command": { "name": "", "args": {} }
//! }
//! ```
//!
//! [`AssistantProposal::from_value`] checks that shape and converts it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::command::CommandArgs;

/// Keys every `thoughts` object must carry.
pub const THOUGHT_FIELDS: [&str; 5] = ["text", "reasoning", "plan", "criticism", "speak"];

/// Free-form reasoning attached to a proposal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thoughts {
    pub text: String,
    pub reasoning: String,
    pub plan: String,
    pub criticism: String,
    pub speak: String,
}

impl Thoughts {
    /// Plan lines, with any leading bullet dash stripped.
    pub fn plan_lines(&self) -> Vec<String> {
        self.plan
            .lines()
            .map(|line| line.trim().trim_start_matches('-').trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// A command name plus its argument map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub name: String,
    #[serde(default)]
    pub args: CommandArgs,
}

impl Invocation {
    pub fn new(name: impl Into<String>, args: CommandArgs) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Whether the name is an error sentinel (`"Error: ..."`, case-insensitive).
    ///
    /// Sentinel invocations are never dispatched; the loop turns them into
    /// failure text for the model.
    pub fn is_error_sentinel(&self) -> bool {
        self.name.to_ascii_lowercase().starts_with("error")
    }
}

/// The parsed structured reply for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantProposal {
    pub thoughts: Thoughts,
    pub command: Invocation,
}

/// Why a JSON object does not match the reply schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaViolation {
    #[error("missing required field '{0}'")]
    Missing(String),

    #[error("field '{field}' must be {expected}")]
    WrongType { field: String, expected: &'static str },
}

impl AssistantProposal {
    /// Validate a JSON object against the reply schema and convert it.
    pub fn from_value(value: &Value) -> Result<Self, SchemaViolation> {
        let root = as_object(value, "$")?;

        let thoughts_obj = as_object(required(root, "thoughts", "thoughts")?, "thoughts")?;
        let mut thoughts = Thoughts::default();
        for field in THOUGHT_FIELDS {
            let path = format!("thoughts.{field}");
            let text = as_text(required(thoughts_obj, field, &path)?, &path)?;
            match field {
                "text" => thoughts.text = text,
                "reasoning" => thoughts.reasoning = text,
                "plan" => thoughts.plan = text,
                "criticism" => thoughts.criticism = text,
                _ => thoughts.speak = text,
            }
        }

        let command_obj = as_object(required(root, "command", "command")?, "command")?;
        let name = required(command_obj, "name", "command.name")?
            .as_str()
            .ok_or_else(|| SchemaViolation::WrongType {
                field: "command.name".into(),
                expected: "a string",
            })?
            .to_string();
        let args = match command_obj.get("args") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(SchemaViolation::WrongType {
                    field: "command.args".into(),
                    expected: "an object",
                });
            }
        };

        Ok(Self {
            thoughts,
            command: Invocation { name, args },
        })
    }

    /// Serialize back to the wire shape, e.g. for the history or a cycle log.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "thoughts": self.thoughts,
            "command": { "name": self.command.name, "args": self.command.args },
        })
    }
}

fn required<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Value, SchemaViolation> {
    obj.get(key).ok_or_else(|| SchemaViolation::Missing(path.to_string()))
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaViolation> {
    value.as_object().ok_or_else(|| SchemaViolation::WrongType {
        field: path.to_string(),
        expected: "an object",
    })
}

// Models often send the plan as a list; accept it and join with newlines.
fn as_text(value: &Value, path: &str) -> Result<String, SchemaViolation> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Array(items) => Ok(items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")),
        _ => Err(SchemaViolation::WrongType {
            field: path.to_string(),
            expected: "a string",
        }),
    }
}

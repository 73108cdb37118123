//! Operator console: the line-based channel to the human supervising a run.
//!
//! Only the authorization gate reads from it; the loop writes thoughts,
//! the next action and command results to it.

use async_trait::async_trait;
use crate::error::ConsoleError;

#[async_trait]
pub trait OperatorConsole: Send + Sync {
    /// Show `prompt` and wait for one line of input (without the newline).
    async fn read_line(&self, prompt: &str) -> Result<String, ConsoleError>;

    /// Print a titled line, e.g. `("SYSTEM: ", "Command ls returned: ...")`.
    fn say(&self, title: &str, content: &str);

    /// Print a warning for the operator.
    fn warn(&self, content: &str) {
        self.say("WARNING: ", content);
    }
}

//! Terminal operator console: prompts on stdout, reads lines from stdin.

use async_trait::async_trait;
use autoclaw_core::console::OperatorConsole;
use autoclaw_core::error::ConsoleError;
use std::io::Write;
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

pub struct StdinConsole {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinConsole {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(io::stdin()).lines()),
        }
    }
}

impl Default for StdinConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperatorConsole for StdinConsole {
    async fn read_line(&self, prompt: &str) -> Result<String, ConsoleError> {
        print!("{prompt} ");
        std::io::stdout().flush()?;

        let mut lines = self.lines.lock().await;
        match lines.next_line().await? {
            Some(line) => Ok(line.trim_end_matches('\r').to_string()),
            // EOF (Ctrl+D)
            None => Err(ConsoleError::Closed),
        }
    }

    fn say(&self, title: &str, content: &str) {
        println!("{title}{content}");
    }

    fn warn(&self, content: &str) {
        eprintln!("  [Warning] {content}");
    }
}

//! CLI console: line prompts on stderr, operator output on stdout.

use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::error::ConsoleError;

/// Line-based human console.
#[async_trait]
pub trait Console: Send {
    /// Show `prompt` and wait for one line. `Ok(None)` means input is closed.
    ///
    /// The returned line has its newline stripped but is otherwise untouched.
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ConsoleError>;

    /// Show text to the operator.
    fn show(&mut self, text: &str);
}

/// Console on the process's stdin/stdout.
pub struct StdConsole {
    lines: Lines<BufReader<Stdin>>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for StdConsole {
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ConsoleError> {
        if !prompt.is_empty() {
            eprint!("{prompt}");
            std::io::stderr().flush()?;
        }
        match self.lines.next_line().await {
            Ok(line) => Ok(line),
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                Err(e.into())
            }
        }
    }

    fn show(&mut self, text: &str) {
        println!("{text}");
    }
}

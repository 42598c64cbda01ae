//! Terminal prompts
//!
//! Questions are written to stdout and answered on stdin. End of input
//! counts as an empty answer, which every caller treats as "no".

use crate::core::error::PublishError;
use crate::core::traits::{Prompter, is_affirmative};
use async_trait::async_trait;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

/// `Prompter` reading answers from the process's stdin
///
/// One reader is kept for the whole run so piped answers buffered ahead of
/// the current question are not lost.
#[derive(Debug)]
pub struct StdinPrompter {
    reader: Mutex<BufReader<Stdin>>,
}

impl Default for StdinPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl StdinPrompter {
    pub fn new() -> Self {
        Self {
            reader: Mutex::new(BufReader::new(io::stdin())),
        }
    }

    async fn read_answer(&self, prompt: &str) -> Result<String, PublishError> {
        let mut stdout = io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let mut answer = String::new();
        self.reader.lock().await.read_line(&mut answer).await?;

        Ok(answer.trim().to_string())
    }
}

#[async_trait]
impl Prompter for StdinPrompter {
    async fn ask(&self, question: &str) -> Result<String, PublishError> {
        self.read_answer(&format!("{}: ", question)).await
    }

    async fn confirm(&self, question: &str) -> Result<bool, PublishError> {
        let answer = self.read_answer(&format!("{} (yes/no): ", question)).await?;
        Ok(is_affirmative(&answer))
    }
}

/// `Prompter` for non-interactive runs: never reads, always declines
#[derive(Debug, Default)]
pub struct NonInteractivePrompter;

#[async_trait]
impl Prompter for NonInteractivePrompter {
    async fn ask(&self, _question: &str) -> Result<String, PublishError> {
        Ok(String::new())
    }

    async fn confirm(&self, question: &str) -> Result<bool, PublishError> {
        println!("{} (yes/no): no [non-interactive]", question);
        Ok(false)
    }
}

// restmigrate/src/import/prompt.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::{stdin, stdout, IsTerminal, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Nobody can answer: stdin is not a terminal or was closed.
    Unavailable,
}

/// Asks the operator a yes/no question.
#[async_trait]
pub trait Confirm {
    async fn ask(&mut self, question: &str, default_yes: bool) -> Result<Answer>;
}

/// Reads the answer from the terminal. The read runs on the blocking pool so
/// a Ctrl-C is still observed while waiting.
pub struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn ask(&mut self, question: &str, default_yes: bool) -> Result<Answer> {
        if !stdin().is_terminal() {
            return Ok(Answer::Unavailable);
        }

        let suffix = if default_yes { "(y/n) [y]" } else { "(y/n) [n]" };
        print!("  {} {}: ", question, suffix);
        stdout().flush().context("Failed to flush stdout")?;

        let line = tokio::task::spawn_blocking(|| {
            let mut input = String::new();
            stdin().read_line(&mut input).map(|read| (read, input))
        })
        .await
        .context("Prompt task failed")?
        .context("Failed to read user input")?;

        Ok(interpret_answer(line.0, &line.1, default_yes))
    }
}

/// `bytes_read == 0` means EOF.
fn interpret_answer(bytes_read: usize, input: &str, default_yes: bool) -> Answer {
    if bytes_read == 0 {
        return Answer::Unavailable;
    }
    match input.trim().to_ascii_lowercase().as_str() {
        "" if default_yes => Answer::Yes,
        "" => Answer::No,
        "y" | "yes" => Answer::Yes,
        _ => Answer::No,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Hands out canned answers and records the questions asked.
    pub(crate) struct ScriptedConfirm {
        pub answers: Vec<Answer>,
        pub asked: Vec<String>,
    }

    impl ScriptedConfirm {
        pub fn new(answers: Vec<Answer>) -> Self {
            Self {
                answers,
                asked: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl Confirm for ScriptedConfirm {
        async fn ask(&mut self, question: &str, _default_yes: bool) -> Result<Answer> {
            self.asked.push(question.to_string());
            if self.answers.is_empty() {
                return Ok(Answer::Unavailable);
            }
            Ok(self.answers.remove(0))
        }
    }

    #[test]
    fn test_interpret_answer() {
        assert_eq!(interpret_answer(1, "\n", true), Answer::Yes);
        assert_eq!(interpret_answer(1, "\n", false), Answer::No);
        assert_eq!(interpret_answer(2, "Y\n", false), Answer::Yes);
        assert_eq!(interpret_answer(4, "yes\n", false), Answer::Yes);
        assert_eq!(interpret_answer(2, "n\n", true), Answer::No);
        assert_eq!(interpret_answer(6, "maybe\n", true), Answer::No);
        assert_eq!(interpret_answer(0, "", true), Answer::Unavailable);
    }
}

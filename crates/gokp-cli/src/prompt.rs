//! Reading answers from the user.

use std::io::{self, BufRead, Write};

pub trait Prompt {
    /// Read a secret without echoing it.
    fn password(&mut self, message: &str) -> io::Result<String>;

    /// Read one line of input, without the trailing newline.
    fn line(&mut self, message: &str) -> io::Result<String>;

    /// Ask a yes/no question. Only the exact answer `yes` confirms.
    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        Ok(self.line(message)?.trim() == "yes")
    }
}

/// The controlling terminal.
#[derive(Debug, Default)]
pub struct Terminal;

impl Prompt for Terminal {
    fn password(&mut self, message: &str) -> io::Result<String> {
        rpassword::prompt_password(message)
    }

    fn line(&mut self, message: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{message}")?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Answers queued up front. Once they run out every answer is empty.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: std::collections::VecDeque<String>,
    pub asked: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompt {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, message: &str) -> String {
        self.asked.push(message.to_string());
        self.answers.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
impl Prompt for ScriptedPrompt {
    fn password(&mut self, message: &str) -> io::Result<String> {
        Ok(self.next(message))
    }

    fn line(&mut self, message: &str) -> io::Result<String> {
        Ok(self.next(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_yes_confirms() {
        let mut prompt = ScriptedPrompt::new(&["yes", "y", "YES", " yes ", ""]);
        let answers: Vec<bool> = (0..5)
            .map(|_| prompt.confirm("Proceed (yes/no)? ").unwrap())
            .collect();
        assert_eq!(answers, [true, false, false, true, false]);
        assert_eq!(prompt.asked.len(), 5);
    }
}

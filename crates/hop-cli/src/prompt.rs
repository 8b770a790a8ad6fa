//! Line-based prompts on stdin
//!
//! Questions are written to stderr so command output on stdout stays
//! pipeable.

use std::io::{self, BufRead, Write};

use hop_core::reconcile::Prompter;

/// Prompter reading answers line by line
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl LinePrompter<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on the process's terminal
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before an answer was given",
            ));
        }
        Ok(line.trim().to_string())
    }

    /// Ask until a non-empty answer is given
    pub fn required(&mut self, label: &str) -> io::Result<String> {
        loop {
            let answer = self.ask(&format!("{label}: "))?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            writeln!(self.output, "A value is required.")?;
        }
    }

    /// Ask for a value that may be left empty
    pub fn optional(&mut self, label: &str) -> io::Result<Option<String>> {
        let answer = self.ask(&format!("{label} (optional): "))?;
        Ok(Some(answer).filter(|a| !a.is_empty()))
    }

    /// Pick one of `items` by number or by name; returns its index
    pub fn select(&mut self, label: &str, items: &[String]) -> io::Result<usize> {
        if items.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "nothing to select"));
        }

        writeln!(self.output, "{label}:")?;
        for (i, item) in items.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, item)?;
        }

        loop {
            let answer = self.ask(&format!("Choice [1-{}]: ", items.len()))?;
            if let Ok(n) = answer.parse::<usize>() {
                if (1..=items.len()).contains(&n) {
                    return Ok(n - 1);
                }
            }
            if let Some(idx) = items.iter().position(|item| *item == answer) {
                return Ok(idx);
            }
            writeln!(self.output, "Invalid choice '{answer}'.")?;
        }
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn confirm(&mut self, label: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{label} [y/N] "))?;
        Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
    }

    fn input(&mut self, label: &str, default: &str) -> io::Result<String> {
        let answer = self.ask(&format!("{label} [{default}]: "))?;
        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer)
        }
    }
}

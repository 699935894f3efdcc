//! Confirmation prompts for destructive actions.

use std::io::{self, BufRead, Write};

/// Asks the user to confirm a destructive action.
///
/// Implementations write the question to `out` so it lands in the same
/// stream as the surrounding progress output.
pub trait Confirm {
    /// Present `message` followed by `[y/N]` and report whether the user agreed.
    fn confirm(&mut self, out: &mut dyn Write, message: &str) -> io::Result<bool>;
}

/// Reads answers line by line from a reader.
///
/// Only an explicit `y` or `yes` (any case) confirms; an empty line or end of
/// input declines.
#[derive(Debug)]
pub struct ReaderConfirm<R> {
    reader: R,
}

impl<R: BufRead> ReaderConfirm<R> {
    /// Wrap a reader.
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl ReaderConfirm<io::StdinLock<'static>> {
    /// Confirm from the process's standard input.
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> Confirm for ReaderConfirm<R> {
    fn confirm(&mut self, out: &mut dyn Write, message: &str) -> io::Result<bool> {
        write!(out, "{message} [y/N] ")?;
        out.flush()?;

        let mut input = String::new();
        self.reader.read_line(&mut input)?;
        Ok(is_affirmative(&input))
    }
}

/// Always gives the same answer, after writing the question.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&mut self, out: &mut dyn Write, message: &str) -> io::Result<bool> {
        write!(out, "{message} [y/N] ")?;
        out.flush()?;
        Ok(self.0)
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

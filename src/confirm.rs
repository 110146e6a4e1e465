//! Decision policies for interactive confirmation
//!
//! The pipeline asks for confirmation in exactly one place: continuing with
//! uncommitted changes. It never reads the terminal itself; it asks a
//! [`Confirm`] implementation, which tests replace with a fixed answer.

use std::io::{self, BufRead, IsTerminal, Write};
use tracing::warn;

/// Answers a yes/no question
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Always continue (`--assume-yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Always decline (`--non-interactive`)
#[derive(Debug, Clone, Copy, Default)]
pub struct Decline;

impl Confirm for Decline {
    fn confirm(&mut self, prompt: &str) -> bool {
        warn!("declining without asking: {}", prompt);
        false
    }
}

/// Ask on the terminal; declines when stdin is not a terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl Confirm for TerminalPrompt {
    fn confirm(&mut self, prompt: &str) -> bool {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            warn!("stdin is not a terminal; declining: {}", prompt);
            return false;
        }

        let mut stderr = io::stderr();
        if write!(stderr, "{prompt} [y/N] ").and_then(|_| stderr.flush()).is_err() {
            return false;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(_) => is_yes(&line),
            Err(_) => false,
        }
    }
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

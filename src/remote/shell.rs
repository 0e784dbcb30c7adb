// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{borrow::Cow, fmt};

const MASK: &str = "***";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Joiner {
    /// `a && b`: stop at, and report, the first failure.
    AllOrNothing,
    /// `a; b`: run everything, report the exit status of the last step.
    Sequential,
}

/// A list of shell commands run as one remote invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellChain {
    steps: Vec<String>,
    joiner: Joiner,
    /// Values masked whenever the chain is displayed, as they appear in `steps`.
    secrets: Vec<String>,
}

impl ShellChain {
    /// A chain that fails as a whole as soon as any step fails.
    pub fn atomic() -> Self {
        ShellChain {
            steps: Vec::new(),
            joiner: Joiner::AllOrNothing,
            secrets: Vec::new(),
        }
    }

    /// A chain whose steps all run regardless of earlier failures.
    pub fn sequential() -> Self {
        ShellChain {
            steps: Vec::new(),
            joiner: Joiner::Sequential,
            secrets: Vec::new(),
        }
    }

    pub fn single(step: impl Into<String>) -> Self {
        Self::atomic().then(step)
    }

    pub fn then(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Mask `secret` wherever the chain is displayed. `render` still carries the real value.
    pub fn secret(mut self, secret: &str) -> Self {
        if !secret.is_empty() {
            let quoted = quote(secret).into_owned();
            if quoted != secret {
                self.secrets.push(quoted);
            }
            self.secrets.push(secret.to_string());
        }
        self
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn is_atomic(&self) -> bool {
        self.joiner == Joiner::AllOrNothing
    }

    pub fn render(&self) -> String {
        let sep = match self.joiner {
            Joiner::AllOrNothing => " && ",
            Joiner::Sequential => "; ",
        };
        self.steps.join(sep)
    }

    /// `text` with every secret of this chain masked.
    pub fn mask(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |text, secret| text.replace(secret.as_str(), MASK))
    }

    /// The chain as it is safe to print or log.
    pub fn redacted(&self) -> String {
        self.mask(&self.render())
    }
}

impl fmt::Display for ShellChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted())
    }
}

/// Quote `word` so the shell passes it through as a single argument. Words that only contain
/// characters the shell never interprets are returned unchanged.
pub fn quote(word: &str) -> Cow<'_, str> {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if plain {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r"'\''")))
    }
}

/// Prefix `command` with `sudo -u <user>` when a user is given.
pub fn as_user(user: Option<&str>, command: &str) -> String {
    match user {
        Some(user) => format!("sudo -u {} {command}", quote(user)),
        None => command.to_string(),
    }
}

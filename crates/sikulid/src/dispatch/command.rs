//! Whitespace-tokenised commands.

use std::fmt;

use super::errors::DispatchError;

/// A non-empty sequence of tokens parsed from one request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    tokens: Vec<String>,
}

impl Command {
    /// Splits `line` on runs of whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::EmptyCommand`] when the line holds no tokens.
    pub fn parse(line: &str) -> Result<Self, DispatchError> {
        let tokens: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
        if tokens.is_empty() {
            return Err(DispatchError::EmptyCommand);
        }
        Ok(Self { tokens })
    }

    /// All tokens in input order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// First token. Used for logging only.
    pub fn topic(&self) -> &str {
        self.tokens.first().map_or("", String::as_str)
    }

    /// Second token, or empty when absent. Used for logging only.
    pub fn action(&self) -> &str {
        self.tokens.get(1).map_or("", String::as_str)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

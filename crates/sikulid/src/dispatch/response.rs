//! Response rendering for the line protocol.
//!
//! A response is always exactly one line: `OK: <payload>` or
//! `ERROR: <message>`. Line breaks inside the text are collapsed to the
//! two-character escape `\n` so multi-line engine output cannot split the
//! response.

use std::io::{self, Write};

use super::errors::DispatchError;

const OK_PREFIX: &str = "OK: ";
const ERROR_PREFIX: &str = "ERROR: ";

/// Outcome reported to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Successful dispatch carrying the router's result text.
    Ok(String),
    /// Failed dispatch carrying the failure message.
    Error(String),
}

impl Response {
    /// Creates an error response from a dispatch failure.
    pub fn from_error(error: &DispatchError) -> Self {
        Self::Error(error.to_string())
    }

    /// Whether this is an `OK` response.
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Renders the response as a single newline-terminated line.
    pub fn render(&self) -> String {
        let (prefix, text) = match self {
            Self::Ok(payload) => (OK_PREFIX, payload),
            Self::Error(message) => (ERROR_PREFIX, message),
        };
        let mut line = String::with_capacity(prefix.len() + text.len() + 1);
        line.push_str(prefix);
        line.push_str(&collapse_line_breaks(text));
        line.push('\n');
        line
    }
}

impl From<Result<String, DispatchError>> for Response {
    fn from(result: Result<String, DispatchError>) -> Self {
        match result {
            Ok(payload) => Self::Ok(payload),
            Err(error) => Self::from_error(&error),
        }
    }
}

fn collapse_line_breaks(text: &str) -> String {
    text.trim_end_matches(['\r', '\n'])
        .replace("\r\n", "\\n")
        .replace(['\n', '\r'], "\\n")
}

/// Writes rendered responses to a stream.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes the whole line in one call and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    pub fn write(&mut self, response: &Response) -> io::Result<()> {
        self.writer.write_all(response.render().as_bytes())?;
        self.writer.flush()
    }
}

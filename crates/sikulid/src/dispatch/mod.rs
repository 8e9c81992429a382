//! Line-based command dispatch.
//!
//! This module reads one command line per connection, splits it into
//! whitespace-separated tokens and forwards the tokens to the automation
//! engine through a [`ProcessRunner`](crate::runner::ProcessRunner). The
//! dispatcher integrates with the transport layer via the `ConnectionHandler`
//! trait.
//!
//! ## Protocol
//!
//! Clients send a single line of UTF-8 text terminated by `\n`:
//!
//! ```text
//! btn1 double 87
//! ```
//!
//! The server answers with exactly one line and closes the connection:
//!
//! ```text
//! OK: Script executed, output: <engine output>
//! ERROR: <message>
//! ```
//!
//! Line breaks in the engine output are rendered as the two characters `\n`
//! so the response always fits on one line.

mod command;
mod errors;
mod handler;
mod response;
mod router;

pub use self::command::Command;
pub use self::errors::DispatchError;
pub use self::handler::LineConnectionHandler;
pub use self::response::{Response, ResponseWriter};
pub use self::router::{CommandRouter, EngineInvocation};

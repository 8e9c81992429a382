//! Test suites for the command server.

pub(crate) mod support;

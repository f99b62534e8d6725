//! Console tooling shared by the emulator binaries.
//!
//! [`grammar`] parses a line, [`commands`] turns it into a session input or a
//! local action, and [`status`] renders the `status` block.

pub mod catalog;
pub mod commands;
pub mod grammar;
pub mod status;

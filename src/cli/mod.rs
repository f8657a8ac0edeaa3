//! CLI commands
//!
//! Command implementation and terminal output for the `promote` binary.

mod progress;
mod promote;
mod style;

pub use promote::run_promote;

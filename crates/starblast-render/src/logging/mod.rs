//! Logging utilities.
//!
//! Centralizes logger initialization. The crate logs through the standard
//! `log` facade; session lifecycle and resource loads are reported at `info`,
//! failures with diagnostics at `error`.

mod init;

pub use init::{init_logging, LoggingConfig};

//! Command-line and environment surface for the scrollwatch binary.
//!
//! Parses flags (with environment fallbacks) and converts them into the
//! validated `ScanConfig` and Discord client settings.

pub mod cli_args;
pub mod cli_config;

pub use cli_args::{AckUserIds, Cli};

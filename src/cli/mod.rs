//! Command line interface for babirusa_builder.

mod args;
pub mod commands;
mod credentials;
mod output;

pub use args::{Args, PassThrough, split_passthrough};
pub use commands::execute_command;
pub use credentials::{TOKEN_ENV_VARS, resolve_token};
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}

//! Command execution.

mod build;

use crate::cli::{Args, OutputManager};
use crate::error::Result;

use build::execute_build;

/// Execute the build command for parsed arguments, returning the exit code
pub async fn execute_command(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.verbose, args.quiet);

    if let Err(validation_error) = args.validate() {
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    if !args.passthrough.is_empty() {
        log::info!(
            "Forwarding build arguments: {}",
            args.passthrough.keys().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    execute_build(args, &output).await
}

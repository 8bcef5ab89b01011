//! Kodegen Bundler Staging - Maven staging-repository release tool.
//!
//! This binary stages signed artifacts into a staging repository, closes it,
//! optionally promotes it, and pushes release tags from CI.

use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Run CLI and get exit code
    let exit_code = match kodegen_bundler_staging::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            for suggestion in e.recovery_suggestions() {
                eprintln!("  hint: {}", suggestion);
            }
            1
        }
    };

    process::exit(exit_code);
}

//! CaseCraft storefront API server.
//!
//! Serves the configurator, catalog and order API on port 3000 by default.
//! See `config.rs` for the environment variables it reads.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match casecraft_storefront::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The subscriber may not be installed yet when configuration fails
            if tracing::dispatcher::has_been_set() {
                tracing::error!(error = %e, "Storefront failed");
            } else {
                #[allow(clippy::print_stderr)]
                {
                    eprintln!("casecraft-storefront: {e}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

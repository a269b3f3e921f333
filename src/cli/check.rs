//! daka check command implementation
//!
//! Verifies the stored session against the server. Exits with the
//! authentication code when the session is missing or expired, so scripts
//! can branch on it.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for the check command
pub struct CheckOptions {
    pub config: Config,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct CheckReport {
    server: String,
    authenticated: bool,
}

pub async fn run(options: CheckOptions) -> Result<()> {
    let api = super::client_api(&options.config);
    if !api.check().await? {
        return Err(Error::Unauthorized);
    }

    let report = CheckReport {
        server: api.base_url().to_string(),
        authenticated: true,
    };

    let mut human = HumanOutput::new("daka check: session valid");
    human.push_summary("server", api.base_url());

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "check",
        &report,
        Some(&human),
    )?;

    Ok(())
}

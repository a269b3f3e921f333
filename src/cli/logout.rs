//! daka logout command implementation
//!
//! Expires the cookie server-side and drops the stored session.

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for the logout command
pub struct LogoutOptions {
    pub config: Config,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct LogoutReport {
    server: String,
    logged_out: bool,
}

pub async fn run(options: LogoutOptions) -> Result<()> {
    let api = super::client_api(&options.config);
    api.logout().await?;

    let report = LogoutReport {
        server: api.base_url().to_string(),
        logged_out: true,
    };

    let mut human = HumanOutput::new("daka logout: session cleared");
    human.push_summary("server", api.base_url());
    human.push_next_step("daka login");

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "logout",
        &report,
        Some(&human),
    )?;

    Ok(())
}

//! daka login command implementation
//!
//! Exchanges the password for a session cookie and stores it for later
//! invocations.

use std::io::{BufRead, Write};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for the login command
pub struct LoginOptions {
    pub password: Option<String>,
    pub config: Config,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct LoginReport {
    server: String,
    authenticated: bool,
}

pub async fn run(options: LoginOptions) -> Result<()> {
    let password = match options.password {
        Some(password) => password,
        None => read_password_from_stdin()?,
    };

    let api = super::client_api(&options.config);
    api.login(&password).await?;

    let report = LoginReport {
        server: api.base_url().to_string(),
        authenticated: true,
    };

    let mut human = HumanOutput::new("daka login: session stored");
    human.push_summary("server", api.base_url());
    human.push_next_step("daka show");

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "login",
        &report,
        Some(&human),
    )?;

    Ok(())
}

fn read_password_from_stdin() -> Result<String> {
    // No TTY handling; the prompt goes to stderr so piped stdin works.
    eprint!("Password: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(Error::InvalidArgument("password must not be empty".to_string()));
    }
    Ok(password)
}

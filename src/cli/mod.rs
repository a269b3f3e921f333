//! Command-line interface for daka
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is defined in its own submodule.

use clap::{Parser, Subcommand};

use crate::cache::RecordCache;
use crate::client::HttpApi;
use crate::config::Config;
use crate::error::Result;

mod check;
mod login;
mod logout;
mod serve;
mod show;
mod toggle;

/// daka - habit check-in calendar
///
/// A single-user calendar tracking four daily habits, with a server holding
/// the records and client commands that sync optimistically against it.
#[derive(Parser, Debug)]
#[command(name = "daka")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Server base URL for client commands
    #[arg(long, global = true, env = "DAKA_SERVER_URL")]
    pub server: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the record server
    Serve {
        /// Bind address (host:port), overriding DAKA_BIND
        #[arg(long)]
        bind: Option<String>,
    },

    /// Log in and store the session
    Login {
        /// Password; read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Check whether the stored session is still valid
    Check,

    /// Render a month of check-ins
    Show {
        /// Month to render as YYYY-MM (default: current month)
        month: Option<String>,
    },

    /// Toggle tasks on a date
    Toggle {
        /// Date as YYYY-MM-DD, or "today"
        date: String,

        /// Tasks to toggle: earlyWake, earlySleep, takeout, eatOut
        #[arg(required = true)]
        tasks: Vec<String>,

        /// Set this value instead of flipping
        #[arg(long)]
        value: Option<bool>,

        /// Write strategy: immediate or debounced
        #[arg(long)]
        strategy: Option<String>,
    },

    /// Log out and drop the stored session
    Logout,
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let mut config = Config::from_env()?;
        if let Some(server) = self.server {
            config.server_url = server;
        }

        match self.command {
            Commands::Serve { bind } => {
                serve::run(serve::ServeOptions {
                    bind,
                    config,
                    quiet: self.quiet,
                })
                .await
            }
            Commands::Login { password } => {
                login::run(login::LoginOptions {
                    password,
                    config,
                    json: self.json,
                    quiet: self.quiet,
                })
                .await
            }
            Commands::Check => {
                check::run(check::CheckOptions {
                    config,
                    json: self.json,
                    quiet: self.quiet,
                })
                .await
            }
            Commands::Show { month } => {
                show::run(show::ShowOptions {
                    month,
                    config,
                    json: self.json,
                    quiet: self.quiet,
                })
                .await
            }
            Commands::Toggle {
                date,
                tasks,
                value,
                strategy,
            } => {
                toggle::run(toggle::ToggleOptions {
                    date,
                    tasks,
                    value,
                    strategy,
                    config,
                    json: self.json,
                    quiet: self.quiet,
                })
                .await
            }
            Commands::Logout => {
                logout::run(logout::LogoutOptions {
                    config,
                    json: self.json,
                    quiet: self.quiet,
                })
                .await
            }
        }
    }
}

/// Client for the configured server, with the stored session attached.
fn client_api(config: &Config) -> HttpApi {
    let session_path = config
        .session_path
        .clone()
        .or_else(HttpApi::default_session_path);
    HttpApi::new(config.server_url.clone(), session_path)
}

/// Record cache for client commands; `None` when no usable path exists.
fn record_cache(config: &Config) -> Option<RecordCache> {
    config
        .cache_path
        .clone()
        .or_else(RecordCache::default_path)
        .map(RecordCache::new)
}

//! daka serve command implementation
//!
//! Runs the record server until interrupted.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::server;
use crate::store::store_from_config;

/// Options for the serve command
pub struct ServeOptions {
    pub bind: Option<String>,
    pub config: Config,
    pub quiet: bool,
}

pub async fn run(options: ServeOptions) -> Result<()> {
    let mut config = options.config;
    if let Some(bind) = options.bind {
        config.bind = bind
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("invalid bind address '{bind}'")))?;
    }

    let store = store_from_config(&config)?;
    if !options.quiet {
        println!(
            "daka server on http://{} ({} store)",
            config.bind,
            store.backend_tag()
        );
    }

    server::serve(Arc::new(config), store).await
}

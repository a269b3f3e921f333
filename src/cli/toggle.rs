//! daka toggle command implementation
//!
//! Flips (or sets) tasks on a date through the sync engine, then flushes so
//! the process can exit without losing a debounced write.

use std::sync::Arc;

use chrono::Local;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::records::{date_key, DayRecord, TaskKey};
use crate::sync::{SyncEngine, SyncStrategy};

/// Options for the toggle command
pub struct ToggleOptions {
    pub date: String,
    pub tasks: Vec<String>,
    pub value: Option<bool>,
    pub strategy: Option<String>,
    pub config: Config,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct ToggleReport {
    date: String,
    record: DayRecord,
    strategy: String,
}

pub async fn run(options: ToggleOptions) -> Result<()> {
    let date = resolve_date(&options.date);
    let tasks = options
        .tasks
        .iter()
        .map(|raw| raw.parse::<TaskKey>())
        .collect::<Result<Vec<_>>>()?;
    let strategy: SyncStrategy = match &options.strategy {
        Some(raw) => raw.parse()?,
        None => options.config.sync_strategy,
    };

    let api = Arc::new(super::client_api(&options.config));
    let engine = SyncEngine::new(
        api,
        super::record_cache(&options.config),
        strategy,
        options.config.sync_delay,
    );

    // Start from the server's copy so a toggle flips the real current value,
    // not a stale cached one.
    engine.refresh().await?;
    for task in &tasks {
        engine.set_task(&date, *task, options.value).await?;
    }
    engine.flush().await?;

    let record = engine.records().get(&date).cloned().unwrap_or_default();
    let report = ToggleReport {
        date: date.clone(),
        record: record.clone(),
        strategy: strategy.to_string(),
    };

    let mut human = HumanOutput::new(format!("daka toggle: {date}"));
    for task in &tasks {
        let flag = record.get(task).copied().unwrap_or(false);
        human.push_summary(task.label(), if flag { "on" } else { "off" });
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "toggle",
        &report,
        Some(&human),
    )?;

    Ok(())
}

/// Accept "today" as a convenience; anything else passes through and gets
/// validated by the engine.
fn resolve_date(raw: &str) -> String {
    if raw == "today" {
        date_key(Local::now().date_naive())
    } else {
        raw.to_string()
    }
}

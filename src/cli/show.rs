//! daka show command implementation
//!
//! Fetches the records and renders one month as a Sunday-first calendar
//! grid. Each in-month cell carries the day number plus one mark slot per
//! task; leading and trailing cells pad the grid to whole weeks.

use chrono::{Datelike, Days, Local, NaiveDate};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{emit_success, OutputOptions};
use crate::records::{date_key, RecordMap, TaskKey};
use crate::sync::RecordsApi;

/// Options for the show command
pub struct ShowOptions {
    pub month: Option<String>,
    pub config: Config,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct ShowReport {
    month: String,
    records: RecordMap,
}

/// One calendar cell. Cells from adjacent months pad the first and last
/// week and are rendered blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GridCell {
    date: NaiveDate,
    in_month: bool,
}

pub async fn run(options: ShowOptions) -> Result<()> {
    let (year, month) = match &options.month {
        Some(raw) => parse_month(raw)?,
        None => {
            let today = Local::now().date_naive();
            (today.year(), today.month())
        }
    };
    let cells = month_grid(year, month)
        .ok_or_else(|| Error::InvalidArgument(format!("invalid month '{year}-{month:02}'")))?;

    let api = super::client_api(&options.config);
    let records = api.fetch_records().await?;
    // Keep the local mirror current on every successful read.
    if let Some(cache) = super::record_cache(&options.config) {
        cache.save(&records);
    }

    let prefix = format!("{year:04}-{month:02}-");
    let month_records: RecordMap = records
        .iter()
        .filter(|(key, _)| key.starts_with(&prefix))
        .map(|(key, day)| (key.clone(), day.clone()))
        .collect();

    let report = ShowReport {
        month: format!("{year:04}-{month:02}"),
        records: month_records,
    };

    if options.json {
        return emit_success(
            OutputOptions {
                json: true,
                quiet: options.quiet,
            },
            "show",
            &report,
            None,
        );
    }
    if options.quiet {
        return Ok(());
    }

    for line in render_month(&cells, &records) {
        println!("{line}");
    }
    Ok(())
}

/// Parse `YYYY-MM` with required zero padding.
fn parse_month(raw: &str) -> Result<(i32, u32)> {
    let invalid = || Error::InvalidArgument(format!("invalid month '{raw}': expected YYYY-MM"));
    let bytes = raw.as_bytes();
    if bytes.len() != 7 || bytes[4] != b'-' {
        return Err(invalid());
    }
    let year: i32 = raw[..4].parse().map_err(|_| invalid())?;
    let month: u32 = raw[5..].parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

/// Sunday-first cell grid covering the month in whole weeks.
fn month_grid(year: i32, month: u32) -> Option<Vec<GridCell>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let days_in_month = next_first.signed_duration_since(first).num_days() as u32;

    let offset = first.weekday().num_days_from_sunday();
    let total = (offset + days_in_month).div_ceil(7) * 7;

    let mut cells = Vec::with_capacity(total as usize);
    let mut cursor = first.checked_sub_days(Days::new(offset as u64))?;
    for _ in 0..total {
        cells.push(GridCell {
            date: cursor,
            in_month: cursor.year() == year && cursor.month() == month,
        });
        cursor = cursor.checked_add_days(Days::new(1))?;
    }
    Some(cells)
}

fn render_month(cells: &[GridCell], records: &RecordMap) -> Vec<String> {
    let mut lines = Vec::new();
    let Some(anchor) = cells.iter().find(|cell| cell.in_month) else {
        return lines;
    };

    lines.push(anchor.date.format("%B %Y").to_string());
    lines.push(
        ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"]
            .map(|day| format!("{day:<7}"))
            .join("  ")
            .trim_end()
            .to_string(),
    );

    for week in cells.chunks(7) {
        let row = week
            .iter()
            .map(|cell| render_cell(cell, records))
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(row.trim_end().to_string());
    }

    lines.push(String::new());
    let mut counts = [0u32; 4];
    for cell in cells.iter().filter(|cell| cell.in_month) {
        if let Some(day) = records.get(&date_key(cell.date)) {
            for (idx, task) in TaskKey::ALL.iter().enumerate() {
                if day.get(task).copied().unwrap_or(false) {
                    counts[idx] += 1;
                }
            }
        }
    }
    for (idx, task) in TaskKey::ALL.iter().enumerate() {
        lines.push(format!("{} {:<12} {:>2}", task.mark(), task.label(), counts[idx]));
    }

    lines
}

/// `dd WSTE` with a dot for each unchecked task; blank outside the month.
fn render_cell(cell: &GridCell, records: &RecordMap) -> String {
    if !cell.in_month {
        return " ".repeat(7);
    }
    let day = records.get(&date_key(cell.date));
    let marks: String = TaskKey::ALL
        .iter()
        .map(|task| {
            let on = day
                .and_then(|record| record.get(task))
                .copied()
                .unwrap_or(false);
            if on {
                task.mark()
            } else {
                '.'
            }
        })
        .collect();
    format!("{:>2} {marks}", cell.date.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::DayRecord;

    #[test]
    fn parse_month_requires_padded_shape() {
        assert_eq!(parse_month("2026-08").unwrap(), (2026, 8));
        assert_eq!(parse_month("1999-12").unwrap(), (1999, 12));
        assert!(parse_month("2026-8").is_err());
        assert!(parse_month("2026-13").is_err());
        assert!(parse_month("2026-00").is_err());
        assert!(parse_month("abcd-ef").is_err());
        assert!(parse_month("2026/08").is_err());
    }

    #[test]
    fn grid_pads_to_whole_weeks() {
        // August 2026 starts on a Saturday: 6 leading cells, 31 days,
        // 5 trailing cells.
        let cells = month_grid(2026, 8).unwrap();
        assert_eq!(cells.len(), 42);
        assert!(!cells[0].in_month);
        assert_eq!(cells[0].date, NaiveDate::from_ymd_opt(2026, 7, 26).unwrap());
        assert!(cells[6].in_month);
        assert_eq!(cells[6].date, NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
        assert!(!cells[41].in_month);
        assert_eq!(cells[41].date, NaiveDate::from_ymd_opt(2026, 9, 5).unwrap());
    }

    #[test]
    fn month_starting_sunday_gets_no_leading_pad() {
        // February 2026 starts on a Sunday and has exactly 28 days.
        let cells = month_grid(2026, 2).unwrap();
        assert_eq!(cells.len(), 28);
        assert!(cells.iter().all(|cell| cell.in_month));
    }

    #[test]
    fn trailing_pad_crosses_the_year_boundary() {
        // December 2025 ends mid-week; trailing cells land in January 2026.
        let cells = month_grid(2025, 12).unwrap();
        assert_eq!(cells.len(), 35);
        let last = cells.last().unwrap();
        assert!(!last.in_month);
        assert_eq!(last.date, NaiveDate::from_ymd_opt(2026, 1, 3).unwrap());
    }

    #[test]
    fn cells_mark_checked_tasks() {
        let mut day = DayRecord::new();
        day.insert(TaskKey::EarlyWake, true);
        day.insert(TaskKey::EatOut, true);
        day.insert(TaskKey::EarlySleep, false);
        let mut records = RecordMap::new();
        records.insert("2026-08-12".to_string(), day);

        let cell = GridCell {
            date: NaiveDate::from_ymd_opt(2026, 8, 12).unwrap(),
            in_month: true,
        };
        assert_eq!(render_cell(&cell, &records), "12 W..E");

        let padding = GridCell {
            date: NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(),
            in_month: false,
        };
        assert_eq!(render_cell(&padding, &RecordMap::new()), "       ");
    }

    #[test]
    fn render_includes_title_weekdays_and_counts() {
        let mut day = DayRecord::new();
        day.insert(TaskKey::Takeout, true);
        let mut records = RecordMap::new();
        records.insert("2026-08-03".to_string(), day);

        let cells = month_grid(2026, 8).unwrap();
        let lines = render_month(&cells, &records);

        assert_eq!(lines[0], "August 2026");
        assert!(lines[1].starts_with("Su"));
        // 6 week rows for August 2026, then a blank line and 4 count lines.
        assert_eq!(lines.len(), 2 + 6 + 1 + 4);
        assert!(lines.iter().any(|line| line.contains("3 ..T.")));
        assert!(lines.last().unwrap().starts_with("E eat out"));
        assert!(lines.iter().any(|line| line.starts_with("T takeout") && line.ends_with(" 1")));
    }
}

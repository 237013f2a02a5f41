//! Steps subcommand handlers: get, set, fill.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use rand::Rng;
use serde::Serialize;
use tabled::Tabled;

use gfit_api::FitClient;
use gfit_api::time::from_millis;

use crate::cli::{GlobalOpts, OutputFormat, StepsArgs, StepsCommand};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

/// Backfilled windows start at 05:00 local and span one hour.
const FILL_HOUR: u32 = 5;

pub async fn handle(args: StepsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        StepsCommand::Get { date, start, end } => {
            let (start, end) = resolve_window(date, start, end)?;
            let client = util::connect(global).await?;
            get(&client, global, start, end).await
        }
        StepsCommand::Set { start, end, count } => {
            validate_window(start, end)?;
            validate_count(count)?;
            let client = util::connect(global).await?;
            set(&client, global, start, end, count).await
        }
        StepsCommand::Fill { min, max } => {
            if min < 0 || max < min {
                return Err(CliError::Validation {
                    field: "min/max".into(),
                    reason: format!("need 0 <= min <= max, got {min}..{max}"),
                });
            }
            let client = util::connect(global).await?;
            fill(&client, global, min, max).await
        }
    }
}

// ── Window resolution ────────────────────────────────────────────────

/// Turn `--date` / `--start --end` flags into a concrete window.
/// With no flags, defaults to today.
fn resolve_window(
    date: Option<chrono::NaiveDate>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Result<(NaiveDateTime, NaiveDateTime), CliError> {
    if let (Some(start), Some(end)) = (start, end) {
        validate_window(start, end)?;
        return Ok((start, end));
    }

    let day = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let start = day.and_time(NaiveTime::MIN);
    Ok((start, start + Duration::days(1)))
}

fn validate_window(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), CliError> {
    if start >= end {
        return Err(CliError::Validation {
            field: "start/end".into(),
            reason: format!("start ({start}) must be before end ({end})"),
        });
    }
    Ok(())
}

fn validate_count(count: i64) -> Result<(), CliError> {
    if count < 0 {
        return Err(CliError::Validation {
            field: "count".into(),
            reason: format!("step count cannot be negative, got {count}"),
        });
    }
    Ok(())
}

// ── Get ──────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct BucketRow {
    #[tabled(rename = "START")]
    start: String,
    #[tabled(rename = "END")]
    end: String,
    #[tabled(rename = "STEPS")]
    steps: i64,
}

#[derive(Serialize)]
struct BucketSummary {
    start: Option<String>,
    end: Option<String>,
    steps: i64,
}

/// Format a decimal-string millis timestamp for display.
fn millis_label(millis: Option<&str>) -> String {
    millis
        .and_then(|m| m.parse::<i64>().ok())
        .map_or_else(|| "-".into(), from_millis)
}

async fn get(
    client: &FitClient,
    global: &GlobalOpts,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<(), CliError> {
    let resp = client.get_steps(start, end).await?;

    let summaries: Vec<BucketSummary> = resp
        .bucket
        .iter()
        .map(|b| BucketSummary {
            start: b.start_time_millis.as_deref().map(|m| millis_label(Some(m))),
            end: b.end_time_millis.as_deref().map(|m| millis_label(Some(m))),
            steps: b.steps(),
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &summaries,
        |s| BucketRow {
            start: s.start.clone().unwrap_or_else(|| "-".into()),
            end: s.end.clone().unwrap_or_else(|| "-".into()),
            steps: s.steps,
        },
        |s| s.steps.to_string(),
    );
    output::print_output(&out, global.quiet);

    if matches!(global.output, OutputFormat::Table) {
        output::print_output(&format!("Total: {}", resp.total_steps()), global.quiet);
    }
    Ok(())
}

// ── Set ──────────────────────────────────────────────────────────────

async fn set(
    client: &FitClient,
    global: &GlobalOpts,
    start: NaiveDateTime,
    end: NaiveDateTime,
    count: i64,
) -> Result<(), CliError> {
    client.set_steps(start, end, count).await?;

    if !global.quiet {
        eprintln!("{} Wrote {count} steps over {start} .. {end}", check(global));
    }
    Ok(())
}

// ── Fill ─────────────────────────────────────────────────────────────

/// Compute the backfill window starts: one per elapsed day of the
/// current month, anchored at 05:00 local, walking backwards from today
/// (yesterday first if 05:00 hasn't passed yet).
///
/// Days that fall into the previous month are excluded, so on the 1st
/// before 05:00 there is nothing to fill yet.
fn fill_windows(now: NaiveDateTime) -> Vec<NaiveDateTime> {
    let five_am = NaiveTime::from_hms_opt(FILL_HOUR, 0, 0).expect("fixed wall-clock time");

    let mut anchor = now.date().and_time(five_am);
    if anchor >= now {
        anchor -= Duration::days(1);
    }

    let mut windows = Vec::new();
    while anchor.month() == now.month() {
        windows.push(anchor);
        anchor -= Duration::days(1);
    }
    windows
}

/// Write a random step count for each elapsed day of the current month.
///
/// The batch stops at the first failed write so a partial fill is
/// visible rather than silently skipped.
async fn fill(
    client: &FitClient,
    global: &GlobalOpts,
    min: i64,
    max: i64,
) -> Result<(), CliError> {
    let windows = fill_windows(chrono::Local::now().naive_local());

    // Draw all counts up front; the RNG is not held across awaits.
    let counts: Vec<i64> = {
        let mut rng = rand::thread_rng();
        windows.iter().map(|_| rng.gen_range(min..=max)).collect()
    };

    let bar = if global.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(windows.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    };

    let mut total = 0;
    for (day, steps) in windows.iter().zip(&counts) {
        bar.set_message(day.date().to_string());
        client.set_steps(*day, *day + Duration::hours(1), *steps).await?;
        total += steps;
        bar.inc(1);
    }
    bar.finish_and_clear();

    if !global.quiet {
        eprintln!(
            "{} Filled {} days with {total} steps total",
            check(global),
            windows.len()
        );
    }
    Ok(())
}

fn check(global: &GlobalOpts) -> String {
    if output::should_color(&global.color) {
        "✓".green().to_string()
    } else {
        "✓".to_string()
    }
}

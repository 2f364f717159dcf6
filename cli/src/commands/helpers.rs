use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, TimeZone};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use calor_core::models::{DATE_FORMAT, EnergyUnit, LogEntry};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, DATE_FORMAT).with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Strict unit parsing for user input; the core treats unknown labels as kJ.
pub(crate) fn parse_unit(s: &str) -> Result<EnergyUnit> {
    match s.trim().to_lowercase().as_str() {
        "kcal" | "kj" => Ok(EnergyUnit::from_label(s)),
        _ => bail!("Invalid unit '{s}'. Use 'kcal' or 'kj'"),
    }
}

pub(crate) fn require_positive(value: f64, what: &str) -> Result<f64> {
    if value.is_nan() || value <= 0.0 {
        bail!("{what} must be greater than 0");
    }
    Ok(value)
}

/// Milliseconds since the epoch at local midnight starting `date`.
pub(crate) fn local_midnight_millis(date: NaiveDate) -> Result<i64> {
    let midnight = date.and_hms_opt(0, 0, 0).context("Invalid midnight")?;
    let local = Local
        .from_local_datetime(&midnight)
        .earliest()
        .with_context(|| format!("Local midnight does not exist on {date}"))?;
    Ok(local.timestamp_millis())
}

/// Convert inclusive `since`/`until` dates into the exclusive-lower,
/// inclusive-upper timestamp bounds used by the log query.
pub(crate) fn date_bounds(
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
) -> Result<(i64, Option<i64>)> {
    let lower = match since {
        Some(d) => local_midnight_millis(d)? - 1,
        None => i64::MIN,
    };
    let upper = match until {
        Some(d) => {
            let next = d.succ_opt().context("Date out of range")?;
            Some(local_midnight_millis(next)? - 1)
        }
        None => None,
    };
    Ok((lower, upper))
}

pub(crate) fn print_log_table(entries: &[LogEntry]) {
    #[derive(Tabled)]
    struct LogRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Food")]
        food: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "kcal")]
        kcal: String,
        #[tabled(rename = "kJ")]
        kj: String,
    }

    let rows: Vec<LogRow> = entries
        .iter()
        .map(|e| LogRow {
            id: e.id,
            date: e.local_date.format(DATE_FORMAT).to_string(),
            time: Local
                .timestamp_millis_opt(e.timestamp)
                .single()
                .map_or_else(|| "-".into(), |t| t.format("%H:%M").to_string()),
            food: e
                .food
                .as_deref()
                .map(|f| truncate(f, 30))
                .unwrap_or_default(),
            quantity: e.quantity.map_or("-".into(), |q| format!("{q:.0}")),
            kcal: format!("{:.0}", no_neg_zero(e.energy_kcal())),
            kj: format!("{:.0}", no_neg_zero(e.energy_kj)),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

use anyhow::{Result, bail};

use calor_core::counter::CalorieCounter;

use super::helpers::{date_bounds, no_neg_zero, parse_date, print_log_table};

pub(crate) fn cmd_log(
    counter: &CalorieCounter,
    since: Option<String>,
    until: Option<String>,
    json: bool,
) -> Result<()> {
    let since = since.map(|s| parse_date(Some(s))).transpose()?;
    let until = until.map(|s| parse_date(Some(s))).transpose()?;
    if since.zip(until).is_some_and(|(s, u)| s > u) {
        bail!("--since must not be after --until");
    }

    let (lower, upper) = date_bounds(since, until)?;
    let entries = counter.query_log_entries(lower, upper)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        eprintln!("No log entries found");
    } else {
        print_log_table(&entries);
        let total_kcal: f64 = entries.iter().map(|e| e.energy_kcal()).sum();
        println!("  {} entries, {:.0} kcal", entries.len(), no_neg_zero(total_kcal));
    }

    Ok(())
}

use anyhow::Result;

use calor_core::counter::CalorieCounter;
use calor_core::models::DATE_FORMAT;

use super::activity::print_balance;
use super::helpers::{parse_date, print_log_table};

pub(crate) fn cmd_summary(counter: &CalorieCounter, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let summary = counter.day_summary(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("=== {} ===\n", summary.date.format(DATE_FORMAT));
    if summary.entries.is_empty() {
        println!("  No food logged");
    } else {
        print_log_table(&summary.entries);
    }
    println!();
    print_balance(&summary.energy);
    println!("  RATIO: {:.2}", summary.energy.ratio);

    Ok(())
}

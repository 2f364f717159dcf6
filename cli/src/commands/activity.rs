use anyhow::Result;

use calor_core::counter::CalorieCounter;
use calor_core::models::EnergySummary;

use super::helpers::{no_neg_zero, parse_unit};

pub(crate) fn cmd_activity(
    counter: &mut CalorieCounter,
    amount: f64,
    unit: &str,
    json: bool,
) -> Result<()> {
    let unit = parse_unit(unit)?;
    counter.add_activity(amount, unit);

    let summary = counter.summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Added {amount} {unit} of activity");
        print_balance(&summary);
        eprintln!("Note: activity is not saved between runs");
    }

    Ok(())
}

pub(crate) fn print_balance(summary: &EnergySummary) {
    println!(
        "  IN: {:.0} kcal | OUT: {:.0} kcal | NET: {:.0} kcal | STATUS: {}",
        no_neg_zero(summary.energy_in_kcal),
        no_neg_zero(summary.energy_out_kcal),
        no_neg_zero(summary.net_kcal),
        summary.status
    );
}

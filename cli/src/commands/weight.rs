use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use calor_core::counter::CalorieCounter;
use calor_core::db::LocalStore;
use calor_core::models::{DATE_FORMAT, WeightEntry};

use super::helpers::{json_error, require_positive};

const LBS_PER_KG: f64 = 2.20462;

/// Record `weight` unless it equals the current one. Returns the stored entry,
/// or `None` when nothing was written.
#[allow(clippy::float_cmp)]
fn record_weight(counter: &mut CalorieCounter, weight: f64) -> Result<Option<WeightEntry>> {
    if counter.weight() == Some(weight) {
        return Ok(None);
    }
    counter.set_weight(weight);
    counter.store().latest_weight()
}

pub(crate) fn cmd_weight_set(counter: &mut CalorieCounter, value: f64, json: bool) -> Result<()> {
    let weight = require_positive(value, "Weight")?;

    match record_weight(counter, weight)? {
        Some(e) if json => println!("{}", serde_json::to_string_pretty(&e)?),
        Some(e) => println!(
            "Logged {:.1} kg ({:.1} lbs) for {}",
            e.weight,
            e.weight * LBS_PER_KG,
            e.local_date.format(DATE_FORMAT)
        ),
        None if json => println!(
            "{}",
            serde_json::json!({ "weight": weight, "unchanged": true })
        ),
        None => println!("Weight unchanged: {weight:.1} kg"),
    }

    Ok(())
}

pub(crate) fn cmd_weight_show(counter: &CalorieCounter, json: bool) -> Result<()> {
    match counter.weight() {
        Some(kg) if json => println!("{}", serde_json::json!({ "weight": kg })),
        Some(kg) => println!("{kg:.1} kg ({:.1} lbs)", kg * LBS_PER_KG),
        None if json => println!("{}", json_error("No weight recorded")),
        None => eprintln!("No weight recorded. Use `calor weight set` to record your weight."),
    }
    Ok(())
}

pub(crate) fn cmd_weight_history(store: &LocalStore, limit: Option<u32>, json: bool) -> Result<()> {
    let entries = store.weight_history(limit.map(i64::from))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        eprintln!("No weight entries found. Use `calor weight set` to record your weight.");
    } else {
        #[derive(Tabled)]
        struct WeightRow {
            #[tabled(rename = "Date")]
            date: String,
            #[tabled(rename = "Weight (kg)")]
            kg: String,
            #[tabled(rename = "Weight (lbs)")]
            lbs: String,
        }

        let rows: Vec<WeightRow> = entries
            .iter()
            .map(|e| WeightRow {
                date: e.local_date.format(DATE_FORMAT).to_string(),
                kg: format!("{:.1}", e.weight),
                lbs: format!("{:.1}", e.weight * LBS_PER_KG),
            })
            .collect();

        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }

    Ok(())
}

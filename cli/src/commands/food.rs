use anyhow::{Context, Result, bail};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use calor_core::counter::CalorieCounter;
use calor_core::models::{EnergySummary, EnergyUnit, LogEntry, kj_to_kcal};
use calor_core::prefill::FoodTable;

use super::helpers::{parse_unit, truncate};

#[derive(Serialize)]
struct FoodLogged<'a> {
    entry: &'a LogEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggested_kcal: Option<i64>,
    totals: EnergySummary,
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn cmd_food(
    counter: &mut CalorieCounter,
    foods: &FoodTable,
    name: &str,
    amount: Option<f64>,
    quantity: Option<f64>,
    unit: &str,
    json: bool,
) -> Result<()> {
    let unit = parse_unit(unit)?;
    let name = name.trim();

    let (amount, unit, suggested_kcal) = match amount {
        Some(a) => (a, unit, None),
        None => {
            let qty = quantity.with_context(|| {
                format!("No amount given for '{name}'. Pass an amount or --quantity to use the food list")
            })?;
            let kcal = foods
                .suggest_kcal(name, qty)
                .with_context(|| format!("'{name}' is not in the food list. Pass an amount"))?;
            (kcal as f64, EnergyUnit::Kilocalories, Some(kcal))
        }
    };

    let food = (!name.is_empty()).then_some(name);
    let Some(entry) = counter.add_food(food, quantity, amount, unit) else {
        bail!("Failed to save food log entry");
    };

    if json {
        let out = FoodLogged {
            entry: &entry,
            suggested_kcal,
            totals: counter.summary(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let qty = entry
            .quantity
            .map(|q| format!(" ({q:.0} g)"))
            .unwrap_or_default();
        let label = entry.food.as_deref().unwrap_or("food");
        println!(
            "Logged {label}{qty}: {:.0} kcal ({:.0} kJ) [#{}]",
            entry.energy_kcal(),
            entry.energy_kj,
            entry.id
        );
        if suggested_kcal.is_some() {
            eprintln!("Note: energy taken from the food list");
        }
    }

    Ok(())
}

pub(crate) fn cmd_foods(
    foods: &FoodTable,
    query: &str,
    quantity: Option<f64>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "kJ/100g")]
        kj_per_100g: String,
        #[tabled(rename = "kcal/100g")]
        kcal_per_100g: String,
        #[tabled(rename = "Suggested kcal")]
        suggested_kcal: String,
    }

    #[derive(Serialize)]
    struct FoodMatch<'a> {
        name: &'a str,
        kj_per_100g: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggested_kcal: Option<i64>,
    }

    let hits = foods.search(query);

    if json {
        let matches: Vec<FoodMatch> = hits
            .iter()
            .map(|f| FoodMatch {
                name: &f.name,
                kj_per_100g: f.kj_per_100g,
                suggested_kcal: quantity.and_then(|q| foods.suggest_kcal(&f.name, q)),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    if hits.is_empty() {
        if foods.is_empty() {
            eprintln!("The food list is empty. Put a food-data.json in the data directory or set CALOR_FOODS.");
        } else {
            eprintln!("No foods matching '{query}'");
        }
        return Ok(());
    }

    let rows: Vec<FoodRow> = hits
        .iter()
        .map(|f| FoodRow {
            name: truncate(f.name.trim(), 35),
            kj_per_100g: format!("{:.0}", f.kj_per_100g),
            kcal_per_100g: format!("{:.0}", kj_to_kcal(f.kj_per_100g)),
            suggested_kcal: quantity
                .and_then(|q| foods.suggest_kcal(&f.name, q))
                .map_or("-".into(), |k| k.to_string()),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

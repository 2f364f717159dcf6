use anyhow::{Context, Result};
use std::path::Path;

use calor_core::db::{Collection, LocalStore, SCHEMA_VERSION};
use calor_core::models::ExportData;

pub(crate) fn cmd_export(store: &LocalStore, file: Option<&Path>, json: bool) -> Result<()> {
    let data = store.export_all()?;
    let body = serde_json::to_string_pretty(&data)?;

    match file {
        Some(path) => {
            std::fs::write(path, body)
                .with_context(|| format!("Failed to write export file: {}", path.display()))?;
            if json {
                let written = serde_json::json!({
                    "file": path.display().to_string(),
                    "log_entries": data.log.len(),
                    "weight_entries": data.weight_log.len(),
                    "settings": data.settings.len(),
                });
                println!("{}", serde_json::to_string_pretty(&written)?);
                return Ok(());
            }
            println!(
                "Exported {} log entries, {} weights, {} settings to {}",
                data.log.len(),
                data.weight_log.len(),
                data.settings.len(),
                path.display()
            );
        }
        None => println!("{body}"),
    }

    Ok(())
}

pub(crate) fn cmd_import(store: &LocalStore, file: &Path, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read import file: {}", file.display()))?;
    let data: ExportData = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid export file: {}", file.display()))?;

    let summary = store.import_all(&data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Imported {} log entries, {} weights, {} settings",
            summary.log_entries_imported,
            summary.weight_entries_imported,
            summary.settings_imported
        );
    }

    Ok(())
}

pub(crate) fn cmd_info(
    store: &LocalStore,
    data_dir: &Path,
    foods_path: &Path,
    food_count: usize,
    json: bool,
) -> Result<()> {
    let version = store.schema_version()?;
    let log = store.count(Collection::Log)?;
    let weights = store.count(Collection::WeightLog)?;
    let settings = store.count(Collection::Settings)?;

    if json {
        let info = serde_json::json!({
            "data_dir": data_dir.display().to_string(),
            "database": store.location().to_string(),
            "schema_version": version,
            "supported_version": SCHEMA_VERSION,
            "log_entries": log,
            "weight_entries": weights,
            "settings": settings,
            "food_list": foods_path.display().to_string(),
            "foods": food_count,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("  Data dir:  {}", data_dir.display());
        println!("  Database:  {} (schema v{version})", store.location());
        println!("  Log:       {log} entries");
        println!("  Weights:   {weights} entries");
        println!("  Settings:  {settings}");
        println!("  Food list: {} ({food_count} foods)", foods_path.display());
    }

    Ok(())
}

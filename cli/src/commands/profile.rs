use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

use calor_core::counter::CalorieCounter;
use calor_core::models::DATE_FORMAT;

use super::helpers::require_positive;

pub(crate) fn cmd_profile_set(
    counter: &mut CalorieCounter,
    height: Option<f64>,
    dob: Option<&str>,
    gender: Option<&str>,
    json: bool,
) -> Result<()> {
    if height.is_none() && dob.is_none() && gender.is_none() {
        bail!("Nothing to set. Pass --height, --dob or --gender");
    }

    // Validate everything before writing anything.
    let height = height.map(|h| require_positive(h, "Height")).transpose()?;
    let dob = dob
        .map(|s| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .with_context(|| format!("Invalid date of birth '{s}'. Use YYYY-MM-DD"))
        })
        .transpose()?;
    if gender.is_some_and(|g| g.trim().is_empty()) {
        bail!("Gender must not be empty");
    }

    if let Some(h) = height {
        counter.set_height(h);
    }
    if let Some(d) = dob {
        counter.set_dob(d);
    }
    if let Some(g) = gender {
        counter.set_gender(g);
    }

    cmd_profile_show(counter, json)
}

pub(crate) fn cmd_profile_show(counter: &CalorieCounter, json: bool) -> Result<()> {
    let profile = counter.profile();

    if json {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    println!("  Weight: {}", or_dash(profile.weight.map(|w| format!("{w:.1} kg"))));
    println!("  Height: {}", or_dash(profile.height.map(|h| format!("{h:.1} cm"))));
    println!(
        "  Born:   {}",
        or_dash(profile.dob.map(|d| d.format(DATE_FORMAT).to_string()))
    );
    println!("  Gender: {}", or_dash(profile.gender.clone()));

    Ok(())
}

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Conversion factor for every kJ/kcal calculation. Not 4.184.
pub const KJ_PER_KCAL: f64 = 4.2;

/// Placeholder basal expenditure until BMR is derived from the profile.
pub const DEFAULT_BASAL_RATE_KJ: f64 = 8000.0;

/// Intake/expenditure ratio below which the day counts as "good".
pub const OK_CUTOFF: f64 = 0.95;
/// Intake/expenditure ratio at or above which the day counts as "bad".
pub const BAD_CUTOFF: f64 = 1.2;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyUnit {
    Kilojoules,
    Kilocalories,
}

impl EnergyUnit {
    /// Anything other than "kcal" (case-insensitive) is treated as kJ.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("kcal") {
            Self::Kilocalories
        } else {
            Self::Kilojoules
        }
    }

    pub fn to_kj(self, amount: f64) -> f64 {
        match self {
            Self::Kilojoules => amount,
            Self::Kilocalories => amount * KJ_PER_KCAL,
        }
    }
}

impl fmt::Display for EnergyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kilojoules => f.write_str("kJ"),
            Self::Kilocalories => f.write_str("kcal"),
        }
    }
}

pub fn kj_to_kcal(kj: f64) -> f64 {
    kj / KJ_PER_KCAL
}

// --- Log ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Food,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "food" => Some(Self::Food),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: LogKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food: Option<String>,
    pub quantity: Option<f64>,
    pub energy_kj: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub local_date: NaiveDate,
}

impl LogEntry {
    pub fn energy_kcal(&self) -> f64 {
        kj_to_kcal(self.energy_kj)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub kind: LogKind,
    pub food: Option<String>,
    pub quantity: Option<f64>,
    pub energy_kj: f64,
    pub timestamp: i64,
    pub local_date: NaiveDate,
}

impl NewLogEntry {
    pub fn with_id(self, id: i64) -> LogEntry {
        LogEntry {
            id,
            kind: self.kind,
            food: self.food,
            quantity: self.quantity,
            energy_kj: self.energy_kj,
            timestamp: self.timestamp,
            local_date: self.local_date,
        }
    }
}

// --- Weight ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub local_date: NaiveDate,
    pub weight: f64,
}

// --- Settings ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Height,
    Dob,
    Gender,
}

impl SettingKey {
    pub const ALL: [SettingKey; 3] = [Self::Height, Self::Dob, Self::Gender];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Height => "height",
            Self::Dob => "dob",
            Self::Gender => "gender",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }

    /// The stored form of `value` under this key, or `None` if it has the
    /// wrong shape: height a number, dob a `YYYY-MM-DD` string, gender a
    /// string (normalized).
    pub fn normalize_value(self, value: &serde_json::Value) -> Option<serde_json::Value> {
        match self {
            Self::Height => value.as_f64().map(serde_json::Value::from),
            Self::Dob => value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
                .map(|d| serde_json::Value::String(d.format(DATE_FORMAT).to_string())),
            Self::Gender => value
                .as_str()
                .map(|g| serde_json::Value::String(normalize_gender(g))),
        }
    }
}

/// Trim and lowercase a gender value before it is compared or stored.
pub fn normalize_gender(value: &str) -> String {
    value.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

// --- Status ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyStatus {
    /// Consumed noticeably less than spent.
    Good,
    /// Consumed roughly what was spent.
    Ok,
    /// Consumed more than spent.
    Bad,
}

impl EnergyStatus {
    /// Classify an intake/expenditure ratio. A NaN ratio (nothing spent and
    /// nothing eaten with a zero basal rate) falls through to `Bad`.
    pub fn classify(ratio: f64) -> Self {
        if ratio < OK_CUTOFF {
            Self::Good
        } else if ratio < BAD_CUTOFF {
            Self::Ok
        } else {
            Self::Bad
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Ok => "ok",
            Self::Bad => "bad",
        }
    }
}

impl fmt::Display for EnergyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergySummary {
    pub energy_in_kj: f64,
    pub energy_out_kj: f64,
    pub energy_in_kcal: f64,
    pub energy_out_kcal: f64,
    pub net_kcal: f64,
    pub ratio: f64,
    pub status: EnergyStatus,
}

impl EnergySummary {
    pub fn new(energy_in_kj: f64, energy_out_kj: f64) -> Self {
        let ratio = energy_in_kj / energy_out_kj;
        let energy_in_kcal = kj_to_kcal(energy_in_kj);
        let energy_out_kcal = kj_to_kcal(energy_out_kj);
        Self {
            energy_in_kj,
            energy_out_kj,
            energy_in_kcal,
            energy_out_kcal,
            net_kcal: energy_in_kcal - energy_out_kcal,
            ratio,
            status: EnergyStatus::classify(ratio),
        }
    }
}

/// Totals of one local day's persisted food log against the basal rate.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub entries: Vec<LogEntry>,
    #[serde(flatten)]
    pub energy: EnergySummary,
}

// --- Export / Import ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSetting {
    pub name: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub version: i64,
    pub exported_at: String,
    #[serde(default)]
    pub log: Vec<LogEntry>,
    #[serde(default)]
    pub weight_log: Vec<WeightEntry>,
    #[serde(default)]
    pub settings: Vec<ExportSetting>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub log_entries_imported: i64,
    pub weight_entries_imported: i64,
    pub settings_imported: i64,
}

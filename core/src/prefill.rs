//! Prefill food list: a static JSON array of `[name, kJ per 100g]` pairs used
//! to suggest an energy value from a food name and quantity.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::models::KJ_PER_KCAL;

#[derive(Debug, Clone, PartialEq)]
pub struct PrefillFood {
    pub name: String,
    pub kj_per_100g: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FoodTable {
    foods: Vec<PrefillFood>,
    by_key: HashMap<String, f64>,
}

fn lookup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl FoodTable {
    /// Parse the prefill resource. Returns `None` when the document is not a
    /// non-empty array whose first element is an array starting with a string.
    /// Individual rows that are not `[string, number]` are skipped.
    pub fn from_json(json: &str) -> Option<Self> {
        let data: Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                warn!("prefill data is not valid JSON: {e}");
                return None;
            }
        };

        let rows = data.as_array()?;
        let first_is_named = rows
            .first()
            .and_then(Value::as_array)
            .and_then(|row| row.first())
            .is_some_and(Value::is_string);
        if !first_is_named {
            debug!("prefill data rejected: expected [[name, kJ/100g], ...]");
            return None;
        }

        let mut table = Self::default();
        for row in rows {
            let pair = row.as_array().and_then(|cols| match cols.as_slice() {
                [Value::String(name), Value::Number(kj), ..] => {
                    kj.as_f64().map(|kj| (name.clone(), kj))
                }
                _ => None,
            });
            match pair {
                Some((name, kj_per_100g)) => table.insert(name, kj_per_100g),
                None => debug!(?row, "skipping malformed prefill row"),
            }
        }
        Some(table)
    }

    /// Read the prefill resource from disk. A missing or malformed file gives
    /// an empty table.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|| {
                warn!("ignoring malformed prefill data in {}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no prefill data at {}", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("failed to read prefill data {}: {e}", path.display());
                Self::default()
            }
        }
    }

    fn insert(&mut self, name: String, kj_per_100g: f64) {
        // Later rows win on duplicate names, matching a plain map assignment.
        self.by_key.insert(lookup_key(&name), kj_per_100g);
        self.foods.push(PrefillFood { name, kj_per_100g });
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    /// Foods in file order, names as written in the file.
    pub fn foods(&self) -> &[PrefillFood] {
        &self.foods
    }

    /// kJ per 100g for a food name, ignoring case and surrounding whitespace.
    pub fn multiplier(&self, name: &str) -> Option<f64> {
        let key = lookup_key(name);
        if key.is_empty() {
            return None;
        }
        self.by_key.get(&key).copied()
    }

    /// Suggested kcal for `quantity` grams of `name`, rounded to a whole kcal.
    #[allow(clippy::cast_possible_truncation)]
    pub fn suggest_kcal(&self, name: &str, quantity: f64) -> Option<i64> {
        if quantity.is_nan() {
            return None;
        }
        let multiplier = self.multiplier(name)?;
        Some((multiplier / 100.0 * quantity / KJ_PER_KCAL).round() as i64)
    }

    /// Foods whose name contains `query`, case-insensitively.
    pub fn search(&self, query: &str) -> Vec<&PrefillFood> {
        let needle = lookup_key(query);
        self.foods
            .iter()
            .filter(|f| f.name.to_lowercase().contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[["Apple", 218], ["Banana ", 371], ["White bread", 1100.5]]"#;

    #[test]
    fn test_from_json_valid() {
        let table = FoodTable::from_json(SAMPLE).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.foods()[1].name, "Banana ");
        assert_eq!(table.multiplier("apple"), Some(218.0));
        assert_eq!(table.multiplier("  BANANA"), Some(371.0));
        assert_eq!(table.multiplier("white bread"), Some(1100.5));
        assert_eq!(table.multiplier("pear"), None);
        assert_eq!(table.multiplier("   "), None);
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(FoodTable::from_json("not json").is_none());
        assert!(FoodTable::from_json(r#"{"apple": 218}"#).is_none());
        assert!(FoodTable::from_json("[]").is_none());
        assert!(FoodTable::from_json(r#"["apple", 218]"#).is_none());
        assert!(FoodTable::from_json(r#"[[218, "apple"]]"#).is_none());
    }

    #[test]
    fn test_from_json_skips_bad_rows() {
        let table =
            FoodTable::from_json(r#"[["Apple", 218], [5, 6], ["Pear"], "oops", ["Kiwi", 255]]"#)
                .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.multiplier("kiwi"), Some(255.0));
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let table = FoodTable::from_json(r#"[["Apple", 200], ["apple", 250]]"#).unwrap();
        assert_eq!(table.multiplier("Apple"), Some(250.0));
    }

    #[test]
    fn test_suggest_kcal_rounds() {
        let table = FoodTable::from_json(SAMPLE).unwrap();
        // 218 / 100 * 150 / 4.2 = 77.857...
        assert_eq!(table.suggest_kcal("apple", 150.0), Some(78));
        // 371 / 100 * 120 / 4.2 = 106.0
        assert_eq!(table.suggest_kcal("banana", 120.0), Some(106));
        assert_eq!(table.suggest_kcal("pear", 100.0), None);
        assert_eq!(table.suggest_kcal("apple", f64::NAN), None);
    }

    #[test]
    fn test_search() {
        let table = FoodTable::from_json(SAMPLE).unwrap();
        let hits = table.search("AN");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Banana ");
        assert_eq!(table.search("").len(), 3);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = FoodTable::load(&dir.path().join("food-data.json"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("food-data.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(FoodTable::load(&path).is_empty());

        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(FoodTable::load(&path).len(), 3);
    }
}

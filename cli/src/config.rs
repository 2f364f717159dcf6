use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::ffi::OsString;
use std::path::PathBuf;

const DB_FILE: &str = "calor.db";
const FOODS_FILE: &str = "food-data.json";

pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub foods_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "calor").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Self::resolve(
            data_dir,
            std::env::var_os("CALOR_DB"),
            std::env::var_os("CALOR_FOODS"),
        ))
    }

    /// Derive file paths from the data directory; non-empty overrides win.
    fn resolve(
        data_dir: PathBuf,
        db_override: Option<OsString>,
        foods_override: Option<OsString>,
    ) -> Self {
        let pick = |over: Option<OsString>, file: &str| {
            over.filter(|p| !p.is_empty())
                .map_or_else(|| data_dir.join(file), PathBuf::from)
        };
        let db_path = pick(db_override, DB_FILE);
        let foods_path = pick(foods_override, FOODS_FILE);
        Config {
            data_dir,
            db_path,
            foods_path,
        }
    }
}

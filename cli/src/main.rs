mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, fmt};

use crate::commands::{
    cmd_activity, cmd_export, cmd_food, cmd_foods, cmd_import, cmd_info, cmd_log, cmd_profile_set,
    cmd_profile_show, cmd_summary, cmd_weight_history, cmd_weight_set, cmd_weight_show,
};
use crate::config::Config;
use calor_core::counter::CalorieCounter;
use calor_core::db::LocalStore;
use calor_core::prefill::FoodTable;

#[derive(Parser)]
#[command(
    name = "calor",
    version,
    about = "A small, local-first calorie counter",
    long_about = "Track energy eaten against energy spent.\n\n\
        Data lives in a local SQLite database (override with CALOR_DB). \
        Food suggestions come from food-data.json in the data directory \
        (override with CALOR_FOODS). Set RUST_LOG=debug for diagnostics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log food you ate
    Food {
        /// Food name
        name: String,
        /// Energy amount (omit to use the food list with --quantity)
        amount: Option<f64>,
        /// Quantity in grams
        #[arg(short, long)]
        quantity: Option<f64>,
        /// Unit of the amount: kcal or kj
        #[arg(short, long, default_value = "kcal")]
        unit: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add energy spent on activity (not saved)
    Activity {
        /// Energy amount
        amount: f64,
        /// Unit of the amount: kcal or kj
        #[arg(short, long, default_value = "kcal")]
        unit: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Track body weight
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },
    /// Height, date of birth and gender
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// List logged food between two dates
    Log {
        /// First date to include (YYYY-MM-DD or today/yesterday)
        #[arg(long)]
        since: Option<String>,
        /// Last date to include (YYYY-MM-DD or today/yesterday)
        #[arg(long)]
        until: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one day's food against the basal rate (defaults to today)
    Summary {
        /// Date to show (YYYY-MM-DD, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search the food list
    Foods {
        /// Part of a food name
        #[arg(default_value = "")]
        query: String,
        /// Quantity in grams to suggest kcal for
        #[arg(short, long)]
        quantity: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export all data as JSON (to stdout if no file is given)
    Export {
        /// Output file
        file: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import data from a JSON export
    Import {
        /// Export file to read
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show database location, schema version and record counts
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WeightCommands {
    /// Record today's weight in kg
    Set {
        /// Weight in kg
        value: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the most recent weight
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weight history, newest first
    History {
        /// Number of entries to show (default: all)
        #[arg(short, long)]
        limit: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Update profile fields
    Set {
        /// Height in cm
        #[arg(long)]
        height: Option<f64>,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: Option<String>,
        /// Gender
        #[arg(long)]
        gender: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let foods = FoodTable::load(&config.foods_path);
    let mut counter = CalorieCounter::load(LocalStore::open(&config.db_path));

    match cli.command {
        Commands::Food {
            name,
            amount,
            quantity,
            unit,
            json,
        } => cmd_food(&mut counter, &foods, &name, amount, quantity, &unit, json),
        Commands::Activity { amount, unit, json } => {
            cmd_activity(&mut counter, amount, &unit, json)
        }
        Commands::Weight { command } => match command {
            WeightCommands::Set { value, json } => cmd_weight_set(&mut counter, value, json),
            WeightCommands::Show { json } => cmd_weight_show(&counter, json),
            WeightCommands::History { limit, json } => {
                cmd_weight_history(counter.store(), limit, json)
            }
        },
        Commands::Profile { command } => match command {
            ProfileCommands::Set {
                height,
                dob,
                gender,
                json,
            } => cmd_profile_set(
                &mut counter,
                height,
                dob.as_deref(),
                gender.as_deref(),
                json,
            ),
            ProfileCommands::Show { json } => cmd_profile_show(&counter, json),
        },
        Commands::Log { since, until, json } => cmd_log(&counter, since, until, json),
        Commands::Summary { date, json } => cmd_summary(&counter, date, json),
        Commands::Foods {
            query,
            quantity,
            json,
        } => cmd_foods(&foods, &query, quantity, json),
        Commands::Export { file, json } => cmd_export(counter.store(), file.as_deref(), json),
        Commands::Import { file, json } => cmd_import(counter.store(), &file, json),
        Commands::Info { json } => cmd_info(
            counter.store(),
            &config.data_dir,
            &config.foods_path,
            foods.len(),
            json,
        ),
    }
}

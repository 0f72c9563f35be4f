use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tax_data::RateTableLoader;
use tax_db_sqlite::SqliteRepository;
use tracing_subscriber::EnvFilter;

/// Load per-year Irish rate tables from a CSV file into the database.
///
/// The CSV file should have the following columns:
/// - tax_year: The tax year (e.g., 2024)
/// - standard_rate_cutoff: Income taxed at the standard rate
/// - standard_rate, higher_rate: Income tax rates as fractions (e.g., 0.20)
/// - usc_exemption_threshold: Gross income at or below which no USC is due
/// - usc_reduced_band_ceiling: Top of the reduced USC band
/// - usc_reduced_rate, usc_higher_rate: USC rates as fractions
/// - prsi_threshold: Gross income above which PRSI applies
/// - prsi_rate: PRSI rate as a fraction
#[derive(Parser, Debug)]
#[command(name = "tax-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing rate table data
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database URL (the file is created if missing)
    #[arg(short, long, default_value = "sqlite:irish-tax.db")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();

    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    println!("Loading rate tables from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = RateTableLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let loaded = RateTableLoader::load(&repo, &records)
        .await
        .context("Failed to load rate tables into database")?;

    println!("Successfully loaded {} rate tables into the database.", loaded);

    Ok(())
}

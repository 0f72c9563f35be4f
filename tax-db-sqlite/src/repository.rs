use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tax_core::db::DbConfig;
use tax_core::{NewTaxReturn, RateTable, RepositoryError, TaxRepository, TaxReturn};
use tracing::{debug, info, warn};

use crate::decimal::{decimal_to_text, get_decimal};

/// Environment variable naming the seeds directory when the config does not.
pub const SEEDS_DIR_ENV: &str = "IRISH_TAX_SEEDS_DIR";

const RATE_TABLE_COLUMNS: &str = "tax_year, standard_rate_cutoff, standard_rate, higher_rate,
        usc_exemption_threshold, usc_reduced_band_ceiling, usc_reduced_rate, usc_higher_rate,
        prsi_threshold, prsi_rate";

const TAX_RETURN_COLUMNS: &str =
    "id, owner_id, income, deductions, tax_credits, year, created_at, updated_at";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connects to `database_url`, creating the database file if it does not
    /// exist yet.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database url: {}", database_url))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        debug!(url = database_url, "connected to database");
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects, migrates, and seeds the store described by `config`.
    pub async fn open(config: &DbConfig) -> Result<Self> {
        let repo = Self::new(&config.url).await?;
        repo.run_migrations().await?;

        match seeds_dir(config.seeds_dir.as_deref()) {
            Some(dir) => repo.run_seeds(&dir).await?,
            None => warn!("No seeds directory found; rate tables were not seeded"),
        }

        info!(url = %config.url, "database ready");
        Ok(repo)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "seed file applied");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Picks the seeds directory.
///
/// An explicitly configured directory (config, then environment) is always
/// returned so a typo surfaces as an error. Otherwise `./seeds` and this
/// crate's own `seeds/` are tried, and `None` means neither exists.
fn seeds_dir(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = configured {
        return Some(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(SEEDS_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }

    [
        PathBuf::from("seeds"),
        Path::new(env!("CARGO_MANIFEST_DIR")).join("seeds"),
    ]
    .into_iter()
    .find(|candidate| candidate.is_dir())
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn row_to_rate_table(row: &SqliteRow) -> Result<RateTable, RepositoryError> {
    Ok(RateTable {
        tax_year: row.try_get("tax_year").map_err(db_error)?,
        standard_rate_cutoff: get_decimal(row, "standard_rate_cutoff")?,
        standard_rate: get_decimal(row, "standard_rate")?,
        higher_rate: get_decimal(row, "higher_rate")?,
        usc_exemption_threshold: get_decimal(row, "usc_exemption_threshold")?,
        usc_reduced_band_ceiling: get_decimal(row, "usc_reduced_band_ceiling")?,
        usc_reduced_rate: get_decimal(row, "usc_reduced_rate")?,
        usc_higher_rate: get_decimal(row, "usc_higher_rate")?,
        prsi_threshold: get_decimal(row, "prsi_threshold")?,
        prsi_rate: get_decimal(row, "prsi_rate")?,
    })
}

fn row_to_tax_return(row: &SqliteRow) -> Result<TaxReturn, RepositoryError> {
    Ok(TaxReturn {
        id: row.try_get("id").map_err(db_error)?,
        owner_id: row.try_get("owner_id").map_err(db_error)?,
        income: get_decimal(row, "income")?,
        deductions: get_decimal(row, "deductions")?,
        tax_credits: get_decimal(row, "tax_credits")?,
        year: row.try_get("year").map_err(db_error)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get updated_at: {}", e)))?,
    })
}

#[async_trait]
impl TaxRepository for SqliteRepository {
    async fn get_rate_table(
        &self,
        tax_year: i32,
    ) -> Result<RateTable, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {RATE_TABLE_COLUMNS} FROM rate_table WHERE tax_year = ?"
        ))
        .bind(tax_year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_rate_table(&row)
    }

    async fn list_rate_tables(&self) -> Result<Vec<RateTable>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {RATE_TABLE_COLUMNS} FROM rate_table ORDER BY tax_year"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_rate_table).collect()
    }

    async fn upsert_rate_table(
        &self,
        table: &RateTable,
    ) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT OR REPLACE INTO rate_table ({RATE_TABLE_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(table.tax_year)
        .bind(decimal_to_text(table.standard_rate_cutoff))
        .bind(decimal_to_text(table.standard_rate))
        .bind(decimal_to_text(table.higher_rate))
        .bind(decimal_to_text(table.usc_exemption_threshold))
        .bind(decimal_to_text(table.usc_reduced_band_ceiling))
        .bind(decimal_to_text(table.usc_reduced_rate))
        .bind(decimal_to_text(table.usc_higher_rate))
        .bind(decimal_to_text(table.prsi_threshold))
        .bind(decimal_to_text(table.prsi_rate))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        debug!(tax_year = table.tax_year, "rate table stored");
        Ok(())
    }

    async fn create_return(
        &self,
        tax_return: NewTaxReturn,
    ) -> Result<TaxReturn, RepositoryError> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO tax_return (
                owner_id, income, deductions, tax_credits, year, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&tax_return.owner_id)
        .bind(decimal_to_text(tax_return.income))
        .bind(decimal_to_text(tax_return.deductions))
        .bind(decimal_to_text(tax_return.tax_credits))
        .bind(tax_return.year)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        let id = result.last_insert_rowid();
        self.get_return(id).await
    }

    async fn get_return(
        &self,
        id: i64,
    ) -> Result<TaxReturn, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {TAX_RETURN_COLUMNS} FROM tax_return WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_tax_return(&row)
    }

    async fn update_return(
        &self,
        tax_return: &TaxReturn,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE tax_return SET
                owner_id = ?, income = ?, deductions = ?, tax_credits = ?, year = ?,
                updated_at = ?
             WHERE id = ?",
        )
        .bind(&tax_return.owner_id)
        .bind(decimal_to_text(tax_return.income))
        .bind(decimal_to_text(tax_return.deductions))
        .bind(decimal_to_text(tax_return.tax_credits))
        .bind(tax_return.year)
        .bind(now)
        .bind(tax_return.id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_return(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_return WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_returns_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<TaxReturn>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {TAX_RETURN_COLUMNS} FROM tax_return
             WHERE owner_id = ?
             ORDER BY year DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_tax_return).collect()
    }
}

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewTaxReturn, RateTable, TaxReturn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait TaxRepository: Send + Sync {
    // Rate tables
    async fn get_rate_table(
        &self,
        tax_year: i32,
    ) -> Result<RateTable, RepositoryError>;

    /// All stored tables, oldest year first.
    async fn list_rate_tables(&self) -> Result<Vec<RateTable>, RepositoryError>;

    /// Inserts the table, replacing any existing table for the same year.
    async fn upsert_rate_table(
        &self,
        table: &RateTable,
    ) -> Result<(), RepositoryError>;

    // Tax returns
    async fn create_return(
        &self,
        tax_return: NewTaxReturn,
    ) -> Result<TaxReturn, RepositoryError>;

    async fn get_return(
        &self,
        id: i64,
    ) -> Result<TaxReturn, RepositoryError>;

    async fn update_return(
        &self,
        tax_return: &TaxReturn,
    ) -> Result<(), RepositoryError>;

    async fn delete_return(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError>;

    /// Returns owned by `owner_id`, most recent tax year first.
    async fn list_returns_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<TaxReturn>, RepositoryError>;
}

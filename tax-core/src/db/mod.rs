pub mod config;
pub mod repository;

pub use config::DbConfig;
pub use repository::{RepositoryError, TaxRepository};

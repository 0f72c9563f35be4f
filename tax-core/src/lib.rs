pub mod access;
pub mod calculations;
pub mod db;
pub mod deadlines;
pub mod input;
pub mod models;
pub mod returns;

pub use calculations::{LiabilityCalculator, RateSchedule, compute};
pub use db::repository::{RepositoryError, TaxRepository};
pub use models::*;

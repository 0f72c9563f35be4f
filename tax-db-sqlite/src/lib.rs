pub mod decimal;
pub mod repository;

pub use repository::{SEEDS_DIR_ENV, SqliteRepository};

use std::collections::HashSet;
use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;
use tax_core::{RateTable, RepositoryError, TaxRepository};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when loading rate table data.
#[derive(Debug, Error)]
pub enum RateTableLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Tax year {0} appears more than once")]
    DuplicateYear(i32),

    #[error("Tax year {tax_year}: {field} must be between 0 and 1, got {value}")]
    RateOutOfRange {
        tax_year: i32,
        field: &'static str,
        value: Decimal,
    },

    #[error("Tax year {tax_year}: {field} must not be negative, got {value}")]
    NegativeThreshold {
        tax_year: i32,
        field: &'static str,
        value: Decimal,
    },

    #[error(
        "Tax year {tax_year}: USC reduced band ceiling {ceiling} is below the exemption threshold {threshold}"
    )]
    UscBandInverted {
        tax_year: i32,
        threshold: Decimal,
        ceiling: Decimal,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for RateTableLoaderError {
    fn from(err: csv::Error) -> Self {
        RateTableLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the rate tables CSV file.
///
/// One row per tax year. Rates are fractions (`0.20` for 20%), thresholds
/// and band limits are euro amounts.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RateTableRecord {
    pub tax_year: i32,
    pub standard_rate_cutoff: Decimal,
    pub standard_rate: Decimal,
    pub higher_rate: Decimal,
    pub usc_exemption_threshold: Decimal,
    pub usc_reduced_band_ceiling: Decimal,
    pub usc_reduced_rate: Decimal,
    pub usc_higher_rate: Decimal,
    pub prsi_threshold: Decimal,
    pub prsi_rate: Decimal,
}

impl RateTableRecord {
    fn rates(&self) -> [(&'static str, Decimal); 5] {
        [
            ("standard_rate", self.standard_rate),
            ("higher_rate", self.higher_rate),
            ("usc_reduced_rate", self.usc_reduced_rate),
            ("usc_higher_rate", self.usc_higher_rate),
            ("prsi_rate", self.prsi_rate),
        ]
    }

    fn thresholds(&self) -> [(&'static str, Decimal); 4] {
        [
            ("standard_rate_cutoff", self.standard_rate_cutoff),
            ("usc_exemption_threshold", self.usc_exemption_threshold),
            ("usc_reduced_band_ceiling", self.usc_reduced_band_ceiling),
            ("prsi_threshold", self.prsi_threshold),
        ]
    }
}

impl From<&RateTableRecord> for RateTable {
    fn from(record: &RateTableRecord) -> Self {
        RateTable {
            tax_year: record.tax_year,
            standard_rate_cutoff: record.standard_rate_cutoff,
            standard_rate: record.standard_rate,
            higher_rate: record.higher_rate,
            usc_exemption_threshold: record.usc_exemption_threshold,
            usc_reduced_band_ceiling: record.usc_reduced_band_ceiling,
            usc_reduced_rate: record.usc_reduced_rate,
            usc_higher_rate: record.usc_higher_rate,
            prsi_threshold: record.prsi_threshold,
            prsi_rate: record.prsi_rate,
        }
    }
}

/// Loader for per-year rate tables from CSV files.
///
/// This loader reads CSV data and stores it via the `TaxRepository` trait,
/// allowing it to work with any database backend.
pub struct RateTableLoader;

impl RateTableLoader {
    /// Parse rate table records from a CSV reader.
    ///
    /// The reader can be any type that implements `Read`, such as a file or
    /// a string slice.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<RateTableRecord>, RateTableLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: RateTableRecord = result?;
            records.push(record);
        }

        debug!(count = records.len(), "parsed rate table records");
        Ok(records)
    }

    /// Check records before anything is written.
    ///
    /// Rejects a year listed twice, any rate outside `[0, 1]`, any negative
    /// threshold, and a USC reduced band whose ceiling sits below the
    /// exemption threshold.
    pub fn validate(records: &[RateTableRecord]) -> Result<(), RateTableLoaderError> {
        let mut seen = HashSet::new();

        for record in records {
            let tax_year = record.tax_year;
            if !seen.insert(tax_year) {
                return Err(RateTableLoaderError::DuplicateYear(tax_year));
            }

            if let Some((field, value)) = record
                .rates()
                .into_iter()
                .find(|(_, rate)| *rate < Decimal::ZERO || *rate > Decimal::ONE)
            {
                return Err(RateTableLoaderError::RateOutOfRange {
                    tax_year,
                    field,
                    value,
                });
            }

            if let Some((field, value)) = record
                .thresholds()
                .into_iter()
                .find(|(_, amount)| *amount < Decimal::ZERO)
            {
                return Err(RateTableLoaderError::NegativeThreshold {
                    tax_year,
                    field,
                    value,
                });
            }

            if record.usc_reduced_band_ceiling < record.usc_exemption_threshold {
                return Err(RateTableLoaderError::UscBandInverted {
                    tax_year,
                    threshold: record.usc_exemption_threshold,
                    ceiling: record.usc_reduced_band_ceiling,
                });
            }
        }

        Ok(())
    }

    /// Validate the records, then store one rate table per record.
    ///
    /// Existing tables for the same year are replaced, so loading the same
    /// file twice leaves the store unchanged. Nothing is written when
    /// validation fails. Writes are not atomic: if the repository fails
    /// partway, the years stored before the failure remain, and loading the
    /// file again completes the set.
    pub async fn load<R: TaxRepository + ?Sized>(
        repo: &R,
        records: &[RateTableRecord],
    ) -> Result<usize, RateTableLoaderError> {
        Self::validate(records)?;

        for record in records {
            repo.upsert_rate_table(&RateTable::from(record)).await?;
            debug!(tax_year = record.tax_year, "rate table loaded");
        }

        info!(count = records.len(), "rate tables loaded");
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const HEADER: &str = "tax_year,standard_rate_cutoff,standard_rate,higher_rate,usc_exemption_threshold,usc_reduced_band_ceiling,usc_reduced_rate,usc_higher_rate,prsi_threshold,prsi_rate";

    fn csv_with(rows: &[&str]) -> String {
        let mut csv = HEADER.to_string();
        for row in rows {
            csv.push('\n');
            csv.push_str(row);
        }
        csv
    }

    fn record_2023() -> RateTableRecord {
        RateTableRecord {
            tax_year: 2023,
            standard_rate_cutoff: dec!(36800),
            standard_rate: dec!(0.20),
            higher_rate: dec!(0.40),
            usc_exemption_threshold: dec!(13000),
            usc_reduced_band_ceiling: dec!(22920),
            usc_reduced_rate: dec!(0.02),
            usc_higher_rate: dec!(0.045),
            prsi_threshold: dec!(18304),
            prsi_rate: dec!(0.04),
        }
    }

    // =========================================================================
    // parse tests
    // =========================================================================

    #[test]
    fn test_parse_csv_single_year() {
        let csv = csv_with(&["2023,36800,0.20,0.40,13000,22920,0.02,0.045,18304,0.04"]);

        let records = RateTableLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records, vec![record_2023()]);
    }

    #[test]
    fn test_parse_csv_tolerates_padding() {
        let csv = csv_with(&["2023, 36800, 0.20, 0.40, 13000, 22920, 0.02, 0.045, 18304, 0.04"]);

        let records = RateTableLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records, vec![record_2023()]);
    }

    #[test]
    fn test_parse_csv_converts_to_rate_table() {
        let csv = csv_with(&["2023,36800,0.20,0.40,13000,22920,0.02,0.045,18304,0.04"]);

        let records = RateTableLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(RateTable::from(&records[0]), RateTable::irish_2023());
    }

    #[test]
    fn test_parse_invalid_csv_missing_column() {
        let csv = "tax_year,standard_rate_cutoff\n2023,36800";

        let result = RateTableLoader::parse(csv.as_bytes());

        let err = result.expect_err("Should fail for missing column");
        let RateTableLoaderError::CsvParse(msg) = err else {
            panic!("Expected CsvParse error, got: {:?}", err);
        };
        assert!(
            msg.contains("missing field"),
            "Expected 'missing field' in error, got: {}",
            msg
        );
    }

    #[test]
    fn test_parse_invalid_csv_bad_decimal() {
        let csv = csv_with(&["2023,lots,0.20,0.40,13000,22920,0.02,0.045,18304,0.04"]);

        let result = RateTableLoader::parse(csv.as_bytes());

        assert!(matches!(result, Err(RateTableLoaderError::CsvParse(_))));
    }

    // =========================================================================
    // validate tests
    // =========================================================================

    #[test]
    fn test_validate_accepts_well_formed_records() {
        let mut record_2024 = record_2023();
        record_2024.tax_year = 2024;

        assert!(RateTableLoader::validate(&[record_2023(), record_2024]).is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_year() {
        let result = RateTableLoader::validate(&[record_2023(), record_2023()]);

        assert!(matches!(
            result,
            Err(RateTableLoaderError::DuplicateYear(2023))
        ));
    }

    #[test]
    fn test_validate_rejects_rate_above_one() {
        let mut record = record_2023();
        record.higher_rate = dec!(40);

        let err = RateTableLoader::validate(&[record]).expect_err("percent instead of fraction");

        assert_eq!(
            err.to_string(),
            "Tax year 2023: higher_rate must be between 0 and 1, got 40"
        );
    }

    #[test]
    fn test_validate_rejects_negative_rate() {
        let mut record = record_2023();
        record.prsi_rate = dec!(-0.04);

        assert!(matches!(
            RateTableLoader::validate(&[record]),
            Err(RateTableLoaderError::RateOutOfRange {
                field: "prsi_rate",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_negative_threshold() {
        let mut record = record_2023();
        record.prsi_threshold = dec!(-1);

        assert!(matches!(
            RateTableLoader::validate(&[record]),
            Err(RateTableLoaderError::NegativeThreshold {
                tax_year: 2023,
                field: "prsi_threshold",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_usc_band() {
        let mut record = record_2023();
        record.usc_reduced_band_ceiling = dec!(12000);

        assert!(matches!(
            RateTableLoader::validate(&[record]),
            Err(RateTableLoaderError::UscBandInverted { tax_year: 2023, .. })
        ));
    }

    #[test]
    fn test_validate_allows_zero_width_usc_band() {
        let mut record = record_2023();
        record.usc_reduced_band_ceiling = record.usc_exemption_threshold;

        assert!(RateTableLoader::validate(&[record]).is_ok());
    }
}

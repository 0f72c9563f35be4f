use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Income tax bands and levy thresholds for a single tax year.
///
/// Rates are fractions (`0.20` means 20%). Thresholds are euro amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    pub tax_year: i32,

    // Income tax bands
    pub standard_rate_cutoff: Decimal,
    pub standard_rate: Decimal,
    pub higher_rate: Decimal,

    // Universal Social Charge, assessed on gross income
    pub usc_exemption_threshold: Decimal,
    pub usc_reduced_band_ceiling: Decimal,
    pub usc_reduced_rate: Decimal,
    pub usc_higher_rate: Decimal,

    // Pay Related Social Insurance, assessed on gross income
    pub prsi_threshold: Decimal,
    pub prsi_rate: Decimal,
}

impl RateTable {
    /// The 2023 single-person table.
    pub fn irish_2023() -> Self {
        Self {
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
}

fn percent(rate: Decimal) -> Decimal {
    (rate * Decimal::ONE_HUNDRED).normalize()
}

impl fmt::Display for RateTable {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Rate table for {}", self.tax_year)?;
        writeln!(
            f,
            "  Income tax   {}% up to {}, {}% above",
            percent(self.standard_rate),
            self.standard_rate_cutoff.normalize(),
            percent(self.higher_rate)
        )?;
        writeln!(
            f,
            "  USC          none up to {}, {}% up to {}, {}% above",
            self.usc_exemption_threshold.normalize(),
            percent(self.usc_reduced_rate),
            self.usc_reduced_band_ceiling.normalize(),
            percent(self.usc_higher_rate)
        )?;
        write!(
            f,
            "  PRSI         {}% of gross income above {}",
            percent(self.prsi_rate),
            self.prsi_threshold.normalize()
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::RateTable;

    #[test]
    fn display_summarises_2023_table() {
        assert_eq!(
            RateTable::irish_2023().to_string(),
            "Rate table for 2023\n\
             \x20 Income tax   20% up to 36800, 40% above\n\
             \x20 USC          none up to 13000, 2% up to 22920, 4.5% above\n\
             \x20 PRSI         4% of gross income above 18304"
        );
    }
}

//! Income tax, USC and PRSI liability for a single taxpayer.
//!
//! # Calculation steps
//!
//! | Step | Quantity | Rule |
//! |------|----------|------|
//! | 1 | Taxable income | gross income − deductions, minimum 0 |
//! | 2 | Tax at standard rate | taxable income up to the cutoff × standard rate |
//! | 3 | Tax at higher rate | taxable income above the cutoff × higher rate |
//! | 4 | Gross tax | step 2 + step 3 |
//! | 5 | Net tax | gross tax − tax credits, minimum 0 |
//! | 6 | USC | tiered on **gross** income, nothing at or below the exemption threshold |
//! | 7 | PRSI | flat rate on all gross income once above the threshold |
//! | 8 | Total tax liability | step 5 + step 6 + step 7 |
//! | 9 | Net income | gross income − step 8 |
//! | 10 | Effective tax rate | step 8 ÷ gross income × 100, or 0 for no income |
//!
//! USC and PRSI are cliffs, not marginal bands: crossing a threshold by one
//! euro charges the levy on the whole gross income.
//!
//! Every quantity is kept at full decimal precision. Rounding happens only
//! when a [`TaxLiability`] is rendered.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::{LiabilityCalculator, RateTable, TaxInput};
//!
//! let rates = RateTable::irish_2023();
//! let input = TaxInput::new(dec!(50000), dec!(5000), dec!(3500));
//!
//! let liability = LiabilityCalculator::new(&rates).calculate(&input);
//!
//! assert_eq!(liability.taxable_income, dec!(45000));
//! assert_eq!(liability.net_tax, dec!(7140));
//! assert_eq!(liability.total_tax_liability, dec!(10817));
//! assert_eq!(liability.effective_tax_rate_display(), "21.63");
//! ```

use rust_decimal::Decimal;

use crate::calculations::common::non_negative;
use crate::calculations::schedule::RateSchedule;
use crate::{RateTable, TaxInput, TaxLiability};

/// Calculator bound to one year's rate table.
///
/// Holds no mutable state; one instance may be shared across threads.
#[derive(Debug, Clone, Copy)]
pub struct LiabilityCalculator<'a> {
    rates: &'a RateTable,
}

impl<'a> LiabilityCalculator<'a> {
    pub fn new(rates: &'a RateTable) -> Self {
        Self { rates }
    }

    /// Produces the full breakdown for `input`.
    ///
    /// Total over its domain: amounts are clamped to zero rather than
    /// rejected, so there is no error path.
    pub fn calculate(
        &self,
        input: &TaxInput,
    ) -> TaxLiability {
        let gross_income = non_negative(input.gross_income);
        let tax_credits = non_negative(input.tax_credits);

        let taxable_income = self.taxable_income(gross_income, non_negative(input.deductions));
        let (tax_at_standard_rate, tax_at_higher_rate) = self.banded_tax(taxable_income);
        let gross_tax = tax_at_standard_rate + tax_at_higher_rate;
        let net_tax = self.net_tax(gross_tax, tax_credits);

        let usc = self.universal_social_charge(gross_income);
        let prsi = self.social_insurance(gross_income);

        let total_tax_liability = net_tax + usc + prsi;
        let net_income = gross_income - total_tax_liability;
        let effective_tax_rate = self.effective_rate(total_tax_liability, gross_income);

        TaxLiability {
            tax_year: self.rates.tax_year,
            gross_income,
            taxable_income,
            tax_at_standard_rate,
            tax_at_higher_rate,
            gross_tax,
            tax_credits,
            net_tax,
            usc,
            prsi,
            total_tax_liability,
            net_income,
            effective_tax_rate,
        }
    }

    fn taxable_income(
        &self,
        gross_income: Decimal,
        deductions: Decimal,
    ) -> Decimal {
        non_negative(gross_income - deductions)
    }

    /// Splits tax between the standard and higher bands.
    fn banded_tax(
        &self,
        taxable_income: Decimal,
    ) -> (Decimal, Decimal) {
        let cutoff = self.rates.standard_rate_cutoff;

        if taxable_income <= cutoff {
            (taxable_income * self.rates.standard_rate, Decimal::ZERO)
        } else {
            (
                cutoff * self.rates.standard_rate,
                (taxable_income - cutoff) * self.rates.higher_rate,
            )
        }
    }

    fn net_tax(
        &self,
        gross_tax: Decimal,
        tax_credits: Decimal,
    ) -> Decimal {
        non_negative(gross_tax - tax_credits)
    }

    fn universal_social_charge(
        &self,
        gross_income: Decimal,
    ) -> Decimal {
        let rates = self.rates;

        if gross_income <= rates.usc_exemption_threshold {
            Decimal::ZERO
        } else if gross_income <= rates.usc_reduced_band_ceiling {
            gross_income * rates.usc_reduced_rate
        } else {
            rates.usc_reduced_band_ceiling * rates.usc_reduced_rate
                + (gross_income - rates.usc_reduced_band_ceiling) * rates.usc_higher_rate
        }
    }

    fn social_insurance(
        &self,
        gross_income: Decimal,
    ) -> Decimal {
        if gross_income > self.rates.prsi_threshold {
            gross_income * self.rates.prsi_rate
        } else {
            Decimal::ZERO
        }
    }

    fn effective_rate(
        &self,
        total_tax_liability: Decimal,
        gross_income: Decimal,
    ) -> Decimal {
        // Divide first; `total * 100` overflows near `Decimal::MAX`.
        if gross_income > Decimal::ZERO {
            total_tax_liability / gross_income * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        }
    }
}

/// Computes liability with the most recent built-in rate table.
pub fn compute(
    gross_income: Decimal,
    deductions: Decimal,
    tax_credits: Decimal,
) -> TaxLiability {
    let schedule = RateSchedule::builtin();
    let input = TaxInput::new(gross_income, deductions, tax_credits);

    LiabilityCalculator::new(schedule.rates_for(None)).calculate(&input)
}

/// Computes liability for `input`, selecting rates by its year.
pub fn compute_with(
    schedule: &RateSchedule,
    input: &TaxInput,
) -> TaxLiability {
    LiabilityCalculator::new(schedule.rates_for(input.year)).calculate(input)
}

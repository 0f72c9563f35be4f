use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Normalized engine input.
///
/// Amounts are never negative once they reach this type; the boundary
/// parsers in [`crate::input`] coerce anything else to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxInput {
    pub gross_income: Decimal,
    pub deductions: Decimal,
    pub tax_credits: Decimal,
    /// Selects the rate table. `None` means the most recent known year.
    pub year: Option<i32>,
}

impl TaxInput {
    pub fn new(
        gross_income: Decimal,
        deductions: Decimal,
        tax_credits: Decimal,
    ) -> Self {
        Self {
            gross_income: gross_income.max(Decimal::ZERO),
            deductions: deductions.max(Decimal::ZERO),
            tax_credits: tax_credits.max(Decimal::ZERO),
            year: None,
        }
    }

    pub fn with_year(
        mut self,
        year: Option<i32>,
    ) -> Self {
        self.year = year;
        self
    }
}

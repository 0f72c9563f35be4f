use std::fmt;

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::calculations::common::format_two_places;

/// Breakdown produced by the liability calculator.
///
/// Serializes to the camelCase JSON shape existing callers consume: every
/// amount is a JSON number and `effectiveTaxRate` is a string with exactly
/// two decimal places. The rate itself is kept at full precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxLiability {
    /// Year of the rate table that produced this breakdown.
    #[serde(skip)]
    pub tax_year: i32,

    #[serde(with = "rust_decimal::serde::float")]
    pub gross_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub taxable_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_at_standard_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_at_higher_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gross_tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_credits: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub usc: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub prsi: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_tax_liability: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_income: Decimal,
    #[serde(serialize_with = "serialize_percentage")]
    pub effective_tax_rate: Decimal,
}

impl TaxLiability {
    /// Effective rate as shown to users, e.g. `"21.63"`.
    pub fn effective_tax_rate_display(&self) -> String {
        format_two_places(self.effective_tax_rate)
    }
}

fn serialize_percentage<S>(
    value: &Decimal,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_two_places(*value))
}

impl fmt::Display for TaxLiability {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let rows = [
            ("Gross income", self.gross_income),
            ("Taxable income", self.taxable_income),
            ("Tax at standard rate", self.tax_at_standard_rate),
            ("Tax at higher rate", self.tax_at_higher_rate),
            ("Gross tax", self.gross_tax),
            ("Tax credits", self.tax_credits),
            ("Net tax", self.net_tax),
            ("USC", self.usc),
            ("PRSI", self.prsi),
            ("Total tax liability", self.total_tax_liability),
            ("Net income", self.net_income),
        ];

        writeln!(f, "Tax liability ({} rates)", self.tax_year)?;
        for (label, amount) in rows {
            writeln!(f, "  {label:<22}{:>14}", format_two_places(amount))?;
        }
        write!(
            f,
            "  {:<22}{:>13}%",
            "Effective tax rate",
            self.effective_tax_rate_display()
        )
    }
}

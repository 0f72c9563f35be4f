//! Lenient request parsing.
//!
//! Callers hand over whatever arrived on the wire (query-string text, JSON
//! values, missing fields). Anything that is not a non-negative number
//! becomes zero here, so the calculator only ever sees clean amounts.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::TaxInput;

/// Parses `text` as an amount, falling back to zero.
///
/// Accepts plain decimals (`"1234.5"`) and scientific notation (`"1.5e4"`)
/// with surrounding whitespace. Empty, malformed, or negative input yields
/// zero.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
/// use tax_core::input::parse_number_or_zero;
///
/// assert_eq!(parse_number_or_zero(" 50000 "), dec!(50000));
/// assert_eq!(parse_number_or_zero("2.5e3"), dec!(2500));
/// assert_eq!(parse_number_or_zero("abc"), Decimal::ZERO);
/// assert_eq!(parse_number_or_zero("-10"), Decimal::ZERO);
/// ```
pub fn parse_number_or_zero(text: &str) -> Decimal {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    let parsed = Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed));
    match parsed {
        Ok(value) if value >= Decimal::ZERO => value,
        Ok(value) => {
            debug!(input = %text, %value, "negative amount treated as zero");
            Decimal::ZERO
        }
        Err(error) => {
            debug!(input = %text, %error, "non-numeric amount treated as zero");
            Decimal::ZERO
        }
    }
}

/// Interprets a JSON value as an amount, falling back to zero.
///
/// Numbers and numeric strings are parsed, `true` counts as one, and every
/// other value (null, `false`, arrays, objects) is zero.
pub fn value_or_zero(value: &Value) -> Decimal {
    match value {
        Value::Number(number) => parse_number_or_zero(&number.to_string()),
        Value::String(text) => parse_number_or_zero(text),
        Value::Bool(true) => Decimal::ONE,
        Value::Null | Value::Bool(false) => Decimal::ZERO,
        Value::Array(_) | Value::Object(_) => {
            debug!(input = %value, "structured value treated as zero");
            Decimal::ZERO
        }
    }
}

/// Parses a tax year. Anything that is not an integer means "no year".
pub fn parse_year(text: &str) -> Option<i32> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<i32>() {
        Ok(year) => Some(year),
        Err(error) => {
            debug!(input = %text, %error, "unparseable tax year ignored");
            None
        }
    }
}

fn value_to_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number.as_i64().and_then(|year| i32::try_from(year).ok()),
        Value::String(text) => parse_year(text),
        _ => None,
    }
}

/// Request body as received: `{ income, deductions, taxCredits, year }`,
/// each field optional and of any JSON type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTaxInput {
    #[serde(default)]
    pub income: Value,
    #[serde(default)]
    pub deductions: Value,
    #[serde(default)]
    pub tax_credits: Value,
    #[serde(default)]
    pub year: Value,
}

impl RawTaxInput {
    /// Parses a JSON request body.
    ///
    /// Only a malformed body fails; bad field values are coerced, not
    /// rejected.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn normalize(&self) -> TaxInput {
        TaxInput::new(
            value_or_zero(&self.income),
            value_or_zero(&self.deductions),
            value_or_zero(&self.tax_credits),
        )
        .with_year(value_to_year(&self.year))
    }
}

impl From<RawTaxInput> for TaxInput {
    fn from(raw: RawTaxInput) -> Self {
        raw.normalize()
    }
}

impl TaxInput {
    /// Builds an input from query-string style text fields.
    pub fn from_text_fields(
        income: Option<&str>,
        deductions: Option<&str>,
        tax_credits: Option<&str>,
        year: Option<&str>,
    ) -> Self {
        let amount = |field: Option<&str>| field.map(parse_number_or_zero).unwrap_or_default();

        TaxInput::new(amount(income), amount(deductions), amount(tax_credits))
            .with_year(year.and_then(parse_year))
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::TaxInput;

/// A saved tax return owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxReturn {
    pub id: i64,
    pub owner_id: String,
    pub income: Decimal,
    pub deductions: Decimal,
    pub tax_credits: Decimal,
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaxReturn {
    /// Engine input for this return, with the return's year selecting rates.
    pub fn to_input(&self) -> TaxInput {
        TaxInput::new(self.income, self.deductions, self.tax_credits).with_year(Some(self.year))
    }

    /// Overwrites the user-editable fields, leaving identity and timestamps.
    pub fn apply(
        &mut self,
        fields: TaxReturnFields,
    ) {
        self.income = fields.income;
        self.deductions = fields.deductions;
        self.tax_credits = fields.tax_credits;
        self.year = fields.year;
    }
}

/// For creating new returns (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxReturn {
    pub owner_id: String,
    pub income: Decimal,
    pub deductions: Decimal,
    pub tax_credits: Decimal,
    pub year: i32,
}

/// The user-editable part of a return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxReturnFields {
    pub income: Decimal,
    #[serde(default)]
    pub deductions: Decimal,
    #[serde(default)]
    pub tax_credits: Decimal,
    pub year: i32,
}

impl TaxReturnFields {
    pub fn into_new_return(
        self,
        owner_id: impl Into<String>,
    ) -> NewTaxReturn {
        NewTaxReturn {
            owner_id: owner_id.into(),
            income: self.income,
            deductions: self.deductions,
            tax_credits: self.tax_credits,
            year: self.year,
        }
    }
}

mod filing_deadline;
mod rate_table;
mod tax_input;
mod tax_liability;
mod tax_return;

pub use filing_deadline::FilingDeadline;
pub use rate_table::RateTable;
pub use tax_input::TaxInput;
pub use tax_liability::TaxLiability;
pub use tax_return::{NewTaxReturn, TaxReturn, TaxReturnFields};

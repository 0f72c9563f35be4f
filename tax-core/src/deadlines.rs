//! Filing calendar.

use chrono::NaiveDate;

use crate::FilingDeadline;

/// (years after the tax year, month, day, description)
const CALENDAR: [(i32, u32, u32, &str); 3] = [
    (0, 10, 31, "Income Tax Return Deadline"),
    (0, 12, 15, "Capital Gains Tax Payment Deadline"),
    (1, 1, 31, "Tax Payment Deadline for Self-Assessed Income Tax"),
];

/// Deadlines that fall due for `year`, earliest first.
///
/// Years outside chrono's calendar range produce no deadlines.
pub fn filing_deadlines(year: i32) -> Vec<FilingDeadline> {
    CALENDAR
        .iter()
        .filter_map(|&(offset, month, day, description)| {
            let date = NaiveDate::from_ymd_opt(year.checked_add(offset)?, month, day)?;
            Some(FilingDeadline {
                date,
                description: description.to_string(),
            })
        })
        .collect()
}

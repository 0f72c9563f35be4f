//! Year-keyed lookup of rate tables.
//!
//! The calculator never hard-codes a year's constants; it is handed a
//! [`RateTable`] chosen here. New years are added as data (seed SQL or the
//! CSV loader) without touching the arithmetic.

use std::collections::BTreeMap;

use crate::RateTable;

/// Known rate tables, ordered by tax year.
///
/// A schedule is never empty: constructors fall back to the built-in tables
/// when given nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSchedule {
    tables: BTreeMap<i32, RateTable>,
    latest: RateTable,
}

impl RateSchedule {
    /// Schedule containing only the tables compiled into this crate.
    pub fn builtin() -> Self {
        Self::from_tables([RateTable::irish_2023()])
    }

    /// Builds a schedule from externally loaded tables.
    ///
    /// A later table for the same year replaces an earlier one. An empty
    /// input yields [`RateSchedule::builtin`].
    pub fn from_tables(tables: impl IntoIterator<Item = RateTable>) -> Self {
        let tables: BTreeMap<i32, RateTable> = tables
            .into_iter()
            .map(|table| (table.tax_year, table))
            .collect();

        match tables.values().next_back().cloned() {
            Some(latest) => Self { tables, latest },
            None => Self::builtin(),
        }
    }

    /// Selects the table for `year`.
    ///
    /// An exact match wins. An unknown year, or no year at all, resolves to
    /// the most recent known table.
    pub fn rates_for(
        &self,
        year: Option<i32>,
    ) -> &RateTable {
        year.and_then(|year| self.tables.get(&year))
            .unwrap_or_else(|| self.latest())
    }

    /// The most recent known table.
    pub fn latest(&self) -> &RateTable {
        &self.latest
    }

    /// Whether a table exists for exactly this year.
    pub fn knows(
        &self,
        year: i32,
    ) -> bool {
        self.tables.contains_key(&year)
    }

    /// Known years, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.tables.keys().copied().collect()
    }
}

impl Default for RateSchedule {
    fn default() -> Self {
        Self::builtin()
    }
}

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable identifier of a listing: normalized company name plus open date.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IpoId(String);

impl IpoId {
    pub fn new(company_name: &str, open_date: NaiveDate) -> Self {
        Self(format!(
            "{}@{}",
            normalize_company_name(company_name),
            open_date.format("%Y-%m-%d")
        ))
    }

    /// Wraps an identifier read back from persisted history.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IpoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercases and collapses internal whitespace so cosmetic markup changes
/// do not produce a new identifier.
pub fn normalize_company_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("company name is empty")]
    EmptyCompanyName,
    #[error("close date {close} is before open date {open}")]
    CloseBeforeOpen { open: NaiveDate, close: NaiveDate },
}

/// One IPO listing as parsed from the source page. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpoRecord {
    id: IpoId,
    company_name: String,
    units: Option<String>,
    price_per_unit: Option<String>,
    open_date: NaiveDate,
    close_date: NaiveDate,
    status: Option<String>,
}

impl IpoRecord {
    pub fn new(
        company_name: &str,
        open_date: NaiveDate,
        close_date: NaiveDate,
    ) -> Result<Self, RecordError> {
        let company_name = company_name.split_whitespace().collect::<Vec<_>>().join(" ");
        if company_name.is_empty() {
            return Err(RecordError::EmptyCompanyName);
        }
        if close_date < open_date {
            return Err(RecordError::CloseBeforeOpen {
                open: open_date,
                close: close_date,
            });
        }
        Ok(Self {
            id: IpoId::new(&company_name, open_date),
            company_name,
            units: None,
            price_per_unit: None,
            open_date,
            close_date,
            status: None,
        })
    }

    pub fn with_units(mut self, units: Option<String>) -> Self {
        self.units = non_empty(units);
        self
    }

    pub fn with_price_per_unit(mut self, price: Option<String>) -> Self {
        self.price_per_unit = non_empty(price);
        self
    }

    pub fn with_status(mut self, status: Option<String>) -> Self {
        self.status = non_empty(status);
        self
    }

    pub fn id(&self) -> &IpoId {
        &self.id
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn price_per_unit(&self) -> Option<&str> {
        self.price_per_unit.as_deref()
    }

    pub fn open_date(&self) -> NaiveDate {
        self.open_date
    }

    pub fn close_date(&self) -> NaiveDate {
        self.close_date
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Listings without a status column are treated as open.
    pub fn is_open(&self) -> bool {
        self.status
            .as_deref()
            .map_or(true, |status| status.trim().eq_ignore_ascii_case("open"))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A table row that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    /// 1-based position of the row among the table's data rows.
    pub row: usize,
    pub reason: String,
}

/// Result of parsing one listing page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedListings {
    /// Valid records in document order, without repeated identifiers.
    pub records: Vec<IpoRecord>,
    pub rejected: Vec<RowRejection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn id_ignores_case_and_spacing() {
        let a = IpoId::new("Himalayan  Hydro Ltd", date(2024, 1, 15));
        let b = IpoId::new(" himalayan hydro LTD ", date(2024, 1, 15));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "himalayan hydro ltd@2024-01-15");
    }

    #[test]
    fn same_company_with_different_open_dates_are_distinct() {
        let a = IpoId::new("Alpha", date(2024, 1, 15));
        let b = IpoId::new("Alpha", date(2024, 6, 1));
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_empty_name_and_inverted_dates() {
        assert_eq!(
            IpoRecord::new("   ", date(2024, 1, 1), date(2024, 1, 2)),
            Err(RecordError::EmptyCompanyName)
        );
        assert!(matches!(
            IpoRecord::new("Alpha", date(2024, 1, 5), date(2024, 1, 2)),
            Err(RecordError::CloseBeforeOpen { .. })
        ));
    }

    #[test]
    fn blank_optional_fields_become_none() {
        let record = IpoRecord::new("Alpha", date(2024, 1, 1), date(2024, 1, 2))
            .unwrap()
            .with_units(Some("  ".into()))
            .with_price_per_unit(Some("100".into()))
            .with_status(None);
        assert_eq!(record.units(), None);
        assert_eq!(record.price_per_unit(), Some("100"));
        assert!(record.is_open());
    }

    #[test]
    fn status_other_than_open_is_not_open() {
        let record = IpoRecord::new("Alpha", date(2024, 1, 1), date(2024, 1, 2))
            .unwrap()
            .with_status(Some("Coming Soon".into()));
        assert!(!record.is_open());
    }
}

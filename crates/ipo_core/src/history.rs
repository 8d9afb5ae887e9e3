use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{IpoId, IpoRecord};

/// One notification ledger entry. Only `notified_at` is required so older or
/// hand-edited files stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub notified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<String>,
}

impl HistoryEntry {
    pub fn at(notified_at: DateTime<Utc>) -> Self {
        Self {
            notified_at,
            company_name: None,
            open_date: None,
            close_date: None,
            units: None,
            price_per_unit: None,
        }
    }

    pub fn for_record(record: &IpoRecord, notified_at: DateTime<Utc>) -> Self {
        Self {
            notified_at,
            company_name: Some(record.company_name().to_string()),
            open_date: Some(record.open_date()),
            close_date: Some(record.close_date()),
            units: record.units().map(ToOwned::to_owned),
            price_per_unit: record.price_per_unit().map(ToOwned::to_owned),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryStats {
    pub total: usize,
    pub first_notified: Option<DateTime<Utc>>,
    pub last_notified: Option<DateTime<Utc>>,
}

/// Deduplication ledger: IPO identifier to time of last notification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationHistory {
    entries: BTreeMap<IpoId, HistoryEntry>,
}

impl NotificationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_notified(&self, id: &IpoId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &IpoId) -> Option<&HistoryEntry> {
        self.entries.get(id)
    }

    pub fn mark_notified(&mut self, id: IpoId, notified_at: DateTime<Utc>) {
        self.entries.insert(id, HistoryEntry::at(notified_at));
    }

    /// Like [`mark_notified`](Self::mark_notified) but keeps the record's
    /// display fields alongside the timestamp.
    pub fn record_notification(&mut self, record: &IpoRecord, notified_at: DateTime<Utc>) {
        self.entries.insert(
            record.id().clone(),
            HistoryEntry::for_record(record, notified_at),
        );
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IpoId, &HistoryEntry)> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &IpoId> {
        self.entries.keys()
    }

    /// Removes entries notified strictly before `now - older_than_days`.
    /// An entry exactly at the cutoff is kept. Returns the number removed.
    pub fn cleanup(&mut self, older_than_days: u32, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(TimeDelta::days(i64::from(older_than_days)))
        else {
            return 0;
        };
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.notified_at >= cutoff);
        before - self.entries.len()
    }

    pub fn stats(&self) -> HistoryStats {
        let timestamps = self.entries.values().map(|entry| entry.notified_at);
        HistoryStats {
            total: self.entries.len(),
            first_notified: timestamps.clone().min(),
            last_notified: timestamps.max(),
        }
    }
}

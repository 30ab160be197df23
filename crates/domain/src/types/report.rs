//! Report snapshot types
//!
//! A report snapshot is a server-computed, per-day summary of which sessions
//! contributed time and to which time entries. Snapshots are ephemeral: the
//! aggregation engine consumes them and keeps its own tree; nothing here is
//! persisted client-side.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::DAYS_PER_WEEK;
use crate::types::task::TaskId;
use crate::types::taxonomy::TimeEntry;

/// Calendar date of a report, as transmitted (month/day/year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDate {
    pub month: u8,
    pub day: u8,
    pub year: i16,
}

impl ReportDate {
    /// Convert to a `chrono` date. Invalid server dates yield `None`.
    pub fn to_naive_date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))
    }
}

/// Marks one session that contributed time on a report's date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePair {
    pub task_id: TaskId,
    /// Index into the task's session list.
    pub session_index: i32,
}

/// Server-computed summary for a single day.
///
/// `found == false` means the server recorded no activity for that date; the
/// remaining fields are zeroed/empty and carry no meaning. This is distinct
/// from a day whose total is exactly zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReport {
    pub found: bool,
    pub date: ReportDate,
    /// Start of the covered range, milliseconds since the epoch.
    pub start_ms: i64,
    /// End of the covered range; stands in for "now" when a running session
    /// has no stop instant.
    pub end_ms: i64,
    /// Total tracked duration for the day.
    pub total_ms: i64,
    /// Aggregate duration already bucketed by the server per time entry.
    pub per_entry_ms: BTreeMap<TimeEntry, i64>,
    /// Which sessions contributed time on this date.
    pub time_pairs: Vec<TimePair>,
}

impl DailyReport {
    /// An empty "no activity" report for a date.
    pub fn not_found(date: ReportDate) -> Self {
        Self {
            found: false,
            date,
            start_ms: 0,
            end_ms: 0,
            total_ms: 0,
            per_entry_ms: BTreeMap::new(),
            time_pairs: Vec::new(),
        }
    }
}

/// Exactly seven daily slots, in server-defined day order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub days: [DailyReport; DAYS_PER_WEEK],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_date_conversion() {
        let date = ReportDate { month: 2, day: 29, year: 2024 };
        assert!(date.to_naive_date().is_some());

        let bad = ReportDate { month: 2, day: 30, year: 2023 };
        assert!(bad.to_naive_date().is_none());
    }

    #[test]
    fn test_not_found_report_is_empty() {
        let report = DailyReport::not_found(ReportDate { month: 1, day: 2, year: 2026 });
        assert!(!report.found);
        assert!(report.per_entry_ms.is_empty());
        assert!(report.time_pairs.is_empty());
    }
}

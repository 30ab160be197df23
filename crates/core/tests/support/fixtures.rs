//! Fixture builders for tasks, sessions, reports, and taxonomies.

use std::collections::BTreeMap;

use tallyarc_domain::constants::MS_PER_MINUTE;
use tallyarc_domain::{
    DailyReport, ReportDate, Session, Task, TaskId, TaskState, TimeCategory, TimeCode, TimeEntry,
    TimePair,
};

/// A bare task with no sessions or assignments.
pub fn task(id: TaskId, parent_id: TaskId) -> Task {
    Task {
        id,
        parent_id,
        index_in_parent: 0,
        name: format!("task {id}"),
        state: TaskState::Pending,
        locked: false,
        server_controlled: false,
        sessions: vec![],
        entries: vec![],
    }
}

/// A task with one finished session of `minutes` whole minutes under the
/// given entries.
pub fn task_with_session(
    id: TaskId,
    parent_id: TaskId,
    minutes: i64,
    entries: &[TimeEntry],
) -> Task {
    let mut t = task(id, parent_id);
    t.sessions.push(Session {
        start_ms: 0,
        stop_ms: Some(minutes * MS_PER_MINUTE),
        entries: entries.to_vec(),
    });
    t
}

/// A found daily report for a fixed date.
pub fn daily_report(pairs: &[(TaskId, i32)], entries: &[TimeEntry]) -> DailyReport {
    DailyReport {
        found: true,
        date: ReportDate { month: 8, day: 3, year: 2026 },
        start_ms: 0,
        end_ms: 24 * 60 * MS_PER_MINUTE,
        total_ms: 0,
        per_entry_ms: entries.iter().map(|&e| (e, 0)).collect::<BTreeMap<_, _>>(),
        time_pairs: pairs
            .iter()
            .map(|&(task_id, session_index)| TimePair { task_id, session_index })
            .collect(),
    }
}

/// A "no activity" report slot.
pub fn empty_report() -> DailyReport {
    DailyReport::not_found(ReportDate { month: 8, day: 4, year: 2026 })
}

/// A category with plainly-named codes.
pub fn category(id: i32, name: &str, codes: &[(i32, &str)]) -> TimeCategory {
    TimeCategory {
        id,
        name: name.to_string(),
        archived: false,
        codes: codes
            .iter()
            .map(|&(code_id, code_name)| TimeCode {
                id: code_id,
                name: code_name.to_string(),
                archived: false,
            })
            .collect(),
    }
}

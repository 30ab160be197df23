//! Report aggregation engine
//!
//! Consumes daily-report snapshots (1 for a daily view, 7 for a weekly view)
//! together with the task directory and maintains the persistent aggregation
//! tree, reconciling it in place on every update rather than rebuilding.
//!
//! Each `update` call runs three phases:
//! - PRE: detect parent changes among referenced tasks (coarse whole-tree
//!   task invalidation when found), reconcile root-level shells against the
//!   incoming entry set, zero all accumulators.
//! - UPDATE: walk every day slot's time pairs and accumulate session minutes
//!   into category, total, and task nodes, creating task nodes and their
//!   structural ancestors on demand.
//! - POST: prune task nodes that pre-existed the update but contributed
//!   nothing, then fill unset minutes bottom-up from children.
//!
//! Malformed report data degrades silently: a time pair whose task or
//! session cannot be resolved is skipped. Corrupt display data is not worth
//! failing the connection over.

use std::collections::{BTreeSet, HashMap, HashSet};

use tallyarc_domain::constants::{MS_PER_MINUTE, ROOT_PARENT_ID};
use tallyarc_domain::{DailyReport, Task, TaskId, TimeEntry};
use tracing::{debug, trace};

use super::tree::AggregationTree;
use crate::directory::ports::TaskLookup;

/// Stateful incremental aggregator over report snapshots.
#[derive(Debug)]
pub struct AggregationEngine {
    tree: AggregationTree,
    /// Parent id recorded the previous time each task id was seen.
    last_known_parent: HashMap<TaskId, TaskId>,
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationEngine {
    pub fn new() -> Self {
        Self { tree: AggregationTree::new(1), last_known_parent: HashMap::new() }
    }

    /// The current aggregation tree.
    pub fn tree(&self) -> &AggregationTree {
        &self.tree
    }

    /// Drop all state. Used on reconnect.
    pub fn clear(&mut self) {
        self.tree = AggregationTree::new(self.tree.slot_count());
        self.last_known_parent.clear();
    }

    /// Apply a report set (1 daily slot or 7 weekly slots) to the tree.
    pub fn update(&mut self, reports: &[DailyReport], lookup: &impl TaskLookup) -> &AggregationTree {
        if reports.is_empty() {
            return &self.tree;
        }

        // Switching between daily and weekly views starts a fresh tree; the
        // two shapes share no meaningful state.
        if reports.len() != self.tree.slot_count() {
            self.tree = AggregationTree::new(reports.len());
        }

        self.pre_phase(reports, lookup);
        let pre_existing = self.snapshot_existing();
        let touched = self.update_phase(reports, lookup);
        self.post_phase(&pre_existing, &touched);

        &self.tree
    }

    /// Invalidate on parent changes and reconcile root-level shells.
    fn pre_phase(&mut self, reports: &[DailyReport], lookup: &impl TaskLookup) {
        let referenced: BTreeSet<TaskId> = reports
            .iter()
            .filter(|r| r.found)
            .flat_map(|r| r.time_pairs.iter().map(|p| p.task_id))
            .collect();

        // A changed parent anywhere in the referenced set discards every
        // category's task sub-tree. Entry reassignment and reparenting are
        // indistinguishable within one update cycle, so no surgical
        // relocation is attempted.
        let parent_changed = referenced.iter().any(|&task_id| {
            match (self.last_known_parent.get(&task_id), lookup.task(task_id)) {
                (Some(&last), Some(task)) => last != task.parent_id,
                _ => false,
            }
        });
        if parent_changed {
            debug!("referenced task reparented; discarding all task sub-trees");
            self.tree.clear_all_tasks();
        }

        for &task_id in &referenced {
            if let Some(task) = lookup.task(task_id) {
                self.last_known_parent.insert(task_id, task.parent_id);
            }
        }

        let incoming: BTreeSet<TimeEntry> = reports
            .iter()
            .filter(|r| r.found)
            .flat_map(|r| r.per_entry_ms.keys().copied())
            .collect();
        self.tree.reconcile_shells(&incoming);
        self.tree.reset_accumulators();
    }

    /// Task-node membership per entry before accumulation, for the prune.
    fn snapshot_existing(&self) -> HashMap<TimeEntry, HashSet<TaskId>> {
        self.tree
            .categories()
            .map(|category| (category.entry, category.task_ids().collect()))
            .collect()
    }

    /// Accumulate every day slot's time pairs into the tree.
    fn update_phase(
        &mut self,
        reports: &[DailyReport],
        lookup: &impl TaskLookup,
    ) -> HashSet<(TimeEntry, TaskId)> {
        let mut touched: HashSet<(TimeEntry, TaskId)> = HashSet::new();

        for (slot, report) in reports.iter().enumerate() {
            if !report.found {
                continue;
            }
            for pair in &report.time_pairs {
                let Some(task) = lookup.task(pair.task_id) else {
                    debug!(task_id = pair.task_id, "time pair references unknown task, skipped");
                    continue;
                };
                let Some(session) = usize::try_from(pair.session_index)
                    .ok()
                    .and_then(|index| task.sessions.get(index))
                else {
                    debug!(
                        task_id = pair.task_id,
                        session_index = pair.session_index,
                        "time pair references unknown session, skipped"
                    );
                    continue;
                };

                // A running session is measured against the report's end
                // instant; durations truncate to whole minutes.
                let stop_ms = session.stop_ms.unwrap_or(report.end_ms);
                let minutes = ((stop_ms - session.start_ms) / MS_PER_MINUTE).max(0);
                let chain = ancestor_chain(task, lookup);

                for entry in &session.entries {
                    if !self.tree.has_category(entry) {
                        trace!(?entry, "session entry absent from report entry set, skipped");
                        continue;
                    }
                    self.tree.accumulate(entry, slot, minutes, &chain);
                    // Structural ancestors count as touched; pruning them
                    // would orphan the contributing leaf.
                    for &id in &chain {
                        touched.insert((*entry, id));
                    }
                }
            }
        }

        touched
    }

    /// Prune stale task nodes, then fill unset minutes bottom-up.
    fn post_phase(
        &mut self,
        pre_existing: &HashMap<TimeEntry, HashSet<TaskId>>,
        touched: &HashSet<(TimeEntry, TaskId)>,
    ) {
        for (entry, category) in self.tree.categories_mut() {
            let existed = pre_existing.get(entry);
            category.retain_tasks(|id| {
                let pre = existed.is_some_and(|set| set.contains(&id));
                !pre || touched.contains(&(*entry, id))
            });
        }
        self.tree.roll_up_all();
    }
}

/// Root-first ancestor chain of a task, ending with the task itself.
///
/// Stops at the first parent the directory does not know. The visited set
/// guards against cyclic parent data from the server.
fn ancestor_chain(task: &Task, lookup: &impl TaskLookup) -> Vec<TaskId> {
    let mut chain = vec![task.id];
    let mut visited: HashSet<TaskId> = HashSet::from([task.id]);
    let mut parent_id = task.parent_id;
    while parent_id != ROOT_PARENT_ID {
        let Some(parent) = lookup.task(parent_id) else { break };
        if !visited.insert(parent.id) {
            break;
        }
        chain.push(parent.id);
        parent_id = parent.parent_id;
    }
    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tallyarc_domain::{DailyReport, ReportDate, Session, TaskState, TimePair};

    use super::*;
    use crate::directory::TaskDirectory;

    const HOUR_MS: i64 = 60 * MS_PER_MINUTE;

    fn entry(category_id: i32, code_id: i32) -> TimeEntry {
        TimeEntry::new(category_id, code_id)
    }

    fn create_test_task(id: TaskId, parent_id: TaskId, sessions: Vec<Session>) -> Task {
        Task {
            id,
            parent_id,
            index_in_parent: 0,
            name: format!("task {id}"),
            state: TaskState::Pending,
            locked: false,
            server_controlled: false,
            sessions,
            entries: vec![],
        }
    }

    fn session(start_ms: i64, stop_ms: i64, entries: &[TimeEntry]) -> Session {
        Session { start_ms, stop_ms: Some(stop_ms), entries: entries.to_vec() }
    }

    fn report(pairs: &[(TaskId, i32)], entries: &[TimeEntry]) -> DailyReport {
        DailyReport {
            found: true,
            date: ReportDate { month: 8, day: 3, year: 2026 },
            start_ms: 0,
            end_ms: 24 * HOUR_MS,
            total_ms: 0,
            per_entry_ms: entries.iter().map(|&e| (e, 0)).collect::<BTreeMap<_, _>>(),
            time_pairs: pairs
                .iter()
                .map(|&(task_id, session_index)| TimePair { task_id, session_index })
                .collect(),
        }
    }

    fn not_found_report() -> DailyReport {
        DailyReport::not_found(ReportDate { month: 8, day: 4, year: 2026 })
    }

    #[test]
    fn test_single_task_daily_accumulation() {
        // Task 5 logs 90 minutes under one entry.
        let mut directory = TaskDirectory::new();
        let project_ps = entry(1, 10);
        directory.upsert(create_test_task(
            5,
            ROOT_PARENT_ID,
            vec![session(0, 90 * MS_PER_MINUTE, &[project_ps])],
        ));
        let mut engine = AggregationEngine::new();

        let tree = engine.update(&[report(&[(5, 0)], &[project_ps])], &directory);

        assert_eq!(tree.total(1).map(|t| t.minutes), Some(90));
        assert_eq!(tree.category(&project_ps).map(|c| c.minutes), Some(90));
        assert_eq!(tree.category(&project_ps).unwrap().node(5).unwrap().minutes, Some(90));
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut directory = TaskDirectory::new();
        let project_ps = entry(1, 10);
        directory.upsert(create_test_task(
            5,
            ROOT_PARENT_ID,
            vec![session(0, HOUR_MS, &[project_ps])],
        ));
        directory.upsert(create_test_task(7, 5, vec![session(0, 30 * MS_PER_MINUTE, &[project_ps])]));
        let reports = [report(&[(5, 0), (7, 0)], &[project_ps])];
        let mut engine = AggregationEngine::new();

        let first = engine.update(&reports, &directory).clone();
        let second = engine.update(&reports, &directory).clone();

        assert_eq!(first, second);
    }

    #[test]
    fn test_child_rollup_fills_unset_parent() {
        // Task 7 (child of 5) logs 30 minutes; task 5 logs nothing directly.
        let mut directory = TaskDirectory::new();
        let project_ps = entry(1, 10);
        directory.upsert(create_test_task(5, ROOT_PARENT_ID, vec![]));
        directory.upsert(create_test_task(7, 5, vec![session(0, 30 * MS_PER_MINUTE, &[project_ps])]));
        let mut engine = AggregationEngine::new();

        let tree = engine.update(&[report(&[(7, 0)], &[project_ps])], &directory);

        let category = tree.category(&project_ps).unwrap();
        assert_eq!(category.node(7).unwrap().minutes, Some(30));
        assert_eq!(category.node(5).unwrap().minutes, Some(30));
        assert_eq!(category.roots(), &[5]);
    }

    #[test]
    fn test_not_found_day_contributes_nothing() {
        let mut directory = TaskDirectory::new();
        let project_ps = entry(1, 10);
        directory.upsert(create_test_task(
            5,
            ROOT_PARENT_ID,
            vec![session(0, HOUR_MS, &[project_ps])],
        ));
        let mut engine = AggregationEngine::new();

        let tree = engine.update(&[not_found_report()], &directory);
        assert!(tree.is_empty());

        // Weekly: one found day among not-found slots is unaffected.
        let mut week: Vec<DailyReport> = (0..7).map(|_| not_found_report()).collect();
        week[3] = report(&[(5, 0)], &[project_ps]);
        let tree = engine.update(&week, &directory);

        assert_eq!(tree.total(1).unwrap().minutes, 60);
        assert_eq!(tree.total(1).unwrap().per_day[3], 60);
        assert_eq!(tree.total(1).unwrap().per_day[2], 0);
    }

    #[test]
    fn test_task_dropped_from_report_is_pruned() {
        let mut directory = TaskDirectory::new();
        let project_ps = entry(1, 10);
        directory.upsert(create_test_task(
            5,
            ROOT_PARENT_ID,
            vec![session(0, HOUR_MS, &[project_ps])],
        ));
        directory.upsert(create_test_task(
            6,
            ROOT_PARENT_ID,
            vec![session(0, HOUR_MS, &[project_ps])],
        ));
        let mut engine = AggregationEngine::new();

        engine.update(&[report(&[(5, 0), (6, 0)], &[project_ps])], &directory);
        let tree = engine.update(&[report(&[(6, 0)], &[project_ps])], &directory);

        let category = tree.category(&project_ps).unwrap();
        assert!(category.node(5).is_none());
        assert!(category.node(6).is_some());
        assert_eq!(category.minutes, 60);
    }

    #[test]
    fn test_parent_change_invalidates_all_sub_trees() {
        let mut directory = TaskDirectory::new();
        let project_ps = entry(1, 10);
        let phase_a = entry(2, 20);
        directory.upsert(create_test_task(
            5,
            ROOT_PARENT_ID,
            vec![session(0, HOUR_MS, &[project_ps])],
        ));
        directory.upsert(create_test_task(7, 5, vec![session(0, HOUR_MS, &[phase_a])]));
        let reports = [report(&[(5, 0), (7, 0)], &[project_ps, phase_a])];
        let mut engine = AggregationEngine::new();
        engine.update(&reports, &directory);

        // Server reparents task 7 under the root.
        directory.upsert(create_test_task(7, ROOT_PARENT_ID, vec![session(0, HOUR_MS, &[phase_a])]));
        let tree = engine.update(&reports, &directory);

        // Fresh structure: 7 is now a root-level node of its category, and
        // the stale ancestor chain under project_ps is gone.
        let phase_category = tree.category(&phase_a).unwrap();
        assert_eq!(phase_category.roots(), &[7]);
        assert_eq!(phase_category.node(7).unwrap().parent, None);
        let project_category = tree.category(&project_ps).unwrap();
        assert_eq!(project_category.task_ids().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_unknown_task_and_session_are_skipped() {
        let mut directory = TaskDirectory::new();
        let project_ps = entry(1, 10);
        directory.upsert(create_test_task(
            5,
            ROOT_PARENT_ID,
            vec![session(0, HOUR_MS, &[project_ps])],
        ));
        let mut engine = AggregationEngine::new();

        // Pair for an unknown task, a bad session index, and a good pair.
        let tree = engine.update(
            &[report(&[(99, 0), (5, 3), (5, -1), (5, 0)], &[project_ps])],
            &directory,
        );

        assert_eq!(tree.total(1).unwrap().minutes, 60);
    }

    #[test]
    fn test_running_session_measured_against_report_end() {
        let mut directory = TaskDirectory::new();
        let project_ps = entry(1, 10);
        let running = Session {
            start_ms: 23 * HOUR_MS + 30 * MS_PER_MINUTE + 45_000,
            stop_ms: None,
            entries: vec![project_ps],
        };
        directory.upsert(create_test_task(5, ROOT_PARENT_ID, vec![running]));
        let mut engine = AggregationEngine::new();

        let tree = engine.update(&[report(&[(5, 0)], &[project_ps])], &directory);

        // 29 min 15 s truncates to 29 whole minutes.
        assert_eq!(tree.total(1).unwrap().minutes, 29);
    }

    #[test]
    fn test_switching_view_width_resets_tree() {
        let mut directory = TaskDirectory::new();
        let project_ps = entry(1, 10);
        directory.upsert(create_test_task(
            5,
            ROOT_PARENT_ID,
            vec![session(0, HOUR_MS, &[project_ps])],
        ));
        let mut engine = AggregationEngine::new();
        engine.update(&[report(&[(5, 0)], &[project_ps])], &directory);

        let mut week: Vec<DailyReport> = (0..7).map(|_| not_found_report()).collect();
        week[0] = report(&[(5, 0)], &[project_ps]);
        let tree = engine.update(&week, &directory);

        assert_eq!(tree.slot_count(), 7);
        assert_eq!(tree.total(1).unwrap().minutes, 60);
    }
}

//! Time taxonomy service
//!
//! Registry of time categories and codes, replaced wholesale by the initial
//! snapshot and patched by incremental deltas. Codes are never deleted;
//! archiving is the deletion mechanism, so resolution over historical
//! sessions keeps working.

use std::collections::HashSet;

use tallyarc_domain::{
    CategoryId, ChangeKind, TaskId, TaxonomyDelta, TimeCategory, TimeCode,
};
use tracing::warn;

use crate::directory::ports::TaskLookup;

/// Registry of time categories and codes, in server order.
#[derive(Debug, Default)]
pub struct TimeTaxonomy {
    categories: Vec<TimeCategory>,
}

impl TimeTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wholesale replace from a full snapshot.
    pub fn replace(&mut self, categories: Vec<TimeCategory>) {
        self.categories = categories;
    }

    /// Apply an incremental add/update delta.
    ///
    /// Updates naming an unknown category or code are dropped with a
    /// warning; the server is authoritative and a later full snapshot will
    /// reconcile.
    pub fn apply_modify(&mut self, delta: TaxonomyDelta) {
        for category_delta in delta.categories {
            let category_id = category_delta.id;
            match category_delta.change {
                ChangeKind::Add => {
                    let codes = category_delta
                        .codes
                        .into_iter()
                        .map(|code_delta| code_delta.code)
                        .collect();
                    self.categories.push(TimeCategory {
                        id: category_id,
                        name: category_delta.name,
                        archived: category_delta.archived,
                        codes,
                    });
                }
                ChangeKind::Update => {
                    let Some(category) =
                        self.categories.iter_mut().find(|c| c.id == category_id)
                    else {
                        warn!(category_id, "taxonomy update for unknown category dropped");
                        continue;
                    };
                    category.name = category_delta.name;
                    category.archived = category_delta.archived;
                    for code_delta in category_delta.codes {
                        match code_delta.change {
                            ChangeKind::Add => category.codes.push(code_delta.code),
                            ChangeKind::Update => {
                                let code_id = code_delta.code.id;
                                if let Some(code) =
                                    category.codes.iter_mut().find(|c| c.id == code_id)
                                {
                                    *code = code_delta.code;
                                } else {
                                    warn!(
                                        category_id,
                                        code_id, "taxonomy update for unknown code dropped"
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    pub fn category(&self, id: CategoryId) -> Option<&TimeCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn categories(&self) -> &[TimeCategory] {
        &self.categories
    }

    /// Resolve the effective time code of a task for a category.
    ///
    /// A direct assignment on the task wins; otherwise the parent chain is
    /// walked until a task with a direct assignment is found. Reaching the
    /// root without one yields the synthetic "Unknown" sentinel, as does an
    /// assignment referencing a code the registry does not know. The visited
    /// set guards against cyclic parent data from the server.
    pub fn resolve_code(
        &self,
        task_id: TaskId,
        category_id: CategoryId,
        lookup: &impl TaskLookup,
    ) -> TimeCode {
        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut current = lookup.task(task_id);
        while let Some(task) = current {
            if !visited.insert(task.id) {
                break;
            }
            if let Some(entry) = task.entry_for(category_id) {
                return self
                    .category(category_id)
                    .and_then(|c| c.code(entry.code_id))
                    .cloned()
                    .unwrap_or_else(TimeCode::unknown);
            }
            if task.is_root_level() {
                break;
            }
            current = lookup.task(task.parent_id);
        }
        TimeCode::unknown()
    }
}

#[cfg(test)]
mod tests {
    use tallyarc_domain::constants::ROOT_PARENT_ID;
    use tallyarc_domain::{
        CategoryDelta, CodeDelta, Task, TaskState, TimeEntry,
    };

    use super::*;

    fn create_test_category(id: CategoryId, name: &str, code_ids: &[i32]) -> TimeCategory {
        TimeCategory {
            id,
            name: name.to_string(),
            archived: false,
            codes: code_ids
                .iter()
                .map(|&code_id| TimeCode {
                    id: code_id,
                    name: format!("code {code_id}"),
                    archived: false,
                })
                .collect(),
        }
    }

    fn create_test_task(id: TaskId, parent_id: TaskId, entries: Vec<TimeEntry>) -> Task {
        Task {
            id,
            parent_id,
            index_in_parent: 0,
            name: format!("task {id}"),
            state: TaskState::Pending,
            locked: false,
            server_controlled: false,
            sessions: vec![],
            entries,
        }
    }

    struct FixtureLookup {
        tasks: Vec<Task>,
    }

    impl TaskLookup for FixtureLookup {
        fn task(&self, id: TaskId) -> Option<&Task> {
            self.tasks.iter().find(|t| t.id == id)
        }
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut taxonomy = TimeTaxonomy::new();
        taxonomy.replace(vec![create_test_category(1, "Project", &[10])]);
        taxonomy.replace(vec![create_test_category(2, "Phase", &[20])]);

        assert!(taxonomy.category(1).is_none());
        assert_eq!(taxonomy.category(2).map(|c| c.name.as_str()), Some("Phase"));
    }

    #[test]
    fn test_apply_modify_adds_category_with_codes() {
        let mut taxonomy = TimeTaxonomy::new();
        taxonomy.apply_modify(TaxonomyDelta {
            categories: vec![CategoryDelta {
                change: ChangeKind::Add,
                id: 3,
                name: "Billing".to_string(),
                archived: false,
                codes: vec![CodeDelta {
                    change: ChangeKind::Add,
                    code: TimeCode { id: 30, name: "B1".to_string(), archived: false },
                }],
            }],
        });

        let category = taxonomy.category(3).unwrap();
        assert_eq!(category.name, "Billing");
        assert_eq!(category.code(30).map(|c| c.name.as_str()), Some("B1"));
    }

    #[test]
    fn test_apply_modify_updates_existing_code() {
        let mut taxonomy = TimeTaxonomy::new();
        taxonomy.replace(vec![create_test_category(1, "Project", &[10])]);

        taxonomy.apply_modify(TaxonomyDelta {
            categories: vec![CategoryDelta {
                change: ChangeKind::Update,
                id: 1,
                name: "Project".to_string(),
                archived: false,
                codes: vec![CodeDelta {
                    change: ChangeKind::Update,
                    code: TimeCode { id: 10, name: "PS".to_string(), archived: true },
                }],
            }],
        });

        let code = taxonomy.category(1).unwrap().code(10).unwrap();
        assert_eq!(code.name, "PS");
        assert!(code.archived);
    }

    #[test]
    fn test_resolve_direct_assignment() {
        let mut taxonomy = TimeTaxonomy::new();
        taxonomy.replace(vec![create_test_category(1, "Project", &[10, 11])]);
        let lookup = FixtureLookup {
            tasks: vec![create_test_task(5, ROOT_PARENT_ID, vec![TimeEntry::new(1, 11)])],
        };

        let code = taxonomy.resolve_code(5, 1, &lookup);
        assert_eq!(code.id, 11);
    }

    #[test]
    fn test_resolve_inherits_from_parent_chain() {
        let mut taxonomy = TimeTaxonomy::new();
        taxonomy.replace(vec![create_test_category(1, "Project", &[10])]);
        let lookup = FixtureLookup {
            tasks: vec![
                create_test_task(5, ROOT_PARENT_ID, vec![TimeEntry::new(1, 10)]),
                create_test_task(7, 5, vec![]),
                create_test_task(9, 7, vec![]),
            ],
        };

        let code = taxonomy.resolve_code(9, 1, &lookup);
        assert_eq!(code.id, 10);
    }

    #[test]
    fn test_resolve_falls_back_to_unknown_sentinel() {
        let mut taxonomy = TimeTaxonomy::new();
        taxonomy.replace(vec![create_test_category(1, "Project", &[10])]);
        let lookup = FixtureLookup {
            tasks: vec![
                create_test_task(5, ROOT_PARENT_ID, vec![]),
                create_test_task(7, 5, vec![]),
            ],
        };

        let code = taxonomy.resolve_code(7, 1, &lookup);
        assert!(code.is_unknown());
    }

    #[test]
    fn test_resolve_cyclic_parent_data_degrades_to_sentinel() {
        let mut taxonomy = TimeTaxonomy::new();
        taxonomy.replace(vec![create_test_category(1, "Project", &[10])]);
        // Neither task is root-level and each names the other as parent.
        let lookup = FixtureLookup {
            tasks: vec![create_test_task(5, 7, vec![]), create_test_task(7, 5, vec![])],
        };

        let code = taxonomy.resolve_code(5, 1, &lookup);
        assert!(code.is_unknown());
    }

    #[test]
    fn test_resolve_unknown_code_reference_degrades_to_sentinel() {
        let mut taxonomy = TimeTaxonomy::new();
        taxonomy.replace(vec![create_test_category(1, "Project", &[10])]);
        let lookup = FixtureLookup {
            tasks: vec![create_test_task(5, ROOT_PARENT_ID, vec![TimeEntry::new(1, 99)])],
        };

        let code = taxonomy.resolve_code(5, 1, &lookup);
        assert!(code.is_unknown());
    }
}

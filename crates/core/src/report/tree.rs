//! The aggregation tree
//!
//! Three node kinds, all addressed by stable keys rather than owning
//! pointers: `TotalNode` per time category, `CategoryNode` per time entry,
//! and a `TaskNode` arena per category node keyed by task id where "parent"
//! is a key lookup. The tree survives across updates; the engine reconciles
//! it in place rather than rebuilding.

use std::collections::btree_map::Entry as BTreeEntry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use tallyarc_domain::constants::DAYS_PER_WEEK;
use tallyarc_domain::{CategoryId, TaskId, TimeEntry};

/// Per-day minute slots. Only the first `slot_count` entries are meaningful;
/// daily mode uses slot 0.
pub type DayMinutes = [i64; DAYS_PER_WEEK];

/// Root-level aggregate for one time category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalNode {
    pub category_id: CategoryId,
    pub minutes: i64,
    pub per_day: DayMinutes,
}

impl TotalNode {
    fn new(category_id: CategoryId) -> Self {
        Self { category_id, minutes: 0, per_day: [0; DAYS_PER_WEEK] }
    }
}

/// One task's position and minutes under a category node.
///
/// `minutes` is `None` when the task logged no direct time this round; the
/// post-pass fills it with the sum of its children, and a childless node
/// stays `None` ("no time", distinct from zero).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub task_id: TaskId,
    /// Parent task id within this category subtree; `None` for nodes sitting
    /// directly under the category node.
    pub parent: Option<TaskId>,
    /// Child task ids, in insertion order.
    pub children: Vec<TaskId>,
    pub minutes: Option<i64>,
}

/// Root-level aggregate for one time entry, owning its task sub-tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub entry: TimeEntry,
    pub minutes: i64,
    pub per_day: DayMinutes,
    nodes: HashMap<TaskId, TaskNode>,
    roots: Vec<TaskId>,
}

impl CategoryNode {
    fn new(entry: TimeEntry) -> Self {
        Self {
            entry,
            minutes: 0,
            per_day: [0; DAYS_PER_WEEK],
            nodes: HashMap::new(),
            roots: Vec::new(),
        }
    }

    pub fn node(&self, id: TaskId) -> Option<&TaskNode> {
        self.nodes.get(&id)
    }

    /// Task ids directly under this category node, in insertion order.
    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    pub fn task_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes.keys().copied()
    }

    /// Insert any missing nodes along a root-first ancestor chain.
    ///
    /// Ancestors get no minutes of their own, only structural position.
    pub(crate) fn ensure_chain(&mut self, chain: &[TaskId]) {
        let mut parent: Option<TaskId> = None;
        for &id in chain {
            if !self.nodes.contains_key(&id) {
                self.nodes.insert(
                    id,
                    TaskNode { task_id: id, parent, children: Vec::new(), minutes: None },
                );
                match parent {
                    Some(parent_id) => {
                        if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                            parent_node.children.push(id);
                        }
                    }
                    None => self.roots.push(id),
                }
            }
            parent = Some(id);
        }
    }

    /// Add directly-logged minutes to a task node.
    pub(crate) fn add_direct_minutes(&mut self, id: TaskId, minutes: i64) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.minutes = Some(node.minutes.unwrap_or(0) + minutes);
        }
    }

    /// Drop the whole task sub-tree, keeping the shell and accumulators.
    pub(crate) fn clear_tasks(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    /// Remove every task node the predicate rejects.
    ///
    /// Callers guarantee the kept set is closed under ancestry (a kept node
    /// never has a removed ancestor).
    pub(crate) fn retain_tasks(&mut self, keep: impl Fn(TaskId) -> bool) {
        self.nodes.retain(|&id, _| keep(id));
        self.roots.retain(|&id| keep(id));
        for node in self.nodes.values_mut() {
            node.children.retain(|&id| keep(id));
        }
    }

    fn reset_accumulators(&mut self) {
        self.minutes = 0;
        self.per_day = [0; DAYS_PER_WEEK];
        for node in self.nodes.values_mut() {
            node.minutes = None;
        }
    }

    /// Bottom-up fill: unset minutes become the sum of the children's
    /// minutes; childless unset nodes stay unset.
    pub(crate) fn roll_up(&mut self) {
        let roots = self.roots.clone();
        for id in roots {
            self.roll_up_node(id);
        }
    }

    fn roll_up_node(&mut self, id: TaskId) -> i64 {
        let children = match self.nodes.get(&id) {
            Some(node) => node.children.clone(),
            None => return 0,
        };
        let mut child_sum = 0;
        for child in children {
            child_sum += self.roll_up_node(child);
        }
        let Some(node) = self.nodes.get_mut(&id) else { return 0 };
        if node.minutes.is_none() && !node.children.is_empty() {
            node.minutes = Some(child_sum);
        }
        node.minutes.unwrap_or(0)
    }
}

/// The persistent aggregation tree, incrementally reconciled by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationTree {
    slot_count: usize,
    totals: BTreeMap<CategoryId, TotalNode>,
    categories: BTreeMap<TimeEntry, CategoryNode>,
}

impl AggregationTree {
    pub(crate) fn new(slot_count: usize) -> Self {
        Self {
            slot_count: slot_count.clamp(1, DAYS_PER_WEEK),
            totals: BTreeMap::new(),
            categories: BTreeMap::new(),
        }
    }

    /// Number of meaningful day slots: 1 for a daily view, 7 for weekly.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn total(&self, category_id: CategoryId) -> Option<&TotalNode> {
        self.totals.get(&category_id)
    }

    pub fn totals(&self) -> impl Iterator<Item = &TotalNode> {
        self.totals.values()
    }

    pub fn category(&self, entry: &TimeEntry) -> Option<&CategoryNode> {
        self.categories.get(entry)
    }

    pub fn categories(&self) -> impl Iterator<Item = &CategoryNode> {
        self.categories.values()
    }

    pub fn has_category(&self, entry: &TimeEntry) -> bool {
        self.categories.contains_key(entry)
    }

    /// Discard every category's task sub-tree, keeping the shells.
    pub(crate) fn clear_all_tasks(&mut self) {
        for category in self.categories.values_mut() {
            category.clear_tasks();
        }
    }

    /// Create shells for newly-seen entries/categories and drop shells whose
    /// key no longer appears in the incoming set.
    pub(crate) fn reconcile_shells(&mut self, incoming: &BTreeSet<TimeEntry>) {
        let incoming_categories: BTreeSet<CategoryId> =
            incoming.iter().map(|e| e.category_id).collect();

        self.categories.retain(|entry, _| incoming.contains(entry));
        self.totals.retain(|category_id, _| incoming_categories.contains(category_id));

        for &entry in incoming {
            if let BTreeEntry::Vacant(slot) = self.categories.entry(entry) {
                slot.insert(CategoryNode::new(entry));
            }
            if let BTreeEntry::Vacant(slot) = self.totals.entry(entry.category_id) {
                slot.insert(TotalNode::new(entry.category_id));
            }
        }
    }

    /// Zero every surviving accumulator; task minutes go back to unset.
    pub(crate) fn reset_accumulators(&mut self) {
        for total in self.totals.values_mut() {
            total.minutes = 0;
            total.per_day = [0; DAYS_PER_WEEK];
        }
        for category in self.categories.values_mut() {
            category.reset_accumulators();
        }
    }

    /// Add one session contribution under an entry: category and total
    /// accumulators plus the task node at the end of the ancestor chain.
    pub(crate) fn accumulate(
        &mut self,
        entry: &TimeEntry,
        slot: usize,
        minutes: i64,
        chain: &[TaskId],
    ) {
        let Some(category) = self.categories.get_mut(entry) else { return };
        category.minutes += minutes;
        category.per_day[slot] += minutes;
        category.ensure_chain(chain);
        if let Some(&task_id) = chain.last() {
            category.add_direct_minutes(task_id, minutes);
        }
        if let Some(total) = self.totals.get_mut(&entry.category_id) {
            total.minutes += minutes;
            total.per_day[slot] += minutes;
        }
    }

    pub(crate) fn categories_mut(
        &mut self,
    ) -> impl Iterator<Item = (&TimeEntry, &mut CategoryNode)> {
        self.categories.iter_mut()
    }

    pub(crate) fn roll_up_all(&mut self) {
        for category in self.categories.values_mut() {
            category.roll_up();
        }
    }
}

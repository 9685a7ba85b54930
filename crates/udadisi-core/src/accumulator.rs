//! Grouping of ordered occurrence rows into per-term totals.
//!
//! The occurrence source hands rows over sorted by `(timestamp, term)`.
//! In [`GroupingMode::Run`] every maximal run of equal terms becomes one
//! [`TermTotal`]; the order is a precondition and is not checked, so a
//! term split across two non-adjacent runs yields two totals.
//! [`GroupingMode::Keyed`] groups by term regardless of adjacency and
//! keeps groups in first-encounter order.
//!
//! Each row resolves to a document. The first time a document is seen
//! inside a group, its provenance is appended and *all* of its stored
//! sub-term counts are added to the group, not just the row's own count.
//! Further rows from the same document in the same group add nothing.
//!
//! ```text
//! rows:  gps(d1) gps(d1) water(d2)
//!        └── group "gps" ──┘ └ "water" ┘
//!        expand d1 once       expand d2
//! ```

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::debug;

use crate::models::{Document, Occurrence, SourceEntry, TermTotal};

/// How rows are assigned to groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// One group per contiguous run of equal terms. Requires sorted input.
    #[default]
    Run,
    /// One group per distinct term, in first-encounter order.
    Keyed,
}

impl std::str::FromStr for GroupingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" => Ok(Self::Run),
            "keyed" => Ok(Self::Keyed),
            other => Err(format!(
                "Unknown grouping mode: '{}'. Must be run or keyed.",
                other
            )),
        }
    }
}

struct Group {
    total: TermTotal,
    expanded: HashSet<i64>,
}

impl Group {
    fn new(term: &str) -> Self {
        Self {
            total: TermTotal::new(term),
            expanded: HashSet::new(),
        }
    }
}

/// Working state for one aggregation request.
///
/// Owned by a single request and consumed by [`finish`](Self::finish).
pub struct GroupingAccumulator {
    mode: GroupingMode,
    open: Vec<Group>,
    index: HashMap<String, usize>,
    active: Option<usize>,
    flushed: Vec<TermTotal>,
}

impl GroupingAccumulator {
    pub fn new(mode: GroupingMode) -> Self {
        Self {
            mode,
            open: Vec::new(),
            index: HashMap::new(),
            active: None,
            flushed: Vec::new(),
        }
    }

    /// Routes `row` to its group, flushing the current run first when the
    /// term changes in [`GroupingMode::Run`].
    ///
    /// Returns `true` when the row's document has not been expanded into
    /// that group yet, i.e. the caller should resolve the document and
    /// call [`expand`](Self::expand).
    pub fn observe(&mut self, row: &Occurrence) -> bool {
        let idx = match self.mode {
            GroupingMode::Run => {
                let changed = self
                    .open
                    .last()
                    .is_some_and(|g| g.total.term != row.term);
                if changed {
                    self.flush_open();
                }
                if self.open.is_empty() {
                    self.open.push(Group::new(&row.term));
                }
                0
            }
            GroupingMode::Keyed => match self.index.get(&row.term) {
                Some(&idx) => idx,
                None => {
                    self.open.push(Group::new(&row.term));
                    let idx = self.open.len() - 1;
                    self.index.insert(row.term.clone(), idx);
                    idx
                }
            },
        };
        self.active = Some(idx);
        !self.open[idx].expanded.contains(&row.document_id)
    }

    /// Adds `doc`'s provenance and every `(sub_term, count)` pair stored for
    /// it to the group of the most recently observed row.
    ///
    /// Does nothing if no row has been observed or the document was
    /// already expanded into that group.
    pub fn expand(&mut self, doc: &Document, terms: &[(String, i64)]) {
        let Some(group) = self.active.and_then(|idx| self.open.get_mut(idx)) else {
            return;
        };
        if !group.expanded.insert(doc.id) {
            return;
        }
        group.total.sources.push(SourceEntry::from_document(doc));
        for (sub_term, count) in terms {
            let total = group.total.counts.entry(sub_term.clone()).or_insert(0);
            *total = total.saturating_add(*count);
        }
    }

    /// Flushes any open groups and returns every completed total in order.
    ///
    /// An accumulator that never observed a row returns an empty list.
    pub fn finish(mut self) -> Vec<TermTotal> {
        self.flush_open();
        self.flushed
    }

    fn flush_open(&mut self) {
        for group in self.open.drain(..) {
            debug!(
                term = %group.total.term,
                documents = group.expanded.len(),
                "flushing term group"
            );
            self.flushed.push(group.total);
        }
        self.index.clear();
        self.active = None;
    }
}

#![forbid(unsafe_code)]

//! Per-pane navigation history.
//!
//! `entries` is the canonical list, newest first. Back/forward traversal works
//! on a frozen copy so that revisiting a path does not reorder the canonical
//! list; the copy goes away once traversal returns to the newest entry or a
//! fresh navigation happens.

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    copy: Option<Vec<String>>,
    index: usize,
    limit: usize,
}

/// Where a traversal step wants the pane to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStep {
    pub path: String,
    /// Traversal reached the newest entry and the copy was dropped.
    pub resolved: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            copy: None,
            index: 0,
            limit: limit.max(1),
        }
    }

    /// Rebuilds history from persisted paths, newest first.
    pub fn from_entries(entries: Vec<String>, limit: usize) -> Self {
        let mut history = Self::new(limit);
        for path in entries.into_iter().rev() {
            history.push_front(&path);
        }
        history
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn copy(&self) -> Option<&[String]> {
        self.copy.as_deref()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_traversing(&self) -> bool {
        self.copy.is_some()
    }

    /// Records a fresh visit and ends any traversal in progress.
    pub fn record(&mut self, path: &str) {
        self.push_front(path);
        self.copy = None;
        self.index = 0;
    }

    /// Positive `steps` go back (older), negative go forward.
    pub fn go(&mut self, steps: isize) -> Option<HistoryStep> {
        let Some(copy) = self.copy.as_ref() else {
            if steps <= 0 || self.entries.len() < 2 {
                return None;
            }
            let index = (steps as usize).min(self.entries.len() - 1);
            let copy = self.entries.clone();
            let path = copy[index].clone();
            self.copy = Some(copy);
            self.index = index;
            return Some(HistoryStep {
                path,
                resolved: false,
            });
        };

        if copy.is_empty() {
            self.copy = None;
            self.index = 0;
            return None;
        }

        let next = self.index as isize + steps;
        if next <= 0 {
            let path = copy[0].clone();
            self.copy = None;
            self.index = 0;
            return Some(HistoryStep {
                path,
                resolved: true,
            });
        }

        let next = (next as usize).min(copy.len() - 1);
        let path = copy[next].clone();
        self.index = next;
        Some(HistoryStep {
            path,
            resolved: false,
        })
    }

    /// Drops a path that could not be visited from both lists.
    pub fn prune(&mut self, path: &str) {
        self.entries.retain(|entry| entry != path);
        let Some(copy) = self.copy.as_mut() else {
            return;
        };
        if let Some(position) = copy.iter().position(|entry| entry == path) {
            copy.remove(position);
            if position < self.index {
                self.index -= 1;
            }
        }
        if copy.is_empty() {
            self.copy = None;
            self.index = 0;
        } else {
            self.index = self.index.min(copy.len() - 1);
        }
    }

    fn push_front(&mut self, path: &str) {
        if path.is_empty() {
            return;
        }
        self.entries.retain(|entry| entry != path);
        self.entries.insert(0, path.to_string());
        self.entries.truncate(self.limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visited(paths: &[&str]) -> History {
        let mut history = History::new(10);
        for path in paths {
            history.record(path);
        }
        history
    }

    #[test]
    fn record_deduplicates_and_keeps_newest_first() {
        let history = visited(&["/c", "/b", "/c", "/a"]);
        assert_eq!(history.entries(), ["/a", "/c", "/b"]);
    }

    #[test]
    fn record_respects_limit() {
        let mut history = History::new(2);
        history.record("/a");
        history.record("/b");
        history.record("/c");
        assert_eq!(history.entries(), ["/c", "/b"]);
    }

    #[test]
    fn back_and_forward_walk_the_frozen_copy() {
        // Visited C, then B, then A; A is current.
        let mut history = visited(&["/c", "/b", "/a"]);
        let canonical = history.entries().to_vec();

        let step = history.go(1).expect("back");
        assert_eq!(step.path, "/b");
        assert_eq!(history.index(), 1);
        assert_eq!(history.copy(), Some(canonical.as_slice()));

        let step = history.go(1).expect("back again");
        assert_eq!(step.path, "/c");
        assert_eq!(history.index(), 2);

        let step = history.go(-1).expect("forward");
        assert_eq!(step.path, "/b");
        assert_eq!(history.index(), 1);
        assert!(history.is_traversing());

        for _ in 0..3 {
            history.go(1);
            history.go(-1);
        }
        assert_eq!(history.entries(), canonical.as_slice());
    }

    #[test]
    fn forward_past_newest_drops_the_copy() {
        let mut history = visited(&["/c", "/b", "/a"]);
        history.go(2);
        let step = history.go(-5).expect("forward");
        assert_eq!(
            step,
            HistoryStep {
                path: "/a".to_string(),
                resolved: true
            }
        );
        assert!(!history.is_traversing());
        assert_eq!(history.index(), 0);
    }

    #[test]
    fn back_clamps_to_oldest_entry() {
        let mut history = visited(&["/b", "/a"]);
        assert_eq!(history.go(7).map(|s| s.path), Some("/b".to_string()));
        assert_eq!(history.go(1).map(|s| s.path), Some("/b".to_string()));
        assert_eq!(history.index(), 1);
    }

    #[test]
    fn traversal_needs_two_entries_and_a_backward_first_step() {
        let mut history = visited(&["/a"]);
        assert_eq!(history.go(1), None);

        let mut history = visited(&["/b", "/a"]);
        assert_eq!(history.go(-1), None);
        assert_eq!(history.go(0), None);
        assert!(!history.is_traversing());
    }

    #[test]
    fn fresh_visit_discards_copy() {
        let mut history = visited(&["/c", "/b", "/a"]);
        history.go(1);
        history.record("/d");
        assert!(!history.is_traversing());
        assert_eq!(history.entries(), ["/d", "/a", "/b", "/c"]);
    }

    #[test]
    fn prune_adjusts_index_only_for_earlier_entries() {
        let mut history = visited(&["/d", "/c", "/b", "/a"]);
        history.go(2);
        assert_eq!(history.index(), 2);

        history.prune("/a");
        assert_eq!(history.index(), 1);
        assert_eq!(history.copy().map(<[String]>::len), Some(3));
        assert!(!history.entries().contains(&"/a".to_string()));

        history.prune("/d");
        assert_eq!(history.index(), 1);
        assert_eq!(
            history.copy(),
            Some(["/b".to_string(), "/c".to_string()].as_slice())
        );
    }

    #[test]
    fn from_entries_preserves_persisted_order() {
        let history = History::from_entries(
            vec!["/a".into(), "/b".into(), "/a".into(), "".into()],
            10,
        );
        assert_eq!(history.entries(), ["/a", "/b"]);
    }
}

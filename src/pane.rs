#![forbid(unsafe_code)]

//! State of one directory frame.
//!
//! The pane owns every field of its frame. Sorted and filtered views are
//! derived on read; the active entry is tracked by name so that re-sorting or
//! filtering never moves it to a different file.

use std::collections::{BTreeSet, HashSet};

use crate::filter::EntryFilter;
use crate::grid::{GridCursor, Motion};
use crate::history::{History, HistoryStep};
use crate::model::{
    Entry, FrameId, Mode, PARENT_ENTRY, SortCriterion, SortField, Update, VirtualOverlay,
};
use crate::paths::{child_on_path, parent_path};
use crate::sort::sort_entries;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneLayout {
    pub gallery_columns: usize,
    pub rows_per_page: usize,
}

impl Default for PaneLayout {
    fn default() -> Self {
        Self {
            gallery_columns: 4,
            rows_per_page: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pane {
    frame: FrameId,
    current_path: String,
    raw_entries: Vec<Entry>,
    sort: SortCriterion,
    filter: EntryFilter,
    overlay: Option<VirtualOverlay>,
    active_name: String,
    selected: HashSet<String>,
    modes: BTreeSet<Mode>,
    history: History,
    scroll: usize,
    layout: PaneLayout,
}

impl Pane {
    pub fn new(frame: FrameId, history: History, layout: PaneLayout) -> Self {
        Self {
            frame,
            current_path: String::new(),
            raw_entries: Vec::new(),
            sort: SortCriterion::default(),
            filter: EntryFilter::default(),
            overlay: None,
            active_name: PARENT_ENTRY.to_string(),
            selected: HashSet::new(),
            modes: BTreeSet::new(),
            history,
            scroll: 0,
            layout,
        }
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Directory that holds what the pane shows; outside an archive this is
    /// the current path.
    pub fn real_dir(&self) -> String {
        match &self.overlay {
            Some(overlay) => {
                parent_path(&overlay.archive_path).unwrap_or_else(|| overlay.archive_path.clone())
            }
            None => self.current_path.clone(),
        }
    }

    pub fn raw_entries(&self) -> &[Entry] {
        &self.raw_entries
    }

    pub fn sort(&self) -> SortCriterion {
        self.sort
    }

    pub fn filter_pattern(&self) -> &str {
        self.filter.pattern()
    }

    pub fn overlay(&self) -> Option<&VirtualOverlay> {
        self.overlay.as_ref()
    }

    pub fn active_name(&self) -> &str {
        &self.active_name
    }

    pub fn modes(&self) -> &BTreeSet<Mode> {
        &self.modes
    }

    pub fn has_mode(&self, mode: Mode) -> bool {
        self.modes.contains(&mode)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn layout(&self) -> PaneLayout {
        self.layout
    }

    pub fn columns(&self) -> usize {
        if self.has_mode(Mode::Gallery) {
            self.layout.gallery_columns.max(1)
        } else {
            1
        }
    }

    pub fn sorted_view(&self) -> Vec<&Entry> {
        sort_entries(&self.raw_entries, self.sort)
    }

    pub fn filtered_view(&self) -> Vec<&Entry> {
        self.filter.apply(self.sorted_view())
    }

    /// Position of the active entry in the filtered view.
    pub fn active_index(&self) -> Option<usize> {
        self.filtered_view()
            .iter()
            .position(|entry| entry.name == self.active_name)
    }

    pub fn active_entry(&self) -> Option<&Entry> {
        self.filtered_view()
            .into_iter()
            .find(|entry| entry.name == self.active_name)
    }

    /// Makes the active entry name a visible entry again.
    pub fn repair_active(&mut self) {
        if self.active_index().is_none() {
            self.active_name = self.first_visible_name();
        }
        self.ensure_visible();
    }

    pub fn set_active(&mut self, name: &str) -> bool {
        let visible = self.filtered_view().iter().any(|entry| entry.name == name);
        if visible {
            self.active_name = name.to_string();
            self.ensure_visible();
        }
        visible
    }

    /// Replaces the listing after a navigation. Transient state (filter,
    /// selection, scroll) is rebuilt; history is left to the caller.
    pub fn show_listing(
        &mut self,
        path: String,
        entries: Vec<Entry>,
        overlay: Option<VirtualOverlay>,
    ) {
        let came_from = child_on_path(&path, &self.current_path);
        self.current_path = path;
        self.raw_entries = entries;
        self.overlay = overlay;
        if self.overlay.is_some() {
            self.modes.insert(Mode::VirtualDir);
        } else {
            self.modes.remove(&Mode::VirtualDir);
        }
        self.filter = EntryFilter::default();
        self.modes.remove(&Mode::Filter);
        self.selected.clear();
        self.scroll = 0;
        self.active_name = came_from
            .filter(|name| self.raw_entries.iter().any(|entry| &entry.name == name))
            .unwrap_or_else(|| PARENT_ENTRY.to_string());
        self.repair_active();
    }

    /// Records a fresh visit, ending any history traversal.
    pub fn record_visit(&mut self, path: &str) {
        self.history.record(path);
        self.modes.remove(&Mode::History);
    }

    pub fn history_step(&mut self, steps: isize) -> Option<HistoryStep> {
        let step = self.history.go(steps)?;
        if step.resolved {
            self.modes.remove(&Mode::History);
        } else {
            self.modes.insert(Mode::History);
        }
        Some(step)
    }

    pub fn prune_history(&mut self, path: &str) {
        self.history.prune(path);
        if !self.history.is_traversing() {
            self.modes.remove(&Mode::History);
        }
    }

    pub fn move_cursor(&mut self, motion: Motion) -> bool {
        let total = self.filtered_view().len();
        let current = match self.active_index() {
            Some(index) => index,
            None => {
                self.repair_active();
                self.active_index().unwrap_or(0)
            }
        };
        let cursor = GridCursor::new(total, self.columns());
        let Some(next) = cursor.apply(current, motion, self.layout.rows_per_page) else {
            return false;
        };
        let Some(name) = self.filtered_view().get(next).map(|entry| entry.name.clone()) else {
            return false;
        };
        self.active_name = name;
        self.ensure_visible();
        next != current
    }

    pub fn set_rows_per_page(&mut self, rows: usize) {
        self.layout.rows_per_page = rows.max(1);
        self.ensure_visible();
    }

    /// Keeps the active row inside the scrolled window.
    pub fn ensure_visible(&mut self) {
        let view_height = self.layout.rows_per_page;
        if view_height == 0 {
            return;
        }
        let Some(index) = self.active_index() else {
            self.scroll = 0;
            return;
        };
        let row = index / self.columns();
        if row < self.scroll {
            self.scroll = row;
        } else if row >= self.scroll + view_height {
            self.scroll = row.saturating_sub(view_height - 1);
        }
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.contains(name)
    }

    /// Selected names in view order.
    pub fn selected_names(&self) -> Vec<String> {
        self.filtered_view()
            .into_iter()
            .filter(|entry| self.selected.contains(&entry.name))
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// The selection, or the active entry when nothing is selected.
    pub fn targeted_names(&self) -> Vec<String> {
        let selected = self.selected_names();
        if !selected.is_empty() {
            return selected;
        }
        self.active_entry()
            .filter(|entry| !entry.is_parent())
            .map(|entry| entry.name.clone())
            .into_iter()
            .collect()
    }

    pub fn toggle_by_name(&mut self, name: &str) -> bool {
        if !self.selectable_names().contains(name) {
            return false;
        }
        if !self.selected.remove(name) {
            self.selected.insert(name.to_string());
        }
        true
    }

    pub fn toggle_by_index(&mut self, index: usize) -> bool {
        let Some(name) = self.filtered_view().get(index).map(|entry| entry.name.clone()) else {
            return false;
        };
        self.toggle_by_name(&name)
    }

    pub fn select_all(&mut self) {
        self.selected = self.selectable_names();
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    pub fn invert_all(&mut self) {
        self.selected = self
            .selectable_names()
            .into_iter()
            .filter(|name| !self.selected.contains(name))
            .collect();
    }

    /// Replaces the selection as a whole, or not at all.
    pub fn replace_selection<I>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        let selectable = self.selectable_names();
        let next: HashSet<String> = names.into_iter().collect();
        if !next.is_subset(&selectable) {
            tracing::debug!(frame = %self.frame, "rejecting selection outside the visible entries");
            return false;
        }
        self.selected = next;
        true
    }

    pub fn set_sort(&mut self, field: SortField) {
        self.sort.field = field;
        self.ensure_visible();
    }

    pub fn cycle_order(&mut self) {
        self.sort.order = self.sort.order.flip();
        self.ensure_visible();
    }

    pub fn clear_sort(&mut self) {
        self.update_sort(Update::ResetToDefault);
    }

    pub fn cycle_dir_position(&mut self) {
        self.sort.dir_position = self.sort.dir_position.cycle();
        self.ensure_visible();
    }

    pub fn update_sort(&mut self, update: Update<SortCriterion>) {
        self.sort = match update {
            Update::Set(criterion) => criterion,
            Update::ResetToDefault => SortCriterion::default(),
        };
        self.ensure_visible();
    }

    pub fn update_filter(&mut self, update: Update<String>) {
        self.filter = match update {
            Update::Set(pattern) => EntryFilter::new(pattern),
            Update::ResetToDefault => EntryFilter::default(),
        };
        if self.filter.is_active() {
            self.modes.insert(Mode::Filter);
        } else {
            self.modes.remove(&Mode::Filter);
        }
        self.prune_selection();
        self.scroll = 0;
        self.repair_active();
    }

    /// Toggles a user mode; modes owned by pane operations are refused.
    pub fn toggle_mode(&mut self, mode: Mode) -> bool {
        if mode.is_derived() {
            return false;
        }
        if !self.modes.remove(&mode) {
            self.modes.insert(mode);
        }
        self.ensure_visible();
        true
    }

    pub(crate) fn replace_entries(&mut self, entries: Vec<Entry>) {
        self.raw_entries = entries;
    }

    pub(crate) fn force_active(&mut self, name: String) {
        self.active_name = name;
    }

    /// Drops selected names that are no longer visible.
    pub(crate) fn prune_selection(&mut self) {
        let selectable = self.selectable_names();
        self.selected.retain(|name| selectable.contains(name));
    }

    fn selectable_names(&self) -> HashSet<String> {
        self.filtered_view()
            .into_iter()
            .filter(|entry| !entry.is_parent() && !entry.name.is_empty())
            .map(|entry| entry.name.clone())
            .collect()
    }

    fn first_visible_name(&self) -> String {
        self.filtered_view()
            .into_iter()
            .find(|entry| !entry.is_parent())
            .or_else(|| self.filtered_view().into_iter().next())
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| PARENT_ENTRY.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;
    use crate::model::{ArchiveKind, DirPosition, SortOrder};

    fn file(name: &str) -> Entry {
        Entry::new(name, "-rw-r--r--")
    }

    fn loaded(names: &[&str]) -> Pane {
        let mut pane = Pane::new(FrameId::A, History::default(), PaneLayout::default());
        let mut entries = vec![Entry::parent()];
        entries.extend(names.iter().map(|name| file(name)));
        pane.show_listing("/work".to_string(), entries, None);
        pane
    }

    fn view(pane: &Pane) -> Vec<String> {
        pane.filtered_view().iter().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn listing_positions_on_the_child_we_came_from() {
        let mut pane = Pane::new(FrameId::A, History::default(), PaneLayout::default());
        pane.show_listing("/work/src/deep".to_string(), vec![Entry::parent()], None);
        pane.show_listing(
            "/work".to_string(),
            vec![Entry::parent(), Entry::new("src", "drwxr-xr-x"), file("x")],
            None,
        );
        assert_eq!(pane.active_name(), "src");

        pane.show_listing("/other".to_string(), vec![Entry::parent(), file("y")], None);
        assert_eq!(pane.active_name(), "..");
    }

    #[test]
    fn navigation_resets_transient_state() {
        let mut pane = loaded(&["a", "b"]);
        pane.select_all();
        pane.update_filter(Update::Set("a".to_string()));
        assert!(pane.has_mode(Mode::Filter));

        pane.show_listing("/work/a".to_string(), vec![Entry::parent(), file("z")], None);
        assert!(pane.selected_names().is_empty());
        assert_eq!(pane.filter_pattern(), "");
        assert!(!pane.has_mode(Mode::Filter));
    }

    #[test]
    fn overlay_sets_and_clears_virtual_dir_mode() {
        let mut pane = loaded(&["x.zip"]);
        let overlay = VirtualOverlay {
            archive_path: "/work/x.zip".to_string(),
            archive_kind: ArchiveKind::Zip,
            inner_path: String::new(),
        };
        pane.show_listing("/work/x.zip".to_string(), vec![Entry::parent()], Some(overlay));
        assert!(pane.has_mode(Mode::VirtualDir));
        assert_eq!(pane.real_dir(), "/work");

        pane.show_listing("/work".to_string(), vec![Entry::parent(), file("x.zip")], None);
        assert!(!pane.has_mode(Mode::VirtualDir));
        assert!(pane.overlay().is_none());
        assert_eq!(pane.active_name(), "x.zip");
    }

    #[test]
    fn selection_never_contains_parent_or_hidden_names() {
        let mut pane = loaded(&["a", "b", "c"]);
        assert!(!pane.toggle_by_name(".."));
        assert!(!pane.toggle_by_name(""));
        assert!(!pane.toggle_by_name("missing"));
        assert!(pane.toggle_by_index(1));
        assert_eq!(pane.selected_names(), ["a"]);

        pane.invert_all();
        assert_eq!(pane.selected_names(), ["b", "c"]);

        assert!(!pane.replace_selection(vec!["a".to_string(), "..".to_string()]));
        assert_eq!(pane.selected_names(), ["b", "c"]);
        assert!(pane.replace_selection(vec!["c".to_string()]));
        assert_eq!(pane.selected_names(), ["c"]);
    }

    #[test]
    fn filter_prunes_selection_and_moves_hidden_active_entry() {
        let mut pane = loaded(&["alpha", "beta", "gamma"]);
        pane.select_all();
        assert!(pane.set_active("beta"));

        pane.update_filter(Update::Set("a$".to_string()));
        assert_eq!(view(&pane), ["..", "alpha", "beta", "gamma"]);

        pane.update_filter(Update::Set("^g".to_string()));
        assert_eq!(view(&pane), ["..", "gamma"]);
        assert_eq!(pane.selected_names(), ["gamma"]);
        assert_eq!(pane.active_name(), "gamma");

        pane.update_filter(Update::ResetToDefault);
        assert_eq!(pane.selected_names(), ["gamma"]);
        assert!(!pane.has_mode(Mode::Filter));
    }

    #[test]
    fn sort_changes_keep_the_active_name() {
        let mut pane = loaded(&["a", "b", "c"]);
        pane.set_active("a");
        pane.cycle_order();
        assert_eq!(view(&pane), ["..", "c", "b", "a"]);
        assert_eq!(pane.active_index(), Some(3));

        pane.update_sort(Update::Set(SortCriterion {
            field: SortField::Name,
            order: SortOrder::Asc,
            dir_position: DirPosition::Bottom,
        }));
        pane.clear_sort();
        assert_eq!(pane.sort(), SortCriterion::default());
        assert_eq!(pane.active_index(), Some(1));
    }

    #[test]
    fn gallery_mode_moves_in_columns() {
        let names: Vec<String> = (0..9).map(|i| format!("f{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut pane = loaded(&refs);
        assert!(pane.toggle_mode(Mode::Gallery));
        pane.set_active("f1");
        let down = Motion::Step {
            direction: Direction::Down,
            count: 1,
            wrap: false,
        };
        assert!(pane.move_cursor(down));
        assert_eq!(pane.active_name(), "f5");

        assert!(!pane.toggle_mode(Mode::History));
    }

    #[test]
    fn scroll_follows_the_cursor() {
        let names: Vec<String> = (0..30).map(|i| format!("f{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut pane = loaded(&refs);
        pane.set_rows_per_page(10);
        pane.move_cursor(Motion::End);
        assert_eq!(pane.active_index(), Some(30));
        assert_eq!(pane.scroll(), 21);
        pane.move_cursor(Motion::Home);
        assert_eq!(pane.scroll(), 0);
    }

    #[test]
    fn targeted_names_fall_back_to_the_active_entry() {
        let mut pane = loaded(&["a", "b"]);
        assert!(pane.targeted_names().is_empty());
        pane.set_active("b");
        assert_eq!(pane.targeted_names(), ["b"]);
        pane.toggle_by_name("a");
        assert_eq!(pane.targeted_names(), ["a"]);
    }
}

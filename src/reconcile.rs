#![forbid(unsafe_code)]

//! Applies directory-change pushes to pane state.

use std::collections::HashSet;

use crate::model::{Entry, PARENT_ENTRY};
use crate::pane::Pane;

/// Whether a `DIR_UPDATE` for `path` concerns this pane. Archive listings are
/// not watched, so a pane inside an overlay never matches.
pub fn applies_to(pane: &Pane, path: &str) -> bool {
    pane.overlay().is_none() && pane.current_path() == path
}

/// Replaces the listing in place, keeping the cursor near where it was.
///
/// When the active entry disappears, the cursor moves to the nearest entry that
/// preceded it in the old sorted order and is still visible, or to `..`.
pub fn apply_dir_update(pane: &mut Pane, entries: Vec<Entry>) {
    let old_sorted: Vec<String> = pane
        .sorted_view()
        .iter()
        .map(|entry| entry.name.clone())
        .collect();
    let old_active = pane.active_name().to_string();

    pane.replace_entries(entries);

    let visible: HashSet<String> = pane
        .filtered_view()
        .iter()
        .map(|entry| entry.name.clone())
        .collect();
    if !visible.contains(&old_active) {
        let replacement = old_sorted
            .iter()
            .position(|name| *name == old_active)
            .and_then(|position| {
                old_sorted[..position]
                    .iter()
                    .rev()
                    .find(|name| visible.contains(*name))
            })
            .cloned()
            .unwrap_or_else(|| PARENT_ENTRY.to_string());
        pane.force_active(replacement);
    }

    pane.prune_selection();
    pane.repair_active();
}

#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::grid::Motion;
use crate::model::{ArchiveKind, Bookmark, FrameId, Mode, Scope, SortField, Transfer, Update};
use crate::wire::BookmarkAction;

/// Everything a command handler may do to the application.
///
/// Synchronous methods touch local state only. Async methods may talk to the
/// service; they log their own failures and report success as a `bool`.
#[async_trait]
pub trait Capabilities: Send + Sync {
    fn active_frame(&self) -> FrameId;

    fn set_active_frame(&self, frame: FrameId);

    fn scope(&self) -> Scope;

    fn set_scope(&self, scope: Scope);

    fn modes(&self, frame: FrameId) -> BTreeSet<Mode>;

    fn tags(&self) -> BTreeSet<String>;

    fn move_cursor(&self, frame: FrameId, motion: Motion) -> bool;

    /// Toggles the active entry's selection.
    fn toggle_select(&self, frame: FrameId) -> bool;

    fn select_all(&self, frame: FrameId);

    fn deselect_all(&self, frame: FrameId);

    fn invert_selection(&self, frame: FrameId);

    fn set_sort(&self, frame: FrameId, field: SortField);

    fn cycle_sort_order(&self, frame: FrameId);

    fn cycle_dir_position(&self, frame: FrameId);

    fn clear_sort(&self, frame: FrameId);

    fn filter_pattern(&self, frame: FrameId) -> String;

    fn update_filter(&self, frame: FrameId, update: Update<String>);

    fn toggle_mode(&self, frame: FrameId, mode: Mode) -> bool;

    fn bookmarks(&self) -> Vec<Bookmark>;

    /// Answers the open confirmation dialog; `false` when none is open.
    fn resolve_dialog(&self, accept: bool) -> bool;

    fn cycle_dialog_focus(&self);

    async fn enter(&self, frame: FrameId) -> bool;

    async fn parent(&self, frame: FrameId) -> bool;

    async fn change_dir(&self, frame: FrameId, path: Option<String>) -> bool;

    async fn change_virtual_dir(
        &self,
        frame: FrameId,
        path: Option<String>,
        kind: Option<ArchiveKind>,
    ) -> bool;

    /// Positive steps go back in history, negative go forward.
    async fn go_history(&self, frame: FrameId, steps: isize) -> bool;

    async fn refresh(&self, frame: FrameId) -> bool;

    async fn extract_selected_entries(
        &self,
        frame: FrameId,
        paths: Option<Vec<String>>,
        kind: Option<ArchiveKind>,
    ) -> bool;

    async fn open_entry(&self, frame: FrameId, app: Option<String>) -> bool;

    async fn start_transfer(&self, frame: FrameId, transfer: Transfer) -> Option<u32>;

    async fn abort_task(&self, pid: Option<u32>) -> bool;

    async fn run_shell(&self, frame: FrameId, cmd: String) -> Option<String>;

    async fn run_user_menu(&self, frame: FrameId, index: usize) -> bool;

    async fn bookmark(&self, frame: FrameId, action: BookmarkAction, name: Option<String>) -> bool;

    async fn goto_bookmark(&self, frame: FrameId, index: usize) -> bool;

    /// Shows a confirmation dialog and waits for the answer.
    async fn confirm(&self, message: String) -> bool;
}

#![forbid(unsafe_code)]

//! Recording [`Capabilities`] stub for unit tests.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::capability::Capabilities;
use crate::grid::Motion;
use crate::model::{ArchiveKind, Bookmark, FrameId, Mode, Scope, SortField, Transfer, Update};
use crate::wire::BookmarkAction;

pub(crate) struct StubCaps {
    pub frame: Mutex<FrameId>,
    pub scope: Mutex<Scope>,
    pub modes: Mutex<BTreeSet<Mode>>,
    pub tags: Mutex<BTreeSet<String>>,
    pub filter: Mutex<String>,
    pub bookmarks: Vec<Bookmark>,
    pub calls: Mutex<Vec<String>>,
}

impl Default for StubCaps {
    fn default() -> Self {
        Self {
            frame: Mutex::new(FrameId::A),
            scope: Mutex::new(Scope::Browse),
            modes: Mutex::new(BTreeSet::new()),
            tags: Mutex::new(BTreeSet::new()),
            filter: Mutex::new(String::new()),
            bookmarks: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl StubCaps {
    pub fn with_modes(modes: &[Mode]) -> Self {
        let stub = Self::default();
        stub.modes.lock().unwrap().extend(modes.iter().copied());
        stub
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl Capabilities for StubCaps {
    fn active_frame(&self) -> FrameId {
        *self.frame.lock().unwrap()
    }

    fn set_active_frame(&self, frame: FrameId) {
        self.record(format!("set_active_frame {frame}"));
        *self.frame.lock().unwrap() = frame;
    }

    fn scope(&self) -> Scope {
        *self.scope.lock().unwrap()
    }

    fn set_scope(&self, scope: Scope) {
        self.record(format!("set_scope {scope}"));
        *self.scope.lock().unwrap() = scope;
    }

    fn modes(&self, _frame: FrameId) -> BTreeSet<Mode> {
        self.modes.lock().unwrap().clone()
    }

    fn tags(&self) -> BTreeSet<String> {
        self.tags.lock().unwrap().clone()
    }

    fn move_cursor(&self, frame: FrameId, motion: Motion) -> bool {
        self.record(format!("move_cursor {frame} {motion:?}"));
        true
    }

    fn toggle_select(&self, frame: FrameId) -> bool {
        self.record(format!("toggle_select {frame}"));
        true
    }

    fn select_all(&self, frame: FrameId) {
        self.record(format!("select_all {frame}"));
    }

    fn deselect_all(&self, frame: FrameId) {
        self.record(format!("deselect_all {frame}"));
    }

    fn invert_selection(&self, frame: FrameId) {
        self.record(format!("invert_selection {frame}"));
    }

    fn set_sort(&self, frame: FrameId, field: SortField) {
        self.record(format!("set_sort {frame} {field:?}"));
    }

    fn cycle_sort_order(&self, frame: FrameId) {
        self.record(format!("cycle_sort_order {frame}"));
    }

    fn cycle_dir_position(&self, frame: FrameId) {
        self.record(format!("cycle_dir_position {frame}"));
    }

    fn clear_sort(&self, frame: FrameId) {
        self.record(format!("clear_sort {frame}"));
    }

    fn filter_pattern(&self, _frame: FrameId) -> String {
        self.filter.lock().unwrap().clone()
    }

    fn update_filter(&self, frame: FrameId, update: Update<String>) {
        self.record(format!("update_filter {frame} {update:?}"));
        *self.filter.lock().unwrap() = match update {
            Update::Set(pattern) => pattern,
            Update::ResetToDefault => String::new(),
        };
    }

    fn toggle_mode(&self, frame: FrameId, mode: Mode) -> bool {
        self.record(format!("toggle_mode {frame} {mode}"));
        true
    }

    fn bookmarks(&self) -> Vec<Bookmark> {
        self.bookmarks.clone()
    }

    fn resolve_dialog(&self, accept: bool) -> bool {
        self.record(format!("resolve_dialog {accept}"));
        true
    }

    fn cycle_dialog_focus(&self) {
        self.record("cycle_dialog_focus");
    }

    async fn enter(&self, frame: FrameId) -> bool {
        self.record(format!("enter {frame}"));
        true
    }

    async fn parent(&self, frame: FrameId) -> bool {
        self.record(format!("parent {frame}"));
        true
    }

    async fn change_dir(&self, frame: FrameId, path: Option<String>) -> bool {
        self.record(format!("change_dir {frame} {path:?}"));
        true
    }

    async fn change_virtual_dir(
        &self,
        frame: FrameId,
        path: Option<String>,
        kind: Option<ArchiveKind>,
    ) -> bool {
        self.record(format!("change_virtual_dir {frame} {path:?} {kind:?}"));
        true
    }

    async fn go_history(&self, frame: FrameId, steps: isize) -> bool {
        self.record(format!("go_history {frame} {steps}"));
        true
    }

    async fn refresh(&self, frame: FrameId) -> bool {
        self.record(format!("refresh {frame}"));
        true
    }

    async fn extract_selected_entries(
        &self,
        frame: FrameId,
        paths: Option<Vec<String>>,
        kind: Option<ArchiveKind>,
    ) -> bool {
        self.record(format!("extract {frame} {paths:?} {kind:?}"));
        true
    }

    async fn open_entry(&self, frame: FrameId, app: Option<String>) -> bool {
        self.record(format!("open_entry {frame} {app:?}"));
        true
    }

    async fn start_transfer(&self, frame: FrameId, transfer: Transfer) -> Option<u32> {
        self.record(format!("start_transfer {frame} {}", transfer.cmd()));
        Some(1)
    }

    async fn abort_task(&self, pid: Option<u32>) -> bool {
        self.record(format!("abort_task {pid:?}"));
        true
    }

    async fn run_shell(&self, frame: FrameId, cmd: String) -> Option<String> {
        self.record(format!("run_shell {frame} {cmd}"));
        Some(String::new())
    }

    async fn run_user_menu(&self, frame: FrameId, index: usize) -> bool {
        self.record(format!("run_user_menu {frame} {index}"));
        true
    }

    async fn bookmark(&self, frame: FrameId, action: BookmarkAction, name: Option<String>) -> bool {
        self.record(format!("bookmark {frame} {action:?} {name:?}"));
        true
    }

    async fn goto_bookmark(&self, frame: FrameId, index: usize) -> bool {
        self.record(format!("goto_bookmark {frame} {index}"));
        true
    }

    async fn confirm(&self, message: String) -> bool {
        self.record(format!("confirm {message}"));
        true
    }
}

#![forbid(unsafe_code)]

//! The composed client: both panes, the dispatcher, dialogs and tasks behind
//! one cheaply cloneable handle.
//!
//! All state lives in one [`AppState`] behind a std mutex. Every method takes
//! the lock for one synchronous batch and releases it before talking to the
//! service, so no guard is ever held across an `.await`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use crossterm::event::KeyEvent;
use serde_json::Value;
use tokio::sync::{oneshot, watch};

use crate::capability::Capabilities;
use crate::channel::{Channel, ListenerId};
use crate::commands;
use crate::config::Config;
use crate::dispatch::{Dispatcher, KeyOutcome};
use crate::error::{AppError, RequestError};
use crate::grid::Motion;
use crate::history::History;
use crate::keymap::{KeyCombo, Keymap};
use crate::model::{
    ArchiveKind, Bookmark, Entry, FrameId, Mode, Scope, SortCriterion, SortField, Transfer,
    Update, UserMenuItem, VirtualOverlay,
};
use crate::pane::{Pane, PaneLayout};
use crate::paths::{file_name, inner_join, join_path, normalize_path, overlay_path, parent_path};
use crate::reconcile::{applies_to, apply_dir_update};
use crate::session::{FrameSession, SessionState, SessionStore};
use crate::tasks::{TaskRegistry, TaskState};
use crate::usermenu::{ensure_user_menu_file, load_user_menu};
use crate::wire::{
    BookmarkAction, Listing, OUTSIDE_ARCHIVE_ROOT, ProgressConfig, Push, PushTag,
    RemoteCommand, Reply, ShellConfig, TaskRef,
};

pub const TAG_DIALOG_OK: &str = "dialog-ok";
pub const TAG_DIALOG_CANCEL: &str = "dialog-cancel";

const PUSH_TAGS: [PushTag; 6] = [
    PushTag::DirUpdate,
    PushTag::WatchError,
    PushTag::Progress,
    PushTag::ProgressError,
    PushTag::ProgressEnd,
    PushTag::ProgressAbort,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogFocus {
    Ok,
    Cancel,
}

impl DialogFocus {
    fn tag(self) -> &'static str {
        match self {
            DialogFocus::Ok => TAG_DIALOG_OK,
            DialogFocus::Cancel => TAG_DIALOG_CANCEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogView {
    pub message: String,
    pub focus: DialogFocus,
}

struct Dialog {
    message: String,
    focus: DialogFocus,
    responder: oneshot::Sender<bool>,
    return_scope: Scope,
}

/// Everything a renderer needs to draw one pane.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneSnapshot {
    pub frame: FrameId,
    pub path: String,
    /// Filtered view, in display order.
    pub entries: Vec<Entry>,
    pub active: Option<usize>,
    pub active_name: String,
    pub selected: Vec<String>,
    pub modes: BTreeSet<Mode>,
    pub sort: SortCriterion,
    pub filter: String,
    pub overlay: Option<VirtualOverlay>,
    pub scroll: usize,
    pub columns: usize,
    pub history: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Fresh,
    History,
}

struct AppState {
    panes: BTreeMap<FrameId, Pane>,
    layout: PaneLayout,
    history_limit: usize,
    active: FrameId,
    scope: Scope,
    tags: BTreeSet<String>,
    dialog: Option<Dialog>,
    tasks: TaskRegistry,
    bookmarks: Vec<Bookmark>,
    user_menu: Vec<UserMenuItem>,
    listeners: Vec<(PushTag, ListenerId)>,
}

impl AppState {
    fn pane_mut(&mut self, frame: FrameId) -> &mut Pane {
        let (layout, limit) = (self.layout, self.history_limit);
        self.panes
            .entry(frame)
            .or_insert_with(|| Pane::new(frame, History::new(limit), layout))
    }

    fn pane(&mut self, frame: FrameId) -> &Pane {
        self.pane_mut(frame)
    }
}

struct AppInner {
    config: Config,
    channel: Channel,
    dispatcher: Dispatcher,
    session: SessionStore,
    start_paths: BTreeMap<FrameId, String>,
    state: Mutex<AppState>,
    revision: watch::Sender<u64>,
}

#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

impl App {
    /// Builds the client over an already connected channel, reading the
    /// keymap override from the state directory.
    pub fn start(config: Config, channel: Channel) -> Result<Self, AppError> {
        let keymap = Keymap::load(&config.keymap_path())?;
        Self::with_keymap(config, channel, keymap)
    }

    pub fn with_keymap(config: Config, channel: Channel, keymap: Keymap) -> Result<Self, AppError> {
        let session = SessionStore::new(config.session_path());
        let saved = session.load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load session from {}: {}", session.path().display(), e);
            SessionState::default()
        });

        let layout = config.layout();
        let mut panes = BTreeMap::new();
        let mut start_paths = BTreeMap::new();
        for frame in FrameId::ALL {
            let saved_frame = saved.frame(frame).cloned().unwrap_or_default();
            let start = saved_frame
                .last_path
                .clone()
                .or_else(|| saved_frame.history.first().cloned())
                .unwrap_or_else(|| config.home.clone());
            let history = History::from_entries(saved_frame.history, config.history_limit);
            panes.insert(frame, Pane::new(frame, history, layout));
            start_paths.insert(frame, start);
        }

        let menu_path = config.user_menu_path();
        if let Err(e) = ensure_user_menu_file(&menu_path) {
            tracing::warn!("Failed to create user menu {}: {}", menu_path.display(), e);
        }
        let user_menu = load_user_menu(&menu_path);

        let dispatcher = Dispatcher::new(keymap, commands::builtin());
        dispatcher.bind(Scope::Browse);
        let (revision, _) = watch::channel(0u64);

        let state = AppState {
            panes,
            layout,
            history_limit: config.history_limit,
            active: FrameId::A,
            scope: Scope::Browse,
            tags: BTreeSet::new(),
            dialog: None,
            tasks: TaskRegistry::new(),
            bookmarks: Vec::new(),
            user_menu,
            listeners: Vec::new(),
        };
        let inner = Arc::new(AppInner {
            config,
            channel,
            dispatcher,
            session,
            start_paths,
            state: Mutex::new(state),
            revision,
        });

        let mut listeners = Vec::with_capacity(PUSH_TAGS.len());
        for tag in PUSH_TAGS {
            let weak: Weak<AppInner> = Arc::downgrade(&inner);
            let id = inner.channel.register_listener(tag, move |push| {
                if let Some(inner) = weak.upgrade() {
                    App { inner }.handle_push(push);
                }
            })?;
            listeners.push((tag, id));
        }

        let app = Self { inner };
        app.lock().listeners = listeners;
        tracing::info!("client ready");
        Ok(app)
    }

    /// Lists the start directory of each frame and fetches bookmarks.
    pub async fn load_panes(&self) -> bool {
        let mut ok = true;
        for frame in FrameId::ALL {
            let path = self
                .inner
                .start_paths
                .get(&frame)
                .cloned()
                .unwrap_or_else(|| self.inner.config.home.clone());
            ok &= self.navigate_dir(frame, path).await;
        }
        let active = self.active_frame();
        ok &= self.bookmark(active, BookmarkAction::Get, None).await;
        ok
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn channel(&self) -> &Channel {
        &self.inner.channel
    }

    /// Receives the revision number bumped after every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub fn snapshot(&self, frame: FrameId) -> PaneSnapshot {
        let mut state = self.lock();
        let pane = state.pane(frame);
        PaneSnapshot {
            frame,
            path: pane.current_path().to_string(),
            entries: pane.filtered_view().into_iter().cloned().collect(),
            active: pane.active_index(),
            active_name: pane.active_name().to_string(),
            selected: pane.selected_names(),
            modes: pane.modes().clone(),
            sort: pane.sort(),
            filter: pane.filter_pattern().to_string(),
            overlay: pane.overlay().cloned(),
            scroll: pane.scroll(),
            columns: pane.columns(),
            history: pane.history().entries().to_vec(),
        }
    }

    pub fn dialog(&self) -> Option<DialogView> {
        self.lock().dialog.as_ref().map(|dialog| DialogView {
            message: dialog.message.clone(),
            focus: dialog.focus,
        })
    }

    pub fn tasks(&self) -> Vec<TaskState> {
        self.lock().tasks.list()
    }

    pub fn evict_finished_tasks(&self) -> usize {
        self.update(|state| state.tasks.evict_finished())
    }

    pub fn user_menu(&self) -> Vec<UserMenuItem> {
        self.lock().user_menu.clone()
    }

    pub fn active_commands(&self) -> BTreeMap<String, Vec<String>> {
        self.inner.dispatcher.active_commands()
    }

    /// Viewport height in rows, for both panes.
    pub fn resize(&self, rows: usize) {
        self.update(|state| {
            for frame in FrameId::ALL {
                state.pane_mut(frame).set_rows_per_page(rows);
            }
        });
    }

    pub async fn handle_key(&self, event: KeyEvent) -> KeyOutcome {
        match KeyCombo::from_event(event) {
            Some(combo) => self.handle_combo(combo).await,
            None => KeyOutcome::Propagate,
        }
    }

    /// Dispatches a combo; unbound printable keys extend the filter while it is open.
    pub async fn handle_combo(&self, combo: KeyCombo) -> KeyOutcome {
        let outcome = self.inner.dispatcher.dispatch(combo, self).await;
        if outcome == KeyOutcome::Consumed || self.scope() != Scope::Filter {
            return outcome;
        }
        let Some(ch) = combo.printable() else {
            return outcome;
        };
        let frame = self.active_frame();
        let mut pattern = self.filter_pattern(frame);
        pattern.push(ch);
        self.update_filter(frame, Update::Set(pattern));
        KeyOutcome::Consumed
    }

    /// Saves the session and drops the push listeners.
    pub fn shutdown(&self) {
        self.persist_session();
        let listeners = std::mem::take(&mut self.lock().listeners);
        for (tag, id) in listeners {
            if let Err(e) = self.inner.channel.remove_listener(tag, id) {
                tracing::debug!("listener {} already gone: {}", id, e);
            }
        }
    }

    pub fn persist_session(&self) {
        let session = {
            let state = self.lock();
            let frames = state
                .panes
                .iter()
                .map(|(frame, pane)| {
                    let dir = pane.real_dir();
                    let saved = FrameSession {
                        last_path: (!dir.is_empty()).then_some(dir),
                        history: pane.history().entries().to_vec(),
                    };
                    (*frame, saved)
                })
                .collect();
            SessionState {
                saved_at: None,
                frames,
            }
        };
        if let Err(e) = self.inner.session.save(&session) {
            tracing::warn!("Failed to save session: {}", e);
        }
    }

    fn handle_push(&self, push: &Push) {
        match push {
            Push::DirUpdate(listing) => {
                self.update(|state| {
                    for pane in state.panes.values_mut() {
                        if applies_to(pane, &listing.path) {
                            tracing::debug!(frame = %pane.frame(), path = %listing.path, "directory changed");
                            apply_dir_update(pane, listing.entries.clone());
                        }
                    }
                });
            }
            Push::WatchError(failure) => {
                let frames: Vec<FrameId> = self
                    .lock()
                    .panes
                    .values()
                    .filter(|pane| applies_to(pane, &failure.path))
                    .map(Pane::frame)
                    .collect();
                for frame in frames {
                    tracing::warn!(
                        frame = %frame,
                        "Watch failed for {} ({}): {}",
                        failure.path,
                        failure.code,
                        failure.msg
                    );
                    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                        tracing::error!("no runtime to leave {}", failure.path);
                        continue;
                    };
                    let app = self.clone();
                    let path = failure.path.clone();
                    runtime.spawn(async move {
                        app.fall_back_home(frame, &path).await;
                    });
                }
            }
            Push::Progress(_)
            | Push::ProgressError(_)
            | Push::ProgressEnd(_)
            | Push::ProgressAbort(_) => {
                self.update(|state| state.tasks.apply(push));
            }
        }
    }

    /// Runs `cd` and shows the result. Errors are returned untouched.
    async fn try_change_dir(
        &self,
        frame: FrameId,
        path: String,
        visit: Visit,
    ) -> Result<(), RequestError> {
        let cwd = self.cwd(frame);
        let reply = self
            .inner
            .channel
            .request(RemoteCommand::Cd { path: path.clone() }, &cwd, frame)
            .await?;
        let listing: Listing = reply.decode().map_err(RequestError::Decode)?;
        let shown = if listing.path.is_empty() {
            path
        } else {
            listing.path
        };
        self.update(|state| {
            let pane = state.pane_mut(frame);
            pane.show_listing(shown.clone(), listing.entries, None);
            if visit == Visit::Fresh {
                pane.record_visit(&shown);
            }
        });
        self.persist_session();
        Ok(())
    }

    /// Fresh navigation to a real directory, going home on failure.
    async fn navigate_dir(&self, frame: FrameId, path: String) -> bool {
        if path.is_empty() {
            tracing::info!("nothing to open");
            return false;
        }
        match self.try_change_dir(frame, path.clone(), Visit::Fresh).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(frame = %frame, "Failed to open {}: {}", path, e);
                self.fall_back_home(frame, &path).await;
                false
            }
        }
    }

    async fn fall_back_home(&self, frame: FrameId, failed: &str) {
        let home = self.inner.config.home.clone();
        if failed == home {
            tracing::error!(frame = %frame, "home directory {} is unavailable", home);
            return;
        }
        if let Err(e) = self.try_change_dir(frame, home.clone(), Visit::Fresh).await {
            tracing::error!(frame = %frame, "Failed to return home to {}: {}", home, e);
        }
    }

    fn cwd(&self, frame: FrameId) -> String {
        let dir = self.lock().pane(frame).real_dir();
        if dir.is_empty() {
            self.inner.config.home.clone()
        } else {
            dir
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one mutation batch and notifies subscribers.
    fn update<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        let result = f(&mut self.lock());
        self.inner.revision.send_modify(|revision| *revision += 1);
        result
    }
}

#[async_trait]
impl Capabilities for App {
    fn active_frame(&self) -> FrameId {
        self.lock().active
    }

    fn set_active_frame(&self, frame: FrameId) {
        self.update(|state| state.active = frame);
    }

    fn scope(&self) -> Scope {
        self.lock().scope
    }

    fn set_scope(&self, scope: Scope) {
        self.update(|state| state.scope = scope);
        self.inner.dispatcher.bind(scope);
    }

    fn modes(&self, frame: FrameId) -> BTreeSet<Mode> {
        self.lock().pane(frame).modes().clone()
    }

    fn tags(&self) -> BTreeSet<String> {
        self.lock().tags.clone()
    }

    fn move_cursor(&self, frame: FrameId, motion: Motion) -> bool {
        self.update(|state| state.pane_mut(frame).move_cursor(motion))
    }

    fn toggle_select(&self, frame: FrameId) -> bool {
        self.update(|state| {
            let pane = state.pane_mut(frame);
            let name = pane.active_name().to_string();
            pane.toggle_by_name(&name)
        })
    }

    fn select_all(&self, frame: FrameId) {
        self.update(|state| state.pane_mut(frame).select_all());
    }

    fn deselect_all(&self, frame: FrameId) {
        self.update(|state| state.pane_mut(frame).deselect_all());
    }

    fn invert_selection(&self, frame: FrameId) {
        self.update(|state| state.pane_mut(frame).invert_all());
    }

    fn set_sort(&self, frame: FrameId, field: SortField) {
        self.update(|state| state.pane_mut(frame).set_sort(field));
    }

    fn cycle_sort_order(&self, frame: FrameId) {
        self.update(|state| state.pane_mut(frame).cycle_order());
    }

    fn cycle_dir_position(&self, frame: FrameId) {
        self.update(|state| state.pane_mut(frame).cycle_dir_position());
    }

    fn clear_sort(&self, frame: FrameId) {
        self.update(|state| state.pane_mut(frame).clear_sort());
    }

    fn filter_pattern(&self, frame: FrameId) -> String {
        self.lock().pane(frame).filter_pattern().to_string()
    }

    fn update_filter(&self, frame: FrameId, update: Update<String>) {
        self.update(|state| state.pane_mut(frame).update_filter(update));
    }

    fn toggle_mode(&self, frame: FrameId, mode: Mode) -> bool {
        self.update(|state| state.pane_mut(frame).toggle_mode(mode))
    }

    fn bookmarks(&self) -> Vec<Bookmark> {
        self.lock().bookmarks.clone()
    }

    fn resolve_dialog(&self, accept: bool) -> bool {
        let dialog = self.update(|state| {
            let dialog = state.dialog.take()?;
            state.tags.remove(TAG_DIALOG_OK);
            state.tags.remove(TAG_DIALOG_CANCEL);
            state.scope = dialog.return_scope;
            Some(dialog)
        });
        let Some(dialog) = dialog else {
            return false;
        };
        self.inner.dispatcher.bind(dialog.return_scope);
        if dialog.responder.send(accept).is_err() {
            tracing::debug!("dialog answered after its caller went away");
        }
        true
    }

    fn cycle_dialog_focus(&self) {
        self.update(|state| {
            let Some(dialog) = state.dialog.as_mut() else {
                return;
            };
            let previous = dialog.focus;
            dialog.focus = match previous {
                DialogFocus::Ok => DialogFocus::Cancel,
                DialogFocus::Cancel => DialogFocus::Ok,
            };
            let next = dialog.focus;
            state.tags.remove(previous.tag());
            state.tags.insert(next.tag().to_string());
        });
    }

    async fn enter(&self, frame: FrameId) -> bool {
        enum Action {
            Parent,
            Dir,
            Archive,
            File,
        }
        let action = {
            let mut state = self.lock();
            let pane = state.pane(frame);
            let in_archive = pane.overlay().is_some();
            match pane.active_entry() {
                None => None,
                Some(entry) if entry.is_parent() => Some(Action::Parent),
                Some(entry) if entry.is_dir() => Some(Action::Dir),
                Some(entry) if !in_archive && ArchiveKind::infer(&entry.name).is_some() => {
                    Some(Action::Archive)
                }
                Some(_) => Some(Action::File),
            }
        };
        match action {
            None => {
                tracing::info!("nothing to enter");
                false
            }
            Some(Action::Parent) => self.parent(frame).await,
            Some(Action::Dir) => self.change_dir(frame, None).await,
            Some(Action::Archive) => self.change_virtual_dir(frame, None, None).await,
            Some(Action::File) => self.open_entry(frame, None).await,
        }
    }

    async fn parent(&self, frame: FrameId) -> bool {
        let (overlay, current) = {
            let mut state = self.lock();
            let pane = state.pane(frame);
            (pane.overlay().cloned(), pane.current_path().to_string())
        };
        if let Some(overlay) = overlay {
            let target = inner_join(&overlay.inner_path, "..");
            return self.change_virtual_dir(frame, Some(target), None).await;
        }
        match parent_path(&current) {
            Some(parent) => self.navigate_dir(frame, parent).await,
            None => {
                tracing::info!("{} has no parent", current);
                false
            }
        }
    }

    async fn change_dir(&self, frame: FrameId, path: Option<String>) -> bool {
        enum Target {
            Real(String),
            Parent,
            Virtual,
        }
        let target = {
            let mut state = self.lock();
            let pane = state.pane(frame);
            match path.filter(|p| !p.is_empty()) {
                Some(path) => Target::Real(normalize_path(&join_path(&pane.real_dir(), &path))),
                None if pane.overlay().is_some() => Target::Virtual,
                None => match pane.active_entry() {
                    Some(entry) if entry.is_parent() => Target::Parent,
                    Some(entry) if !entry.name.is_empty() => {
                        Target::Real(join_path(pane.current_path(), &entry.name))
                    }
                    _ => Target::Real(String::new()),
                },
            }
        };
        match target {
            Target::Real(path) => self.navigate_dir(frame, path).await,
            Target::Parent => self.parent(frame).await,
            Target::Virtual => self.change_virtual_dir(frame, None, None).await,
        }
    }

    async fn change_virtual_dir(
        &self,
        frame: FrameId,
        path: Option<String>,
        kind: Option<ArchiveKind>,
    ) -> bool {
        let plan = {
            let mut state = self.lock();
            let pane = state.pane(frame);
            match pane.overlay() {
                Some(overlay) => {
                    let inner = match path {
                        Some(path) => Some(path),
                        None => pane.active_entry().map(|entry| {
                            inner_join(&overlay.inner_path, &entry.name)
                        }),
                    };
                    inner.map(|inner| {
                        (
                            overlay.archive_path.clone(),
                            Some(kind.unwrap_or(overlay.archive_kind)),
                            inner,
                        )
                    })
                }
                None => {
                    let archive = match path {
                        Some(path) => Some(normalize_path(&join_path(pane.current_path(), &path))),
                        None => pane
                            .active_entry()
                            .filter(|entry| !entry.is_parent())
                            .map(|entry| join_path(pane.current_path(), &entry.name)),
                    };
                    archive.map(|archive| {
                        let kind = kind.or_else(|| ArchiveKind::infer(&archive));
                        (archive, kind, String::new())
                    })
                }
            }
        };
        let Some((archive, kind, inner)) = plan else {
            tracing::info!("no archive to open");
            return false;
        };
        let Some(kind) = kind else {
            tracing::warn!("Cannot tell the archive type of {}", archive);
            return false;
        };

        let cwd = self.cwd(frame);
        let command = RemoteCommand::Cvd {
            kind,
            archive: archive.clone(),
            path: inner.clone(),
            filter: self.inner.config.archive_exclude.clone(),
        };
        let result = match self.inner.channel.request(command, &cwd, frame).await {
            Ok(reply) => reply.decode::<Listing>().map_err(RequestError::Decode),
            Err(e) => Err(e),
        };
        match result {
            Ok(listing) => {
                let inner_path = listing.path.trim_matches('/').to_string();
                let shown = overlay_path(&archive, &inner_path);
                let overlay = VirtualOverlay {
                    archive_path: archive,
                    archive_kind: kind,
                    inner_path,
                };
                self.update(|state| {
                    state
                        .pane_mut(frame)
                        .show_listing(shown, listing.entries, Some(overlay));
                });
                true
            }
            Err(e) if e.remote_code() == Some(OUTSIDE_ARCHIVE_ROOT) => {
                let real = normalize_path(&join_path(&archive, &inner));
                tracing::debug!(frame = %frame, "left {} for {}", archive, real);
                self.navigate_dir(frame, real).await
            }
            Err(e) => {
                tracing::warn!(frame = %frame, "Failed to open {} inside {}: {}", inner, archive, e);
                self.fall_back_home(frame, "").await;
                false
            }
        }
    }

    async fn go_history(&self, frame: FrameId, steps: isize) -> bool {
        let step = self.update(|state| state.pane_mut(frame).history_step(steps));
        let Some(step) = step else {
            tracing::info!("no history in that direction");
            return false;
        };
        match self.try_change_dir(frame, step.path.clone(), Visit::History).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(frame = %frame, "Failed to revisit {}: {}", step.path, e);
                self.update(|state| state.pane_mut(frame).prune_history(&step.path));
                false
            }
        }
    }

    async fn refresh(&self, frame: FrameId) -> bool {
        let (overlay, current) = {
            let mut state = self.lock();
            let pane = state.pane(frame);
            (pane.overlay().cloned(), pane.current_path().to_string())
        };
        if current.is_empty() {
            let home = self.inner.config.home.clone();
            return self.navigate_dir(frame, home).await;
        }
        let command = match &overlay {
            Some(overlay) => RemoteCommand::Cvd {
                kind: overlay.archive_kind,
                archive: overlay.archive_path.clone(),
                path: overlay.inner_path.clone(),
                filter: self.inner.config.archive_exclude.clone(),
            },
            None => RemoteCommand::Cd {
                path: current.clone(),
            },
        };
        let cwd = self.cwd(frame);
        let result = match self.inner.channel.request(command, &cwd, frame).await {
            Ok(reply) => reply.decode::<Listing>().map_err(RequestError::Decode),
            Err(e) => Err(e),
        };
        match result {
            Ok(listing) => {
                self.update(|state| apply_dir_update(state.pane_mut(frame), listing.entries));
                true
            }
            Err(e) => {
                tracing::warn!(frame = %frame, "Failed to refresh {}: {}", current, e);
                self.fall_back_home(frame, &current).await;
                false
            }
        }
    }

    async fn extract_selected_entries(
        &self,
        frame: FrameId,
        paths: Option<Vec<String>>,
        kind: Option<ArchiveKind>,
    ) -> bool {
        let plan = {
            let mut state = self.lock();
            let destination = {
                let other = state.pane(frame.other());
                other
                    .overlay()
                    .is_none()
                    .then(|| other.current_path().to_string())
            };
            let pane = state.pane(frame);
            pane.overlay().cloned().map(|overlay| {
                let sources = paths.unwrap_or_else(|| {
                    pane.targeted_names()
                        .iter()
                        .map(|name| inner_join(&overlay.inner_path, name))
                        .collect()
                });
                (overlay, sources, destination, pane.real_dir())
            })
        };
        let Some((overlay, sources, destination, cwd)) = plan else {
            tracing::info!("extract works inside an archive only");
            return false;
        };
        let Some(destination) = destination.filter(|d| !d.is_empty()) else {
            tracing::info!("cannot extract into another archive");
            return false;
        };
        if sources.is_empty() {
            tracing::info!("nothing to extract");
            return false;
        }

        let count = sources.len();
        let command = RemoteCommand::Vcp {
            kind: kind.unwrap_or(overlay.archive_kind),
            archive: overlay.archive_path.clone(),
            sources,
            destination: destination.clone(),
        };
        match self.inner.channel.request(command, &cwd, frame).await {
            Ok(Reply::Success(_)) => {
                tracing::info!("extracted {} entries to {}", count, destination);
                true
            }
            Ok(Reply::Skipped(skipped)) => {
                tracing::warn!(
                    "Extracted into {} but skipped {} entries: {}",
                    destination,
                    skipped.len(),
                    skipped.join(", ")
                );
                true
            }
            Err(e) => {
                tracing::warn!("Failed to extract from {}: {}", overlay.archive_path, e);
                false
            }
        }
    }

    async fn open_entry(&self, frame: FrameId, app: Option<String>) -> bool {
        let target = {
            let mut state = self.lock();
            let pane = state.pane(frame);
            if pane.overlay().is_some() {
                None
            } else {
                pane.active_entry()
                    .filter(|entry| !entry.is_parent())
                    .map(|entry| join_path(pane.current_path(), &entry.name))
            }
        };
        let Some(path) = target else {
            tracing::info!("nothing to open");
            return false;
        };
        let cwd = self.cwd(frame);
        match self
            .inner
            .channel
            .request(RemoteCommand::Open { path: path.clone(), app }, &cwd, frame)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to open {}: {}", path, e);
                false
            }
        }
    }

    async fn start_transfer(&self, frame: FrameId, transfer: Transfer) -> Option<u32> {
        let plan = {
            let mut state = self.lock();
            let destination = match transfer {
                Transfer::Delete => None,
                Transfer::Copy | Transfer::Move => {
                    let other = state.pane(frame.other());
                    Some(
                        other
                            .overlay()
                            .is_none()
                            .then(|| other.current_path().to_string()),
                    )
                }
            };
            let pane = state.pane(frame);
            if pane.overlay().is_some() {
                None
            } else {
                let sources: Vec<String> = pane
                    .targeted_names()
                    .iter()
                    .map(|name| join_path(pane.current_path(), name))
                    .collect();
                let destination =
                    destination.unwrap_or_else(|| Some(pane.current_path().to_string()));
                Some((sources, destination, pane.real_dir()))
            }
        };
        let Some((sources, destination, cwd)) = plan else {
            tracing::info!("{} is not available inside an archive", transfer.cmd());
            return None;
        };
        let Some(destination) = destination.filter(|d| !d.is_empty()) else {
            tracing::info!("{} cannot target an archive", transfer.cmd());
            return None;
        };
        if sources.is_empty() {
            tracing::info!("nothing to {}", transfer.cmd());
            return None;
        }

        if transfer == Transfer::Delete {
            let message = match sources.as_slice() {
                [single] => format!("Delete {}?", file_name(single)),
                many => format!("Delete {} entries?", many.len()),
            };
            if !self.confirm(message).await {
                tracing::info!("delete cancelled");
                return None;
            }
        }

        let label = match sources.as_slice() {
            [single] => format!("{} {}", transfer.cmd(), file_name(single)),
            many => format!("{} {} entries", transfer.cmd(), many.len()),
        };
        let command = RemoteCommand::Progress {
            config: ProgressConfig {
                cmd: transfer.cmd().to_string(),
                total: sources.len(),
            },
            sources,
            destination,
        };
        let result = match self.inner.channel.request(command, &cwd, frame).await {
            Ok(reply) => reply.decode::<TaskRef>().map_err(RequestError::Decode),
            Err(e) => Err(e),
        };
        match result {
            Ok(task) => {
                tracing::info!(pid = task.pid, "started {}", label);
                self.update(|state| state.tasks.start(task.pid, label));
                Some(task.pid)
            }
            Err(e) => {
                tracing::warn!("Failed to start {}: {}", label, e);
                None
            }
        }
    }

    async fn abort_task(&self, pid: Option<u32>) -> bool {
        let (pid, frame) = {
            let state = self.lock();
            (pid.or_else(|| state.tasks.latest_running()), state.active)
        };
        let Some(pid) = pid else {
            tracing::info!("no running task to abort");
            return false;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!("no runtime to abort task {}", pid);
            return false;
        };
        let channel = self.inner.channel.clone();
        let cwd = self.cwd(frame);
        runtime.spawn(async move {
            if let Err(e) = channel.request(RemoteCommand::Kill { pid }, &cwd, frame).await {
                tracing::warn!(pid, "Failed to abort task: {}", e);
            }
        });
        true
    }

    async fn run_shell(&self, frame: FrameId, cmd: String) -> Option<String> {
        let plan = {
            let mut state = self.lock();
            let destination = state.pane(frame.other()).real_dir();
            let pane = state.pane(frame);
            if pane.overlay().is_some() {
                None
            } else {
                let sources: Vec<String> = pane
                    .selected_names()
                    .iter()
                    .map(|name| join_path(pane.current_path(), name))
                    .collect();
                Some((sources, destination, pane.real_dir()))
            }
        };
        let Some((sources, destination, cwd)) = plan else {
            tracing::info!("shell commands do not run inside an archive");
            return None;
        };
        let command = RemoteCommand::Sh {
            sources,
            destination,
            config: ShellConfig { cmd: cmd.clone() },
        };
        match self.inner.channel.request(command, &cwd, frame).await {
            Ok(reply) => {
                let output = match reply {
                    Reply::Success(Value::String(text)) => text,
                    Reply::Success(Value::Null) => String::new(),
                    Reply::Success(other) => other.to_string(),
                    Reply::Skipped(paths) => {
                        tracing::warn!("'{}' skipped {} entries", cmd, paths.len());
                        paths.join("\n")
                    }
                };
                tracing::info!("'{}' finished:\n{}", cmd, output);
                Some(output)
            }
            Err(e) => {
                tracing::warn!("Failed to run '{}': {}", cmd, e);
                None
            }
        }
    }

    async fn run_user_menu(&self, frame: FrameId, index: usize) -> bool {
        let item = self.lock().user_menu.get(index).cloned();
        let Some(item) = item else {
            tracing::info!("no user menu item {}", index + 1);
            return false;
        };
        tracing::debug!("running user menu item '{}'", item.label);
        self.run_shell(frame, item.command).await.is_some()
    }

    async fn bookmark(&self, frame: FrameId, action: BookmarkAction, name: Option<String>) -> bool {
        let path = self.cwd(frame);
        let name = match action {
            BookmarkAction::Get => None,
            BookmarkAction::Add => Some(name.unwrap_or_else(|| match file_name(&path) {
                "" => path.clone(),
                base => base.to_string(),
            })),
            BookmarkAction::Delete => match name {
                Some(name) => Some(name),
                None => {
                    tracing::info!("which bookmark to delete?");
                    return false;
                }
            },
        };
        let command = RemoteCommand::Bookmark {
            action,
            name,
            path: path.clone(),
        };
        let result = match self.inner.channel.request(command, &path, frame).await {
            Ok(reply) => reply.decode::<Vec<Bookmark>>().map_err(RequestError::Decode),
            Err(e) => Err(e),
        };
        match result {
            Ok(bookmarks) => {
                self.update(|state| state.bookmarks = bookmarks);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to {:?} bookmark: {}", action, e);
                false
            }
        }
    }

    async fn goto_bookmark(&self, frame: FrameId, index: usize) -> bool {
        let path = self.lock().bookmarks.get(index).map(|b| b.path.clone());
        match path {
            Some(path) => self.navigate_dir(frame, path).await,
            None => {
                tracing::info!("no bookmark {}", index + 1);
                false
            }
        }
    }

    async fn confirm(&self, message: String) -> bool {
        let receiver = {
            let mut state = self.lock();
            if state.dialog.is_some() {
                tracing::info!("a dialog is already open");
                return false;
            }
            let (responder, receiver) = oneshot::channel();
            let return_scope = state.scope;
            state.dialog = Some(Dialog {
                message,
                focus: DialogFocus::Ok,
                responder,
                return_scope,
            });
            state.tags.remove(TAG_DIALOG_CANCEL);
            state.tags.insert(TAG_DIALOG_OK.to_string());
            state.scope = Scope::Confirm;
            receiver
        };
        self.inner.dispatcher.bind(Scope::Confirm);
        self.inner.revision.send_modify(|revision| *revision += 1);
        receiver.await.unwrap_or(false)
    }
}

#![forbid(unsafe_code)]

//! Built-in commands referenced by the default keymap.
//!
//! Every command accepts an optional `frame` argument (`"a"` or `"b"`); without
//! it the command acts on the active frame.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::capability::Capabilities;
use crate::dispatch::{CommandFuture, CommandRegistry};
use crate::grid::{Direction, Motion};
use crate::model::{FrameId, Mode, Scope, SortField, Transfer, Update};
use crate::wire::BookmarkAction;

pub fn builtin() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register("cursor", cursor);
    registry.register("enter", enter);
    registry.register("parent", parent);
    registry.register("history-back", history_back);
    registry.register("history-forward", history_forward);
    registry.register("switch-frame", switch_frame);
    registry.register("toggle-select", toggle_select);
    registry.register("select-all", select_all);
    registry.register("deselect-all", deselect_all);
    registry.register("invert-selection", invert_selection);
    registry.register("sort", sort);
    registry.register("sort-order", sort_order);
    registry.register("sort-dirs", sort_dirs);
    registry.register("sort-clear", sort_clear);
    registry.register("filter-open", filter_open);
    registry.register("filter-close", filter_close);
    registry.register("filter-cancel", filter_cancel);
    registry.register("filter-backspace", filter_backspace);
    registry.register("toggle-mode", toggle_mode);
    registry.register("open", open);
    registry.register("copy", copy);
    registry.register("move", move_entries);
    registry.register("delete", delete);
    registry.register("extract", extract);
    registry.register("abort-task", abort_task);
    registry.register("user-menu", user_menu);
    registry.register("bookmark-add", bookmark_add);
    registry.register("bookmark-delete", bookmark_delete);
    registry.register("bookmark-goto", bookmark_goto);
    registry.register("dialog-accept", dialog_accept);
    registry.register("dialog-reject", dialog_reject);
    registry.register("dialog-focus", dialog_focus);
    registry.register("refresh", refresh);
    registry
}

fn frame_of(caps: &dyn Capabilities, args: &Value) -> FrameId {
    args.get("frame")
        .and_then(Value::as_str)
        .and_then(FrameId::parse)
        .unwrap_or_else(|| caps.active_frame())
}

/// Decodes command arguments; `null` means "all defaults".
fn parse_args<T: DeserializeOwned + Default>(command: &str, args: &Value) -> Option<T> {
    if args.is_null() {
        return Some(T::default());
    }
    match serde_json::from_value(args.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Invalid arguments for '{}': {}", command, e);
            None
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StepsArgs {
    steps: Option<isize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ToggleArgs {
    advance: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SortArgs {
    field: SortField,
}

#[derive(Debug, Deserialize)]
struct ModeArgs {
    mode: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenArgs {
    app: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExtractArgs {
    paths: Option<Vec<String>>,
    kind: Option<crate::model::ArchiveKind>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PidArgs {
    pid: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IndexArgs {
    index: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BookmarkArgs {
    name: Option<String>,
    index: Option<usize>,
}

fn cursor<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move {
        let motion: Motion = match serde_json::from_value(args.clone()) {
            Ok(motion) => motion,
            Err(e) => {
                tracing::warn!("Invalid arguments for 'cursor': {}", e);
                return;
            }
        };
        caps.move_cursor(frame_of(caps, args), motion);
    })
}

fn enter<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move {
        caps.enter(frame_of(caps, args)).await;
    })
}

fn parent<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move {
        caps.parent(frame_of(caps, args)).await;
    })
}

fn history_back<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        let Some(parsed) = parse_args::<StepsArgs>("history-back", args) else {
            return;
        };
        let steps = parsed.steps.unwrap_or(1).max(1);
        caps.go_history(frame_of(caps, args), steps).await;
    })
}

fn history_forward<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        let Some(parsed) = parse_args::<StepsArgs>("history-forward", args) else {
            return;
        };
        let steps = parsed.steps.unwrap_or(1).max(1);
        caps.go_history(frame_of(caps, args), -steps).await;
    })
}

fn switch_frame<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        let target = match args.get("frame").and_then(Value::as_str) {
            Some(raw) => FrameId::parse(raw),
            None => Some(caps.active_frame().other()),
        };
        match target {
            Some(frame) => caps.set_active_frame(frame),
            None => tracing::warn!("Invalid arguments for 'switch-frame': {}", args),
        }
    })
}

fn toggle_select<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        let Some(parsed) = parse_args::<ToggleArgs>("toggle-select", args) else {
            return;
        };
        let frame = frame_of(caps, args);
        caps.toggle_select(frame);
        if parsed.advance {
            caps.move_cursor(
                frame,
                Motion::Step {
                    direction: Direction::Down,
                    count: 1,
                    wrap: false,
                },
            );
        }
    })
}

fn select_all<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move { caps.select_all(frame_of(caps, args)) })
}

fn deselect_all<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move { caps.deselect_all(frame_of(caps, args)) })
}

fn invert_selection<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move { caps.invert_selection(frame_of(caps, args)) })
}

fn sort<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move {
        if let Some(parsed) = parse_args::<SortArgs>("sort", args) {
            caps.set_sort(frame_of(caps, args), parsed.field);
        }
    })
}

fn sort_order<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move { caps.cycle_sort_order(frame_of(caps, args)) })
}

fn sort_dirs<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move { caps.cycle_dir_position(frame_of(caps, args)) })
}

fn sort_clear<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move { caps.clear_sort(frame_of(caps, args)) })
}

fn filter_open<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    _args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move { caps.set_scope(Scope::Filter) })
}

fn filter_close<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    _args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move { caps.set_scope(Scope::Browse) })
}

fn filter_cancel<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        caps.update_filter(frame_of(caps, args), Update::ResetToDefault);
        caps.set_scope(Scope::Browse);
    })
}

fn filter_backspace<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        let frame = frame_of(caps, args);
        let mut pattern = caps.filter_pattern(frame);
        if pattern.pop().is_none() {
            return;
        }
        let update = if pattern.is_empty() {
            Update::ResetToDefault
        } else {
            Update::Set(pattern)
        };
        caps.update_filter(frame, update);
    })
}

fn toggle_mode<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        let parsed: ModeArgs = match serde_json::from_value(args.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid arguments for 'toggle-mode': {}", e);
                return;
            }
        };
        match parsed.mode.parse::<Mode>() {
            Ok(mode) => {
                if !caps.toggle_mode(frame_of(caps, args), mode) {
                    tracing::info!("mode '{}' cannot be toggled by hand", mode);
                }
            }
            Err(e) => tracing::warn!("Invalid arguments for 'toggle-mode': {}", e),
        }
    })
}

fn open<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move {
        if let Some(parsed) = parse_args::<OpenArgs>("open", args) {
            caps.open_entry(frame_of(caps, args), parsed.app).await;
        }
    })
}

fn copy<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move {
        caps.start_transfer(frame_of(caps, args), Transfer::Copy).await;
    })
}

fn move_entries<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        caps.start_transfer(frame_of(caps, args), Transfer::Move).await;
    })
}

fn delete<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move {
        caps.start_transfer(frame_of(caps, args), Transfer::Delete).await;
    })
}

fn extract<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move {
        if let Some(parsed) = parse_args::<ExtractArgs>("extract", args) {
            caps.extract_selected_entries(frame_of(caps, args), parsed.paths, parsed.kind)
                .await;
        }
    })
}

fn abort_task<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move {
        if let Some(parsed) = parse_args::<PidArgs>("abort-task", args) {
            caps.abort_task(parsed.pid).await;
        }
    })
}

fn user_menu<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move {
        if let Some(parsed) = parse_args::<IndexArgs>("user-menu", args) {
            caps.run_user_menu(frame_of(caps, args), parsed.index).await;
        }
    })
}

fn bookmark_add<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        if let Some(parsed) = parse_args::<BookmarkArgs>("bookmark-add", args) {
            caps.bookmark(frame_of(caps, args), BookmarkAction::Add, parsed.name)
                .await;
        }
    })
}

fn bookmark_delete<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        let Some(parsed) = parse_args::<BookmarkArgs>("bookmark-delete", args) else {
            return;
        };
        let name = parsed.name.or_else(|| {
            parsed
                .index
                .and_then(|index| caps.bookmarks().get(index).map(|b| b.name.clone()))
        });
        match name {
            Some(name) => {
                caps.bookmark(frame_of(caps, args), BookmarkAction::Delete, Some(name))
                    .await;
            }
            None => tracing::info!("no bookmark to delete"),
        }
    })
}

fn bookmark_goto<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        let Some(parsed) = parse_args::<BookmarkArgs>("bookmark-goto", args) else {
            return;
        };
        let index = match (parsed.name, parsed.index) {
            (Some(name), _) => caps.bookmarks().iter().position(|b| b.name == name),
            (None, index) => Some(index.unwrap_or(0)),
        };
        match index {
            Some(index) => {
                caps.goto_bookmark(frame_of(caps, args), index).await;
            }
            None => tracing::info!("no such bookmark"),
        }
    })
}

fn dialog_accept<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    _args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        caps.resolve_dialog(true);
    })
}

fn dialog_reject<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    _args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move {
        caps.resolve_dialog(false);
    })
}

fn dialog_focus<'a>(
    caps: &'a dyn Capabilities,
    _combo: &'a str,
    _args: &'a Value,
) -> CommandFuture<'a> {
    Box::pin(async move { caps.cycle_dialog_focus() })
}

fn refresh<'a>(caps: &'a dyn Capabilities, _combo: &'a str, args: &'a Value) -> CommandFuture<'a> {
    Box::pin(async move {
        caps.refresh(frame_of(caps, args)).await;
    })
}

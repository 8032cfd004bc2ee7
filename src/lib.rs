#![forbid(unsafe_code)]

//! Client engine of a dual-pane file manager that browses a remote
//! filesystem service over newline-delimited JSON.

pub mod app;
pub mod capability;
pub mod channel;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod grid;
pub mod history;
pub mod keymap;
pub mod logging;
pub mod model;
pub mod pane;
pub mod paths;
pub mod reconcile;
pub mod session;
pub mod sort;
pub mod tasks;
pub mod usermenu;
pub mod wire;

#[cfg(test)]
mod testing;

pub use app::{App, DialogFocus, DialogView, PaneSnapshot};
pub use capability::Capabilities;
pub use channel::Channel;
pub use config::Config;
pub use dispatch::{CommandRegistry, Dispatcher, KeyOutcome};
pub use error::{AppError, ChannelError, KeymapError, RemoteError, RequestError, SessionError};
pub use keymap::{KeyCombo, Keymap};
pub use model::{Entry, FrameId, Mode, Scope, Update};

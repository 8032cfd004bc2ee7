#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name of the parent-navigation pseudo-entry the server puts first in every listing.
pub const PARENT_ENTRY: &str = "..";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameId {
    A,
    B,
}

impl FrameId {
    pub const ALL: [FrameId; 2] = [FrameId::A, FrameId::B];

    pub fn other(self) -> Self {
        match self {
            FrameId::A => FrameId::B,
            FrameId::B => FrameId::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameId::A => "a",
            FrameId::B => "b",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "a" => Some(FrameId::A),
            "b" => Some(FrameId::B),
            _ => None,
        }
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a directory listing, as sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    #[serde(rename = "perm")]
    pub permission: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub time: String,
    /// Empty, or `"<kind>:<target>"` with kind `d`, `f` or `e` (broken).
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Directory,
    File,
    Broken,
}

impl Entry {
    pub fn new(name: impl Into<String>, permission: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permission: permission.into(),
            size: String::new(),
            time: String::new(),
            link: String::new(),
            is_virtual: false,
        }
    }

    pub fn parent() -> Self {
        Self::new(PARENT_ENTRY, "drwxr-xr-x")
    }

    pub fn is_parent(&self) -> bool {
        self.name == PARENT_ENTRY
    }

    pub fn kind(&self) -> EntryKind {
        match self.permission.chars().next() {
            Some('d') => EntryKind::Directory,
            Some('-') => EntryKind::File,
            Some('l') => EntryKind::Symlink,
            _ => EntryKind::Other,
        }
    }

    pub fn link_target(&self) -> Option<(LinkKind, &str)> {
        let (kind, target) = self.link.split_once(':')?;
        let kind = match kind {
            "d" => LinkKind::Directory,
            "f" => LinkKind::File,
            "e" => LinkKind::Broken,
            _ => return None,
        };
        Some((kind, target))
    }

    /// Directories and symlinks that resolve to a directory.
    pub fn is_dir(&self) -> bool {
        match self.kind() {
            EntryKind::Directory => true,
            EntryKind::Symlink => {
                matches!(self.link_target(), Some((LinkKind::Directory, _)))
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Name,
    Extension,
    Size,
    Time,
    Unsorted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn flip(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Where directories go relative to files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirPosition {
    #[default]
    Top,
    Bottom,
    None,
}

impl DirPosition {
    pub fn cycle(self) -> Self {
        match self {
            DirPosition::Top => DirPosition::Bottom,
            DirPosition::Bottom => DirPosition::None,
            DirPosition::None => DirPosition::Top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SortCriterion {
    pub field: SortField,
    pub order: SortOrder,
    pub dir_position: DirPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    Zip,
    Tar,
    Tgz,
}

impl ArchiveKind {
    pub fn infer(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else if lower.ends_with(".tgz") || lower.ends_with(".tar.gz") {
            Some(ArchiveKind::Tgz)
        } else if lower.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else {
            None
        }
    }
}

/// A pane listing that comes from inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualOverlay {
    pub archive_path: String,
    pub archive_kind: ArchiveKind,
    /// Path inside the archive as last reported by the server; empty at the root.
    pub inner_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mode {
    Gallery,
    Preview,
    Filter,
    VirtualDir,
    History,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Gallery => "gallery",
            Mode::Preview => "preview",
            Mode::Filter => "filter",
            Mode::VirtualDir => "virtual-dir",
            Mode::History => "history",
        }
    }

    /// Modes owned by pane operations rather than toggled by the user.
    pub fn is_derived(self) -> bool {
        matches!(self, Mode::Filter | Mode::VirtualDir | Mode::History)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "gallery" => Ok(Mode::Gallery),
            "preview" => Ok(Mode::Preview),
            "filter" => Ok(Mode::Filter),
            "virtual-dir" => Ok(Mode::VirtualDir),
            "history" => Ok(Mode::History),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Region of the UI that currently owns keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Browse,
    Filter,
    Confirm,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Browse => "browse",
            Scope::Filter => "filter",
            Scope::Confirm => "confirm",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either a new value or a request to go back to the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update<T> {
    Set(T),
    ResetToDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMenuItem {
    pub label: String,
    pub command: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transfer {
    Copy,
    Move,
    Delete,
}

impl Transfer {
    pub fn cmd(self) -> &'static str {
        match self {
            Transfer::Copy => "cp",
            Transfer::Move => "mv",
            Transfer::Delete => "rm",
        }
    }
}

#![forbid(unsafe_code)]

//! JSON messages exchanged with the filesystem service.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{RemoteError, RequestError};
use crate::model::{ArchiveKind, Entry, FrameId};

/// Error code returned by `cvd` when the requested path escapes the archive.
pub const OUTSIDE_ARCHIVE_ROOT: &str = "OUTSIDE_ARCHIVE_ROOT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "name", content = "args", rename_all = "lowercase")]
pub enum RemoteCommand {
    Cd {
        path: String,
    },
    Cvd {
        kind: ArchiveKind,
        archive: String,
        path: String,
        filter: String,
    },
    Vcp {
        kind: ArchiveKind,
        archive: String,
        sources: Vec<String>,
        destination: String,
    },
    Bookmark {
        action: BookmarkAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        path: String,
    },
    Open {
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        app: Option<String>,
    },
    Sh {
        sources: Vec<String>,
        destination: String,
        config: ShellConfig,
    },
    Progress {
        sources: Vec<String>,
        destination: String,
        config: ProgressConfig,
    },
    Kill {
        pid: u32,
    },
}

impl RemoteCommand {
    pub fn name(&self) -> &'static str {
        match self {
            RemoteCommand::Cd { .. } => "cd",
            RemoteCommand::Cvd { .. } => "cvd",
            RemoteCommand::Vcp { .. } => "vcp",
            RemoteCommand::Bookmark { .. } => "bookmark",
            RemoteCommand::Open { .. } => "open",
            RemoteCommand::Sh { .. } => "sh",
            RemoteCommand::Progress { .. } => "progress",
            RemoteCommand::Kill { .. } => "kill",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkAction {
    Get,
    Add,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellConfig {
    pub cmd: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressConfig {
    pub cmd: String,
    pub total: usize,
}

/// Outgoing envelope: `{id, name, args, cwd, frame}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    pub id: String,
    #[serde(flatten)]
    pub command: RemoteCommand,
    pub cwd: String,
    pub frame: FrameId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Error,
    CommandError,
    Skipped,
    DirUpdate,
    WatchError,
    Progress,
    ProgressError,
    ProgressEnd,
    ProgressAbort,
}

impl Status {
    pub fn push_tag(self) -> Option<PushTag> {
        match self {
            Status::DirUpdate => Some(PushTag::DirUpdate),
            Status::WatchError => Some(PushTag::WatchError),
            Status::Progress => Some(PushTag::Progress),
            Status::ProgressError => Some(PushTag::ProgressError),
            Status::ProgressEnd => Some(PushTag::ProgressEnd),
            Status::ProgressAbort => Some(PushTag::ProgressAbort),
            Status::Success | Status::Error | Status::CommandError | Status::Skipped => None,
        }
    }
}

/// Status tags of unsolicited messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushTag {
    DirUpdate,
    WatchError,
    Progress,
    ProgressError,
    ProgressEnd,
    ProgressAbort,
}

/// Any message from the service, before classification.
#[derive(Debug, Clone, Deserialize)]
pub struct Inbound {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    pub status: Status,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Success(Value),
    Skipped(Vec<String>),
}

impl Response {
    /// A `SKIPPED` payload that is not a list of paths is a decode error.
    pub fn into_reply(self) -> Result<Reply, RequestError> {
        match self.status {
            Status::Success => Ok(Reply::Success(self.data)),
            Status::Skipped => serde_json::from_value(self.data)
                .map(Reply::Skipped)
                .map_err(RequestError::Decode),
            Status::Error | Status::CommandError => {
                Err(remote_error(self.status, self.data).into())
            }
            other => Err(RemoteError::new(
                "UNEXPECTED_STATUS",
                format!("{other:?} is not a response status"),
            )
            .into()),
        }
    }
}

impl Reply {
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        match self {
            Reply::Success(value) => serde_json::from_value(value),
            Reply::Skipped(paths) => serde_json::from_value(Value::from(paths)),
        }
    }
}

fn remote_error(status: Status, data: Value) -> RemoteError {
    let fallback_code = match status {
        Status::CommandError => "COMMAND_ERROR",
        _ => "ERROR",
    };
    match data {
        Value::Object(_) => {
            let mut err: RemoteError =
                serde_json::from_value(data).unwrap_or_else(|_| RemoteError::new(fallback_code, ""));
            if err.code.is_empty() {
                err.code = fallback_code.to_string();
            }
            err
        }
        Value::String(msg) => RemoteError::new(fallback_code, msg),
        Value::Null => RemoteError::new(fallback_code, ""),
        other => RemoteError::new(fallback_code, other.to_string()),
    }
}

/// `{path, entries}` as returned by `cd`/`cvd` and pushed with `DIR_UPDATE`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Listing {
    pub path: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchFailure {
    pub path: String,
    #[serde(default, deserialize_with = "code_string")]
    pub code: String,
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressUpdate {
    pub pid: u32,
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgressFailure {
    pub pid: u32,
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TaskRef {
    pub pid: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Push {
    DirUpdate(Listing),
    WatchError(WatchFailure),
    Progress(ProgressUpdate),
    ProgressError(ProgressFailure),
    ProgressEnd(TaskRef),
    ProgressAbort(TaskRef),
}

impl Push {
    pub fn decode(tag: PushTag, data: Value) -> Result<Self, serde_json::Error> {
        Ok(match tag {
            PushTag::DirUpdate => Push::DirUpdate(serde_json::from_value(data)?),
            PushTag::WatchError => Push::WatchError(serde_json::from_value(data)?),
            PushTag::Progress => Push::Progress(serde_json::from_value(data)?),
            PushTag::ProgressError => Push::ProgressError(serde_json::from_value(data)?),
            PushTag::ProgressEnd => Push::ProgressEnd(serde_json::from_value(data)?),
            PushTag::ProgressAbort => Push::ProgressAbort(serde_json::from_value(data)?),
        })
    }
}

/// Error codes may be strings (`ENOENT`) or numbers depending on the server.
pub(crate) fn code_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(code) => code,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) => id,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

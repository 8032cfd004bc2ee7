#![forbid(unsafe_code)]

//! The single duplex connection to the filesystem service.
//!
//! Requests carry a fresh correlation id and park a one-shot responder until
//! the matching response arrives. Messages with a push status fan out to every
//! listener registered for that status instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{ChannelError, RequestError};
use crate::model::FrameId;
use crate::wire::{Inbound, Push, PushTag, RemoteCommand, Reply, Request, Response};

pub type ListenerId = u64;

type Listener = Arc<dyn Fn(&Push) + Send + Sync>;

#[derive(Clone, Default)]
pub struct Channel {
    inner: Arc<Mutex<ChannelState>>,
}

#[derive(Default)]
struct ChannelState {
    link: Link,
    pending: HashMap<String, oneshot::Sender<Response>>,
    listeners: HashMap<PushTag, Vec<(ListenerId, Listener)>>,
    next_listener: ListenerId,
}

#[derive(Default)]
enum Link {
    #[default]
    Idle,
    Open(mpsc::UnboundedSender<String>),
    Closed,
}

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the channel over an outbound queue of encoded lines.
    pub fn connect(&self, outbound: mpsc::UnboundedSender<String>) {
        self.lock().link = Link::Open(outbound);
    }

    /// Runs the channel over a byte stream, one JSON document per line.
    ///
    /// The returned task ends when the peer closes the stream; pending
    /// requests are then resolved with [`ChannelError::Closed`].
    pub fn attach<S>(&self, stream: S) -> JoinHandle<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        self.connect(tx);

        let writer_task = tokio::spawn(async move {
            while let Some(mut line) = rx.recv().await {
                line.push('\n');
                if let Err(e) = writer.write_all(line.as_bytes()).await {
                    tracing::warn!("Failed to write request: {}", e);
                    break;
                }
                if let Err(e) = writer.flush().await {
                    tracing::warn!("Failed to flush request: {}", e);
                    break;
                }
            }
        });

        let channel = self.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => channel.handle_incoming(&line),
                    Ok(None) => {
                        tracing::info!("connection closed by peer");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read from connection: {}", e);
                        break;
                    }
                }
            }
            channel.disconnect();
            writer_task.abort();
        })
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.lock().link, Link::Open(_))
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Sends one request and waits for its correlated response.
    pub async fn send(
        &self,
        command: RemoteCommand,
        cwd: &str,
        frame: FrameId,
    ) -> Result<Response, ChannelError> {
        let id = Uuid::new_v4().to_string();
        let name = command.name();
        let request = Request {
            id: id.clone(),
            command,
            cwd: cwd.to_string(),
            frame,
        };
        let line = serde_json::to_string(&request)?;

        let receiver = {
            let mut state = self.lock();
            let outbound = match &state.link {
                Link::Open(outbound) => outbound.clone(),
                Link::Idle => return Err(ChannelError::NotConnected),
                Link::Closed => return Err(ChannelError::Closed),
            };
            let (responder, receiver) = oneshot::channel();
            state.pending.insert(id.clone(), responder);
            if outbound.send(line).is_err() {
                state.pending.remove(&id);
                state.link = Link::Closed;
                return Err(ChannelError::Closed);
            }
            receiver
        };
        tracing::debug!(request = %id, command = name, "request sent");

        receiver.await.map_err(|_| ChannelError::Closed)
    }

    /// [`Channel::send`] followed by status classification.
    pub async fn request(
        &self,
        command: RemoteCommand,
        cwd: &str,
        frame: FrameId,
    ) -> Result<Reply, RequestError> {
        let response = self.send(command, cwd, frame).await?;
        response.into_reply()
    }

    pub fn register_listener<F>(&self, tag: PushTag, listener: F) -> Result<ListenerId, ChannelError>
    where
        F: Fn(&Push) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        match state.link {
            Link::Open(_) => {}
            Link::Idle => return Err(ChannelError::NotConnected),
            Link::Closed => return Err(ChannelError::Closed),
        }
        state.next_listener += 1;
        let id = state.next_listener;
        state
            .listeners
            .entry(tag)
            .or_default()
            .push((id, Arc::new(listener)));
        Ok(id)
    }

    /// Returns whether a listener was removed.
    pub fn remove_listener(&self, tag: PushTag, id: ListenerId) -> Result<bool, ChannelError> {
        let mut state = self.lock();
        if matches!(state.link, Link::Idle) {
            return Err(ChannelError::NotConnected);
        }
        let Some(listeners) = state.listeners.get_mut(&tag) else {
            return Ok(false);
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        Ok(listeners.len() != before)
    }

    /// Routes one inbound line to listeners or to the waiting request.
    pub fn handle_incoming(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let inbound: Inbound = match serde_json::from_str(text) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!("Failed to parse inbound message: {}", e);
                return;
            }
        };

        if let Some(tag) = inbound.status.push_tag() {
            let push = match Push::decode(tag, inbound.data) {
                Ok(push) => push,
                Err(e) => {
                    tracing::warn!("Failed to decode {:?} push: {}", tag, e);
                    return;
                }
            };
            let listeners: Vec<Listener> = self
                .lock()
                .listeners
                .get(&tag)
                .map(|listeners| listeners.iter().map(|(_, l)| l.clone()).collect())
                .unwrap_or_default();
            for listener in listeners {
                listener(&push);
            }
            return;
        }

        let responder = self.lock().pending.remove(&inbound.id);
        match responder {
            Some(responder) => {
                let _ = responder.send(Response {
                    status: inbound.status,
                    data: inbound.data,
                });
            }
            None => tracing::debug!(id = %inbound.id, "dropping unmatched response"),
        }
    }

    /// Marks the connection lost and fails every pending request.
    pub fn disconnect(&self) {
        let mut state = self.lock();
        state.link = Link::Closed;
        let dropped = state.pending.len();
        state.pending.clear();
        if dropped > 0 {
            tracing::warn!("connection lost with {} pending requests", dropped);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{Value, json};

    use super::*;
    use crate::wire::Status;

    fn connected() -> (Channel, mpsc::UnboundedReceiver<String>) {
        let channel = Channel::new();
        let (tx, rx) = mpsc::unbounded_channel();
        channel.connect(tx);
        (channel, rx)
    }

    fn cd(path: &str) -> RemoteCommand {
        RemoteCommand::Cd {
            path: path.to_string(),
        }
    }

    #[tokio::test]
    async fn operations_fail_before_connect() {
        let channel = Channel::new();
        let err = channel.send(cd("/"), "/", FrameId::A).await.expect_err("idle");
        assert!(matches!(err, ChannelError::NotConnected));
        assert!(matches!(
            channel.register_listener(PushTag::DirUpdate, |_| {}),
            Err(ChannelError::NotConnected)
        ));
        assert!(matches!(
            channel.remove_listener(PushTag::DirUpdate, 1),
            Err(ChannelError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn response_resolves_the_matching_request_once() {
        let (channel, mut rx) = connected();
        let server = channel.clone();
        tokio::spawn(async move {
            let line = rx.recv().await.expect("request");
            let request: Value = serde_json::from_str(&line).expect("json");
            assert_eq!(request["name"], "cd");
            assert_eq!(request["frame"], "a");
            let id = request["id"].as_str().expect("id").to_string();
            let reply = json!({"id": id, "status": "SUCCESS", "data": {"path": "/tmp", "entries": []}});
            server.handle_incoming(&reply.to_string());
            // A duplicate is unmatched and dropped.
            server.handle_incoming(&reply.to_string());
        });

        let response = channel.send(cd("/tmp"), "/", FrameId::A).await.expect("response");
        assert_eq!(response.status, Status::Success);
        assert_eq!(response.data["path"], "/tmp");
        assert_eq!(channel.pending_count(), 0);
    }

    #[tokio::test]
    async fn pushes_fan_out_until_listener_is_removed() {
        let (channel, _rx) = connected();
        let hits = Arc::new(AtomicUsize::new(0));

        let first = {
            let hits = hits.clone();
            channel
                .register_listener(PushTag::ProgressEnd, move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                })
                .expect("register")
        };
        {
            let hits = hits.clone();
            channel
                .register_listener(PushTag::ProgressEnd, move |_| {
                    hits.fetch_add(10, Ordering::SeqCst);
                })
                .expect("register");
        }

        let push = json!({"id": "", "status": "PROGRESS_END", "data": {"pid": 3}}).to_string();
        channel.handle_incoming(&push);
        assert_eq!(hits.load(Ordering::SeqCst), 11);

        assert!(channel.remove_listener(PushTag::ProgressEnd, first).expect("remove"));
        channel.handle_incoming(&push);
        assert_eq!(hits.load(Ordering::SeqCst), 21);
    }

    #[tokio::test]
    async fn malformed_messages_are_dropped() {
        let (channel, _rx) = connected();
        channel.handle_incoming("not json");
        channel.handle_incoming(r#"{"id":"x","status":"NOPE"}"#);
        channel.handle_incoming(r#"{"status":"DIR_UPDATE","data":{"oops":1}}"#);
        assert!(channel.is_connected());
    }

    #[tokio::test]
    async fn disconnect_fails_pending_requests() {
        let (channel, _rx) = connected();
        let waiter = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.send(cd("/"), "/", FrameId::B).await })
        };
        while channel.pending_count() == 0 {
            tokio::task::yield_now().await;
        }
        channel.disconnect();
        let result = waiter.await.expect("join");
        assert!(matches!(result, Err(ChannelError::Closed)));
        assert!(matches!(
            channel.send(cd("/"), "/", FrameId::B).await,
            Err(ChannelError::Closed)
        ));
    }

    #[tokio::test]
    async fn attach_speaks_newline_delimited_json() {
        let (client, server) = tokio::io::duplex(4096);
        let channel = Channel::new();
        let reader = channel.attach(client);

        let (server_read, mut server_write) = tokio::io::split(server);
        let responder = tokio::spawn(async move {
            let mut lines = BufReader::new(server_read).lines();
            let line = lines.next_line().await.expect("read").expect("line");
            let request: Value = serde_json::from_str(&line).expect("json");
            let reply = json!({"id": request["id"], "status": "SUCCESS", "data": null});
            server_write
                .write_all(format!("{reply}\n").as_bytes())
                .await
                .expect("write");
            server_write.shutdown().await.expect("shutdown");
            drop(lines);
        });

        let response = channel
            .send(RemoteCommand::Kill { pid: 9 }, "/", FrameId::A)
            .await
            .expect("response");
        assert_eq!(response.status, Status::Success);
        responder.await.expect("server");
        reader.await.expect("reader");
        assert!(!channel.is_connected());
    }
}

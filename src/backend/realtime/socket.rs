/**
 * WebSocket Endpoint
 *
 * `GET /ws?token=<jwt>` upgrades to a socket speaking JSON frames
 * `{ "event": ..., "data": ... }`. Clients join group rooms explicitly with
 * `group:join`; joining requires membership. Presence is announced with
 * `presence:online` and withdrawn when the socket closes.
 *
 * Each connection runs one writer task fed by a bounded channel, one
 * forwarding task per joined room, and one for the global presence channel.
 * A forwarder waits while the writer's queue is full, so a slow client falls
 * behind on the room channel and loses the overflow there instead of
 * buffering without limit.
 */

use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::middleware::{authenticate, bearer_token, AuthenticatedUser};
use crate::backend::realtime::broadcast::ROOM_CAPACITY;
use crate::backend::server::state::AppState;
use crate::shared::event::{PresenceEntry, PresenceSnapshot, OFFLINE_STATUS};
use crate::shared::{ClientEvent, ServerEvent};

/// Events queued for one socket's writer
pub const OUTBOUND_CAPACITY: usize = ROOM_CAPACITY;

#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// Authenticate, then upgrade
pub async fn socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<SocketParams>,
    headers: HeaderMap,
) -> Result<Response, BackendError> {
    let token = params
        .token
        .as_deref()
        .or_else(|| bearer_token(&headers))
        .ok_or_else(|| BackendError::unauthenticated("missing token"))?;
    let user = authenticate(&state, token).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: AuthenticatedUser) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(OUTBOUND_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("[Realtime] Failed to serialize {}: {}", event.name(), e);
                    continue;
                }
            };
            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    tracing::info!("[Realtime] Socket connected: user={}", user.user_id);
    let mut session = SocketSession::new(state, user, tx);

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => session.handle_frame(text.as_str()).await,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("[Realtime] Socket error for {}: {}", user.user_id, e);
                break;
            }
        }
    }

    session.close();
    writer.abort();
    tracing::info!("[Realtime] Socket disconnected: user={}", user.user_id);
}

/// Forward a broadcast receiver into a socket's outbound channel
fn forward(mut rx: broadcast::Receiver<ServerEvent>, tx: mpsc::Sender<ServerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("[Realtime] Socket lagged, {} events dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Per-connection state
pub struct SocketSession {
    state: AppState,
    user: AuthenticatedUser,
    tx: mpsc::Sender<ServerEvent>,
    rooms: HashMap<Uuid, JoinHandle<()>>,
    presence_feed: JoinHandle<()>,
    announced: bool,
}

impl SocketSession {
    pub fn new(state: AppState, user: AuthenticatedUser, tx: mpsc::Sender<ServerEvent>) -> Self {
        let presence_feed = forward(state.rooms.subscribe_presence(), tx.clone());
        Self {
            state,
            user,
            tx,
            rooms: HashMap::new(),
            presence_feed,
            announced: false,
        }
    }

    fn reply(&self, event: ServerEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!("[Realtime] Outbound queue full for {}, dropped {}", self.user.user_id, event.name());
            }
            // the writer is gone and the read loop will end
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    pub fn joined_rooms(&self) -> impl Iterator<Item = &Uuid> {
        self.rooms.keys()
    }

    pub async fn handle_frame(&mut self, frame: &str) {
        match serde_json::from_str::<ClientEvent>(frame) {
            Ok(event) => self.handle_event(event).await,
            Err(e) => {
                tracing::debug!("[Realtime] Bad frame from {}: {}", self.user.user_id, e);
                self.reply(ServerEvent::error(format!("invalid frame: {}", e)));
            }
        }
    }

    pub async fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::JoinGroup(group_id) => self.join(group_id).await,
            ClientEvent::LeaveGroup(group_id) => {
                if let Some(handle) = self.rooms.remove(&group_id) {
                    handle.abort();
                }
            }
            ClientEvent::PresenceOnline { status } => self.announce(status.as_deref()),
            ClientEvent::PresenceSet { status } => {
                if !self.announced {
                    self.announce(Some(&status));
                } else if let Some(status) = self.state.presence.set_status(self.user.user_id, &status) {
                    self.broadcast_presence(status);
                }
            }
            ClientEvent::PresenceWho => self.reply(self.snapshot()),
            ClientEvent::Ping => self.reply(ServerEvent::Pong),
        }
    }

    async fn join(&mut self, group_id: Uuid) {
        if self.rooms.contains_key(&group_id) {
            return;
        }
        match self.state.store.is_member(group_id, self.user.user_id).await {
            Ok(true) => {
                let handle = forward(self.state.rooms.subscribe(group_id), self.tx.clone());
                self.rooms.insert(group_id, handle);
                tracing::debug!("[Realtime] {} joined room {}", self.user.user_id, group_id);
            }
            Ok(false) => self.reply(ServerEvent::error("not a member of this group")),
            Err(e) => {
                tracing::error!("[Realtime] Membership lookup failed: {}", e);
                self.reply(ServerEvent::error("internal server error"));
            }
        }
    }

    fn announce(&mut self, status: Option<&str>) {
        if self.announced {
            if let Some(status) = status.and_then(|s| self.state.presence.set_status(self.user.user_id, s)) {
                self.broadcast_presence(status);
            }
        } else {
            self.announced = true;
            let transition = self.state.presence.mark_online(self.user.user_id, status);
            if transition.should_broadcast() {
                self.broadcast_presence(transition.status);
            }
        }
        self.reply(self.snapshot());
    }

    fn broadcast_presence(&self, status: String) {
        self.state.rooms.emit_presence(ServerEvent::PresenceUpdate(PresenceEntry {
            user_id: self.user.user_id,
            status,
        }));
    }

    fn snapshot(&self) -> ServerEvent {
        ServerEvent::PresenceSnapshot(PresenceSnapshot {
            users: self.state.presence.snapshot(),
        })
    }

    /// Leave every room and withdraw this session's presence
    pub fn close(&mut self) {
        for (_, handle) in self.rooms.drain() {
            handle.abort();
        }
        self.presence_feed.abort();
        if self.announced && self.state.presence.mark_offline(self.user.user_id) {
            self.broadcast_presence(OFFLINE_STATUS.to_string());
        }
        self.announced = false;
    }
}

impl Drop for SocketSession {
    fn drop(&mut self) {
        self.close();
    }
}

/**
 * Room Broker
 *
 * Per-group fan-out of realtime events. Each group gets its own
 * `tokio::sync::broadcast` channel, created on first use; sockets that joined
 * the group hold a receiver. Presence events go through one process-wide
 * channel that every socket listens to.
 *
 * # Delivery
 *
 * Fire-and-forget and at-most-once: an event emitted while nobody listens is
 * dropped, and a receiver that falls more than the channel capacity behind
 * loses the overflow. Within one room, every receiver observes events in
 * emission order.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::shared::ServerEvent;

/// Capacity of each room channel
pub const ROOM_CAPACITY: usize = 256;

/// Realtime event broadcast channel
pub type RealtimeEventBroadcast = broadcast::Sender<ServerEvent>;

/// Broadcast an event to every receiver of a channel
///
/// # Returns
///
/// Number of receivers that got the event (0 if nobody listens)
pub fn broadcast_event(broadcast_tx: &RealtimeEventBroadcast, event: ServerEvent) -> usize {
    let name = event.name();
    match broadcast_tx.send(event) {
        Ok(subscriber_count) => {
            tracing::debug!("[Realtime] {} delivered to {} subscribers", name, subscriber_count);
            subscriber_count
        }
        Err(_) => {
            tracing::debug!("[Realtime] No subscribers for {}", name);
            0
        }
    }
}

#[derive(Clone, Debug)]
pub struct RoomBroker {
    rooms: Arc<Mutex<HashMap<Uuid, RealtimeEventBroadcast>>>,
    presence: RealtimeEventBroadcast,
}

impl Default for RoomBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomBroker {
    pub fn new() -> Self {
        let (presence, _) = broadcast::channel(ROOM_CAPACITY);
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            presence,
        }
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<Uuid, RealtimeEventBroadcast>> {
        // the map holds no invariants a panicking holder could break
        self.rooms.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Join a group's room
    pub fn subscribe(&self, group_id: Uuid) -> broadcast::Receiver<ServerEvent> {
        self.rooms()
            .entry(group_id)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Emit an event to everyone currently joined to `group_id`
    pub fn emit(&self, group_id: Uuid, event: ServerEvent) -> usize {
        let sender = self.rooms().get(&group_id).cloned();
        match sender {
            Some(sender) => broadcast_event(&sender, event),
            None => {
                tracing::debug!("[Realtime] Room {} has no listeners for {}", group_id, event.name());
                0
            }
        }
    }

    pub fn subscribe_presence(&self) -> broadcast::Receiver<ServerEvent> {
        self.presence.subscribe()
    }

    /// Emit a presence event to every connected socket
    pub fn emit_presence(&self, event: ServerEvent) -> usize {
        broadcast_event(&self.presence, event)
    }

    /// Drop rooms nobody listens to; returns how many were removed
    pub fn cleanup_inactive_rooms(&self) -> usize {
        let mut rooms = self.rooms();
        let before = rooms.len();
        rooms.retain(|_, sender| sender.receiver_count() > 0);
        before - rooms.len()
    }

    pub fn subscriber_count(&self, group_id: Uuid) -> usize {
        self.rooms()
            .get(&group_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms().len()
    }
}

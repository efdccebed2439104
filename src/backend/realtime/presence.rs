/**
 * Presence Tracker
 *
 * Reference-counted online state per user. A user with three open tabs has
 * three sessions; they go offline only when the last one disconnects. The
 * tracker owns its map and is the only thing that touches it, so counts stay
 * consistent under concurrent connects and disconnects.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::shared::event::{normalize_status, PresenceEntry};

#[derive(Debug, Clone)]
struct Sessions {
    count: u32,
    status: String,
}

/// Result of registering a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineTransition {
    /// The user went from 0 to 1 sessions
    pub first_session: bool,
    /// An already-online user announced a different status
    pub status_changed: bool,
    pub status: String,
}

impl OnlineTransition {
    pub fn should_broadcast(&self) -> bool {
        self.first_session || self.status_changed
    }
}

#[derive(Clone, Debug, Default)]
pub struct PresenceTracker {
    users: Arc<Mutex<HashMap<Uuid, Sessions>>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> MutexGuard<'_, HashMap<Uuid, Sessions>> {
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register one more live session for `user_id`
    pub fn mark_online(&self, user_id: Uuid, status: Option<&str>) -> OnlineTransition {
        let mut users = self.users();
        match users.get_mut(&user_id) {
            Some(sessions) if sessions.count > 0 => {
                sessions.count += 1;
                let explicit = status.map(str::trim).filter(|s| !s.is_empty());
                let status_changed = match explicit {
                    Some(s) if s != sessions.status => {
                        sessions.status = s.to_string();
                        true
                    }
                    _ => false,
                };
                OnlineTransition {
                    first_session: false,
                    status_changed,
                    status: sessions.status.clone(),
                }
            }
            _ => {
                let status = normalize_status(status);
                users.insert(user_id, Sessions { count: 1, status: status.clone() });
                OnlineTransition {
                    first_session: true,
                    status_changed: false,
                    status,
                }
            }
        }
    }

    /// Drop one session; returns true when it was the user's last
    pub fn mark_offline(&self, user_id: Uuid) -> bool {
        let mut users = self.users();
        let Some(sessions) = users.get_mut(&user_id) else {
            return false;
        };
        sessions.count = sessions.count.saturating_sub(1);
        if sessions.count == 0 {
            users.remove(&user_id);
            true
        } else {
            false
        }
    }

    /// Change the status of an online user; `Some(new)` only if it changed
    pub fn set_status(&self, user_id: Uuid, status: &str) -> Option<String> {
        let status = normalize_status(Some(status));
        let mut users = self.users();
        let sessions = users.get_mut(&user_id).filter(|s| s.count > 0)?;
        if sessions.status == status {
            return None;
        }
        sessions.status = status.clone();
        Some(status)
    }

    /// Online users ordered by id
    pub fn snapshot(&self) -> Vec<PresenceEntry> {
        let mut entries: Vec<PresenceEntry> = self
            .users()
            .iter()
            .filter(|(_, s)| s.count > 0)
            .map(|(user_id, s)| PresenceEntry { user_id: *user_id, status: s.status.clone() })
            .collect();
        entries.sort_by_key(|e| e.user_id);
        entries
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.users().get(&user_id).is_some_and(|s| s.count > 0)
    }

    pub fn online_user_count(&self) -> usize {
        self.users().values().filter(|s| s.count > 0).count()
    }

    pub fn session_count(&self) -> u32 {
        self.users().values().map(|s| s.count).sum()
    }
}

//! In-process message store
//!
//! Keeps every table in one `RwLock`ed struct, so each trait method runs
//! under a single write (or read) guard and is atomic by construction. Used
//! by the test suites and by servers started without `DATABASE_URL`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::messaging::store::{MessageStore, NewMessage, NewUser, PageRequest, StoreError};
use crate::shared::messaging::reaction::toggle_outcome;
use crate::shared::messaging::{
    sorted_pair, AuthorSummary, DirectThread, DirectThreadSummary, FavoriteEntry, Group,
    GroupSummary, MemberName, MemberRole, Message, MessageType, ReactionRow, ReactionToggle,
    ReplyAuthor, ReplyPreview, User, DIRECT_GROUP_NAME,
};

#[derive(Debug, Clone)]
struct StoredMessage {
    id: Uuid,
    group_id: Uuid,
    author_id: Uuid,
    kind: MessageType,
    content: String,
    reply_to_id: Option<Uuid>,
    edited_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl StoredMessage {
    fn key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }
}

#[derive(Debug, Clone)]
struct StoredReaction {
    emoji: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    groups: HashMap<Uuid, Group>,
    /// (group, user) -> role
    members: HashMap<(Uuid, Uuid), MemberRole>,
    /// sorted (user_a, user_b) -> thread
    threads: HashMap<(Uuid, Uuid), DirectThread>,
    messages: HashMap<Uuid, StoredMessage>,
    /// (message, user) -> read_at
    reads: HashMap<(Uuid, Uuid), DateTime<Utc>>,
    /// (message, user) -> favorited_at
    favorites: HashMap<(Uuid, Uuid), DateTime<Utc>>,
    /// (message, user) -> reaction
    reactions: HashMap<(Uuid, Uuid), StoredReaction>,
    /// (message, user)
    mentions: HashSet<(Uuid, Uuid)>,
    last_created_at: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing creation timestamps, so keyset pagination never
    /// sees two messages with the same instant.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_created_at {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_created_at = Some(now);
        now
    }

    fn author_summary(&self, user_id: Uuid) -> AuthorSummary {
        match self.users.get(&user_id) {
            Some(user) => user.summary(),
            None => AuthorSummary {
                id: user_id,
                name: "Unknown".to_string(),
                avatar_url: None,
            },
        }
    }

    fn is_direct_group(&self, group_id: Uuid) -> bool {
        self.threads.values().any(|t| t.group_id == group_id)
    }

    fn is_unread(&self, message: &StoredMessage, user_id: Uuid) -> bool {
        message.deleted_at.is_none()
            && message.author_id != user_id
            && !self.reads.contains_key(&(message.id, user_id))
    }

    fn unread_count(&self, group_id: Uuid, user_id: Uuid) -> u32 {
        self.messages
            .values()
            .filter(|m| m.group_id == group_id && self.is_unread(m, user_id))
            .count() as u32
    }

    fn mention_count(&self, group_id: Uuid, user_id: Uuid) -> u32 {
        self.messages
            .values()
            .filter(|m| {
                m.group_id == group_id
                    && self.is_unread(m, user_id)
                    && self.mentions.contains(&(m.id, user_id))
            })
            .count() as u32
    }

    fn reaction_rows(&self, message_id: Uuid) -> Vec<ReactionRow> {
        let mut rows: Vec<(DateTime<Utc>, ReactionRow)> = self
            .reactions
            .iter()
            .filter(|((m, _), _)| *m == message_id)
            .map(|((_, user), r)| {
                (r.created_at, ReactionRow { user_id: *user, emoji: r.emoji.clone() })
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.user_id.cmp(&b.1.user_id)));
        rows.into_iter().map(|(_, row)| row).collect()
    }

    fn readers(&self, message_id: Uuid) -> Vec<Uuid> {
        let mut readers: Vec<(DateTime<Utc>, Uuid)> = self
            .reads
            .iter()
            .filter(|((m, _), _)| *m == message_id)
            .map(|((_, user), at)| (*at, *user))
            .collect();
        readers.sort();
        readers.into_iter().map(|(_, user)| user).collect()
    }

    fn hydrate(&self, stored: &StoredMessage) -> Message {
        let reply_to = stored
            .reply_to_id
            .and_then(|id| self.messages.get(&id))
            .map(|parent| ReplyPreview {
                id: parent.id,
                kind: parent.kind,
                content: if parent.deleted_at.is_some() {
                    String::new()
                } else {
                    parent.content.clone()
                },
                author: {
                    let author = self.author_summary(parent.author_id);
                    ReplyAuthor { id: author.id, name: author.name }
                },
            });
        let reply_count = self
            .messages
            .values()
            .filter(|m| m.reply_to_id == Some(stored.id))
            .count() as u32;

        Message {
            id: stored.id,
            group_id: stored.group_id,
            author_id: stored.author_id,
            author: self.author_summary(stored.author_id),
            kind: stored.kind,
            content: stored.content.clone(),
            reply_to_id: stored.reply_to_id,
            reply_to,
            reply_count,
            reactions: self.reaction_rows(stored.id),
            reaction_summary: Vec::new(),
            read_by: self.readers(stored.id),
            edited_at: stored.edited_at,
            deleted_at: stored.deleted_at,
            created_at: stored.created_at,
        }
    }

    fn latest_in_group(&self, group_id: Uuid) -> Option<&StoredMessage> {
        self.messages
            .values()
            .filter(|m| m.group_id == group_id)
            .max_by_key(|m| m.key())
    }

    fn replace_mentions(&mut self, message_id: Uuid, mentions: &[Uuid]) {
        self.mentions.retain(|(m, _)| *m != message_id);
        for user in mentions {
            self.mentions.insert((message_id, *user));
        }
    }
}

/// Message store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryMessageStore {
    tables: RwLock<Tables>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            avatar_url: user.avatar_url,
            is_admin: user.is_admin,
            created_at: Utc::now(),
        };
        self.tables.write().await.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn create_group(&self, name: &str, is_private: bool) -> Result<Group, StoreError> {
        let group = Group {
            id: Uuid::new_v4(),
            name: name.to_string(),
            is_private,
            last_message_at: None,
            created_at: Utc::now(),
        };
        self.tables.write().await.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid, role: MemberRole) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.groups.contains_key(&group_id) {
            return Err(StoreError::NotFound("group"));
        }
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("user"));
        }
        tables.members.insert((group_id, user_id), role);
        Ok(())
    }

    async fn member_role(&self, group_id: Uuid, user_id: Uuid) -> Result<Option<MemberRole>, StoreError> {
        Ok(self.tables.read().await.members.get(&(group_id, user_id)).copied())
    }

    async fn member_names(&self, group_id: Uuid) -> Result<Vec<MemberName>, StoreError> {
        let tables = self.tables.read().await;
        let mut names: Vec<MemberName> = tables
            .members
            .keys()
            .filter(|(g, _)| *g == group_id)
            .filter_map(|(_, user)| tables.users.get(user))
            .map(|user| MemberName { user_id: user.id, name: user.name.clone() })
            .collect();
        names.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.user_id.cmp(&b.user_id)));
        Ok(names)
    }

    async fn groups_for_user(&self, user_id: Uuid) -> Result<Vec<GroupSummary>, StoreError> {
        let tables = self.tables.read().await;
        let mut groups: Vec<GroupSummary> = tables
            .members
            .keys()
            .filter(|(_, u)| *u == user_id)
            .filter_map(|(g, _)| tables.groups.get(g))
            .filter(|g| !tables.is_direct_group(g.id))
            .map(|g| GroupSummary {
                id: g.id,
                name: g.name.clone(),
                is_private: g.is_private,
                last_message_at: g.last_message_at,
                unread: tables.unread_count(g.id, user_id),
                mentions: tables.mention_count(g.id, user_id),
            })
            .collect();
        // last activity desc, never-active groups last
        groups.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(groups)
    }

    async fn find_direct_thread(&self, a: Uuid, b: Uuid) -> Result<Option<DirectThread>, StoreError> {
        Ok(self.tables.read().await.threads.get(&sorted_pair(a, b)).cloned())
    }

    async fn open_direct_thread(&self, a: Uuid, b: Uuid) -> Result<DirectThread, StoreError> {
        let pair = sorted_pair(a, b);
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.threads.get(&pair) {
            return Ok(existing.clone());
        }
        for user in [pair.0, pair.1] {
            if !tables.users.contains_key(&user) {
                return Err(StoreError::NotFound("user"));
            }
        }

        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            name: DIRECT_GROUP_NAME.to_string(),
            is_private: true,
            last_message_at: None,
            created_at: now,
        };
        let thread = DirectThread {
            id: Uuid::new_v4(),
            group_id: group.id,
            user_a_id: pair.0,
            user_b_id: pair.1,
            created_at: now,
        };
        tables.members.insert((group.id, pair.0), MemberRole::Member);
        tables.members.insert((group.id, pair.1), MemberRole::Member);
        tables.groups.insert(group.id, group);
        tables.threads.insert(pair, thread.clone());
        Ok(thread)
    }

    async fn direct_threads_for_user(&self, user_id: Uuid) -> Result<Vec<DirectThreadSummary>, StoreError> {
        let tables = self.tables.read().await;
        let mut threads: Vec<DirectThreadSummary> = tables
            .threads
            .values()
            .filter(|t| t.user_a_id == user_id || t.user_b_id == user_id)
            .map(|t| DirectThreadSummary {
                id: t.id,
                group_id: t.group_id,
                other: tables.author_summary(t.other_participant(user_id)),
                last_message: tables
                    .latest_in_group(t.group_id)
                    .map(|m| tables.hydrate(m).redacted()),
                last_message_at: tables.groups.get(&t.group_id).and_then(|g| g.last_message_at),
                unread: tables.unread_count(t.group_id, user_id),
            })
            .collect();
        threads.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at).then_with(|| a.id.cmp(&b.id)));
        Ok(threads)
    }

    async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.messages.get(&message_id).map(|m| tables.hydrate(m)))
    }

    async fn list_messages(&self, group_id: Uuid, page: PageRequest) -> Result<Vec<Message>, StoreError> {
        let tables = self.tables.read().await;
        let before = match page.cursor {
            Some(cursor) => match tables.messages.get(&cursor) {
                Some(m) if m.group_id == group_id => Some(m.key()),
                _ => return Err(StoreError::NotFound("cursor")),
            },
            None => None,
        };

        let mut candidates: Vec<&StoredMessage> = tables
            .messages
            .values()
            .filter(|m| m.group_id == group_id)
            .filter(|m| before.map_or(true, |key| m.key() < key))
            .collect();
        candidates.sort_by_key(|m| std::cmp::Reverse(m.key()));

        Ok(candidates
            .into_iter()
            .take(page.take as usize)
            .map(|m| tables.hydrate(m))
            .collect())
    }

    async fn insert_message(&self, message: NewMessage, mentions: &[Uuid]) -> Result<Message, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.groups.contains_key(&message.group_id) {
            return Err(StoreError::NotFound("group"));
        }

        let created_at = tables.next_created_at();
        let stored = StoredMessage {
            id: Uuid::new_v4(),
            group_id: message.group_id,
            author_id: message.author_id,
            kind: message.kind,
            content: message.content,
            reply_to_id: message.reply_to_id,
            edited_at: None,
            deleted_at: None,
            created_at,
        };
        tables.replace_mentions(stored.id, mentions);
        if let Some(group) = tables.groups.get_mut(&stored.group_id) {
            group.last_message_at = Some(created_at);
        }
        let hydrated = tables.hydrate(&stored);
        tables.messages.insert(stored.id, stored);
        Ok(hydrated)
    }

    async fn update_message(&self, message_id: Uuid, content: &str, mentions: &[Uuid]) -> Result<Message, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .messages
            .get_mut(&message_id)
            .ok_or(StoreError::NotFound("message"))?;
        if stored.deleted_at.is_some() {
            return Err(StoreError::Deleted);
        }
        stored.content = content.to_string();
        stored.edited_at = Some(Utc::now());
        let snapshot = stored.clone();

        tables.replace_mentions(message_id, mentions);
        Ok(tables.hydrate(&snapshot))
    }

    async fn soft_delete_message(&self, message_id: Uuid) -> Result<Message, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .messages
            .get_mut(&message_id)
            .ok_or(StoreError::NotFound("message"))?;
        if stored.deleted_at.is_none() {
            stored.deleted_at = Some(Utc::now());
        }
        let snapshot = stored.clone();
        Ok(tables.hydrate(&snapshot))
    }

    async fn toggle_reaction(&self, message_id: Uuid, user_id: Uuid, emoji: &str) -> Result<Vec<ReactionRow>, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.messages.get(&message_id) {
            None => return Err(StoreError::NotFound("message")),
            Some(stored) if stored.deleted_at.is_some() => return Err(StoreError::Deleted),
            Some(_) => {}
        }

        let key = (message_id, user_id);
        let current = tables.reactions.get(&key).map(|r| r.emoji.clone());
        match toggle_outcome(current.as_deref(), emoji) {
            ReactionToggle::Removed => {
                tables.reactions.remove(&key);
            }
            ReactionToggle::Added | ReactionToggle::Replaced => {
                tables.reactions.insert(
                    key,
                    StoredReaction { emoji: emoji.to_string(), created_at: Utc::now() },
                );
            }
        }
        Ok(tables.reaction_rows(message_id))
    }

    async fn add_favorite(&self, message_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.messages.contains_key(&message_id) {
            return Err(StoreError::NotFound("message"));
        }
        tables.favorites.entry((message_id, user_id)).or_insert_with(Utc::now);
        Ok(())
    }

    async fn remove_favorite(&self, message_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        self.tables.write().await.favorites.remove(&(message_id, user_id));
        Ok(())
    }

    async fn list_favorites(&self, user_id: Uuid, group_id: Option<Uuid>) -> Result<Vec<FavoriteEntry>, StoreError> {
        let tables = self.tables.read().await;
        let mut entries: Vec<FavoriteEntry> = tables
            .favorites
            .iter()
            .filter(|((_, u), _)| *u == user_id)
            .filter_map(|((m, _), at)| tables.messages.get(m).map(|stored| (stored, *at)))
            .filter(|(stored, _)| group_id.map_or(true, |g| stored.group_id == g))
            .map(|(stored, favorited_at)| FavoriteEntry {
                message_id: stored.id,
                group_id: stored.group_id,
                kind: stored.kind,
                content: if stored.deleted_at.is_some() { String::new() } else { stored.content.clone() },
                author_name: tables.author_summary(stored.author_id).name,
                created_at: stored.created_at,
                deleted_at: stored.deleted_at,
                favorited_at,
            })
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn mark_group_read(&self, group_id: Uuid, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let mut tables = self.tables.write().await;
        let mut targets: Vec<(DateTime<Utc>, Uuid)> = tables
            .messages
            .values()
            .filter(|m| m.group_id == group_id && m.author_id != user_id)
            .filter(|m| !tables.reads.contains_key(&(m.id, user_id)))
            .map(|m| (m.created_at, m.id))
            .collect();
        targets.sort();

        let now = Utc::now();
        let ids: Vec<Uuid> = targets.into_iter().map(|(_, id)| id).collect();
        for id in &ids {
            tables.reads.insert((*id, user_id), now);
        }
        Ok(ids)
    }
}

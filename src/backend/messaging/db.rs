//! Database operations for messaging
//!
//! PostgreSQL implementation of `MessageStore`. Writes that touch more than
//! one table run inside a transaction; relation loading (author, reply
//! preview, readers, reactions, reply count) happens in `attach_relations` so
//! every read path returns the same shape.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::backend::messaging::store::{MessageStore, NewMessage, NewUser, PageRequest, StoreError};
use crate::shared::messaging::reaction::toggle_outcome;
use crate::shared::messaging::{
    sorted_pair, AuthorSummary, DirectThread, DirectThreadSummary, FavoriteEntry, Group,
    GroupSummary, MemberName, MemberRole, Message, MessageType, ReactionRow, ReactionToggle,
    ReplyAuthor, ReplyPreview, User, DIRECT_GROUP_NAME,
};

const MESSAGE_COLUMNS: &str = r#"
    SELECT m.id, m.group_id, m.author_id, m.type, m.content, m.reply_to_id,
           m.edited_at, m.deleted_at, m.created_at,
           u.name AS author_name, u.avatar_url AS author_avatar_url,
           p.id AS parent_id, p.type AS parent_type, p.content AS parent_content,
           p.deleted_at AS parent_deleted_at,
           pu.id AS parent_author_id, pu.name AS parent_author_name,
           (SELECT COUNT(*) FROM messages r WHERE r.reply_to_id = m.id) AS reply_count
    FROM messages m
    JOIN users u ON u.id = m.author_id
    LEFT JOIN messages p ON p.id = m.reply_to_id
    LEFT JOIN users pu ON pu.id = p.author_id
"#;

/// Unread predicate for user `$1` over messages aliased `m`
const UNREAD_FOR_USER: &str = r#"
    m.deleted_at IS NULL AND m.author_id <> $1
    AND NOT EXISTS (SELECT 1 FROM message_reads r WHERE r.message_id = m.id AND r.user_id = $1)
"#;

/// PostgreSQL-backed message store
#[derive(Clone, Debug)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

fn parse_kind(value: &str) -> Result<MessageType, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::InvalidData(format!("message type '{}'", value)))
}

fn base_message(row: &PgRow) -> Result<Message, StoreError> {
    let author_id: Uuid = row.try_get("author_id")?;
    let reply_to = match row.try_get::<Option<Uuid>, _>("parent_id")? {
        Some(parent_id) => {
            let parent_deleted: Option<DateTime<Utc>> = row.try_get("parent_deleted_at")?;
            let parent_type: String = row.try_get("parent_type")?;
            Some(ReplyPreview {
                id: parent_id,
                kind: parse_kind(&parent_type)?,
                content: if parent_deleted.is_some() {
                    String::new()
                } else {
                    row.try_get("parent_content")?
                },
                author: ReplyAuthor {
                    id: row.try_get("parent_author_id")?,
                    name: row.try_get("parent_author_name")?,
                },
            })
        }
        None => None,
    };
    let kind: String = row.try_get("type")?;
    let reply_count: i64 = row.try_get("reply_count")?;

    Ok(Message {
        id: row.try_get("id")?,
        group_id: row.try_get("group_id")?,
        author_id,
        author: AuthorSummary {
            id: author_id,
            name: row.try_get("author_name")?,
            avatar_url: row.try_get("author_avatar_url")?,
        },
        kind: parse_kind(&kind)?,
        content: row.try_get("content")?,
        reply_to_id: row.try_get("reply_to_id")?,
        reply_to,
        reply_count: reply_count.max(0) as u32,
        reactions: Vec::new(),
        reaction_summary: Vec::new(),
        read_by: Vec::new(),
        edited_at: row.try_get("edited_at")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Attach readers and reaction rows to already-decoded messages
async fn attach_relations(conn: &mut PgConnection, messages: &mut [Message]) -> Result<(), StoreError> {
    if messages.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();

    let reads = sqlx::query(
        r#"
        SELECT message_id, user_id FROM message_reads
        WHERE message_id = ANY($1)
        ORDER BY read_at, user_id
        "#,
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await?;

    let reactions = sqlx::query(
        r#"
        SELECT message_id, user_id, emoji FROM message_reactions
        WHERE message_id = ANY($1)
        ORDER BY created_at, user_id
        "#,
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await?;

    let mut readers: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in reads {
        readers
            .entry(row.try_get("message_id")?)
            .or_default()
            .push(row.try_get("user_id")?);
    }
    let mut rows: HashMap<Uuid, Vec<ReactionRow>> = HashMap::new();
    for row in reactions {
        rows.entry(row.try_get("message_id")?).or_default().push(ReactionRow {
            user_id: row.try_get("user_id")?,
            emoji: row.try_get("emoji")?,
        });
    }

    for message in messages.iter_mut() {
        message.read_by = readers.remove(&message.id).unwrap_or_default();
        message.reactions = rows.remove(&message.id).unwrap_or_default();
    }
    Ok(())
}

async fn load_message(conn: &mut PgConnection, message_id: Uuid) -> Result<Option<Message>, StoreError> {
    let sql = format!("{} WHERE m.id = $1", MESSAGE_COLUMNS);
    let row = sqlx::query(&sql).bind(message_id).fetch_optional(&mut *conn).await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let mut messages = vec![base_message(&row)?];
    attach_relations(conn, &mut messages).await?;
    Ok(messages.pop())
}

async fn load_messages_by_id(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<Message>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!("{} WHERE m.id = ANY($1)", MESSAGE_COLUMNS);
    let rows = sqlx::query(&sql).bind(ids).fetch_all(&mut *conn).await?;
    let mut messages = rows.iter().map(base_message).collect::<Result<Vec<_>, _>>()?;
    attach_relations(conn, &mut messages).await?;
    Ok(messages)
}

async fn replace_mentions(conn: &mut PgConnection, message_id: Uuid, mentions: &[Uuid]) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM message_mentions WHERE message_id = $1")
        .bind(message_id)
        .execute(&mut *conn)
        .await?;
    if !mentions.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO message_mentions (message_id, user_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(message_id)
        .bind(mentions)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        avatar_url: row.try_get("avatar_url")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
    })
}

fn thread_from_row(row: &PgRow) -> Result<DirectThread, StoreError> {
    Ok(DirectThread {
        id: row.try_get("id")?,
        group_id: row.try_get("group_id")?,
        user_a_id: row.try_get("user_a_id")?,
        user_b_id: row.try_get("user_b_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn count(row: &PgRow, column: &str) -> Result<u32, StoreError> {
    let value: i64 = row.try_get(column)?;
    Ok(value.max(0) as u32)
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, email, name, avatar_url, password_hash, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, name, avatar_url, is_admin, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.avatar_url)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await?;
        user_from_row(&row)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, avatar_url, is_admin, created_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_group(&self, name: &str, is_private: bool) -> Result<Group, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO chat_groups (id, name, is_private)
            VALUES ($1, $2, $3)
            RETURNING id, name, is_private, last_message_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(is_private)
        .fetch_one(&self.pool)
        .await?;

        Ok(Group {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            is_private: row.try_get("is_private")?,
            last_message_at: row.try_get("last_message_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid, role: MemberRole) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (group_id, user_id) DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn member_role(&self, group_id: Uuid, user_id: Uuid) -> Result<Option<MemberRole>, StoreError> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM group_members WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role.as_deref().map(MemberRole::parse))
    }

    async fn member_names(&self, group_id: Uuid) -> Result<Vec<MemberName>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.name FROM group_members gm
            JOIN users u ON u.id = gm.user_id
            WHERE gm.group_id = $1
            ORDER BY u.name, u.id
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<MemberName, StoreError> {
                Ok(MemberName {
                    user_id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn groups_for_user(&self, user_id: Uuid) -> Result<Vec<GroupSummary>, StoreError> {
        let sql = format!(
            r#"
            SELECT g.id, g.name, g.is_private, g.last_message_at,
                   (SELECT COUNT(*) FROM messages m
                     WHERE m.group_id = g.id AND {unread}) AS unread,
                   (SELECT COUNT(*) FROM message_mentions mm
                     JOIN messages m ON m.id = mm.message_id
                     WHERE mm.user_id = $1 AND m.group_id = g.id AND {unread}) AS mentions
            FROM chat_groups g
            JOIN group_members gm ON gm.group_id = g.id AND gm.user_id = $1
            WHERE NOT EXISTS (SELECT 1 FROM direct_threads d WHERE d.group_id = g.id)
            ORDER BY g.last_message_at DESC NULLS LAST, g.name
            "#,
            unread = UNREAD_FOR_USER
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<GroupSummary, StoreError> {
                Ok(GroupSummary {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    is_private: row.try_get("is_private")?,
                    last_message_at: row.try_get("last_message_at")?,
                    unread: count(row, "unread")?,
                    mentions: count(row, "mentions")?,
                })
            })
            .collect()
    }

    async fn find_direct_thread(&self, a: Uuid, b: Uuid) -> Result<Option<DirectThread>, StoreError> {
        let (lo, hi) = sorted_pair(a, b);
        let row = sqlx::query(
            r#"
            SELECT id, group_id, user_a_id, user_b_id, created_at
            FROM direct_threads WHERE user_a_id = $1 AND user_b_id = $2
            "#,
        )
        .bind(lo)
        .bind(hi)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(thread_from_row).transpose()
    }

    async fn open_direct_thread(&self, a: Uuid, b: Uuid) -> Result<DirectThread, StoreError> {
        if let Some(existing) = self.find_direct_thread(a, b).await? {
            return Ok(existing);
        }
        let (lo, hi) = sorted_pair(a, b);

        let mut tx = self.pool.begin().await?;
        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ANY($1)")
            .bind(vec![lo, hi])
            .fetch_one(&mut *tx)
            .await?;
        if known != 2 {
            return Err(StoreError::NotFound("user"));
        }

        let group_id = Uuid::new_v4();
        sqlx::query("INSERT INTO chat_groups (id, name, is_private) VALUES ($1, $2, TRUE)")
            .bind(group_id)
            .bind(DIRECT_GROUP_NAME)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id, role)
            VALUES ($1, $2, 'member'), ($1, $3, 'member')
            "#,
        )
        .bind(group_id)
        .bind(lo)
        .bind(hi)
        .execute(&mut *tx)
        .await?;
        let row = sqlx::query(
            r#"
            INSERT INTO direct_threads (id, group_id, user_a_id, user_b_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_a_id, user_b_id) DO NOTHING
            RETURNING id, group_id, user_a_id, user_b_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(group_id)
        .bind(lo)
        .bind(hi)
        .fetch_optional(&mut *tx)
        .await?;

        match row {
            Some(row) => {
                let thread = thread_from_row(&row)?;
                tx.commit().await?;
                tracing::info!("Created direct thread {} for {} and {}", thread.id, lo, hi);
                Ok(thread)
            }
            None => {
                // lost the race against a concurrent open; keep the winner's thread
                tx.rollback().await?;
                self.find_direct_thread(lo, hi)
                    .await?
                    .ok_or(StoreError::NotFound("direct thread"))
            }
        }
    }

    async fn direct_threads_for_user(&self, user_id: Uuid) -> Result<Vec<DirectThreadSummary>, StoreError> {
        let sql = format!(
            r#"
            SELECT d.id, d.group_id, g.last_message_at,
                   o.id AS other_id, o.name AS other_name, o.avatar_url AS other_avatar_url,
                   (SELECT COUNT(*) FROM messages m
                     WHERE m.group_id = d.group_id AND {unread}) AS unread,
                   (SELECT m.id FROM messages m WHERE m.group_id = d.group_id
                     ORDER BY m.created_at DESC, m.id DESC LIMIT 1) AS last_message_id
            FROM direct_threads d
            JOIN chat_groups g ON g.id = d.group_id
            JOIN users o ON o.id = CASE WHEN d.user_a_id = $1 THEN d.user_b_id ELSE d.user_a_id END
            WHERE d.user_a_id = $1 OR d.user_b_id = $1
            ORDER BY g.last_message_at DESC NULLS LAST, d.id
            "#,
            unread = UNREAD_FOR_USER
        );
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&mut *conn).await?;

        let last_ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get::<Option<Uuid>, _>("last_message_id"))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect();
        let mut last_messages: HashMap<Uuid, Message> = load_messages_by_id(&mut *conn, &last_ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m.redacted()))
            .collect();

        rows.iter()
            .map(|row| -> Result<DirectThreadSummary, StoreError> {
                let last_id: Option<Uuid> = row.try_get("last_message_id")?;
                Ok(DirectThreadSummary {
                    id: row.try_get("id")?,
                    group_id: row.try_get("group_id")?,
                    other: AuthorSummary {
                        id: row.try_get("other_id")?,
                        name: row.try_get("other_name")?,
                        avatar_url: row.try_get("other_avatar_url")?,
                    },
                    last_message: last_id.and_then(|id| last_messages.remove(&id)),
                    last_message_at: row.try_get("last_message_at")?,
                    unread: count(row, "unread")?,
                })
            })
            .collect()
    }

    async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        load_message(&mut *conn, message_id).await
    }

    async fn list_messages(&self, group_id: Uuid, page: PageRequest) -> Result<Vec<Message>, StoreError> {
        let mut conn = self.pool.acquire().await?;

        let rows = match page.cursor {
            Some(cursor) => {
                let cursor_at: Option<DateTime<Utc>> = sqlx::query_scalar(
                    "SELECT created_at FROM messages WHERE id = $1 AND group_id = $2",
                )
                .bind(cursor)
                .bind(group_id)
                .fetch_optional(&mut *conn)
                .await?;
                let cursor_at = cursor_at.ok_or(StoreError::NotFound("cursor"))?;

                let sql = format!(
                    r#"{}
                    WHERE m.group_id = $1 AND (m.created_at, m.id) < ($2, $3)
                    ORDER BY m.created_at DESC, m.id DESC
                    LIMIT $4
                    "#,
                    MESSAGE_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(group_id)
                    .bind(cursor_at)
                    .bind(cursor)
                    .bind(page.take as i64)
                    .fetch_all(&mut *conn)
                    .await?
            }
            None => {
                let sql = format!(
                    r#"{}
                    WHERE m.group_id = $1
                    ORDER BY m.created_at DESC, m.id DESC
                    LIMIT $2
                    "#,
                    MESSAGE_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(group_id)
                    .bind(page.take as i64)
                    .fetch_all(&mut *conn)
                    .await?
            }
        };

        let mut messages = rows.iter().map(base_message).collect::<Result<Vec<_>, _>>()?;
        attach_relations(&mut *conn, &mut messages).await?;
        Ok(messages)
    }

    async fn insert_message(&self, message: NewMessage, mentions: &[Uuid]) -> Result<Message, StoreError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO messages (id, group_id, author_id, type, content, reply_to_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, clock_timestamp())
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(message.group_id)
        .bind(message.author_id)
        .bind(message.kind.as_str())
        .bind(&message.content)
        .bind(message.reply_to_id)
        .fetch_one(&mut *tx)
        .await?;

        replace_mentions(&mut *tx, id, mentions).await?;

        sqlx::query("UPDATE chat_groups SET last_message_at = $2 WHERE id = $1")
            .bind(message.group_id)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

        let stored = load_message(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound("message"))?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn update_message(&self, message_id: Uuid, content: &str, mentions: &[Uuid]) -> Result<Message, StoreError> {
        let mut tx = self.pool.begin().await?;

        let deleted_at: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT deleted_at FROM messages WHERE id = $1 FOR UPDATE")
                .bind(message_id)
                .fetch_optional(&mut *tx)
                .await?;
        match deleted_at {
            None => return Err(StoreError::NotFound("message")),
            Some(Some(_)) => return Err(StoreError::Deleted),
            Some(None) => {}
        }

        sqlx::query("UPDATE messages SET content = $2, edited_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(message_id)
            .bind(content)
            .execute(&mut *tx)
            .await?;
        replace_mentions(&mut *tx, message_id, mentions).await?;

        let stored = load_message(&mut *tx, message_id)
            .await?
            .ok_or(StoreError::NotFound("message"))?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn soft_delete_message(&self, message_id: Uuid) -> Result<Message, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("UPDATE messages SET deleted_at = COALESCE(deleted_at, now()) WHERE id = $1")
            .bind(message_id)
            .execute(&mut *conn)
            .await?;
        load_message(&mut *conn, message_id)
            .await?
            .ok_or(StoreError::NotFound("message"))
    }

    async fn toggle_reaction(&self, message_id: Uuid, user_id: Uuid, emoji: &str) -> Result<Vec<ReactionRow>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // serialises concurrent toggles (and deletes) on the same message
        let locked: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT deleted_at FROM messages WHERE id = $1 FOR UPDATE")
                .bind(message_id)
                .fetch_optional(&mut *tx)
                .await?;
        match locked {
            None => return Err(StoreError::NotFound("message")),
            Some(Some(_)) => return Err(StoreError::Deleted),
            Some(None) => {}
        }

        let current: Option<String> = sqlx::query_scalar(
            "SELECT emoji FROM message_reactions WHERE message_id = $1 AND user_id = $2",
        )
        .bind(message_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        match toggle_outcome(current.as_deref(), emoji) {
            ReactionToggle::Added => {
                sqlx::query("INSERT INTO message_reactions (message_id, user_id, emoji) VALUES ($1, $2, $3)")
                    .bind(message_id)
                    .bind(user_id)
                    .bind(emoji)
                    .execute(&mut *tx)
                    .await?;
            }
            ReactionToggle::Removed => {
                sqlx::query("DELETE FROM message_reactions WHERE message_id = $1 AND user_id = $2")
                    .bind(message_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
            ReactionToggle::Replaced => {
                sqlx::query(
                    r#"
                    UPDATE message_reactions SET emoji = $3, created_at = now()
                    WHERE message_id = $1 AND user_id = $2
                    "#,
                )
                .bind(message_id)
                .bind(user_id)
                .bind(emoji)
                .execute(&mut *tx)
                .await?;
            }
        }

        let rows = sqlx::query(
            r#"
            SELECT user_id, emoji FROM message_reactions
            WHERE message_id = $1
            ORDER BY created_at, user_id
            "#,
        )
        .bind(message_id)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        rows.iter()
            .map(|row| -> Result<ReactionRow, StoreError> {
                Ok(ReactionRow {
                    user_id: row.try_get("user_id")?,
                    emoji: row.try_get("emoji")?,
                })
            })
            .collect()
    }

    async fn add_favorite(&self, message_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO message_favorites (message_id, user_id)
            SELECT id, $2 FROM messages WHERE id = $1
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM messages WHERE id = $1")
                .bind(message_id)
                .fetch_optional(&self.pool)
                .await?;
            if exists.is_none() {
                return Err(StoreError::NotFound("message"));
            }
        }
        Ok(())
    }

    async fn remove_favorite(&self, message_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM message_favorites WHERE message_id = $1 AND user_id = $2")
            .bind(message_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_favorites(&self, user_id: Uuid, group_id: Option<Uuid>) -> Result<Vec<FavoriteEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT f.message_id, f.created_at AS favorited_at,
                   m.group_id, m.type, m.content, m.created_at, m.deleted_at,
                   u.name AS author_name
            FROM message_favorites f
            JOIN messages m ON m.id = f.message_id
            JOIN users u ON u.id = m.author_id
            WHERE f.user_id = $1 AND ($2::uuid IS NULL OR m.group_id = $2)
            ORDER BY m.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<FavoriteEntry, StoreError> {
                let kind: String = row.try_get("type")?;
                let deleted_at: Option<DateTime<Utc>> = row.try_get("deleted_at")?;
                Ok(FavoriteEntry {
                    message_id: row.try_get("message_id")?,
                    group_id: row.try_get("group_id")?,
                    kind: parse_kind(&kind)?,
                    content: if deleted_at.is_some() {
                        String::new()
                    } else {
                        row.try_get("content")?
                    },
                    author_name: row.try_get("author_name")?,
                    created_at: row.try_get("created_at")?,
                    deleted_at,
                    favorited_at: row.try_get("favorited_at")?,
                })
            })
            .collect()
    }

    async fn mark_group_read(&self, group_id: Uuid, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO message_reads (message_id, user_id)
            SELECT m.id, $2 FROM messages m
            WHERE m.group_id = $1 AND m.author_id <> $2
              AND NOT EXISTS (
                  SELECT 1 FROM message_reads r WHERE r.message_id = m.id AND r.user_id = $2
              )
            ON CONFLICT (message_id, user_id) DO NOTHING
            RETURNING message_id
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

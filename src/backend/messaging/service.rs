/**
 * Message Service
 *
 * Every message operation runs through here: membership and authorship
 * checks, mention detection, persistence through the `MessageStore`, then
 * fan-out to the group's room and background push dispatch.
 *
 * # Ordering
 *
 * Validation and authorization happen before any mutation. The room emit
 * happens after the store call returns, so a subscriber never sees an event
 * for a write that did not commit. Push dispatch runs last and never fails
 * the request.
 */

use std::sync::Arc;

use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::messaging::store::{MessageStore, NewMessage, PageRequest};
use crate::backend::middleware::AuthenticatedUser;
use crate::backend::push::{self, PushDispatcher};
use crate::backend::realtime::RoomBroker;
use crate::backend::storage::{with_original_name, Storage, UploadedFile};
use crate::shared::event::{MessageDeleted, MessagesRead, ReactionsChanged};
use crate::shared::messaging::reaction::validate_emoji;
use crate::shared::messaging::{
    extract_mentioned_user_ids, validate_content, CreateMessageRequest, DeleteResponse,
    DirectThread, DirectThreadSummary, EditMessageRequest, FavoriteEntry, GroupSummary,
    ListMessagesParams, MarkReadResponse, MemberName, MemberRole, Message, MessageType,
    ReactionResponse, UploadParams, summarize_reactions,
};
use crate::shared::ServerEvent;

#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn MessageStore>,
    rooms: RoomBroker,
    push: Arc<dyn PushDispatcher>,
    storage: Arc<dyn Storage>,
}

impl MessageService {
    pub fn new(
        store: Arc<dyn MessageStore>,
        rooms: RoomBroker,
        push: Arc<dyn PushDispatcher>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self { store, rooms, push, storage }
    }

    async fn require_member(&self, group_id: Uuid, user_id: Uuid) -> Result<MemberRole, BackendError> {
        self.store
            .member_role(group_id, user_id)
            .await?
            .ok_or(BackendError::NotMember)
    }

    async fn load_message(&self, message_id: Uuid) -> Result<Message, BackendError> {
        self.store
            .get_message(message_id)
            .await?
            .ok_or_else(|| BackendError::not_found("message"))
    }

    /// Author, global admin, or admin of the message's group
    async fn require_moderator(&self, actor: &AuthenticatedUser, message: &Message) -> Result<(), BackendError> {
        if message.author_id == actor.user_id || actor.is_admin {
            return Ok(());
        }
        match self.store.member_role(message.group_id, actor.user_id).await? {
            Some(MemberRole::Admin) => Ok(()),
            _ => Err(BackendError::forbidden("only the author or an admin can change this message")),
        }
    }

    fn mentions_for(kind: MessageType, content: &str, members: &[MemberName], author_id: Uuid) -> Vec<Uuid> {
        if kind.is_text() {
            extract_mentioned_user_ids(content, members, author_id)
        } else {
            Vec::new()
        }
    }

    /// Newest-first page of a group's history as seen by `actor`
    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        group_id: Uuid,
        params: &ListMessagesParams,
    ) -> Result<Vec<Message>, BackendError> {
        self.require_member(group_id, actor.user_id).await?;
        let page = PageRequest {
            take: params.page_size(),
            cursor: params.cursor,
        };
        let messages = self.store.list_messages(group_id, page).await?;
        Ok(messages
            .into_iter()
            .map(|m| m.redacted().with_summary_for(actor.user_id))
            .collect())
    }

    /// Post a text (or URL-bearing) message
    pub async fn create(
        &self,
        actor: &AuthenticatedUser,
        group_id: Uuid,
        request: CreateMessageRequest,
    ) -> Result<Message, BackendError> {
        validate_content(&request.content)?;
        self.require_member(group_id, actor.user_id).await?;
        if let Some(parent) = request.reply_to_id {
            self.check_reply_target(group_id, parent).await?;
        }
        self.post(
            actor,
            NewMessage {
                group_id,
                author_id: actor.user_id,
                kind: request.kind,
                content: request.content,
                reply_to_id: request.reply_to_id,
            },
        )
        .await
    }

    /// Store an uploaded file and post a message pointing at it
    pub async fn upload(
        &self,
        actor: &AuthenticatedUser,
        group_id: Uuid,
        params: &UploadParams,
        file: Option<UploadedFile>,
    ) -> Result<Message, BackendError> {
        let file = file.ok_or_else(|| BackendError::validation("missing file field"))?;
        if file.bytes.is_empty() {
            return Err(BackendError::validation("uploaded file is empty"));
        }
        self.require_member(group_id, actor.user_id).await?;
        // checked before the file is stored
        if let Some(parent) = params.reply_to_id {
            self.check_reply_target(group_id, parent).await?;
        }

        let original_name = file.file_name.clone();
        let stored = self.storage.store(file).await.map_err(|e| {
            tracing::error!("[Messages] Upload storage failed: {}", e);
            BackendError::upstream("upload failed")
        })?;

        self.post(
            actor,
            NewMessage {
                group_id,
                author_id: actor.user_id,
                kind: params.kind.unwrap_or_default().message_type(),
                content: with_original_name(&stored.url, &original_name),
                reply_to_id: params.reply_to_id,
            },
        )
        .await
    }

    async fn check_reply_target(&self, group_id: Uuid, parent_id: Uuid) -> Result<(), BackendError> {
        match self.store.get_message(parent_id).await? {
            Some(parent) if parent.group_id == group_id => Ok(()),
            _ => Err(BackendError::validation("replyToId must reference a message in this group")),
        }
    }

    async fn post(&self, actor: &AuthenticatedUser, new_message: NewMessage) -> Result<Message, BackendError> {
        let members = self.store.member_names(new_message.group_id).await?;
        let mentions = Self::mentions_for(new_message.kind, &new_message.content, &members, actor.user_id);
        let message = self.store.insert_message(new_message, &mentions).await?;

        tracing::info!(
            "[Messages] {} posted {} in group {} ({} mentions)",
            actor.user_id,
            message.id,
            message.group_id,
            mentions.len()
        );
        self.rooms.emit(message.group_id, ServerEvent::MessageNew(message.clone()));

        let member_ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
        let plan = push::plan_push(actor.user_id, &member_ids, &mentions);
        push::dispatch_in_background(self.push.clone(), &message, plan);

        Ok(message.with_summary_for(actor.user_id))
    }

    /// Replace the content of a text message
    pub async fn edit(
        &self,
        actor: &AuthenticatedUser,
        message_id: Uuid,
        request: EditMessageRequest,
    ) -> Result<Message, BackendError> {
        validate_content(&request.content)?;
        let message = self.load_message(message_id).await?;
        self.require_moderator(actor, &message).await?;
        if !message.kind.is_text() {
            return Err(BackendError::validation("only text messages can be edited"));
        }
        if message.is_deleted() {
            return Err(BackendError::validation("message was deleted"));
        }

        let members = self.store.member_names(message.group_id).await?;
        let mentions = extract_mentioned_user_ids(&request.content, &members, message.author_id);
        let updated = self
            .store
            .update_message(message_id, &request.content, &mentions)
            .await?;

        // a delete may have landed after the checks above
        let updated = updated.redacted();
        self.rooms.emit(updated.group_id, ServerEvent::MessageUpdated(updated.clone()));
        Ok(updated.with_summary_for(actor.user_id))
    }

    /// Tombstone a message; repeating the call changes nothing
    pub async fn delete(&self, actor: &AuthenticatedUser, message_id: Uuid) -> Result<DeleteResponse, BackendError> {
        let message = self.load_message(message_id).await?;
        self.require_moderator(actor, &message).await?;
        if message.is_deleted() {
            return Ok(DeleteResponse { ok: true, id: message_id });
        }

        let deleted = self.store.soft_delete_message(message_id).await?;
        if let Some(deleted_at) = deleted.deleted_at {
            self.rooms.emit(
                deleted.group_id,
                ServerEvent::MessageDeleted(MessageDeleted {
                    id: deleted.id,
                    group_id: deleted.group_id,
                    deleted_at,
                }),
            );
        }
        tracing::info!("[Messages] {} deleted {}", actor.user_id, message_id);
        Ok(DeleteResponse { ok: true, id: message_id })
    }

    /// Add, replace or remove the caller's reaction
    pub async fn react(
        &self,
        actor: &AuthenticatedUser,
        message_id: Uuid,
        emoji: &str,
    ) -> Result<ReactionResponse, BackendError> {
        let emoji = emoji.trim();
        validate_emoji(emoji)?;
        let message = self.load_message(message_id).await?;
        self.require_member(message.group_id, actor.user_id).await?;
        if message.is_deleted() {
            return Err(BackendError::validation("message was deleted"));
        }

        let rows = self.store.toggle_reaction(message_id, actor.user_id, emoji).await?;
        self.rooms.emit(
            message.group_id,
            ServerEvent::MessageReactions(ReactionsChanged {
                message_id,
                group_id: message.group_id,
                reactions: rows.clone(),
            }),
        );
        Ok(ReactionResponse {
            message_id,
            reactions: summarize_reactions(&rows, actor.user_id),
        })
    }

    pub async fn favorite(&self, actor: &AuthenticatedUser, message_id: Uuid) -> Result<(), BackendError> {
        let message = self.load_message(message_id).await?;
        self.require_member(message.group_id, actor.user_id).await?;
        self.store.add_favorite(message_id, actor.user_id).await?;
        Ok(())
    }

    pub async fn unfavorite(&self, actor: &AuthenticatedUser, message_id: Uuid) -> Result<(), BackendError> {
        let message = self.load_message(message_id).await?;
        self.require_member(message.group_id, actor.user_id).await?;
        self.store.remove_favorite(message_id, actor.user_id).await?;
        Ok(())
    }

    pub async fn favorites(
        &self,
        actor: &AuthenticatedUser,
        group_id: Option<Uuid>,
    ) -> Result<Vec<FavoriteEntry>, BackendError> {
        if let Some(group_id) = group_id {
            self.require_member(group_id, actor.user_id).await?;
        }
        Ok(self.store.list_favorites(actor.user_id, group_id).await?)
    }

    /// Receipt every unread message of the group for the caller
    pub async fn mark_read(&self, actor: &AuthenticatedUser, group_id: Uuid) -> Result<MarkReadResponse, BackendError> {
        self.require_member(group_id, actor.user_id).await?;
        let ids = self.store.mark_group_read(group_id, actor.user_id).await?;
        let marked = ids.len() as u32;
        if !ids.is_empty() {
            self.rooms.emit(
                group_id,
                ServerEvent::MessagesRead(MessagesRead {
                    group_id,
                    user_id: actor.user_id,
                    ids,
                }),
            );
        }
        Ok(MarkReadResponse { ok: true, marked })
    }

    pub async fn groups(&self, actor: &AuthenticatedUser) -> Result<Vec<GroupSummary>, BackendError> {
        Ok(self.store.groups_for_user(actor.user_id).await?)
    }

    pub async fn direct_threads(&self, actor: &AuthenticatedUser) -> Result<Vec<DirectThreadSummary>, BackendError> {
        Ok(self.store.direct_threads_for_user(actor.user_id).await?)
    }

    pub async fn direct_thread_with(&self, actor: &AuthenticatedUser, other: Uuid) -> Result<DirectThread, BackendError> {
        self.store
            .find_direct_thread(actor.user_id, other)
            .await?
            .ok_or_else(|| BackendError::not_found("direct thread"))
    }

    /// Find or create the 1:1 conversation with `other`
    pub async fn open_direct_thread(&self, actor: &AuthenticatedUser, other: Uuid) -> Result<DirectThread, BackendError> {
        if other == actor.user_id {
            return Err(BackendError::validation("cannot open a direct thread with yourself"));
        }
        if self.store.get_user(other).await?.is_none() {
            return Err(BackendError::not_found("user"));
        }
        Ok(self.store.open_direct_thread(actor.user_id, other).await?)
    }
}

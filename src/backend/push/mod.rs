//! Push Notifications
//!
//! After a message is persisted, the members of its group who are not the
//! author get a push notification. Mentioned members get a distinct,
//! more prominent one. Delivery is best effort: it runs on a spawned task,
//! failures are logged, and the message send never waits for it.
//!
//! Two dispatchers ship: [`LoggingPushDispatcher`] (development default) and
//! [`WebhookPushDispatcher`], which POSTs each batch to `PUSH_WEBHOOK_URL`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::messaging::preview::{body_text, truncate};
use crate::shared::messaging::Message;

const BODY_MAX_CHARS: usize = 140;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("push endpoint answered with status {0}")]
    Status(u16),
}

/// Notification as handed to the delivery backend
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    /// Collapses notifications of the same group on the device
    pub tag: String,
    pub data: serde_json::Value,
}

impl PushNotification {
    fn for_message(title: String, message: &Message) -> Self {
        Self {
            title,
            body: truncate(&body_text(message.kind, &message.content), BODY_MAX_CHARS),
            tag: format!("group:{}", message.group_id),
            data: json!({
                "groupId": message.group_id,
                "messageId": message.id,
            }),
        }
    }

    /// Notification for members who were mentioned
    pub fn mention(message: &Message) -> Self {
        Self::for_message(format!("{} mentioned you", message.author.name), message)
    }

    /// Notification for everyone else
    pub fn new_message(message: &Message) -> Self {
        Self::for_message(message.author.name.clone(), message)
    }
}

#[async_trait]
pub trait PushDispatcher: Send + Sync {
    async fn notify(&self, user_ids: &[Uuid], notification: &PushNotification) -> Result<(), PushError>;
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Default, Clone)]
pub struct LoggingPushDispatcher;

#[async_trait]
impl PushDispatcher for LoggingPushDispatcher {
    async fn notify(&self, user_ids: &[Uuid], notification: &PushNotification) -> Result<(), PushError> {
        tracing::debug!(
            "[Push] {} -> {} recipients ({})",
            notification.title,
            user_ids.len(),
            notification.tag
        );
        Ok(())
    }
}

/// POSTs `{ "userIds": [...], "notification": {...} }` to a webhook
#[derive(Debug, Clone)]
pub struct WebhookPushDispatcher {
    client: reqwest::Client,
    url: String,
}

impl WebhookPushDispatcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl PushDispatcher for WebhookPushDispatcher {
    async fn notify(&self, user_ids: &[Uuid], notification: &PushNotification) -> Result<(), PushError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "userIds": user_ids, "notification": notification }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PushError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Recipients of a new message, split by notification kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushPlan {
    pub mentioned: Vec<Uuid>,
    pub others: Vec<Uuid>,
}

impl PushPlan {
    pub fn is_empty(&self) -> bool {
        self.mentioned.is_empty() && self.others.is_empty()
    }
}

/// Split group members into mention and generic recipients, never the author
pub fn plan_push(author_id: Uuid, members: &[Uuid], mentioned: &[Uuid]) -> PushPlan {
    let mut plan = PushPlan::default();
    for &member in members {
        if member == author_id {
            continue;
        }
        if mentioned.contains(&member) {
            plan.mentioned.push(member);
        } else {
            plan.others.push(member);
        }
    }
    plan
}

/// Deliver the notifications for `message` on a background task
pub fn dispatch_in_background(dispatcher: Arc<dyn PushDispatcher>, message: &Message, plan: PushPlan) {
    if plan.is_empty() {
        return;
    }
    let mention = PushNotification::mention(message);
    let generic = PushNotification::new_message(message);
    let message_id = message.id;

    tokio::spawn(async move {
        if !plan.mentioned.is_empty() {
            if let Err(e) = dispatcher.notify(&plan.mentioned, &mention).await {
                tracing::warn!("[Push] Mention notification for {} failed: {}", message_id, e);
            }
        }
        if !plan.others.is_empty() {
            if let Err(e) = dispatcher.notify(&plan.others, &generic).await {
                tracing::warn!("[Push] Notification for {} failed: {}", message_id, e);
            }
        }
    });
}

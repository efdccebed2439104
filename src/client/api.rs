//! REST API Client
//!
//! Typed async wrappers around the `/api` endpoints. Every call carries the
//! bearer token from [`Config`]; error statuses become
//! [`ClientError::Api`] with the server's `error` text.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use super::config::Config;
use super::error::ClientError;
use crate::shared::messaging::{
    CreateMessageRequest, DeleteResponse, DirectThread, DirectThreadSummary, EditMessageRequest,
    FavoriteEntry, GroupSummary, MarkReadResponse, Message, OkResponse, ReactRequest,
    ReactionResponse,
};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Chat API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: Config,
    client: Client,
}

impl ApiClient {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn authed(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.config.get_token().ok_or(ClientError::NotAuthenticated)?;
        Ok(request.bearer_auth(token))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or_else(|_| if text.is_empty() { status.to_string() } else { text });
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ClientError> {
        let request = self.authed(self.client.get(self.config.api_url(path)).query(query))?;
        Self::decode(request.send().await?).await
    }

    /// History page, newest first
    pub async fn list_messages(
        &self,
        group_id: Uuid,
        take: Option<u32>,
        cursor: Option<Uuid>,
    ) -> Result<Vec<Message>, ClientError> {
        let mut query = Vec::new();
        if let Some(take) = take {
            query.push(("take", take.to_string()));
        }
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        self.get(&format!("/api/messages/{}", group_id), &query).await
    }

    pub async fn send_message(&self, group_id: Uuid, request: &CreateMessageRequest) -> Result<Message, ClientError> {
        let url = self.config.api_url(&format!("/api/messages/{}", group_id));
        let request = self.authed(self.client.post(url).json(request))?;
        Self::decode(request.send().await?).await
    }

    pub async fn edit_message(&self, message_id: Uuid, content: &str) -> Result<Message, ClientError> {
        let url = self.config.api_url(&format!("/api/messages/{}", message_id));
        let body = EditMessageRequest { content: content.to_string() };
        let request = self.authed(self.client.patch(url).json(&body))?;
        Self::decode(request.send().await?).await
    }

    pub async fn delete_message(&self, message_id: Uuid) -> Result<DeleteResponse, ClientError> {
        let url = self.config.api_url(&format!("/api/messages/{}", message_id));
        let request = self.authed(self.client.delete(url))?;
        Self::decode(request.send().await?).await
    }

    pub async fn react(&self, message_id: Uuid, emoji: &str) -> Result<ReactionResponse, ClientError> {
        let url = self.config.api_url(&format!("/api/messages/{}/reaction", message_id));
        let body = ReactRequest { emoji: emoji.to_string() };
        let request = self.authed(self.client.put(url).json(&body))?;
        Self::decode(request.send().await?).await
    }

    pub async fn favorite(&self, message_id: Uuid) -> Result<OkResponse, ClientError> {
        let url = self.config.api_url(&format!("/api/messages/{}/favorite", message_id));
        let request = self.authed(self.client.post(url))?;
        Self::decode(request.send().await?).await
    }

    pub async fn unfavorite(&self, message_id: Uuid) -> Result<OkResponse, ClientError> {
        let url = self.config.api_url(&format!("/api/messages/{}/favorite", message_id));
        let request = self.authed(self.client.delete(url))?;
        Self::decode(request.send().await?).await
    }

    pub async fn favorites(&self, group_id: Option<Uuid>) -> Result<Vec<FavoriteEntry>, ClientError> {
        let query: Vec<(&str, String)> = group_id
            .map(|id| vec![("groupId", id.to_string())])
            .unwrap_or_default();
        self.get("/api/messages/favorites", &query).await
    }

    pub async fn mark_read(&self, group_id: Uuid) -> Result<MarkReadResponse, ClientError> {
        let url = self.config.api_url(&format!("/api/messages/{}/read", group_id));
        let request = self.authed(self.client.post(url))?;
        Self::decode(request.send().await?).await
    }

    pub async fn groups(&self) -> Result<Vec<GroupSummary>, ClientError> {
        self.get("/api/groups", &[]).await
    }

    pub async fn direct_threads(&self) -> Result<Vec<DirectThreadSummary>, ClientError> {
        self.get("/api/dm", &[]).await
    }

    pub async fn open_direct_thread(&self, user_id: Uuid) -> Result<DirectThread, ClientError> {
        let url = self.config.api_url(&format!("/api/dm/{}", user_id));
        let request = self.authed(self.client.post(url))?;
        Self::decode(request.send().await?).await
    }
}

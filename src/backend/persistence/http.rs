//! REST chat directory
//!
//! Asks the REST backend whether a user belongs to a chat:
//! `GET {base}/chat-user/is-member?chatId={chat}&userId={user}` answering a
//! JSON boolean. A 404 means the chat or user is unknown and counts as "not a
//! member"; any other failure is a persistence error so the caller sees the
//! submit fail instead of being silently rejected.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::ChatDirectory;
use crate::shared::{ChatId, HubError, UserId};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpChatDirectory {
    client: Client,
    base_url: String,
    service_token: Option<String>,
}

impl HttpChatDirectory {
    pub fn new(base_url: impl Into<String>) -> Result<Self, HubError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HubError::persistence(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_token: None,
        })
    }

    /// Bearer token sent with every lookup
    pub fn with_service_token(mut self, token: impl Into<String>) -> Self {
        self.service_token = Some(token.into());
        self
    }

    fn membership_url(&self) -> String {
        format!("{}/chat-user/is-member", self.base_url)
    }
}

impl ChatDirectory for HttpChatDirectory {
    fn is_member(&self, user_id: UserId, chat_id: ChatId) -> BoxFuture<'_, Result<bool, HubError>> {
        async move {
            let mut request = self
                .client
                .get(self.membership_url())
                .query(&[("chatId", chat_id), ("userId", user_id)]);
            if let Some(token) = &self.service_token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await.map_err(|e| {
                tracing::error!("[Directory] Membership lookup failed: {}", e);
                HubError::persistence(format!("chat directory unreachable: {}", e))
            })?;

            match response.status() {
                StatusCode::NOT_FOUND => Ok(false),
                status if status.is_success() => response.json::<bool>().await.map_err(|e| {
                    HubError::persistence(format!("invalid chat directory response: {}", e))
                }),
                status => {
                    tracing::warn!(
                        "[Directory] Membership lookup for user {} in chat {} returned {}",
                        user_id,
                        chat_id,
                        status
                    );
                    Err(HubError::persistence(format!(
                        "chat directory returned {}",
                        status
                    )))
                }
            }
        }
        .boxed()
    }
}

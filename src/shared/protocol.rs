//! Hub Wire Protocol
//!
//! JSON text frames exchanged over a persistent hub connection.
//!
//! Client to server:
//!
//! ```json
//! {"type":"handshake","accessToken":"<jwt>"}
//! {"type":"invocation","invocationId":"1","call":{"target":"AddToGroup","arguments":"7"}}
//! {"type":"ping"}
//! ```
//!
//! Server to client:
//!
//! ```json
//! {"type":"handshakeAck","connectionId":"<uuid>"}
//! {"type":"event","event":{"target":"OnMessageDeleted","arguments":[7,11]}}
//! {"type":"completion","invocationId":"1","result":null,"error":null}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::shared::error::{ErrorPayload, HubError};
use crate::shared::event::HubEvent;
use crate::shared::message::{AddMessageDto, MessageId, UpdateMessageDto};

/// Identifier of one live hub connection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Hub method invoked by a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "target", content = "arguments")]
pub enum HubCall {
    /// Join the realtime group of a chat
    AddToGroup(String),
    /// Leave the realtime group of a chat
    RemoveFromGroup(String),
    SendMessage(AddMessageDto),
    EditMessage(UpdateMessageDto),
    DeleteMessage(MessageId),
}

impl HubCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddToGroup(_) => "AddToGroup",
            Self::RemoveFromGroup(_) => "RemoveFromGroup",
            Self::SendMessage(_) => "SendMessage",
            Self::EditMessage(_) => "EditMessage",
            Self::DeleteMessage(_) => "DeleteMessage",
        }
    }
}

/// Frame sent by a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Credential for connections that did not present one at upgrade
    #[serde(rename_all = "camelCase")]
    Handshake { access_token: String },
    #[serde(rename_all = "camelCase")]
    Invocation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invocation_id: Option<String>,
        call: HubCall,
    },
    Ping,
}

impl ClientFrame {
    pub fn invoke(invocation_id: impl Into<String>, call: HubCall) -> Self {
        Self::Invocation {
            invocation_id: Some(invocation_id.into()),
            call,
        }
    }

    pub fn to_text(&self) -> Result<String, HubError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_text(text: &str) -> Result<Self, HubError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Frame sent by the hub
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    #[serde(rename_all = "camelCase")]
    HandshakeAck { connection_id: ConnectionId },
    Event { event: HubEvent },
    /// Outcome of one invocation, sent only to the caller
    #[serde(rename_all = "camelCase")]
    Completion {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invocation_id: Option<String>,
        #[serde(default)]
        result: Option<serde_json::Value>,
        #[serde(default)]
        error: Option<ErrorPayload>,
    },
    Ping,
    Pong,
    Close { reason: String },
}

impl ServerFrame {
    pub fn event(event: HubEvent) -> Self {
        Self::Event { event }
    }

    pub fn completed(invocation_id: Option<String>, result: Option<serde_json::Value>) -> Self {
        Self::Completion {
            invocation_id,
            result,
            error: None,
        }
    }

    pub fn failed(invocation_id: Option<String>, error: &HubError) -> Self {
        Self::Completion {
            invocation_id,
            result: None,
            error: Some(error.to_payload()),
        }
    }

    pub fn close(reason: impl Into<String>) -> Self {
        Self::Close {
            reason: reason.into(),
        }
    }

    pub fn to_text(&self) -> Result<String, HubError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_text(text: &str) -> Result<Self, HubError> {
        Ok(serde_json::from_str(text)?)
    }
}

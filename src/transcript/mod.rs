//! Conversation transcript
//!
//! This module provides the chat message types and the append-only
//! `Transcript` that accumulates them for the lifetime of a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Stable string form, used as the message id prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single chat message
///
/// Immutable once created. Display order equals creation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique id, stable for the session lifetime
    pub id: String,

    /// Message author
    pub role: Role,

    /// Message text
    pub content: String,

    /// When the message was created
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message with a fresh id and the current timestamp
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: format!("{}-{}", role.as_str(), uuid::Uuid::new_v4()),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only sequence of messages for one session
///
/// Cloning is cheap (shared storage); all clones observe the same
/// messages. There is no clear operation: the transcript lives until the
/// session itself is torn down.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl Transcript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub async fn push(&self, message: Message) {
        let mut messages = self.messages.lock().await;
        messages.push(message);
    }

    /// Snapshot of all messages in creation order
    pub async fn messages(&self) -> Vec<Message> {
        let messages = self.messages.lock().await;
        messages.clone()
    }

    /// Number of messages appended so far
    pub async fn len(&self) -> usize {
        let messages = self.messages.lock().await;
        messages.len()
    }

    /// Whether the transcript is still empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

use serde::{Deserialize, Serialize};

use super::Citation;
use crate::error::AppError;
use crate::normalize::canonical_rfc3339_utc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Only set on assistant messages.
    #[serde(default)]
    pub confidence: Option<f32>,
    pub created_at: String,
}

/// A chat over a fixed set of documents.
///
/// Sessions are never closed; each exchange appends a user message, then an
/// assistant message, then bumps `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    pub id: String,
    /// Opaque identity of the session owner.
    pub user_id: String,
    /// Documents the owner may read; already filtered by the access gate.
    pub document_ids: Vec<String>,
    pub messages: Vec<ChatMessage>,
    pub created_at: String,
    pub updated_at: String,
}

impl ChatSession {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        document_ids: Vec<String>,
        created_at: &str,
    ) -> Result<Self, AppError> {
        let created_at = canonical_rfc3339_utc(created_at)?;
        Ok(Self {
            id: id.into(),
            user_id: user_id.into(),
            document_ids,
            messages: Vec::new(),
            updated_at: created_at.clone(),
            created_at,
        })
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn append_user_message(&mut self, content: &str, at: &str) -> Result<(), AppError> {
        if content.trim().is_empty() {
            return Err(AppError::new(
                "CHAT_MESSAGE_INVALID",
                "Chat message must not be empty",
            ));
        }
        let created_at = canonical_rfc3339_utc(at)?;
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            content: content.to_string(),
            citations: Vec::new(),
            confidence: None,
            created_at,
        });
        Ok(())
    }

    /// Append the reply to the most recent user message.
    pub fn append_assistant_message(
        &mut self,
        content: &str,
        citations: Vec<Citation>,
        confidence: f32,
        at: &str,
    ) -> Result<(), AppError> {
        match self.messages.last().map(|m| m.role) {
            Some(ChatRole::User) => {}
            _ => {
                return Err(AppError::new(
                    "CHAT_OUT_OF_ORDER",
                    "Assistant message must follow a user message",
                )
                .with_details(format!("session_id={}", self.id)));
            }
        }
        let created_at = canonical_rfc3339_utc(at)?;
        self.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content: content.to_string(),
            citations,
            confidence: Some(confidence),
            created_at,
        });
        Ok(())
    }

    pub fn touch(&mut self, at: &str) -> Result<(), AppError> {
        self.updated_at = canonical_rfc3339_utc(at)?;
        Ok(())
    }
}

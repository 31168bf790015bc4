use lexdoc_core::domain::ChatSession;
use lexdoc_core::error::AppError;

use crate::answer::{Answerer, ChatAnswer};

/// Drives one exchange of a chat session.
pub struct ChatService {
    answerer: Answerer,
}

impl ChatService {
    pub fn new(answerer: Answerer) -> Self {
        Self { answerer }
    }

    /// Append the user's message, answer it from the session's documents,
    /// append the reply and bump `updated_at`.
    ///
    /// Only an invalid message or timestamp is an error; provider failures
    /// produce a low-confidence apology that is stored like any other reply.
    pub fn send_message(
        &self,
        session: &mut ChatSession,
        content: &str,
        now: &str,
    ) -> Result<ChatAnswer, AppError> {
        session.append_user_message(content, now)?;

        let answer = self.answerer.answer(content, &session.document_ids);
        if answer.degraded {
            tracing::warn!(session_id = %session.id, "chat reply degraded");
        }

        session.append_assistant_message(
            &answer.content,
            answer.citations.clone(),
            answer.confidence,
            now,
        )?;
        session.touch(now)?;
        Ok(answer)
    }
}

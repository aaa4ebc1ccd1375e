//! Questions and conversation context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A prior question/answer exchange in the same conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Conversation context supplied by the caller alongside a question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Prior turns, oldest first.
    #[serde(default)]
    pub history: Vec<Turn>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            history: Vec::new(),
        }
    }

    pub fn with_turn(mut self, turn: Turn) -> Self {
        self.history.push(turn);
        self
    }
}

/// A natural-language question about the database.
///
/// Created once per request and never mutated afterwards; agents receive it
/// by shared reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub history: Vec<Turn>,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            session_id: None,
            history: Vec::new(),
        }
    }

    /// Build a question carrying the caller's conversation context.
    pub fn with_context(text: impl Into<String>, context: SessionContext) -> Self {
        Self {
            session_id: context.session_id,
            history: context.history,
            ..Self::new(text)
        }
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    /// Lower-cased text used for keyword routing.
    pub fn normalized_text(&self) -> String {
        self.text.trim().to_lowercase()
    }
}

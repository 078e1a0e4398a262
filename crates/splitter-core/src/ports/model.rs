//! ModelBackend port - the remote completion call workers talk to

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(String),

    #[error("backend returned an empty reply")]
    EmptyReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// `complete(history) -> text`.
///
/// A backend shared between workers must tolerate concurrent calls.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn complete(&self, history: &[Message]) -> Result<String, BackendError>;
}

/// Keep at most `max_messages` messages, always retaining a leading system
/// prompt.
pub fn truncate_history(history: &[Message], max_messages: usize) -> Vec<Message> {
    if history.len() <= max_messages {
        return history.to_vec();
    }
    match history.first() {
        Some(first) if first.role == Role::System && max_messages > 0 => {
            let tail = max_messages - 1;
            let mut out = Vec::with_capacity(max_messages);
            out.push(first.clone());
            out.extend_from_slice(&history[history.len() - tail..]);
            out
        }
        _ => history[history.len() - max_messages..].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(n: usize) -> Vec<Message> {
        let mut h = vec![Message::system("sys")];
        for i in 0..n {
            h.push(Message::user(format!("u{i}")));
        }
        h
    }

    #[test]
    fn short_history_is_untouched() {
        let h = history(3);
        assert_eq!(truncate_history(&h, 50), h);
    }

    #[test]
    fn truncation_keeps_system_prompt_and_latest_messages() {
        let h = history(10);
        let t = truncate_history(&h, 4);
        assert_eq!(t.len(), 4);
        assert_eq!(t[0], Message::system("sys"));
        assert_eq!(t[1].content, "u7");
        assert_eq!(t[3].content, "u9");
    }

    #[test]
    fn truncation_without_system_prompt_keeps_tail() {
        let h: Vec<Message> = (0..5).map(|i| Message::user(format!("u{i}"))).collect();
        let t = truncate_history(&h, 2);
        assert_eq!(t, vec![Message::user("u3"), Message::user("u4")]);
    }

    #[test]
    fn role_serializes_lowercase() {
        let v = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert_eq!(v["role"], "assistant");
    }
}

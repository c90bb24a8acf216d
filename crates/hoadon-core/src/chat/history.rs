//! Per-user conversation history.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Intent, ResponseKind};

/// Default number of exchanges kept per user.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One user message and the bot's reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub bot: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ResponseKind,
}

/// Conversation state of one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub messages: Vec<Exchange>,
    pub started_at: DateTime<Utc>,
    pub last_intent: Option<Intent>,
}

impl ConversationContext {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            started_at: Utc::now(),
            last_intent: None,
        }
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.messages
            .last()
            .map(|m| m.timestamp)
            .unwrap_or(self.started_at)
    }
}

/// Counters over all conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total_users: usize,
    pub total_messages: usize,
    /// Users with activity in the last hour.
    pub active_conversations: usize,
}

/// In-memory conversation store keyed by user id.
pub struct ConversationStore {
    limit: usize,
    conversations: RwLock<HashMap<String, ConversationContext>>,
}

impl ConversationStore {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of a user's context; empty for unknown users.
    pub fn context(&self, user_id: &str) -> ConversationContext {
        self.conversations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .cloned()
            .unwrap_or_else(ConversationContext::new)
    }

    /// Append an exchange, dropping the oldest beyond the limit.
    pub fn record(
        &self,
        user_id: &str,
        message: &str,
        response: &str,
        kind: ResponseKind,
        intent: Intent,
    ) {
        let mut conversations = self.conversations.write().unwrap_or_else(|e| e.into_inner());
        let context = conversations
            .entry(user_id.to_string())
            .or_insert_with(ConversationContext::new);

        context.messages.push(Exchange {
            user: message.to_string(),
            bot: response.to_string(),
            timestamp: Utc::now(),
            kind,
        });
        context.last_intent = Some(intent);

        if context.messages.len() > self.limit {
            let excess = context.messages.len() - self.limit;
            context.messages.drain(..excess);
        }
    }

    /// Forget a user's conversation. Returns whether one existed.
    pub fn clear(&self, user_id: &str) -> bool {
        self.conversations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(user_id)
            .is_some()
    }

    pub fn statistics(&self) -> ConversationStats {
        let conversations = self.conversations.read().unwrap_or_else(|e| e.into_inner());
        let cutoff = Utc::now() - Duration::hours(1);

        ConversationStats {
            total_users: conversations.len(),
            total_messages: conversations.values().map(|c| c.messages.len()).sum(),
            active_conversations: conversations
                .values()
                .filter(|c| c.last_activity() > cutoff)
                .count(),
        }
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_and_trim() {
        let store = ConversationStore::new(3);
        for i in 0..5 {
            store.record("u1", &format!("m{}", i), "ok", ResponseKind::Text, Intent::General);
        }
        store.record("u1", "xin chào", "chào", ResponseKind::Text, Intent::Greeting);

        let context = store.context("u1");
        assert_eq!(context.messages.len(), 3);
        assert_eq!(context.messages[0].user, "m3");
        assert_eq!(context.messages[2].bot, "chào");
        assert_eq!(context.last_intent, Some(Intent::Greeting));
    }

    #[test]
    fn test_unknown_user_has_empty_context() {
        let store = ConversationStore::default();
        let context = store.context("nobody");
        assert!(context.messages.is_empty());
        assert_eq!(context.last_intent, None);
    }

    #[test]
    fn test_statistics_and_clear() {
        let store = ConversationStore::default();
        store.record("a", "1", "x", ResponseKind::Text, Intent::General);
        store.record("a", "2", "x", ResponseKind::Text, Intent::General);
        store.record("b", "1", "x", ResponseKind::Markdown, Intent::Help);

        assert_eq!(
            store.statistics(),
            ConversationStats {
                total_users: 2,
                total_messages: 3,
                active_conversations: 2,
            }
        );

        assert!(store.clear("a"));
        assert!(!store.clear("a"));
        assert_eq!(store.statistics().total_users, 1);
    }
}

//! Conversation sessions.
//!
//! Keeps a short rolling history per session so follow-up questions can
//! refer back to earlier answers. History is held in memory only.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// One remembered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: String,
    pub content: String,
}

#[derive(Default)]
struct Sessions {
    next_id: usize,
    history: HashMap<String, Vec<SessionMessage>>,
    // Issued ids, oldest first.
    order: VecDeque<String>,
}

/// In-memory session store with a bounded history per session and a cap on
/// the number of live sessions.
pub struct SessionManager {
    max_history: usize,
    max_sessions: usize,
    sessions: Mutex<Sessions>,
}

impl SessionManager {
    /// Create a manager that remembers the last `max_history` exchanges for
    /// at most `max_sessions` sessions. The oldest session is evicted when a
    /// new one would exceed the cap.
    pub fn new(max_history: usize, max_sessions: usize) -> Self {
        Self {
            max_history,
            max_sessions: max_sessions.max(1),
            sessions: Mutex::new(Sessions::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        // History is append-only text; a poisoned lock leaves it usable.
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a new, empty session and return its id.
    pub fn create_session(&self) -> String {
        let mut sessions = self.lock();
        sessions.next_id += 1;
        let id = format!("session_{}", sessions.next_id);

        while sessions.order.len() >= self.max_sessions {
            let Some(oldest) = sessions.order.pop_front() else {
                break;
            };
            sessions.history.remove(&oldest);
            debug!("Evicted {}", oldest);
        }

        sessions.history.insert(id.clone(), Vec::new());
        sessions.order.push_back(id.clone());
        debug!("Created {}", id);
        id
    }

    /// Whether a session with this id exists.
    pub fn contains(&self, session_id: &str) -> bool {
        self.lock().history.contains_key(session_id)
    }

    /// Append a message, dropping the oldest messages beyond the history
    /// limit. Ids this manager never issued (or has evicted) are ignored.
    pub fn add_message(&self, session_id: &str, role: &str, content: &str) {
        let limit = self.max_history * 2;
        let mut sessions = self.lock();
        let Some(messages) = sessions.history.get_mut(session_id) else {
            debug!("Ignoring message for unknown session {}", session_id);
            return;
        };
        messages.push(SessionMessage {
            role: role.to_string(),
            content: content.to_string(),
        });
        if messages.len() > limit {
            let excess = messages.len() - limit;
            messages.drain(..excess);
        }
    }

    /// Record a question and its answer.
    pub fn add_exchange(&self, session_id: &str, user: &str, assistant: &str) {
        self.add_message(session_id, "user", user);
        self.add_message(session_id, "assistant", assistant);
    }

    /// Recent history formatted for the system prompt, or `None` when the
    /// session is unknown or empty.
    pub fn conversation_history(&self, session_id: &str) -> Option<String> {
        let sessions = self.lock();
        let messages = sessions.history.get(session_id)?;
        if messages.is_empty() {
            return None;
        }

        let lines: Vec<String> = messages
            .iter()
            .map(|m| format!("{}: {}", capitalize(&m.role), m.content))
            .collect();
        Some(lines.join("\n"))
    }

    /// Forget a session's history. The id stays valid.
    pub fn clear_session(&self, session_id: &str) {
        if let Some(messages) = self.lock().history.get_mut(session_id) {
            messages.clear();
        }
    }
}

fn capitalize(role: &str) -> String {
    let mut chars = role.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_sequential() {
        let manager = SessionManager::new(2, 10);
        assert_eq!(manager.create_session(), "session_1");
        assert_eq!(manager.create_session(), "session_2");
        assert!(manager.contains("session_2"));
        assert!(!manager.contains("session_3"));
    }

    #[test]
    fn test_history_format() {
        let manager = SessionManager::new(2, 10);
        let id = manager.create_session();
        assert_eq!(manager.conversation_history(&id), None);

        manager.add_exchange(&id, "What is MCP?", "A protocol.");
        assert_eq!(
            manager.conversation_history(&id).as_deref(),
            Some("User: What is MCP?\nAssistant: A protocol.")
        );
    }

    #[test]
    fn test_history_keeps_last_exchanges() {
        let manager = SessionManager::new(2, 10);
        let id = manager.create_session();
        for i in 1..=3 {
            manager.add_exchange(&id, &format!("q{}", i), &format!("a{}", i));
        }

        let history = manager.conversation_history(&id).unwrap();
        assert_eq!(history, "User: q2\nAssistant: a2\nUser: q3\nAssistant: a3");
    }

    #[test]
    fn test_unknown_session_is_not_created_on_write() {
        let manager = SessionManager::new(1, 10);
        assert_eq!(manager.conversation_history("elsewhere"), None);
        manager.add_exchange("elsewhere", "hi", "hello");
        assert!(!manager.contains("elsewhere"));
        assert_eq!(manager.conversation_history("elsewhere"), None);
    }

    #[test]
    fn test_oldest_sessions_evicted_past_cap() {
        let manager = SessionManager::new(2, 3);
        let ids: Vec<String> = (0..5).map(|_| manager.create_session()).collect();
        assert_eq!(ids.last().map(String::as_str), Some("session_5"));

        assert!(!manager.contains("session_1"));
        assert!(!manager.contains("session_2"));
        for id in &ids[2..] {
            assert!(manager.contains(id));
        }

        // Writes to an evicted id do not bring it back.
        manager.add_exchange("session_1", "q", "a");
        assert!(!manager.contains("session_1"));
        assert_eq!(manager.lock().history.len(), 3);
    }

    #[test]
    fn test_zero_session_cap_keeps_newest() {
        let manager = SessionManager::new(2, 0);
        manager.create_session();
        let id = manager.create_session();
        assert!(!manager.contains("session_1"));
        assert!(manager.contains(&id));
    }

    #[test]
    fn test_clear_session() {
        let manager = SessionManager::new(2, 10);
        let id = manager.create_session();
        manager.add_exchange(&id, "q", "a");
        manager.clear_session(&id);
        assert_eq!(manager.conversation_history(&id), None);
        assert!(manager.contains(&id));
    }
}

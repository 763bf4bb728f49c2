//! Conversation store: persisted conversations plus a per-conversation
//! message cache and the currently selected view.

use std::collections::HashMap;

use database::{conversation, message, Conversation, Database, Message, SenderType};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::ChatError;

/// Number of conversations kept in the recent list.
pub const RECENT_LIMIT: i64 = 20;

#[derive(Debug, Default)]
struct StoreState {
    /// Newest `last_message_at` first
    conversations: Vec<Conversation>,
    /// Conversation id -> messages in ascending timestamp order
    messages: HashMap<String, Vec<Message>>,
    selected: Option<String>,
    /// Messages of the selected conversation
    visible: Vec<Message>,
}

/// Owns conversations and their cached messages for one caller identity.
///
/// The message cache is only mutated through this type's methods.
pub struct ConversationStore {
    db: Database,
    user_id: String,
    state: RwLock<StoreState>,
}

impl ConversationStore {
    /// Create a store acting on behalf of `user_id`.
    pub fn new(db: Database, user_id: impl Into<String>) -> Self {
        Self {
            db,
            user_id: user_id.into(),
            state: RwLock::new(StoreState::default()),
        }
    }

    /// The caller identity this store acts for.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Reload the most recent conversations.
    ///
    /// A failed read is logged and the last known list is returned.
    pub async fn list_conversations(&self) -> Vec<Conversation> {
        match conversation::list_recent(self.db.pool(), &self.user_id, RECENT_LIMIT).await {
            Ok(conversations) => {
                debug!("Loaded {} conversations", conversations.len());
                self.state.write().await.conversations = conversations.clone();
                conversations
            }
            Err(e) => {
                error!("Failed to list conversations: {}", e);
                self.conversations().await
            }
        }
    }

    /// The last loaded conversation list without touching the database.
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.read().await.conversations.clone()
    }

    /// Look up a conversation, preferring the loaded list.
    pub async fn get_conversation(&self, id: &str) -> Result<Conversation, ChatError> {
        if let Some(found) = self
            .state
            .read()
            .await
            .conversations
            .iter()
            .find(|c| c.id == id)
        {
            return Ok(found.clone());
        }

        let found = conversation::get_conversation(self.db.pool(), id).await?;
        if found.user_id != self.user_id {
            return Err(ChatError::NotFound {
                entity: "Conversation",
                id: id.to_string(),
            });
        }
        Ok(found)
    }

    /// Create a conversation bound to `agent_id`.
    ///
    /// A rejected write is returned to the caller.
    pub async fn create_conversation(
        &self,
        agent_id: &str,
        title: Option<&str>,
    ) -> Result<Conversation, ChatError> {
        let created =
            conversation::create_conversation(self.db.pool(), &self.user_id, agent_id, title)
                .await
                .map_err(|e| {
                    error!("Failed to create conversation: {}", e);
                    e
                })?;

        info!("Created conversation {} with agent {}", created.id, agent_id);

        let mut state = self.state.write().await;
        state.conversations.insert(0, created.clone());
        state.conversations.truncate(RECENT_LIMIT as usize);
        state.messages.insert(created.id.clone(), Vec::new());

        Ok(created)
    }

    /// Read a conversation's messages from the database.
    ///
    /// The cache is always refreshed. The visible list is only replaced if
    /// `conversation_id` is still selected once the read completes.
    pub async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ChatError> {
        let messages = message::list_messages(self.db.pool(), conversation_id)
            .await
            .map_err(|e| {
                error!("Failed to fetch messages for {}: {}", conversation_id, e);
                e
            })?;

        let mut state = self.state.write().await;
        state
            .messages
            .insert(conversation_id.to_string(), messages.clone());

        if state.selected.as_deref() == Some(conversation_id) {
            state.visible = messages.clone();
        } else {
            debug!(
                "Discarding view update for {}: no longer selected",
                conversation_id
            );
        }

        Ok(messages)
    }

    /// Change the selected conversation and return its messages.
    ///
    /// Served from the cache when possible, otherwise fetched. A failed fetch
    /// is logged and leaves the view empty.
    pub async fn select_conversation(&self, conversation_id: Option<&str>) -> Vec<Message> {
        let cached = {
            let mut state = self.state.write().await;
            state.selected = conversation_id.map(str::to_string);

            let cached = conversation_id.and_then(|id| state.messages.get(id).cloned());
            state.visible = cached.clone().unwrap_or_default();
            cached
        };

        let Some(id) = conversation_id else {
            return Vec::new();
        };

        if let Some(messages) = cached {
            debug!("Cache hit for conversation {}", id);
            return messages;
        }

        match self.fetch_messages(id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Could not load conversation {}: {}", id, e);
                Vec::new()
            }
        }
    }

    /// Persist a message and fold it into the cached state.
    ///
    /// Fails only when the message itself cannot be written. Advancing the
    /// conversation's `last_message_at` is best effort.
    pub async fn save_message(
        &self,
        conversation_id: &str,
        content: &str,
        sender_type: SenderType,
    ) -> Result<Message, ChatError> {
        let saved = message::insert_message(self.db.pool(), conversation_id, sender_type, content)
            .await
            .map_err(|e| {
                error!("Failed to save {} message: {}", sender_type, e);
                e
            })?;

        let touched =
            match conversation::touch_last_message_at(self.db.pool(), conversation_id, &saved.timestamp)
                .await
            {
                Ok(stored) => Some(stored),
                Err(e) => {
                    warn!(
                        "Failed to update last_message_at for {}: {}",
                        conversation_id, e
                    );
                    None
                }
            };

        let mut state = self.state.write().await;

        if let Some(stored) = touched {
            if let Some(conv) = state
                .conversations
                .iter_mut()
                .find(|c| c.id == conversation_id)
            {
                conv.last_message_at = stored;
            }
            state
                .conversations
                .sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        }

        if let Some(cached) = state.messages.get_mut(conversation_id) {
            cached.push(saved.clone());
        }

        if state.selected.as_deref() == Some(conversation_id) {
            state.visible.push(saved.clone());
        }

        Ok(saved)
    }

    /// Rename a conversation.
    pub async fn update_conversation_title(&self, id: &str, title: &str) -> Result<(), ChatError> {
        conversation::update_title(self.db.pool(), id, title).await?;

        let mut state = self.state.write().await;
        if let Some(conv) = state.conversations.iter_mut().find(|c| c.id == id) {
            conv.title = title.to_string();
        }

        info!("Renamed conversation {}", id);
        Ok(())
    }

    /// Delete a conversation and everything cached for it.
    pub async fn delete_conversation(&self, id: &str) -> Result<(), ChatError> {
        conversation::delete_conversation(self.db.pool(), id).await?;

        let mut state = self.state.write().await;
        state.conversations.retain(|c| c.id != id);
        state.messages.remove(id);
        if state.selected.as_deref() == Some(id) {
            state.selected = None;
            state.visible.clear();
        }

        info!("Deleted conversation {}", id);
        Ok(())
    }

    /// The selected conversation id.
    pub async fn selected(&self) -> Option<String> {
        self.state.read().await.selected.clone()
    }

    /// Messages of the selected conversation.
    pub async fn visible_messages(&self) -> Vec<Message> {
        self.state.read().await.visible.clone()
    }

    /// Cached messages for a conversation, if loaded.
    pub async fn cached_messages(&self, conversation_id: &str) -> Option<Vec<Message>> {
        self.state.read().await.messages.get(conversation_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::ReadStatus;

    async fn store() -> ConversationStore {
        ConversationStore::new(Database::in_memory().await.unwrap(), "guest")
    }

    #[tokio::test]
    async fn test_create_conversation_defaults() {
        let store = store().await;

        let conv = store.create_conversation("agent-1", None).await.unwrap();
        assert_eq!(conv.title, "New Conversation");
        assert_eq!(conv.user_id, "guest");
        assert_eq!(conv.started_at, conv.last_message_at);

        assert_eq!(store.cached_messages(&conv.id).await, Some(Vec::new()));
        assert_eq!(store.list_conversations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_save_messages_in_order() {
        let store = store().await;
        let conv = store.create_conversation("agent-1", Some("Chat")).await.unwrap();
        store.select_conversation(Some(&conv.id)).await;

        let user = store
            .save_message(&conv.id, "Hi", SenderType::User)
            .await
            .unwrap();
        assert_eq!(user.read_status, ReadStatus::Read);

        for i in 0..5 {
            let reply = store
                .save_message(&conv.id, &format!("reply {}", i), SenderType::Agent)
                .await
                .unwrap();
            assert_eq!(reply.read_status, ReadStatus::Unread);
        }

        let fetched = store.fetch_messages(&conv.id).await.unwrap();
        assert_eq!(fetched.len(), 6);
        assert!(fetched
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
        assert_eq!(fetched[0].content, "Hi");
        assert_eq!(store.visible_messages().await, fetched);
    }

    #[tokio::test]
    async fn test_save_advances_last_message_at_and_reorders() {
        let store = store().await;
        let older = store.create_conversation("agent-1", Some("Older")).await.unwrap();
        let newer = store.create_conversation("agent-1", Some("Newer")).await.unwrap();

        let saved = store
            .save_message(&older.id, "bump", SenderType::User)
            .await
            .unwrap();

        let listed = store.conversations().await;
        assert_eq!(listed[0].id, older.id);
        assert_eq!(listed[0].last_message_at, saved.timestamp);
        assert_eq!(listed[1].id, newer.id);

        let reloaded = store.list_conversations().await;
        assert_eq!(reloaded[0].id, older.id);
    }

    #[tokio::test]
    async fn test_save_to_unknown_conversation_fails() {
        let store = store().await;
        let result = store.save_message("missing", "Hi", SenderType::User).await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_fetch_for_unselected_conversation_keeps_view() {
        let store = store().await;
        let a = store.create_conversation("agent-1", Some("A")).await.unwrap();
        let b = store.create_conversation("agent-1", Some("B")).await.unwrap();

        store.select_conversation(Some(&a.id)).await;
        store.save_message(&a.id, "in a", SenderType::User).await.unwrap();
        store.save_message(&b.id, "in b", SenderType::User).await.unwrap();

        // A late fetch for B must not replace A's view
        let fetched_b = store.fetch_messages(&b.id).await.unwrap();
        assert_eq!(fetched_b.len(), 1);

        let visible = store.visible_messages().await;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].content, "in a");
        assert_eq!(store.cached_messages(&b.id).await.unwrap()[0].content, "in b");
    }

    #[tokio::test]
    async fn test_select_uses_cache_then_fetches() {
        let db = Database::in_memory().await.unwrap();
        let conv = conversation::create_conversation(db.pool(), "guest", "agent-1", None)
            .await
            .unwrap();
        message::insert_message(db.pool(), &conv.id, SenderType::User, "from elsewhere")
            .await
            .unwrap();

        let store = ConversationStore::new(db.clone(), "guest");
        assert_eq!(store.cached_messages(&conv.id).await, None);

        // Cache miss: fetched from the database
        let loaded = store.select_conversation(Some(&conv.id)).await;
        assert_eq!(loaded.len(), 1);

        // Written behind the store's back; a cache hit does not see it
        message::insert_message(db.pool(), &conv.id, SenderType::Agent, "unseen")
            .await
            .unwrap();
        let again = store.select_conversation(Some(&conv.id)).await;
        assert_eq!(again.len(), 1);

        assert!(store.select_conversation(None).await.is_empty());
        assert_eq!(store.selected().await, None);
        assert!(store.visible_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_conversation_purges_everything() {
        let store = store().await;
        let conv = store.create_conversation("agent-1", None).await.unwrap();
        store.select_conversation(Some(&conv.id)).await;
        store.save_message(&conv.id, "Hi", SenderType::User).await.unwrap();

        store.delete_conversation(&conv.id).await.unwrap();

        assert!(store.list_conversations().await.is_empty());
        assert_eq!(store.cached_messages(&conv.id).await, None);
        assert_eq!(store.selected().await, None);
        assert!(store.visible_messages().await.is_empty());
        assert!(store.fetch_messages(&conv.id).await.unwrap().is_empty());

        let again = store.delete_conversation(&conv.id).await;
        assert!(again.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_title() {
        let store = store().await;
        let conv = store.create_conversation("agent-1", None).await.unwrap();

        store
            .update_conversation_title(&conv.id, "Renamed")
            .await
            .unwrap();

        assert_eq!(store.conversations().await[0].title, "Renamed");
        assert_eq!(store.get_conversation(&conv.id).await.unwrap().title, "Renamed");
    }

    #[tokio::test]
    async fn test_conversations_scoped_to_user() {
        let db = Database::in_memory().await.unwrap();
        let other = conversation::create_conversation(db.pool(), "someone-else", "agent-1", None)
            .await
            .unwrap();

        let store = ConversationStore::new(db, "guest");
        assert!(store.list_conversations().await.is_empty());
        assert!(store.get_conversation(&other.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_falls_back_to_last_known() {
        let db = Database::in_memory().await.unwrap();
        let store = ConversationStore::new(db.clone(), "guest");
        store.create_conversation("agent-1", None).await.unwrap();
        assert_eq!(store.list_conversations().await.len(), 1);

        db.close().await;

        assert_eq!(store.list_conversations().await.len(), 1);
        assert!(store.create_conversation("agent-1", None).await.is_err());
    }
}

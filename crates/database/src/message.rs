//! Message persistence.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{timestamp_now, ContentType, Message, SenderType};

/// Insert a text message into a conversation.
///
/// The store assigns the id and timestamp. User messages start read, agent
/// messages start unread. Fails if the conversation does not exist.
pub async fn insert_message(
    pool: &SqlitePool,
    conversation_id: &str,
    sender_type: SenderType,
    content: &str,
) -> Result<Message> {
    let message = Message {
        id: Uuid::new_v4().to_string(),
        conversation_id: conversation_id.to_string(),
        sender_type,
        content: content.to_string(),
        content_type: ContentType::Text,
        timestamp: timestamp_now(),
        read_status: sender_type.initial_read_status(),
    };

    sqlx::query(
        r#"
        INSERT INTO messages (
            id, conversation_id, sender_type, content, content_type, timestamp, read_status
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&message.id)
    .bind(&message.conversation_id)
    .bind(message.sender_type.as_str())
    .bind(&message.content)
    .bind(message.content_type.as_str())
    .bind(&message.timestamp)
    .bind(message.read_status.as_str())
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_foreign_key_violation() {
                return DatabaseError::NotFound {
                    entity: "Conversation",
                    id: conversation_id.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(message)
}

/// List a conversation's messages in ascending timestamp order.
///
/// Messages sharing a timestamp keep their insertion order.
pub async fn list_messages(pool: &SqlitePool, conversation_id: &str) -> Result<Vec<Message>> {
    let rows = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, conversation_id, sender_type, content, content_type, timestamp, read_status
        FROM messages
        WHERE conversation_id = ?
        ORDER BY timestamp ASC, rowid ASC
        "#,
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadStatus;
    use crate::{conversation, Database};

    #[tokio::test]
    async fn test_insert_sets_read_status() {
        let db = Database::in_memory().await.unwrap();
        let conv = conversation::create_conversation(db.pool(), "guest", "agent-1", None)
            .await
            .unwrap();

        let user = insert_message(db.pool(), &conv.id, SenderType::User, "Hi")
            .await
            .unwrap();
        let agent = insert_message(db.pool(), &conv.id, SenderType::Agent, "Hello")
            .await
            .unwrap();

        assert_eq!(user.read_status, ReadStatus::Read);
        assert_eq!(agent.read_status, ReadStatus::Unread);
        assert_eq!(agent.content_type, ContentType::Text);
    }

    #[tokio::test]
    async fn test_list_is_non_decreasing() {
        let db = Database::in_memory().await.unwrap();
        let conv = conversation::create_conversation(db.pool(), "guest", "agent-1", None)
            .await
            .unwrap();

        for i in 0..10 {
            insert_message(db.pool(), &conv.id, SenderType::User, &format!("m{}", i))
                .await
                .unwrap();
        }

        let messages = list_messages(db.pool(), &conv.id).await.unwrap();
        assert_eq!(messages.len(), 10);
        assert!(messages
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents[0], "m0");
        assert_eq!(contents[9], "m9");
        assert_eq!(messages.len(), 10);
    }

    #[tokio::test]
    async fn test_insert_into_missing_conversation() {
        let db = Database::in_memory().await.unwrap();

        let result = insert_message(db.pool(), "missing", SenderType::User, "Hi").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}

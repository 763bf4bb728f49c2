//! Conversation persistence.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{timestamp_now, Conversation};

/// Title given to conversations created without one.
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Create a conversation for `user_id` bound to `agent_id`.
///
/// `started_at` and `last_message_at` both start at the creation time.
pub async fn create_conversation(
    pool: &SqlitePool,
    user_id: &str,
    agent_id: &str,
    title: Option<&str>,
) -> Result<Conversation> {
    let now = timestamp_now();
    let conversation = Conversation {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        agent_id: agent_id.to_string(),
        started_at: now.clone(),
        last_message_at: now,
        title: title.unwrap_or(DEFAULT_TITLE).to_string(),
        is_archived: false,
    };

    sqlx::query(
        r#"
        INSERT INTO conversations (
            id, user_id, agent_id, started_at, last_message_at, title, is_archived
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&conversation.id)
    .bind(&conversation.user_id)
    .bind(&conversation.agent_id)
    .bind(&conversation.started_at)
    .bind(&conversation.last_message_at)
    .bind(&conversation.title)
    .bind(conversation.is_archived)
    .execute(pool)
    .await?;

    Ok(conversation)
}

/// Get a conversation by ID.
pub async fn get_conversation(pool: &SqlitePool, id: &str) -> Result<Conversation> {
    sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, user_id, agent_id, started_at, last_message_at, title, is_archived
        FROM conversations
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: id.to_string(),
    })
}

/// List a user's most recently active conversations.
pub async fn list_recent(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<Conversation>> {
    let rows = sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, user_id, agent_id, started_at, last_message_at, title, is_archived
        FROM conversations
        WHERE user_id = ?
        ORDER BY last_message_at DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Advance `last_message_at`, never moving it backwards.
///
/// Returns the stored value after the update.
pub async fn touch_last_message_at(
    pool: &SqlitePool,
    id: &str,
    timestamp: &str,
) -> Result<String> {
    let stored = sqlx::query_scalar::<_, String>(
        r#"
        UPDATE conversations
        SET last_message_at = MAX(last_message_at, ?)
        WHERE id = ?
        RETURNING last_message_at
        "#,
    )
    .bind(timestamp)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: id.to_string(),
    })?;

    Ok(stored)
}

/// Rename a conversation.
pub async fn update_title(pool: &SqlitePool, id: &str, title: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET title = ?
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Delete a conversation. Its messages go with it.
pub async fn delete_conversation(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM conversations
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: id.to_string(),
        });
    }

    Ok(())
}

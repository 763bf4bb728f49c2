//! Agent CRUD operations.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{timestamp_now, Agent, AgentPatch, NewAgent};

/// Create a new agent. The store assigns the id and creation timestamp.
pub async fn create_agent(pool: &SqlitePool, new_agent: &NewAgent) -> Result<Agent> {
    let agent = new_agent
        .clone()
        .into_agent(Uuid::new_v4().to_string(), timestamp_now());

    insert_agent(pool, &agent).await?;

    Ok(agent)
}

/// Insert a fully formed agent, keeping its id.
///
/// Used when mirroring an agent that was created while the store was
/// unreachable.
pub async fn insert_agent(pool: &SqlitePool, agent: &Agent) -> Result<()> {
    let configuration = agent
        .configuration
        .as_ref()
        .map(|value| value.to_string());

    sqlx::query(
        r#"
        INSERT INTO agents (
            id, name, description, webhook_url, status, response_format,
            configuration, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&agent.id)
    .bind(&agent.name)
    .bind(&agent.description)
    .bind(&agent.webhook_url)
    .bind(agent.status.as_str())
    .bind(agent.response_format.as_str())
    .bind(configuration)
    .bind(&agent.created_at)
    .bind(&agent.updated_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Agent",
                    id: agent.id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// Get an agent by ID.
pub async fn get_agent(pool: &SqlitePool, id: &str) -> Result<Agent> {
    sqlx::query_as::<_, Agent>(
        r#"
        SELECT id, name, description, webhook_url, status, response_format,
               configuration, created_at, updated_at
        FROM agents
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Agent",
        id: id.to_string(),
    })
}

/// List all agents, most recently created first.
pub async fn list_agents(pool: &SqlitePool) -> Result<Vec<Agent>> {
    let agents = sqlx::query_as::<_, Agent>(
        r#"
        SELECT id, name, description, webhook_url, status, response_format,
               configuration, created_at, updated_at
        FROM agents
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(agents)
}

/// Apply a partial update and return the stored agent.
pub async fn update_agent(pool: &SqlitePool, id: &str, patch: &AgentPatch) -> Result<Agent> {
    let mut agent = get_agent(pool, id).await?;
    patch.apply(&mut agent, &timestamp_now());

    let configuration = agent
        .configuration
        .as_ref()
        .map(|value| value.to_string());

    let result = sqlx::query(
        r#"
        UPDATE agents
        SET name = ?, description = ?, webhook_url = ?, status = ?,
            response_format = ?, configuration = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&agent.name)
    .bind(&agent.description)
    .bind(&agent.webhook_url)
    .bind(agent.status.as_str())
    .bind(agent.response_format.as_str())
    .bind(configuration)
    .bind(&agent.updated_at)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Agent",
            id: id.to_string(),
        });
    }

    Ok(agent)
}

/// Delete an agent by ID.
///
/// Conversations referencing the agent are left alone.
pub async fn delete_agent(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM agents
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Agent",
            id: id.to_string(),
        });
    }

    Ok(())
}

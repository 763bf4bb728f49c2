//! SQLite persistence layer for agent chat.
//!
//! This crate provides async database operations for agents, conversations
//! and their messages using SQLx with SQLite. The store is the id authority:
//! every `create_*`/`insert_*` function generates the record's identifier and
//! timestamps and hands back the canonical row.
//!
//! # Example
//!
//! ```no_run
//! use database::{agent, conversation, message, Database, NewAgent, SenderType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:agent-chat.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let agent = agent::create_agent(
//!         db.pool(),
//!         &NewAgent::new("Echo", "Repeats every message", "https://example.test/hook"),
//!     )
//!     .await?;
//!
//!     let conv = conversation::create_conversation(db.pool(), "guest", &agent.id, None).await?;
//!     message::insert_message(db.pool(), &conv.id, SenderType::User, "Hi").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod conversation;
pub mod error;
pub mod message;
pub mod models;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use models::{
    timestamp_now, Agent, AgentPatch, AgentStatus, ContentType, Conversation, Message, NewAgent,
    ReadStatus, SenderType,
};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// let db = database::Database::connect("sqlite:data/agent-chat.db?mode=rwc").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Open a migrated in-memory database.
    ///
    /// Every SQLite connection to `:memory:` sees its own database, so the
    /// pool is pinned to a single connection.
    pub async fn in_memory() -> Result<Self> {
        let db = Self::connect_with_pool_size("sqlite::memory:", 1).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    ///
    /// Every clone shares the pool, so all of them observe the closure.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Whether the pool has been closed.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

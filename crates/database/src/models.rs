//! Database models.

use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Current UTC time as a fixed-width RFC 3339 string.
///
/// Microsecond precision and the `Z` suffix keep lexical order equal to
/// chronological order, which the `ORDER BY` clauses rely on.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Error returned when a stored enum column holds an unknown value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Get the stored string form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Whether an agent accepts messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Inactive,
}

string_enum!(AgentStatus, "agent status", {
    Active => "active",
    Inactive => "inactive",
});

/// Declared format of a message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Html,
    Markdown,
}

string_enum!(ContentType, "content type", {
    Text => "text",
    Html => "html",
    Markdown => "markdown",
});

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    User,
    Agent,
}

string_enum!(SenderType, "sender type", {
    User => "user",
    Agent => "agent",
});

impl SenderType {
    /// Read status a fresh message starts with: the user has seen their own
    /// messages, agent replies start unread.
    pub fn initial_read_status(&self) -> ReadStatus {
        match self {
            SenderType::User => ReadStatus::Read,
            SenderType::Agent => ReadStatus::Unread,
        }
    }
}

/// Read marker on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStatus {
    Read,
    Unread,
}

string_enum!(ReadStatus, "read status", {
    Read => "read",
    Unread => "unread",
});

fn decode_enum<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: ParseEnumError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// A configured external endpoint that answers chat messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier, assigned by the authoritative store.
    pub id: String,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Absolute URL the agent's messages are POSTed to
    pub webhook_url: String,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub response_format: ContentType,
    /// Arbitrary agent-specific settings
    pub configuration: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl FromRow<'_, SqliteRow> for Agent {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let configuration: Option<String> = row.try_get("configuration")?;
        let configuration = configuration
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "configuration".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            webhook_url: row.try_get("webhook_url")?,
            status: decode_enum(row, "status")?,
            response_format: decode_enum(row, "response_format")?,
            configuration,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Fields submitted when creating an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub description: Option<String>,
    pub webhook_url: String,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub response_format: ContentType,
    #[serde(default)]
    pub configuration: Option<serde_json::Value>,
}

impl NewAgent {
    /// Create an active, text-format agent definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        webhook_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            webhook_url: webhook_url.into(),
            status: AgentStatus::Active,
            response_format: ContentType::Text,
            configuration: None,
        }
    }

    /// Set the response format.
    pub fn with_format(mut self, format: ContentType) -> Self {
        self.response_format = format;
        self
    }

    /// Materialize the agent under the given id.
    pub fn into_agent(self, id: String, created_at: String) -> Agent {
        Agent {
            id,
            name: self.name,
            description: self.description,
            webhook_url: self.webhook_url,
            status: self.status,
            response_format: self.response_format,
            configuration: self.configuration,
            created_at,
            updated_at: None,
        }
    }
}

/// Partial update of an agent. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub webhook_url: Option<String>,
    pub status: Option<AgentStatus>,
    pub response_format: Option<ContentType>,
    pub configuration: Option<serde_json::Value>,
}

impl AgentPatch {
    /// Apply the patch to an agent, stamping `updated_at`.
    pub fn apply(&self, agent: &mut Agent, updated_at: &str) {
        if let Some(name) = &self.name {
            agent.name = name.clone();
        }
        if let Some(description) = &self.description {
            agent.description = Some(description.clone());
        }
        if let Some(url) = &self.webhook_url {
            agent.webhook_url = url.clone();
        }
        if let Some(status) = self.status {
            agent.status = status;
        }
        if let Some(format) = self.response_format {
            agent.response_format = format;
        }
        if let Some(configuration) = &self.configuration {
            agent.configuration = Some(configuration.clone());
        }
        agent.updated_at = Some(updated_at.to_string());
    }
}

/// An ordered thread of messages between one user and one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// Caller identity owning the thread
    pub user_id: String,
    /// Agent the thread talks to. May dangle if the agent was deleted.
    pub agent_id: String,
    pub started_at: String,
    /// Never moves backwards
    pub last_message_at: String,
    pub title: String,
    pub is_archived: bool,
}

impl FromRow<'_, SqliteRow> for Conversation {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            agent_id: row.try_get("agent_id")?,
            started_at: row.try_get("started_at")?,
            last_message_at: row.try_get("last_message_at")?,
            title: row.try_get("title")?,
            is_archived: row.try_get("is_archived")?,
        })
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_type: SenderType,
    pub content: String,
    pub content_type: ContentType,
    pub timestamp: String,
    pub read_status: ReadStatus,
}

impl FromRow<'_, SqliteRow> for Message {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            sender_type: decode_enum(row, "sender_type")?,
            content: row.try_get("content")?,
            content_type: decode_enum(row, "content_type")?,
            timestamp: row.try_get("timestamp")?,
            read_status: decode_enum(row, "read_status")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trip_through_str() {
        assert_eq!("html".parse::<ContentType>().unwrap(), ContentType::Html);
        assert_eq!(AgentStatus::Inactive.as_str(), "inactive");
        assert!("shouting".parse::<SenderType>().is_err());
    }

    #[test]
    fn test_initial_read_status() {
        assert_eq!(SenderType::User.initial_read_status(), ReadStatus::Read);
        assert_eq!(SenderType::Agent.initial_read_status(), ReadStatus::Unread);
    }

    #[test]
    fn test_timestamps_sort_lexically() {
        let a = timestamp_now();
        let b = timestamp_now();
        assert!(a <= b);
        assert!(a.ends_with('Z'));
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_patch_only_touches_provided_fields() {
        let mut agent = NewAgent::new("Echo", "Repeats every message", "https://example.test/hook")
            .into_agent("a1".to_string(), timestamp_now());
        let patch = AgentPatch {
            name: Some("Parrot".to_string()),
            ..Default::default()
        };
        patch.apply(&mut agent, "2026-01-01T00:00:00.000000Z");

        assert_eq!(agent.name, "Parrot");
        assert_eq!(agent.webhook_url, "https://example.test/hook");
        assert_eq!(agent.updated_at.as_deref(), Some("2026-01-01T00:00:00.000000Z"));
    }

    #[test]
    fn test_agent_serde_uses_wire_names() {
        let agent = NewAgent::new("Echo", "Repeats every message", "https://example.test/hook")
            .with_format(ContentType::Markdown)
            .into_agent("a1".to_string(), "2026-01-01T00:00:00.000000Z".to_string());
        let json = serde_json::to_value(&agent).unwrap();
        assert_eq!(json["response_format"], "markdown");
        assert_eq!(json["status"], "active");
    }
}

//! Optimistic message timeline.
//!
//! Entries start as [`TimelineEntry::Pending`] with a temporary id and are
//! either confirmed with the stored [`Message`], discarded, or replaced
//! wholesale by [`Timeline::reconcile`].

use database::{timestamp_now, Message, SenderType};
use serde::Serialize;
use uuid::Uuid;

/// Text of the placeholder shown while an agent is answering.
pub const THINKING_TEXT: &str = "Thinking...";

/// Why a pending entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingKind {
    /// The user's message, not yet stored.
    Outgoing,
    /// Placeholder while the agent webhook is in flight. Never stored.
    Thinking,
    /// Fallback reply shown after a failed agent call, not yet stored.
    Fallback,
}

/// A locally created message awaiting its stored copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMessage {
    pub temp_id: String,
    pub conversation_id: String,
    pub sender_type: SenderType,
    pub content: String,
    pub timestamp: String,
    pub kind: PendingKind,
}

/// One row of the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TimelineEntry {
    Pending(PendingMessage),
    Confirmed(Message),
}

impl TimelineEntry {
    /// Temporary id for pending entries, stored id otherwise.
    pub fn id(&self) -> &str {
        match self {
            TimelineEntry::Pending(p) => &p.temp_id,
            TimelineEntry::Confirmed(m) => &m.id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            TimelineEntry::Pending(p) => &p.content,
            TimelineEntry::Confirmed(m) => &m.content,
        }
    }

    pub fn sender_type(&self) -> SenderType {
        match self {
            TimelineEntry::Pending(p) => p.sender_type,
            TimelineEntry::Confirmed(m) => m.sender_type,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            TimelineEntry::Pending(p) => &p.timestamp,
            TimelineEntry::Confirmed(m) => &m.timestamp,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TimelineEntry::Pending(_))
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self, TimelineEntry::Pending(p) if p.kind == PendingKind::Thinking)
    }
}

/// The messages shown for one conversation, including unconfirmed ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timeline {
    conversation_id: Option<String>,
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// Start a timeline for a conversation from stored messages.
    pub fn new(conversation_id: Option<String>, messages: Vec<Message>) -> Self {
        Self {
            conversation_id,
            entries: messages.into_iter().map(TimelineEntry::Confirmed).collect(),
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Whether the timeline shows `conversation_id`.
    pub fn shows(&self, conversation_id: &str) -> bool {
        self.conversation_id.as_deref() == Some(conversation_id)
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a pending entry and return its temporary id.
    pub fn push_pending(
        &mut self,
        conversation_id: &str,
        sender_type: SenderType,
        content: &str,
        kind: PendingKind,
    ) -> String {
        let temp_id = format!("temp-{}", Uuid::new_v4());
        self.entries.push(TimelineEntry::Pending(PendingMessage {
            temp_id: temp_id.clone(),
            conversation_id: conversation_id.to_string(),
            sender_type,
            content: content.to_string(),
            timestamp: timestamp_now(),
            kind,
        }));
        temp_id
    }

    /// Append an already stored message.
    pub fn push_confirmed(&mut self, message: Message) {
        self.entries.push(TimelineEntry::Confirmed(message));
    }

    /// Replace a pending entry with its stored copy, in place.
    ///
    /// Returns false if no such pending entry exists.
    pub fn confirm(&mut self, temp_id: &str, message: Message) -> bool {
        let slot = self
            .entries
            .iter_mut()
            .find(|e| e.is_pending() && e.id() == temp_id);

        match slot {
            Some(entry) => {
                *entry = TimelineEntry::Confirmed(message);
                true
            }
            None => false,
        }
    }

    /// Drop a pending entry. Returns false if it was not present.
    pub fn discard(&mut self, temp_id: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.is_pending() && e.id() == temp_id));
        self.entries.len() != before
    }

    /// Replace every confirmed entry with the canonical stored list.
    ///
    /// Pending entries that are still outstanding stay at the end.
    pub fn reconcile(&mut self, canonical: Vec<Message>) {
        let pending: Vec<_> = self
            .entries
            .drain(..)
            .filter(TimelineEntry::is_pending)
            .collect();

        self.entries = canonical
            .into_iter()
            .map(TimelineEntry::Confirmed)
            .chain(pending)
            .collect();
    }
}

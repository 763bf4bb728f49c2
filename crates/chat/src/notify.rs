//! User-facing notification sink and implementations.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;

/// How a toast should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Default,
    Destructive,
}

/// A short user-visible notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    /// A destructive "Error" toast.
    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }

    /// A "Success" toast.
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            title: "Success".to_string(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn is_error(&self) -> bool {
        self.variant == ToastVariant::Destructive
    }
}

/// Trait for surfacing feedback to whoever drives the chat.
///
/// Abstracted so web pages and logs can both receive feedback.
pub trait Notifier: Send + Sync {
    /// Show a toast.
    fn toast(&self, toast: Toast);

    /// A conversation became the active one, e.g. to sync a URL.
    ///
    /// Default implementation does nothing.
    fn conversation_opened(&self, conversation_id: &str) {
        let _ = conversation_id;
    }
}

/// A notifier that logs every notice.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn toast(&self, toast: Toast) {
        if toast.is_error() {
            tracing::warn!("[toast] {}: {}", toast.title, toast.description);
        } else {
            tracing::info!("[toast] {}: {}", toast.title, toast.description);
        }
    }

    fn conversation_opened(&self, conversation_id: &str) {
        tracing::info!("Conversation opened: {}", conversation_id);
    }
}

/// Bounded in-memory notifier that a shell drains when it renders.
#[derive(Debug)]
pub struct ToastBuffer {
    capacity: usize,
    toasts: Mutex<VecDeque<Toast>>,
    last_opened: Mutex<Option<String>>,
}

impl Default for ToastBuffer {
    fn default() -> Self {
        Self::new(20)
    }
}

impl ToastBuffer {
    /// Create a buffer keeping at most `capacity` toasts. Oldest are dropped.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            toasts: Mutex::new(VecDeque::new()),
            last_opened: Mutex::new(None),
        }
    }

    /// Take every buffered toast, oldest first.
    pub fn drain(&self) -> Vec<Toast> {
        let mut toasts = self.toasts.lock().unwrap_or_else(|e| e.into_inner());
        toasts.drain(..).collect()
    }

    /// The conversation most recently announced as opened.
    pub fn last_opened(&self) -> Option<String> {
        self.last_opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Notifier for ToastBuffer {
    fn toast(&self, toast: Toast) {
        LoggingNotifier.toast(toast.clone());

        let mut toasts = self.toasts.lock().unwrap_or_else(|e| e.into_inner());
        if toasts.len() == self.capacity {
            toasts.pop_front();
        }
        toasts.push_back(toast);
    }

    fn conversation_opened(&self, conversation_id: &str) {
        LoggingNotifier.conversation_opened(conversation_id);

        *self.last_opened.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(conversation_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_notifier() {
        // Should not panic
        LoggingNotifier.toast(Toast::error("boom"));
        LoggingNotifier.conversation_opened("c1");
    }

    #[test]
    fn test_buffer_drains_in_order() {
        let buffer = ToastBuffer::default();
        buffer.toast(Toast::error("first"));
        buffer.toast(Toast::success("second"));

        let drained = buffer.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].description, "first");
        assert!(drained[0].is_error());
        assert_eq!(drained[1].title, "Success");
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn test_buffer_is_bounded() {
        let buffer = ToastBuffer::new(2);
        buffer.toast(Toast::error("a"));
        buffer.toast(Toast::error("b"));
        buffer.toast(Toast::error("c"));

        let drained: Vec<_> = buffer.drain().into_iter().map(|t| t.description).collect();
        assert_eq!(drained, vec!["b", "c"]);
    }

    #[test]
    fn test_buffer_tracks_opened_conversation() {
        let buffer = ToastBuffer::default();
        assert_eq!(buffer.last_opened(), None);
        buffer.conversation_opened("c1");
        buffer.conversation_opened("c2");
        assert_eq!(buffer.last_opened().as_deref(), Some("c2"));
    }
}

//! Chat session controller.
//!
//! Drives one send at a time through
//! `Idle -> ConversationEnsured -> UserMessagePersisted -> AwaitingAgent ->
//! {AgentMessagePersisted | AgentCallFailed} -> Idle`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use database::{Agent, Conversation, Message, SenderType};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use webhook::{AgentTransport, WebhookError, WebhookRequest};

use crate::error::ChatError;
use crate::notify::{Notifier, Toast};
use crate::registry::AgentRegistry;
use crate::store::ConversationStore;
use crate::timeline::{PendingKind, Timeline, THINKING_TEXT};

/// Reply stored when an agent call fails.
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't process your request. Please try again later.";

/// Where the current send is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendPhase {
    #[default]
    Idle,
    ConversationEnsured,
    UserMessagePersisted,
    AwaitingAgent,
    AgentMessagePersisted,
    AgentCallFailed,
}

/// Reasons a send stops before an agent reply is stored.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("A message is already being sent")]
    Busy,

    #[error("Please select an agent first")]
    NoAgent,

    #[error("Selected agent not found: {0}")]
    AgentNotFound(String),

    #[error("{0}")]
    InvalidWebhook(WebhookError),

    #[error("Failed to create conversation: {0}")]
    ConversationCreate(ChatError),

    #[error("Failed to save message: {0}")]
    Persist(ChatError),
}

/// Why the fallback reply replaced the agent's answer.
#[derive(Debug, Error)]
pub enum FallbackReason {
    /// The webhook call failed.
    #[error(transparent)]
    Agent(WebhookError),

    /// The webhook answered but the reply could not be stored.
    #[error("Failed to save agent reply: {0}")]
    Persist(ChatError),
}

/// How the agent side of a send ended.
#[derive(Debug)]
pub enum AgentReply {
    /// The webhook answered and its reply was stored.
    Delivered(Message),
    /// The fallback reply was stored instead of an answer.
    Fallback {
        message: Message,
        error: FallbackReason,
    },
}

impl AgentReply {
    /// The stored agent message.
    pub fn message(&self) -> &Message {
        match self {
            AgentReply::Delivered(message) => message,
            AgentReply::Fallback { message, .. } => message,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, AgentReply::Fallback { .. })
    }
}

/// Result of a completed send.
#[derive(Debug)]
pub struct SendOutcome {
    pub conversation_id: String,
    pub user_message: Message,
    pub reply: AgentReply,
}

#[derive(Debug, Default)]
struct SessionState {
    selected_agent: Option<String>,
    timeline: Timeline,
    phase: SendPhase,
}

/// Orchestrates sends, conversation switching and the optimistic timeline
/// for one caller identity.
pub struct ChatSession {
    user_id: String,
    store: Arc<ConversationStore>,
    registry: Arc<AgentRegistry>,
    transport: Arc<dyn AgentTransport>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<SessionState>,
    sending: AtomicBool,
}

/// Returns the session to `Idle` however a send ends.
struct InFlight<'a> {
    session: &'a ChatSession,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.session.set_phase(SendPhase::Idle);
        self.session.sending.store(false, Ordering::Release);
    }
}

impl ChatSession {
    pub fn new(
        user_id: impl Into<String>,
        store: Arc<ConversationStore>,
        registry: Arc<AgentRegistry>,
        transport: Arc<dyn AgentTransport>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            store,
            registry,
            transport,
            notifier,
            state: Mutex::new(SessionState::default()),
            sending: AtomicBool::new(false),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Snapshot of the displayed timeline.
    pub fn timeline(&self) -> Timeline {
        self.lock().timeline.clone()
    }

    pub fn phase(&self) -> SendPhase {
        self.lock().phase
    }

    /// Whether a send or conversation creation is in flight.
    pub fn is_busy(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    /// The conversation sends currently go to.
    pub async fn active_conversation(&self) -> Option<String> {
        self.store.selected().await
    }

    /// The explicitly selected agent id.
    pub fn selected_agent(&self) -> Option<String> {
        self.lock().selected_agent.clone()
    }

    /// Select the agent used for new sends.
    pub async fn select_agent(&self, agent_id: &str) -> Result<Agent, ChatError> {
        let agent = self
            .registry
            .get(agent_id)
            .await
            .ok_or_else(|| ChatError::NotFound {
                entity: "Agent",
                id: agent_id.to_string(),
            })?;

        self.lock().selected_agent = Some(agent.id.clone());
        debug!("Selected agent {}", agent.id);
        Ok(agent)
    }

    /// Switch to a conversation (or to none) and load its messages.
    ///
    /// An id that is unknown or belongs to another user leaves the session
    /// with no active conversation, so the next send starts a fresh one.
    pub async fn open_conversation(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Timeline, ChatError> {
        if let Some(id) = conversation_id {
            if let Err(e) = self.store.get_conversation(id).await {
                warn!("Cannot open conversation {}: {}", id, e);
                self.clear_active().await;
                return Err(e);
            }
        }

        let messages = self.store.select_conversation(conversation_id).await;

        // Another switch may have happened while loading
        if self.store.selected().await.as_deref() != conversation_id {
            return Ok(self.timeline());
        }

        let timeline = Timeline::new(conversation_id.map(str::to_string), messages);
        self.lock().timeline = timeline.clone();

        if let Some(id) = conversation_id {
            self.notifier.conversation_opened(id);
        }
        Ok(timeline)
    }

    /// Clear the view and start an empty conversation with the resolved agent.
    pub async fn start_new_conversation(&self) -> Result<Conversation, SendError> {
        if self
            .sending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SendError::Busy);
        }
        let _in_flight = InFlight { session: self };

        self.clear_active().await;

        let agent = match self.resolve_agent().await {
            Ok(agent) => agent,
            Err(e) => {
                self.notifier
                    .toast(Toast::error("No agents available. Please create an agent first."));
                return Err(e);
            }
        };

        {
            let mut state = self.lock();
            if state.selected_agent.is_none() {
                state.selected_agent = Some(agent.id.clone());
            }
        }

        match self.open_new_conversation(&agent).await {
            Ok(conversation) => Ok(conversation),
            Err(e) => {
                self.notifier
                    .toast(Toast::error("Failed to create new conversation"));
                Err(SendError::ConversationCreate(e))
            }
        }
    }

    /// Delete a conversation, clearing the view if it was displayed.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ChatError> {
        self.store.delete_conversation(conversation_id).await?;

        let mut state = self.lock();
        if state.timeline.shows(conversation_id) {
            state.timeline = Timeline::default();
        }
        Ok(())
    }

    /// Send a user message to the resolved agent.
    ///
    /// A failed agent call is not an error: the fallback reply is stored and
    /// returned as [`AgentReply::Fallback`]. Errors are returned only when the
    /// send could not start or a message could not be stored.
    pub async fn send(&self, input: &str) -> Result<SendOutcome, SendError> {
        if input.trim().is_empty() {
            return Err(SendError::EmptyMessage);
        }

        if self
            .sending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Send rejected: another send is in flight");
            return Err(SendError::Busy);
        }
        let _in_flight = InFlight { session: self };

        let agent = self.resolve_agent().await.map_err(|e| self.report(e))?;

        if !agent.webhook_url.starts_with("http") {
            return Err(self.report(SendError::InvalidWebhook(WebhookError::InvalidUrl(
                agent.webhook_url.clone(),
            ))));
        }

        let conversation_id = match self.store.selected().await {
            Some(id) => {
                self.ensure_timeline_for(&id).await;
                id
            }
            None => self
                .open_new_conversation(&agent)
                .await
                .map_err(|e| self.report(SendError::ConversationCreate(e)))?
                .id,
        };
        self.set_phase(SendPhase::ConversationEnsured);

        let user_message = match self
            .persist_pending(&conversation_id, SenderType::User, input, PendingKind::Outgoing)
            .await
        {
            Ok(message) => message,
            Err(e) => {
                if e.is_not_found() {
                    warn!("Conversation {} no longer exists", conversation_id);
                    self.clear_active().await;
                }
                return Err(self.report(SendError::Persist(e)));
            }
        };
        self.set_phase(SendPhase::UserMessagePersisted);

        let thinking = self.update_timeline(&conversation_id, |t| {
            t.push_pending(
                &conversation_id,
                SenderType::Agent,
                THINKING_TEXT,
                PendingKind::Thinking,
            )
        });
        self.set_phase(SendPhase::AwaitingAgent);

        let request = WebhookRequest::new(input, &self.user_id, &conversation_id);
        let delivered = self.transport.deliver(&agent.webhook_url, &request).await;

        if let Some(temp_id) = &thinking {
            self.update_timeline(&conversation_id, |t| t.discard(temp_id));
        }

        let reply = match delivered {
            Ok(text) => match self
                .store
                .save_message(&conversation_id, &text, SenderType::Agent)
                .await
            {
                Ok(saved) => {
                    self.set_phase(SendPhase::AgentMessagePersisted);
                    self.reconcile(&conversation_id, &saved).await;
                    info!("Agent {} replied in {}", agent.name, conversation_id);
                    AgentReply::Delivered(saved)
                }
                Err(e) => {
                    error!("Failed to store reply from {}: {}", agent.name, e);
                    self.fall_back(&conversation_id, FallbackReason::Persist(e))
                        .await?
                }
            },
            Err(err) => {
                warn!("Agent {} call failed: {}", agent.name, err);
                self.fall_back(&conversation_id, FallbackReason::Agent(err))
                    .await?
            }
        };

        Ok(SendOutcome {
            conversation_id,
            user_message,
            reply,
        })
    }

    /// Show and store the fallback reply in place of the agent's answer.
    async fn fall_back(
        &self,
        conversation_id: &str,
        reason: FallbackReason,
    ) -> Result<AgentReply, SendError> {
        self.set_phase(SendPhase::AgentCallFailed);
        self.notifier.toast(Toast::error(reason.to_string()));

        let saved = self
            .persist_pending(
                conversation_id,
                SenderType::Agent,
                FALLBACK_REPLY,
                PendingKind::Fallback,
            )
            .await
            .map_err(|e| self.report(SendError::Persist(e)))?;

        Ok(AgentReply::Fallback {
            message: saved,
            error: reason,
        })
    }

    /// Drop the active conversation and its timeline.
    async fn clear_active(&self) {
        self.store.select_conversation(None).await;
        self.lock().timeline = Timeline::default();
    }

    async fn resolve_agent(&self) -> Result<Agent, SendError> {
        match self.selected_agent() {
            Some(id) => self
                .registry
                .get(&id)
                .await
                .ok_or(SendError::AgentNotFound(id)),
            None => self.registry.first().await.ok_or(SendError::NoAgent),
        }
    }

    async fn open_new_conversation(&self, agent: &Agent) -> Result<Conversation, ChatError> {
        let conversation = self.store.create_conversation(&agent.id, None).await?;

        self.store.select_conversation(Some(&conversation.id)).await;
        self.lock().timeline = Timeline::new(Some(conversation.id.clone()), Vec::new());
        self.notifier.conversation_opened(&conversation.id);

        Ok(conversation)
    }

    /// Make sure the timeline displays `conversation_id`.
    async fn ensure_timeline_for(&self, conversation_id: &str) {
        if self.lock().timeline.shows(conversation_id) {
            return;
        }
        let messages = self.store.visible_messages().await;
        self.lock().timeline = Timeline::new(Some(conversation_id.to_string()), messages);
    }

    /// Show a pending entry, store it, then confirm or drop it.
    async fn persist_pending(
        &self,
        conversation_id: &str,
        sender_type: SenderType,
        content: &str,
        kind: PendingKind,
    ) -> Result<Message, ChatError> {
        let temp_id = self.update_timeline(conversation_id, |t| {
            t.push_pending(conversation_id, sender_type, content, kind)
        });

        let saved = self
            .store
            .save_message(conversation_id, content, sender_type)
            .await;

        if let Some(temp_id) = temp_id {
            self.update_timeline(conversation_id, |t| match &saved {
                Ok(message) => t.confirm(&temp_id, message.clone()),
                // A fallback stays visible even if it could not be stored
                Err(_) if kind == PendingKind::Fallback => false,
                Err(_) => t.discard(&temp_id),
            });
        }

        saved
    }

    /// Replace the timeline's confirmed entries with the stored list.
    async fn reconcile(&self, conversation_id: &str, saved: &Message) {
        match self.store.fetch_messages(conversation_id).await {
            Ok(canonical) => {
                self.update_timeline(conversation_id, |t| t.reconcile(canonical));
            }
            Err(e) => {
                warn!("Could not reconcile {}: {}", conversation_id, e);
                self.update_timeline(conversation_id, |t| t.push_confirmed(saved.clone()));
            }
        }
    }

    /// Apply `f` if the timeline still shows `conversation_id`.
    fn update_timeline<T>(
        &self,
        conversation_id: &str,
        f: impl FnOnce(&mut Timeline) -> T,
    ) -> Option<T> {
        let mut state = self.lock();
        if state.timeline.shows(conversation_id) {
            Some(f(&mut state.timeline))
        } else {
            debug!(
                "Timeline moved away from {}; skipping view update",
                conversation_id
            );
            None
        }
    }

    fn report(&self, err: SendError) -> SendError {
        error!("Send failed: {}", err);
        let description = match &err {
            SendError::AgentNotFound(_) => "Selected agent not found".to_string(),
            other => other.to_string(),
        };
        self.notifier.toast(Toast::error(description));
        err
    }

    fn set_phase(&self, phase: SendPhase) {
        debug!("Send phase: {:?}", phase);
        self.lock().phase = phase;
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

//! Agent registry with a local cache fallback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use database::validation::{validate_agent_patch, validate_new_agent};
use database::{agent, timestamp_now, Agent, AgentPatch, Database, DatabaseError, NewAgent};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use webhook::{AgentTransport, ProbeResult};

use crate::cache::{LocalCache, AGENTS_KEY};
use crate::defaults::default_agents;
use crate::error::ChatError;
use crate::notify::{Notifier, Toast};

/// The set of configured agents.
///
/// Reads are served from memory. Writes go to the relational store while it
/// is reachable and are always mirrored to the local cache. After the first
/// failed remote operation the registry runs from the cache alone until it
/// is recreated.
pub struct AgentRegistry {
    remote: Option<Database>,
    remote_available: AtomicBool,
    cache: LocalCache,
    agents: RwLock<Vec<Agent>>,
    transport: Arc<dyn AgentTransport>,
    notifier: Arc<dyn Notifier>,
}

impl AgentRegistry {
    /// Create an empty registry. Call [`AgentRegistry::load`] to populate it.
    pub fn new(
        remote: Option<Database>,
        cache: LocalCache,
        transport: Arc<dyn AgentTransport>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let remote_available = AtomicBool::new(remote.is_some());
        Self {
            remote,
            remote_available,
            cache,
            agents: RwLock::new(Vec::new()),
            transport,
            notifier,
        }
    }

    /// Populate from the cache, seeding built-in agents when it is empty,
    /// then refresh from the relational store.
    pub async fn load(&self, seed_defaults: bool) {
        let mut cached: Vec<Agent> = self.cache.get(AGENTS_KEY).await.unwrap_or_default();

        if cached.is_empty() && seed_defaults {
            info!("Seeding registry with built-in agents");
            cached = default_agents();
            self.write_cache(&cached).await;
        }

        debug!("Loaded {} agents from local cache", cached.len());
        *self.agents.write().await = cached;

        self.refresh().await;
    }

    /// Re-read the agent list from the relational store.
    ///
    /// An empty remote list leaves the current agents in place. Does nothing
    /// once the store has been marked unavailable.
    pub async fn refresh(&self) {
        let Some(db) = self.active_remote() else {
            return;
        };

        match agent::list_agents(db.pool()).await {
            Ok(remote) if remote.is_empty() => {
                debug!("Remote store has no agents; keeping {} cached", self.agents.read().await.len());
            }
            Ok(remote) => {
                info!("Loaded {} agents from remote store", remote.len());
                self.write_cache(&remote).await;
                *self.agents.write().await = remote;
            }
            Err(e) => self.mark_unavailable("list agents", &e),
        }
    }

    /// All agents, most recently created first.
    pub async fn list(&self) -> Vec<Agent> {
        let mut agents = self.agents.read().await.clone();
        agents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        agents
    }

    /// Look up an agent by id.
    pub async fn get(&self, id: &str) -> Option<Agent> {
        self.agents.read().await.iter().find(|a| a.id == id).cloned()
    }

    /// The agent used when none is selected.
    pub async fn first(&self) -> Option<Agent> {
        self.list().await.into_iter().next()
    }

    /// Whether writes still reach the relational store.
    pub fn is_remote_available(&self) -> bool {
        self.active_remote().is_some()
    }

    /// Validate and create an agent.
    ///
    /// The relational store assigns the id while it is reachable. Otherwise
    /// the local cache becomes the authority and the id is generated here.
    pub async fn create(&self, new_agent: NewAgent) -> Result<Agent, ChatError> {
        validate_new_agent(&new_agent)?;

        let created = match self.active_remote() {
            Some(db) => match agent::create_agent(db.pool(), &new_agent).await {
                Ok(created) => Some(created),
                Err(e) => {
                    error!("Failed to create agent in remote store: {}", e);
                    self.mark_unavailable("create agent", &e);
                    None
                }
            },
            None => None,
        };

        let created = created.unwrap_or_else(|| {
            new_agent.into_agent(Uuid::new_v4().to_string(), timestamp_now())
        });

        info!("Created agent {} ({})", created.name, created.id);

        let snapshot = {
            let mut agents = self.agents.write().await;
            agents.insert(0, created.clone());
            agents.clone()
        };
        self.write_cache(&snapshot).await;

        self.notifier
            .toast(Toast::success("Agent created successfully"));

        Ok(created)
    }

    /// Validate and apply a partial update.
    pub async fn update(&self, id: &str, patch: AgentPatch) -> Result<Agent, ChatError> {
        validate_agent_patch(&patch)?;

        let mut remote_copy = None;
        if let Some(db) = self.active_remote() {
            match agent::update_agent(db.pool(), id, &patch).await {
                Ok(updated) => remote_copy = Some(updated),
                Err(e) if e.is_not_found() => {
                    warn!("Agent {} is not in the remote store; updating cache only", id);
                }
                Err(e) => {
                    error!("Failed to update agent in remote store: {}", e);
                    self.mark_unavailable("update agent", &e);
                }
            }
        }

        let (updated, snapshot) = {
            let mut agents = self.agents.write().await;
            let position = agents.iter().position(|a| a.id == id);
            let updated = match (position, remote_copy) {
                (Some(index), Some(canonical)) => {
                    agents[index] = canonical.clone();
                    canonical
                }
                (Some(index), None) => {
                    patch.apply(&mut agents[index], &timestamp_now());
                    agents[index].clone()
                }
                (None, Some(canonical)) => {
                    agents.insert(0, canonical.clone());
                    canonical
                }
                (None, None) => {
                    return Err(ChatError::NotFound {
                        entity: "Agent",
                        id: id.to_string(),
                    });
                }
            };
            (updated, agents.clone())
        };
        self.write_cache(&snapshot).await;

        info!("Updated agent {}", id);
        self.notifier
            .toast(Toast::success("Agent updated successfully"));

        Ok(updated)
    }

    /// Delete an agent from the cache and, if reachable, the relational store.
    ///
    /// Conversations that reference the agent are left alone.
    pub async fn delete(&self, id: &str) -> Result<(), ChatError> {
        let mut removed_remotely = false;
        if let Some(db) = self.active_remote() {
            match agent::delete_agent(db.pool(), id).await {
                Ok(()) => removed_remotely = true,
                Err(e) if e.is_not_found() => {
                    debug!("Agent {} is not in the remote store", id);
                }
                Err(e) => {
                    error!("Failed to delete agent from remote store: {}", e);
                    self.mark_unavailable("delete agent", &e);
                }
            }
        }

        let (removed_locally, snapshot) = {
            let mut agents = self.agents.write().await;
            let before = agents.len();
            agents.retain(|a| a.id != id);
            (agents.len() != before, agents.clone())
        };

        if !removed_locally && !removed_remotely {
            return Err(ChatError::NotFound {
                entity: "Agent",
                id: id.to_string(),
            });
        }

        self.write_cache(&snapshot).await;

        info!("Deleted agent {}", id);
        self.notifier
            .toast(Toast::success("Agent deleted successfully"));

        Ok(())
    }

    /// Send the fixed test payload to a webhook. Nothing is persisted.
    pub async fn test_webhook(&self, url: &str) -> ProbeResult {
        let result = self.transport.probe(url).await;
        if result.success {
            info!("Webhook test to {} succeeded via {}", url, self.transport.name());
        } else {
            warn!("Webhook test to {} failed: {}", url, result.message);
        }
        result
    }

    fn active_remote(&self) -> Option<&Database> {
        if self.remote_available.load(Ordering::Acquire) {
            self.remote.as_ref()
        } else {
            None
        }
    }

    fn mark_unavailable(&self, operation: &str, err: &DatabaseError) {
        if self.remote_available.swap(false, Ordering::AcqRel) {
            let cause = if err.is_unavailable() { "unreachable" } else { "failing" };
            warn!(
                "Remote store {} during {} ({}); using local cache until restart",
                cause, operation, err
            );
        }
    }

    async fn write_cache(&self, agents: &[Agent]) {
        if let Err(e) = self.cache.set(AGENTS_KEY, &agents).await {
            warn!("Failed to write agents to local cache: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ToastBuffer;
    use database::ContentType;
    use serde_json::json;
    use webhook::WebhookClient;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> Arc<dyn AgentTransport> {
        Arc::new(WebhookClient::new().unwrap())
    }

    fn echo() -> NewAgent {
        NewAgent::new("Echo", "Repeats every message", "https://example.test/hook")
    }

    async fn registry_with(db: Option<Database>, notifier: Arc<dyn Notifier>) -> AgentRegistry {
        let registry = AgentRegistry::new(db, LocalCache::in_memory(), transport(), notifier);
        registry.load(false).await;
        registry
    }

    #[tokio::test]
    async fn test_create_then_list_contains_agent() {
        let db = Database::in_memory().await.unwrap();
        let registry = registry_with(Some(db.clone()), Arc::new(ToastBuffer::default())).await;

        let first = registry.create(echo()).await.unwrap();
        let second = registry
            .create(
                NewAgent::new("Poet", "Answers in verse only", "https://example.test/poet")
                    .with_format(ContentType::Markdown),
            )
            .await
            .unwrap();

        assert_ne!(first.id, second.id);

        let listed = registry.list().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[0].response_format, ContentType::Markdown);
        assert_eq!(listed[1].name, "Echo");
        assert_eq!(listed[1].webhook_url, "https://example.test/hook");

        // The relational store assigned the id
        let stored = agent::get_agent(db.pool(), &first.id).await.unwrap();
        assert_eq!(stored.name, "Echo");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_fields() {
        let registry = registry_with(None, Arc::new(ToastBuffer::default())).await;

        let short_name = NewAgent::new("E", "Repeats every message", "https://example.test/hook");
        assert!(matches!(
            registry.create(short_name).await,
            Err(ChatError::Validation(_))
        ));

        let short_description = NewAgent::new("Echo", "short", "https://example.test/hook");
        assert!(registry.create(short_description).await.is_err());

        let bad_url = NewAgent::new("Echo", "Repeats every message", "not a url");
        assert!(registry.create(bad_url).await.is_err());

        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_degrades_to_cache_when_remote_fails() {
        let db = Database::in_memory().await.unwrap();
        let notifier = Arc::new(ToastBuffer::default());
        let registry = registry_with(Some(db.clone()), notifier.clone()).await;
        assert!(registry.is_remote_available());

        db.close().await;

        let created = registry.create(echo()).await.unwrap();
        assert!(!registry.is_remote_available());
        assert!(Uuid::parse_str(&created.id).is_ok());
        assert_eq!(registry.list().await.len(), 1);

        let toasts = notifier.drain();
        assert_eq!(toasts.len(), 1);
        assert!(!toasts[0].is_error());

        // Subsequent operations keep working against the cache
        let patch = AgentPatch {
            name: Some("Echo Two".to_string()),
            ..Default::default()
        };
        let updated = registry.update(&created.id, patch).await.unwrap();
        assert_eq!(updated.name, "Echo Two");
        assert!(updated.updated_at.is_some());

        registry.delete(&created.id).await.unwrap();
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_cache_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.json");

        let registry = AgentRegistry::new(
            None,
            LocalCache::open(&path).await,
            transport(),
            Arc::new(ToastBuffer::default()),
        );
        registry.load(false).await;
        let created = registry.create(echo()).await.unwrap();

        let reloaded = AgentRegistry::new(
            None,
            LocalCache::open(&path).await,
            transport(),
            Arc::new(ToastBuffer::default()),
        );
        reloaded.load(false).await;

        assert_eq!(reloaded.get(&created.id).await.unwrap().name, "Echo");
    }

    #[tokio::test]
    async fn test_seeds_defaults_and_keeps_them_over_empty_remote() {
        let db = Database::in_memory().await.unwrap();
        let registry = AgentRegistry::new(
            Some(db.clone()),
            LocalCache::in_memory(),
            transport(),
            Arc::new(ToastBuffer::default()),
        );
        registry.load(true).await;

        assert_eq!(registry.list().await.len(), 3);
        assert!(registry.first().await.is_some());
    }

    #[tokio::test]
    async fn test_non_empty_remote_replaces_cache() {
        let db = Database::in_memory().await.unwrap();
        let stored = agent::create_agent(db.pool(), &echo()).await.unwrap();

        let registry = AgentRegistry::new(
            Some(db),
            LocalCache::in_memory(),
            transport(),
            Arc::new(ToastBuffer::default()),
        );
        registry.load(true).await;

        let listed = registry.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, stored.id);
    }

    #[tokio::test]
    async fn test_update_cache_only_agent_with_remote_up() {
        let db = Database::in_memory().await.unwrap();
        let registry = AgentRegistry::new(
            Some(db),
            LocalCache::in_memory(),
            transport(),
            Arc::new(ToastBuffer::default()),
        );
        registry.load(true).await;

        let seeded = registry.first().await.unwrap();
        let patch = AgentPatch {
            description: Some("A freshly rewritten description".to_string()),
            ..Default::default()
        };
        let updated = registry.update(&seeded.id, patch).await.unwrap();

        assert_eq!(
            updated.description.as_deref(),
            Some("A freshly rewritten description")
        );
        // A missing remote row is not a store failure
        assert!(registry.is_remote_available());
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_agent() {
        let db = Database::in_memory().await.unwrap();
        let registry = registry_with(Some(db), Arc::new(ToastBuffer::default())).await;

        let result = registry.update("missing", AgentPatch::default()).await;
        assert!(result.unwrap_err().is_not_found());

        let result = registry.delete("missing").await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_validates_provided_fields() {
        let registry = registry_with(None, Arc::new(ToastBuffer::default())).await;
        let created = registry.create(echo()).await.unwrap();

        let patch = AgentPatch {
            webhook_url: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            registry.update(&created.id, patch).await,
            Err(ChatError::Validation(_))
        ));
        assert_eq!(
            registry.get(&created.id).await.unwrap().webhook_url,
            "https://example.test/hook"
        );
    }

    #[tokio::test]
    async fn test_webhook_probe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_with(None, Arc::new(ToastBuffer::default())).await;
        let result = registry.test_webhook(&server.uri()).await;

        assert!(result.success);
        assert!(result.message.starts_with("Test successful! Response: "));
        assert!(registry.list().await.is_empty());
    }
}

//! Built-in agents seeded into an empty registry.

use database::{timestamp_now, Agent, AgentStatus, ContentType};

/// Placeholder endpoint shared by the built-in agents.
pub const DEFAULT_WEBHOOK_URL: &str = "https://agents.example.com/webhook/default";

/// Placeholder endpoint for agents still under test.
pub const DEFAULT_TEST_WEBHOOK_URL: &str = "https://agents.example.com/webhook-test/default";

/// The built-in agents, stamped with the current time.
pub fn default_agents() -> Vec<Agent> {
    let now = timestamp_now();

    [
        (
            "550e8400-e29b-41d4-a716-446655440000",
            "SEO Content Agent",
            "Generates SEO-optimized content for websites and blogs",
            DEFAULT_WEBHOOK_URL,
            ContentType::Text,
        ),
        (
            "550e8400-e29b-41d4-a716-446655440001",
            "LinkedIn Post Agent",
            "Creates engaging LinkedIn posts for professional networking",
            DEFAULT_TEST_WEBHOOK_URL,
            ContentType::Text,
        ),
        (
            "550e8400-e29b-41d4-a716-446655440002",
            "Spatial Room Agent",
            "Manages spatial room configurations and settings",
            DEFAULT_WEBHOOK_URL,
            ContentType::Html,
        ),
    ]
    .into_iter()
    .map(|(id, name, description, url, format)| Agent {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        webhook_url: url.to_string(),
        status: AgentStatus::Active,
        response_format: format,
        configuration: None,
        created_at: now.clone(),
        updated_at: None,
    })
    .collect()
}

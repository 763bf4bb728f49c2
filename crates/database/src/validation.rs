//! Input validation for agent fields.

use std::fmt;

use url::Url;

use crate::models::{AgentPatch, NewAgent};

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Value shorter than the field's minimum.
    TooShort { field: String, min: usize, actual: usize },
    /// Value is not a well-formed absolute URL.
    InvalidUrl(String),
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::TooShort { field, min, actual } => {
                write!(
                    f,
                    "{} must be at least {} characters ({} given)",
                    field, min, actual
                )
            }
            ValidationError::InvalidUrl(msg) => write!(f, "Please enter a valid URL: {}", msg),
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Minimum length of an agent name.
pub const MIN_NAME_LENGTH: usize = 2;

/// Minimum length of an agent description.
pub const MIN_DESCRIPTION_LENGTH: usize = 10;

fn check_min_length(field: &str, value: &str, min: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
            actual,
        });
    }
    Ok(())
}

/// Validate an agent name (at least two characters).
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    check_min_length("Agent name", name, MIN_NAME_LENGTH)
}

/// Validate an agent description (at least ten characters).
pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    check_min_length("Description", description, MIN_DESCRIPTION_LENGTH)
}

/// Validate a webhook URL.
///
/// The URL must parse as an absolute URL and carry a host.
pub fn validate_webhook_url(url: &str) -> Result<(), ValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(ValidationError::Empty("webhook_url".to_string()));
    }

    let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    if parsed.host_str().is_none() {
        return Err(ValidationError::InvalidUrl("URL must have a host".to_string()));
    }

    Ok(())
}

/// Validate every field of a new agent.
///
/// The response format and status are closed enums, so they are valid by
/// construction once deserialized.
pub fn validate_new_agent(agent: &NewAgent) -> Result<(), ValidationError> {
    validate_name(&agent.name)?;
    match agent.description.as_deref() {
        Some(description) => validate_description(description)?,
        None => return Err(ValidationError::Empty("description".to_string())),
    }
    validate_webhook_url(&agent.webhook_url)
}

/// Validate only the fields a patch provides.
pub fn validate_agent_patch(patch: &AgentPatch) -> Result<(), ValidationError> {
    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(description) = &patch.description {
        validate_description(description)?;
    }
    if let Some(url) = &patch.webhook_url {
        validate_webhook_url(url)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_name("AI").is_ok());
        assert!(validate_name("SEO Content Agent").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(matches!(
            validate_name("A"),
            Err(ValidationError::TooShort { min: 2, actual: 1, .. })
        ));
        assert!(validate_name("").is_err());
    }

    #[test]
    fn test_description_length_counts_chars() {
        // Ten multi-byte characters are enough
        assert!(validate_description("éééééééééé").is_ok());
        assert!(validate_description("too short").is_err());
    }

    #[test]
    fn test_valid_urls() {
        assert!(validate_webhook_url("https://example.test/hook").is_ok());
        assert!(validate_webhook_url("http://localhost:5678/webhook/abc").is_ok());
    }

    #[test]
    fn test_invalid_urls() {
        assert!(matches!(
            validate_webhook_url(""),
            Err(ValidationError::Empty(_))
        ));
        assert!(matches!(
            validate_webhook_url("example.test/hook"),
            Err(ValidationError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_webhook_url("mailto:someone@example.test"),
            Err(ValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_new_agent_requires_description() {
        let mut agent = NewAgent::new("Echo", "Repeats every message", "https://example.test/hook");
        assert!(validate_new_agent(&agent).is_ok());

        agent.description = None;
        assert_eq!(
            validate_new_agent(&agent),
            Err(ValidationError::Empty("description".to_string()))
        );
    }

    #[test]
    fn test_patch_validates_only_provided_fields() {
        assert!(validate_agent_patch(&AgentPatch::default()).is_ok());

        let patch = AgentPatch {
            webhook_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(validate_agent_patch(&patch).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::TooShort {
            field: "Agent name".to_string(),
            min: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "Agent name must be at least 2 characters (1 given)"
        );
    }
}

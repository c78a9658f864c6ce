use crate::error::{EventSpaceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value Object: SpaceName
///
/// The human-chosen, unique name a space is created and looked up by.
/// Unlike [`SpaceId`](super::SpaceId), which is assigned by the registry,
/// the name is supplied by the caller of `get_or_create`.
///
/// Domain rules:
/// - Cannot be empty
/// - At most 128 characters
/// - Alphanumeric, `-` and `_` only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpaceName(String);

impl SpaceName {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    fn validate(value: &str) -> Result<()> {
        if value.is_empty() {
            return Err(EventSpaceError::InvalidInput(
                "space name cannot be empty".to_string(),
            ));
        }
        if value.len() > 128 {
            return Err(EventSpaceError::InvalidInput(format!(
                "space name cannot exceed 128 characters, got {}",
                value.len()
            )));
        }
        if !value.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            return Err(EventSpaceError::InvalidInput(format!(
                "space name '{value}' contains invalid characters; only alphanumeric, '-' and '_' allowed"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SpaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for SpaceName {
    type Error = EventSpaceError;

    fn try_from(value: &str) -> Result<Self> {
        SpaceName::new(value)
    }
}

impl TryFrom<String> for SpaceName {
    type Error = EventSpaceError;

    fn try_from(value: String) -> Result<Self> {
        SpaceName::new(value)
    }
}

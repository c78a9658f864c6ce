use crate::error::{EventSpaceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value Object: RefKey
///
/// The opaque key carried by a [`Ref`](crate::domain::entities::Ref), of
/// the form `"<entity_type>:<id>"`. Also doubles as a general projection
/// key elsewhere in the system (e.g. `"card:c1"`), which is why
/// [`RefKey::entity_type`] is useful outside of Ref resolution too: the
/// migration engine uses it to look up a stored value's schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefKey(String);

impl RefKey {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(EventSpaceError::InvalidInput(
                "ref key cannot be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// The portion before the first `:`, or the whole key if there is none.
    pub fn entity_type(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for RefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RefKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RefKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value Object: SpaceId
///
/// The numeric identifier a [`Space`](crate::domain::entities::Space) is
/// addressed by everywhere else in the system (event log keys, projection
/// keys, checkpoints). Assigned by the space registry; never reused once a
/// space is deleted.
///
/// `SpaceId(0)` is reserved for the registry's own bookkeeping space (see
/// [`crate::application::space_registry`]) and is never handed out by
/// `get_or_create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpaceId(u64);

impl SpaceId {
    pub const REGISTRY: SpaceId = SpaceId(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_registry(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SpaceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_space_is_reserved() {
        assert!(SpaceId::REGISTRY.is_registry());
        assert_eq!(SpaceId::REGISTRY.value(), 0);
    }

    #[test]
    fn ordering_follows_numeric_value() {
        assert!(SpaceId::new(1) < SpaceId::new(2));
    }

    #[test]
    fn display_is_plain_integer() {
        assert_eq!(format!("{}", SpaceId::new(42)), "42");
    }
}

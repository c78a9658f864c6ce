use std::fmt;
use std::sync::Arc;

use crate::domain::entities::value::Value;

/// The declared shape of a field, used by [`needs_migration`] to decide
/// whether a stored value matches what the schema currently expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Map,
    List,
    Ref,
    /// A schema hint with no storage-shape assertion of its own; always
    /// matches. Used for fields whose shape is itself schema-defined
    /// elsewhere (e.g. a migrated collection of Refs).
    Collection,
}

impl FieldType {
    /// Whether `value`'s runtime shape matches this declared type. `null`
    /// is universally compatible and never reported as a mismatch here;
    /// callers should check for null separately (see [`needs_migration`]).
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => matches!(value, Value::String(_)),
            FieldType::Integer => matches!(value, Value::Number(n) if n.is_i64() || n.is_u64()),
            FieldType::Map => matches!(value, Value::Map(_)),
            FieldType::List => matches!(value, Value::List(_)),
            FieldType::Ref => matches!(value, Value::Ref(_)),
            FieldType::Collection => true,
        }
    }
}

type MigrateFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;
type ValidateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Declaration of one field of an entity type: its expected shape and,
/// optionally, a migration function applied when a stored value no longer
/// matches that shape and a validation predicate applied by commands.
#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub ref_type: Option<String>,
    pub migrate_fn: Option<MigrateFn>,
    pub validate_fn: Option<ValidateFn>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            ref_type: None,
            migrate_fn: None,
            validate_fn: None,
        }
    }

    pub fn ref_to(mut self, entity_type: impl Into<String>) -> Self {
        self.ref_type = Some(entity_type.into());
        self
    }

    pub fn migrate(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.migrate_fn = Some(Arc::new(f));
        self
    }

    pub fn validate(mut self, f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.validate_fn = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("ref_type", &self.ref_type)
            .field("has_migrate_fn", &self.migrate_fn.is_some())
            .field("has_validate_fn", &self.validate_fn.is_some())
            .finish()
    }
}

/// The ordered field declarations for one entity type. Immutable once
/// registered with a [`crate::application::schema_registry::SchemaRegistry`].
pub type EntitySchema = Vec<Field>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_matches_both_signed_and_unsigned_numbers() {
        assert!(FieldType::Integer.matches(&Value::Number(3.into())));
        assert!(!FieldType::Integer.matches(&Value::String("3".into())));
    }

    #[test]
    fn map_excludes_refs() {
        let map_value = Value::map();
        assert!(FieldType::Map.matches(&map_value));
    }

    #[test]
    fn collection_matches_anything() {
        assert!(FieldType::Collection.matches(&Value::Null));
        assert!(FieldType::Collection.matches(&Value::List(vec![])));
    }

    #[test]
    fn field_builder_sets_migrate_and_validate() {
        let field = Field::new("count", FieldType::Integer)
            .migrate(|v| v)
            .validate(|v| !v.is_null());
        assert!(field.migrate_fn.is_some());
        assert!(field.validate_fn.is_some());
    }
}

//! Declarative entity schemas: `entity_type -> Vec<Field>`.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::entities::{EntitySchema, Field, FieldType};

/// Owns every entity type's field declarations. A given entity type's
/// schema is immutable once registered; re-registering replaces it
/// outright (no field-level versioning).
#[derive(Default)]
pub struct SchemaRegistry {
    entities: RwLock<HashMap<String, EntitySchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_entity(&self, entity_type: impl Into<String>, fields: EntitySchema) {
        self.entities.write().insert(entity_type.into(), fields);
    }

    pub fn schema_for(&self, entity_type: &str) -> Option<EntitySchema> {
        self.entities.read().get(entity_type).cloned()
    }

    pub fn field_for(&self, entity_type: &str, field_name: &str) -> Option<Field> {
        self.schema_for(entity_type)?.into_iter().find(|f| f.name == field_name)
    }

    /// Start a fluent declaration: `schema.entity("card").field("translations", FieldType::Collection).migrate(...).register()`.
    pub fn entity(self: &Arc<Self>, entity_type: impl Into<String>) -> EntityBuilder {
        EntityBuilder {
            registry: self.clone(),
            entity_type: entity_type.into(),
            fields: Vec::new(),
        }
    }
}

pub struct EntityBuilder {
    registry: Arc<SchemaRegistry>,
    entity_type: String,
    fields: EntitySchema,
}

impl EntityBuilder {
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn register(self) {
        self.registry.register_entity(self.entity_type, self.fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup_round_trips() {
        let registry = SchemaRegistry::new();
        registry.register_entity("card", vec![Field::new("name", FieldType::String)]);
        let schema = registry.schema_for("card").unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].name, "name");
    }

    #[test]
    fn unregistered_entity_type_returns_none() {
        let registry = SchemaRegistry::new();
        assert!(registry.schema_for("unknown").is_none());
    }

    #[test]
    fn re_registering_replaces_the_schema() {
        let registry = SchemaRegistry::new();
        registry.register_entity("card", vec![Field::new("a", FieldType::String)]);
        registry.register_entity("card", vec![Field::new("b", FieldType::Integer)]);
        let schema = registry.schema_for("card").unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].name, "b");
    }

    #[test]
    fn fluent_builder_registers_on_call() {
        let registry = Arc::new(SchemaRegistry::new());
        registry
            .entity("deck")
            .field(Field::new("title", FieldType::String))
            .field(Field::new("cards", FieldType::Map))
            .register();
        assert_eq!(registry.schema_for("deck").unwrap().len(), 2);
    }
}

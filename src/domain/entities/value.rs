use crate::domain::value_objects::RefKey;
use serde_json::{Map as JsonMap, Value as Json};
use std::collections::BTreeMap;

/// A reference to another entity, carried by key only. Refs are
/// first-class: they can appear anywhere inside a stored value and are
/// resolved lazily by [`crate::application::pstate::PState::get_resolved`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    pub key: RefKey,
}

impl Ref {
    pub fn new(key: impl Into<RefKey>) -> Self {
        Self { key: key.into() }
    }
}

/// Reserved object key used to tag an encoded Ref inside a JSON value.
/// A plain map is never allowed to use this key for anything else; see
/// [`needs_migration`](crate::application::migration::needs_migration)'s
/// `map` shape rule, which explicitly excludes ref-tagged records.
pub const REF_TAG: &str = "$ref";

/// The typed value currency PState hands to callers. Isomorphic to the
/// adapter's JSON wire format except that Refs are a distinct variant
/// rather than a tagged object, so that callers never have to special-case
/// the tagged shape themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Ref(Ref),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ref_key(&self) -> Option<&RefKey> {
        match self {
            Value::Ref(r) => Some(&r.key),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Encode a typed [`Value`] into the JSON wire format understood by
/// storage adapters, tagging Refs as `{"$ref": "<key>"}`.
pub fn encode(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => Json::Number(n.clone()),
        Value::String(s) => Json::String(s.clone()),
        Value::Ref(r) => {
            let mut map = JsonMap::new();
            map.insert(REF_TAG.to_string(), Json::String(r.key.as_str().to_string()));
            Json::Object(map)
        }
        Value::List(items) => Json::Array(items.iter().map(encode).collect()),
        Value::Map(fields) => {
            let mut map = JsonMap::new();
            for (k, v) in fields {
                map.insert(k.clone(), encode(v));
            }
            Json::Object(map)
        }
    }
}

/// Decode a JSON wire value back into the typed [`Value`] currency,
/// rehydrating `{"$ref": ...}` objects into [`Value::Ref`]. Fixed point
/// with [`encode`]: `decode(encode(v)) == v` for every `v`.
pub fn decode(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Number(n.clone()),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(decode).collect()),
        Json::Object(map) => {
            if let Some(Json::String(key)) = map.get(REF_TAG) {
                if map.len() == 1 {
                    return Value::Ref(Ref::new(key.as_str()));
                }
            }
            let mut fields = BTreeMap::new();
            for (k, v) in map {
                fields.insert(k.clone(), decode(v));
            }
            Value::Map(fields)
        }
    }
}

/// `true` if `json` is a ref-tagged record rather than a plain map.
pub fn is_ref_json(json: &Json) -> bool {
    matches!(json, Json::Object(map) if map.len() == 1 && matches!(map.get(REF_TAG), Some(Json::String(_))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_decode_round_trips_plain_values() {
        let value = Value::Map(BTreeMap::from([
            ("name".to_string(), Value::String("N1".to_string())),
            ("count".to_string(), Value::Number(3.into())),
            ("tags".to_string(), Value::List(vec![Value::String("a".to_string())])),
        ]));
        assert_eq!(decode(&encode(&value)), value);
    }

    #[test]
    fn encode_decode_round_trips_refs() {
        let value = Value::Map(BTreeMap::from([(
            "deck".to_string(),
            Value::Ref(Ref::new("deck:d1")),
        )]));
        let json = encode(&value);
        assert_eq!(json["deck"], json!({"$ref": "deck:d1"}));
        assert_eq!(decode(&json), value);
    }

    #[test]
    fn is_ref_json_rejects_plain_objects_with_ref_like_fields() {
        assert!(!is_ref_json(&json!({"$ref": "x", "other": 1})));
        assert!(is_ref_json(&json!({"$ref": "deck:d1"})));
    }

    #[test]
    fn decode_treats_multi_field_ref_shaped_object_as_plain_map() {
        let json = json!({"$ref": "deck:d1", "note": "not actually a ref"});
        let decoded = decode(&json);
        assert!(matches!(decoded, Value::Map(_)));
    }
}

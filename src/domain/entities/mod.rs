pub mod event_record;
pub mod schema;
pub mod space;
pub mod value;

pub use event_record::EventRecord;
pub use schema::{Field, FieldType, EntitySchema};
pub use space::Space;
pub use value::{decode, encode, is_ref_json, Ref, Value, REF_TAG};

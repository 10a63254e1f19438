pub mod envelope;
pub mod serializer;

pub use envelope::{row_to_json, ChangeEvent, SchemaChangeEvent, SourceMetadata};
pub use serializer::JsonSerializer;

//! Structured output from models that only produce free text.
//!
//! The request side ([`protocol`]) appends formatting instructions and an
//! example-shaped object derived from a [`FieldSchema`]. The response side
//! ([`recovery`]) repairs the usual damage (code fences, trailing commas,
//! bare keys, over-escaping) before parsing. [`StructuredGenerator`] ties the
//! two together over a model backend.

pub mod generator;
pub mod protocol;
pub mod recovery;
pub mod schema;

pub use generator::{StructuredGenerator, generate_structured};
pub use protocol::{build_structured_prompt, request_structured};
pub use recovery::{clean_json_text, recover};
pub use schema::{FieldSchema, SchemaExample};

//! Field schemas and the example object shown to the model.
//!
//! A [`FieldSchema`] only names the expected fields and optionally describes
//! them. Nothing here validates a response; the schema exists to produce a
//! [`SchemaExample`] that is pasted into the prompt as a formatting aid.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Fixed sentence placed in the `example` field of every [`SchemaExample`].
pub const EXAMPLE_TEXT: &str = "This is an example of the expected format";

/// Hint used for fields without a description.
pub const REQUIRED_MARKER: &str = "required";

/// Ordered field names with optional descriptions. Names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<(String, Option<String>)>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a described field.
    pub fn field(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.insert(name, Some(description.into()));
        self
    }

    /// Add a field without a description.
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.insert(name, None);
        self
    }

    /// Insert a field, replacing the description of an existing one in place.
    pub fn insert(&mut self, name: impl Into<String>, description: Option<String>) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = description,
            None => self.fields.push((name, description)),
        }
    }

    /// Build from a JSON-schema object, reading `properties.<name>.description`.
    ///
    /// Anything that is not an object with a `properties` object yields an
    /// empty schema.
    pub fn from_json_schema(schema: &serde_json::Value) -> Self {
        let mut fields = Self::new();
        if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
            for (name, property) in properties {
                let description = property
                    .get("description")
                    .and_then(|d| d.as_str())
                    .map(String::from);
                fields.insert(name.clone(), description);
            }
        }
        fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(name, description)| (name.as_str(), description.as_deref()))
    }
}

/// Illustrative object serialized into structured-output prompts.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SchemaExample {
    pub example: String,
    pub properties: PropertyHints,
}

/// Field hints in schema order. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyHints(Vec<(String, String)>);

impl PropertyHints {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, hint)| hint.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for PropertyHints {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, hint) in &self.0 {
            map.serialize_entry(name, hint)?;
        }
        map.end()
    }
}

impl SchemaExample {
    /// One hint per field: `"(<description>)"`, or `"(required)"`.
    pub fn from_schema(schema: &FieldSchema) -> Self {
        let hints = schema
            .iter()
            .map(|(name, description)| {
                let hint = format!("({})", description.unwrap_or(REQUIRED_MARKER));
                (name.to_string(), hint)
            })
            .collect();

        Self {
            example: EXAMPLE_TEXT.into(),
            properties: PropertyHints(hints),
        }
    }

    /// Pretty JSON with two-space indentation.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

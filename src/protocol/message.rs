//! Message definitions
//!
//! A decoded inbound transaction.

/// A transaction name plus its fields, in wire order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Transaction name (e.g. `wired.send_ping`)
    pub name: String,

    /// (field name, field value) pairs
    pub fields: Vec<(String, String)>,
}

impl Message {
    /// Create a message with no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Value of the last field with this name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Boolean field; P7 encodes true as `1`, `YES` or `true`
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.field(name).map(parse_flag)
    }

    /// Iterate over field values
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, value)| value.as_str())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "YES" | "yes" | "true" | "TRUE")
}

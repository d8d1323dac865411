//! Specification Catalog
//!
//! Maps a P7 protocol version (e.g. `2.0b55`) to the Wired specification
//! document sent during the compatibility check.
//!
//! Documents are stored already escaped for use as a field value, so the
//! (large) escape pass runs once at load time instead of on every connect.
//! The catalog is built once at startup and only read afterwards.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, WiredError};
use crate::protocol::escape_value;

/// Protocol versions shipped with the client
pub const SUPPORTED_VERSIONS: &[&str] = &["2.0b51", "2.0b53", "2.0b55"];

/// Immutable version → escaped specification mapping
#[derive(Debug, Clone, Default)]
pub struct SpecCatalog {
    specs: HashMap<String, String>,
}

impl SpecCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw document; it is escaped here
    pub fn with_document(mut self, version: impl Into<String>, document: &str) -> Self {
        self.specs.insert(version.into(), escape_value(document));
        self
    }

    /// Add a document that is already escaped
    pub fn with_escaped(mut self, version: impl Into<String>, escaped: impl Into<String>) -> Self {
        self.specs.insert(version.into(), escaped.into());
        self
    }

    /// Load `WiredSpec_<version>.xml` for every requested version
    ///
    /// Every file must be readable: the client cannot pass a compatibility
    /// check without them.
    pub fn load_dir(dir: &Path, versions: &[&str]) -> Result<Self> {
        let mut catalog = Self::new();

        for version in versions {
            let path = dir.join(Self::file_name(version));
            let document = fs::read_to_string(&path).map_err(|e| {
                WiredError::Catalog(format!("cannot read {}: {}", path.display(), e))
            })?;

            tracing::debug!("Loaded specification {} ({} bytes)", version, document.len());
            catalog = catalog.with_document(*version, &document);
        }

        tracing::info!("Specification catalog ready with {} versions", catalog.len());
        Ok(catalog)
    }

    /// File name used for a version's document
    pub fn file_name(version: &str) -> String {
        format!("WiredSpec_{}.xml", version)
    }

    /// Escaped document for a version, empty if unknown
    pub fn get(&self, version: &str) -> &str {
        self.specs.get(version).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, version: &str) -> bool {
        self.specs.contains_key(version)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

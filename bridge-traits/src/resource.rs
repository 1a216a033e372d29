//! Resource bundle abstraction.
//!
//! Media assets live inside an opaque bundle (a directory, an archive, an
//! in-memory table). The engine only ever asks the bundle for the complete
//! bytes of a named resource and then reads them through its own adapter,
//! so bundles need no streaming support of their own.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{BridgeError, Result};

/// Source of packaged media resources.
///
/// Names are logical, slash-separated paths relative to the bundle root
/// (`"audio/rain.ogg"`). Implementations return [`BridgeError::NotFound`] for
/// names they do not carry.
pub trait ResourceBundle: Send + Sync {
    /// Open a resource and return its full contents.
    fn open(&self, name: &str) -> Result<Bytes>;

    /// Check whether a resource exists without reading it.
    fn contains(&self, name: &str) -> bool;

    /// Size of a resource in bytes.
    fn size(&self, name: &str) -> Result<u64> {
        self.open(name).map(|data| data.len() as u64)
    }

    /// Names of every resource the bundle can enumerate.
    ///
    /// Bundles that cannot enumerate return an empty list.
    fn list(&self) -> Vec<String> {
        Vec::new()
    }
}

/// In-memory bundle, mostly useful for tests and embedded assets.
#[derive(Debug, Default)]
pub struct MemoryBundle {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_resource(self, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.insert(name, data);
        self
    }

    /// Insert or replace a resource.
    pub fn insert(&self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.entries.write().insert(name.into(), data.into());
    }

    /// Remove a resource, returning its bytes if it existed.
    pub fn remove(&self, name: &str) -> Option<Bytes> {
        self.entries.write().remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ResourceBundle for MemoryBundle {
    fn open(&self, name: &str) -> Result<Bytes> {
        self.entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(name.to_string()))
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    fn size(&self, name: &str) -> Result<u64> {
        self.entries
            .read()
            .get(name)
            .map(|data| data.len() as u64)
            .ok_or_else(|| BridgeError::NotFound(name.to_string()))
    }

    fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_bundle_open_and_contains() {
        let bundle = MemoryBundle::new().with_resource("music/theme.ogg", vec![1u8, 2, 3]);

        assert!(bundle.contains("music/theme.ogg"));
        assert!(!bundle.contains("music/other.ogg"));
        assert_eq!(bundle.open("music/theme.ogg").unwrap().as_ref(), &[1, 2, 3]);
        assert_eq!(bundle.size("music/theme.ogg").unwrap(), 3);
    }

    #[test]
    fn test_memory_bundle_missing_resource() {
        let bundle = MemoryBundle::new();

        let err = bundle.open("missing.ogg").unwrap_err();
        assert!(matches!(err, BridgeError::NotFound(ref name) if name == "missing.ogg"));
        assert!(bundle.size("missing.ogg").is_err());
    }

    #[test]
    fn test_memory_bundle_list_is_sorted() {
        let bundle = MemoryBundle::new()
            .with_resource("b.ogg", Bytes::new())
            .with_resource("a.ogg", Bytes::new());

        assert_eq!(bundle.list(), vec!["a.ogg".to_string(), "b.ogg".to_string()]);
        assert_eq!(bundle.len(), 2);

        bundle.remove("a.ogg");
        assert_eq!(bundle.list(), vec!["b.ogg".to_string()]);
    }
}

//! Directory-backed resource bundle.

use bridge_traits::{
    error::{BridgeError, Result},
    resource::ResourceBundle,
};
use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

const DEFAULT_CACHE_ENTRIES: usize = 32;

/// Serves resources from a directory tree.
///
/// Recently opened resources are kept in an LRU cache so looping ambient
/// sounds and re-entered rooms do not hit the disk again.
pub struct DirectoryBundle {
    root: PathBuf,
    cache: Mutex<LruCache<String, Bytes>>,
}

impl DirectoryBundle {
    /// Create a bundle rooted at `root`, which must be an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_cache_capacity(root, DEFAULT_CACHE_ENTRIES)
    }

    pub fn with_cache_capacity(root: impl Into<PathBuf>, entries: usize) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(BridgeError::NotAvailable(format!(
                "Resource root {} is not a directory",
                root.display()
            )));
        }

        let capacity = NonZeroUsize::new(entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        debug!(root = ?root, capacity = entries, "Opened directory bundle");

        Ok(Self {
            root,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a logical name to a path under the root, rejecting anything that
    /// would escape it.
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative.components().any(|component| {
            !matches!(component, Component::Normal(_) | Component::CurDir)
        });

        if escapes || name.is_empty() {
            warn!(resource = name, "Rejected resource name outside bundle root");
            return Err(BridgeError::NotFound(name.to_string()));
        }

        Ok(self.root.join(relative))
    }

    fn map_io_error(name: &str, e: std::io::Error) -> BridgeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            BridgeError::NotFound(name.to_string())
        } else {
            BridgeError::Io(e)
        }
    }
}

impl ResourceBundle for DirectoryBundle {
    fn open(&self, name: &str) -> Result<Bytes> {
        if let Some(data) = self.cache.lock().get(name) {
            return Ok(data.clone());
        }

        let path = self.resolve(name)?;
        let data = Bytes::from(std::fs::read(&path).map_err(|e| Self::map_io_error(name, e))?);
        debug!(resource = name, bytes = data.len(), "Loaded resource from disk");

        self.cache.lock().put(name.to_string(), data.clone());
        Ok(data)
    }

    fn contains(&self, name: &str) -> bool {
        if self.cache.lock().contains(name) {
            return true;
        }
        self.resolve(name).map(|path| path.is_file()).unwrap_or(false)
    }

    fn size(&self, name: &str) -> Result<u64> {
        if let Some(data) = self.cache.lock().peek(name) {
            return Ok(data.len() as u64);
        }
        let path = self.resolve(name)?;
        std::fs::metadata(&path)
            .map(|meta| meta.len())
            .map_err(|e| Self::map_io_error(name, e))
    }

    fn list(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    let name = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    names.push(name);
                }
            }
        }

        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_with(files: &[(&str, &[u8])]) -> (tempfile::TempDir, DirectoryBundle) {
        let dir = tempfile::tempdir().unwrap();
        for (name, data) in files {
            let path = dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, data).unwrap();
        }
        let bundle = DirectoryBundle::new(dir.path()).unwrap();
        (dir, bundle)
    }

    #[test]
    fn test_open_reads_file() {
        let (_dir, bundle) = bundle_with(&[("audio/rain.ogg", b"OggS")]);

        assert!(bundle.contains("audio/rain.ogg"));
        assert_eq!(bundle.open("audio/rain.ogg").unwrap().as_ref(), b"OggS");
        assert_eq!(bundle.size("audio/rain.ogg").unwrap(), 4);
    }

    #[test]
    fn test_open_serves_cached_copy() {
        let (dir, bundle) = bundle_with(&[("a.ogg", b"first")]);

        bundle.open("a.ogg").unwrap();
        std::fs::remove_file(dir.path().join("a.ogg")).unwrap();

        assert_eq!(bundle.open("a.ogg").unwrap().as_ref(), b"first");
    }

    #[test]
    fn test_missing_resource_is_not_found() {
        let (_dir, bundle) = bundle_with(&[]);

        assert!(!bundle.contains("nope.ogg"));
        assert!(matches!(bundle.open("nope.ogg"), Err(BridgeError::NotFound(_))));
    }

    #[test]
    fn test_rejects_escaping_names() {
        let (_dir, bundle) = bundle_with(&[("a.ogg", b"x")]);

        assert!(bundle.open("../a.ogg").is_err());
        assert!(bundle.open("/etc/passwd").is_err());
        assert!(!bundle.contains("../a.ogg"));
    }

    #[test]
    fn test_list_uses_forward_slashes() {
        let (_dir, bundle) = bundle_with(&[("b/step1.ogg", b"1"), ("a.ogg", b"2")]);

        assert_eq!(bundle.list(), vec!["a.ogg".to_string(), "b/step1.ogg".to_string()]);
    }

    #[test]
    fn test_root_must_exist() {
        assert!(DirectoryBundle::new("/definitely/not/a/real/dir").is_err());
    }
}

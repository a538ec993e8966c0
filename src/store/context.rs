// Current-version map shared between the store and whoever composes it.
//
// The store writes the current content hash of each resource here; request
// layers read it to build version-aware URLs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct VersionMap {
    inner: RwLock<HashMap<PathBuf, String>>,
}

impl VersionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(path).cloned()
    }

    pub fn set(&self, path: PathBuf, version: String) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(path, version);
    }

    pub fn remove(&self, path: &Path) -> Option<String> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.remove(path)
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the whole map, sorted by path.
    pub fn snapshot(&self) -> Vec<(PathBuf, String)> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<_> = map.iter().map(|(p, v)| (p.clone(), v.clone())).collect();
        out.sort();
        out
    }
}

// Persisted path -> resource id mapping.
//
// Stored as properties text sorted by path, so the file diffs cleanly and
// stays readable by older tooling.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::atomic_write;
use crate::properties;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<PathBuf, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> io::Result<Self> {
        let pairs = properties::parse(text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let entries = pairs
            .into_iter()
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .map(|(k, v)| (PathBuf::from(k), v))
            .collect();
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn render(&self) -> String {
        let keys: Vec<(String, &str)> = self
            .entries
            .iter()
            .map(|(p, id)| (p.to_string_lossy().into_owned(), id.as_str()))
            .collect();
        properties::render(keys.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        atomic_write(path, self.render().as_bytes())
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn insert(&mut self, path: PathBuf, id: String) -> Option<String> {
        self.entries.insert(path, id)
    }

    pub fn remove(&mut self, path: &Path) -> Option<String> {
        self.entries.remove(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.entries.iter().map(|(p, id)| (p.as_path(), id.as_str()))
    }
}

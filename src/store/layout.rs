// On-disk layout of a store root.
//
//   <root>/diffable.manifest
//   <root>/<resource id>/<content hash>.version
//   <root>/<resource id>/<old hash>_<new hash>.diff

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::sha256_hex;

pub const MANIFEST_FILE: &str = "diffable.manifest";
pub const VERSION_EXTENSION: &str = "version";
pub const DIFF_EXTENSION: &str = "diff";

/// Resource id for an absolute path: hex SHA-256 of its string form.
pub fn resource_id(path: &Path) -> String {
    sha256_hex(path.to_string_lossy().as_bytes())
}

/// One recognized file inside a resource folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Version { hash: String },
    Diff { from: String, to: String },
}

impl Artifact {
    /// Classify a file name. In-flight `.tmp` files and anything else
    /// unrecognized are `None`.
    pub fn classify(file_name: &str) -> Option<Self> {
        let (stem, ext) = file_name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        match ext {
            VERSION_EXTENSION if !stem.contains('_') => Some(Artifact::Version {
                hash: stem.to_string(),
            }),
            DIFF_EXTENSION => {
                let (from, to) = stem.split_once('_')?;
                if from.is_empty() || to.is_empty() || to.contains('_') {
                    return None;
                }
                Some(Artifact::Diff {
                    from: from.to_string(),
                    to: to.to_string(),
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn resource_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    pub fn version_path(&self, id: &str, hash: &str) -> PathBuf {
        self.resource_dir(id)
            .join(format!("{hash}.{VERSION_EXTENSION}"))
    }

    pub fn diff_path(&self, id: &str, from: &str, to: &str) -> PathBuf {
        self.resource_dir(id)
            .join(format!("{from}_{to}.{DIFF_EXTENSION}"))
    }

    /// Every recognized artifact in a resource folder, with its path.
    ///
    /// A missing folder lists as empty.
    pub fn artifacts(&self, id: &str) -> io::Result<Vec<(Artifact, PathBuf)>> {
        let dir = self.resource_dir(id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(artifact) = name.to_str().and_then(Artifact::classify) {
                out.push((artifact, entry.path()));
            }
        }
        out.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(out)
    }
}

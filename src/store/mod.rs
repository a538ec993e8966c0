// Versioned resource store.
//
// Each managed file gets a folder under the store root named by its
// resource id. The folder holds one `.version` file per distinct content
// and one `.diff` file from every older version to the current one. The
// folder's mtime is kept equal to the managed file's mtime and serves as
// the change indicator.
//
// All diff work happens in `put`; `get` only reads what is already on disk
// (or in memory).

pub mod context;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod request;

pub use context::VersionMap;
pub use error::{Result, StoreError};
pub use layout::{Artifact, StoreLayout};
pub use manifest::Manifest;
pub use request::{RequestError, ResourceRequest, Response};

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::DiffableConfig;
use crate::delta::full_content_payload;
use crate::engine::DeltaCodec;
use crate::hash::rolling::{Hasher, RollingHash};
use crate::io as fsio;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Default)]
struct State {
    manifest: Manifest,
    by_id: HashMap<String, PathBuf>,
    contents: HashMap<PathBuf, Vec<u8>>,
}

/// Delta computed from one retained version; `None` when the decoded texts
/// match.
type PendingDelta = (String, Option<String>);

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Content-addressed, manifest-backed store of resource versions and the
/// deltas between them.
///
/// Every operation takes one store-wide lock, so a reader never sees a
/// half-regenerated resource folder.
#[derive(Debug)]
pub struct VersionedResourceStore<H = RollingHash> {
    config: DiffableConfig,
    layout: StoreLayout,
    codec: DeltaCodec<H>,
    versions: Arc<VersionMap>,
    state: Mutex<State>,
}

impl VersionedResourceStore<RollingHash> {
    /// Open (or create) the store for `base_dir` and reconcile it with the
    /// file system.
    ///
    /// Current versions of all surviving resources are published to
    /// `versions`.
    pub fn initialize(
        base_dir: &Path,
        config: DiffableConfig,
        versions: Arc<VersionMap>,
    ) -> Result<Self> {
        let codec = DeltaCodec::rolling(config.block_size, config.hash_params());
        Self::with_codec(base_dir, config, versions, codec)
    }
}

impl<H: Hasher + Clone + Send + Sync> VersionedResourceStore<H> {
    /// Like [`initialize`](VersionedResourceStore::initialize) with a
    /// caller-built codec.
    pub fn with_codec(
        base_dir: &Path,
        config: DiffableConfig,
        versions: Arc<VersionMap>,
        codec: DeltaCodec<H>,
    ) -> Result<Self> {
        config.validate()?;

        let requested = config.resolve_store_root(base_dir);
        let root = std::path::absolute(&requested).map_err(|e| StoreError::init(&requested, e))?;
        if root.exists() && !root.is_dir() {
            return Err(StoreError::init(&root, "exists but is not a directory"));
        }
        fs::create_dir_all(&root).map_err(|e| StoreError::init(&root, e))?;

        let layout = StoreLayout::new(root);
        let manifest_path = layout.manifest_path();
        let manifest = if manifest_path.is_file() {
            Manifest::load(&manifest_path).map_err(|e| StoreError::init(&manifest_path, e))?
        } else {
            let fresh = Manifest::new();
            fresh
                .save(&manifest_path)
                .map_err(|e| StoreError::init(&manifest_path, e))?;
            fresh
        };
        let by_id = manifest
            .iter()
            .map(|(path, id)| (id.to_string(), path.to_path_buf()))
            .collect();

        log::info!(
            "resource store at {} ({} managed)",
            layout.root().display(),
            manifest.len()
        );

        let store = Self {
            config,
            layout,
            codec,
            versions,
            state: Mutex::new(State {
                manifest,
                by_id,
                contents: HashMap::new(),
            }),
        };
        store.reconcile()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn config(&self) -> &DiffableConfig {
        &self.config
    }

    pub fn versions(&self) -> &Arc<VersionMap> {
        &self.versions
    }

    pub fn is_managed(&self, path: &Path) -> bool {
        match std::path::absolute(path) {
            Ok(path) => self.lock().manifest.contains(&path),
            Err(_) => false,
        }
    }

    /// Resource id of a managed path.
    pub fn resource_id(&self, path: &Path) -> Option<String> {
        let path = std::path::absolute(path).ok()?;
        self.lock().manifest.get(&path).map(str::to_string)
    }

    /// Current content hash of a managed path.
    pub fn current_version(&self, path: &Path) -> Option<String> {
        let path = std::path::absolute(path).ok()?;
        self.versions.get(&path)
    }

    /// Managed paths in sorted order.
    pub fn get_managed_resources(&self) -> Vec<PathBuf> {
        self.lock()
            .manifest
            .iter()
            .map(|(path, _)| path.to_path_buf())
            .collect()
    }

    /// Whether the resource folder's fence differs from the file's mtime.
    ///
    /// This is a timestamp comparison only: a rewrite that keeps the mtime
    /// goes unnoticed and a bare `touch` reports a change.
    pub fn has_changed(&self, path: &Path) -> Result<bool> {
        let path = absolute(path)?;
        let state = self.lock();
        let id = state
            .manifest
            .get(&path)
            .ok_or_else(|| StoreError::NotManaged(path.clone()))?;
        Ok(!fsio::fence_matches(&self.layout.resource_dir(id), &path))
    }

    /// Bring the stored artifacts of `path` up to date.
    ///
    /// Unmanaged files become managed with their first version. Managed
    /// files are re-read only when their fence is stale. Calling `put`
    /// again without a change is a no-op.
    pub fn put(&self, path: &Path) -> Result<()> {
        let path = absolute(path)?;
        let mut state = self.lock();
        let existing = state.manifest.get(&path).map(str::to_string);
        let Some(id) = existing else {
            return self.manage(&mut state, path);
        };
        if fsio::fence_matches(&self.layout.resource_dir(&id), &path) {
            return Ok(());
        }
        self.refresh(&mut state, &path, &id)
    }

    /// Serve a request. Unknown resources yield `None`.
    ///
    /// A delta request whose `.diff` is not stored is answered with the
    /// current full content wrapped as a one-element payload.
    pub fn get(&self, request: &ResourceRequest) -> Option<Response> {
        let state = self.lock();
        let id = request.resource_id();
        let Some(path) = state.by_id.get(id) else {
            log::debug!("request for unknown resource {id}");
            return None;
        };

        match request {
            ResourceRequest::Delta { from, to, .. } => {
                let diff = self.layout.diff_path(id, from, to);
                match fs::read_to_string(&diff) {
                    Ok(payload) => Some(Response::Delta {
                        resource_id: id.to_string(),
                        payload,
                    }),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        log::debug!("no delta {from} -> {to} for {id}, sending full content");
                        let (content, _) = self.current_content(&state, path, id)?;
                        Some(Response::Delta {
                            resource_id: id.to_string(),
                            payload: full_content_payload(&fsio::decode_text(&content)),
                        })
                    }
                    Err(e) => {
                        log::warn!("cannot read {}: {e}", diff.display());
                        None
                    }
                }
            }
            ResourceRequest::Content { .. } => {
                let (content, version) = self.current_content(&state, path, id)?;
                Some(Response::Content {
                    resource_id: id.to_string(),
                    content,
                    version,
                })
            }
        }
    }

    /// Forget a resource and remove all its artifacts. Unmanaged paths are
    /// ignored.
    pub fn delete_resource(&self, path: &Path) -> Result<()> {
        let path = absolute(path)?;
        let mut state = self.lock();
        let Some(id) = state.manifest.remove(&path) else {
            return Ok(());
        };
        state.by_id.remove(&id);
        state.contents.remove(&path);
        self.versions.remove(&path);

        let dir = self.layout.resource_dir(&id);
        let removed = fsio::remove_dir_if_exists(&dir);
        self.save_manifest(&state)?;
        removed.map_err(StoreError::artifact(&dir))?;
        log::info!("no longer managing {}", path.display());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals (caller holds the lock)
    // -----------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save_manifest(&self, state: &State) -> Result<()> {
        let path = self.layout.manifest_path();
        state
            .manifest
            .save(&path)
            .map_err(StoreError::artifact(&path))
    }

    /// Drop manifest entries whose files are gone; re-hash the rest.
    fn reconcile(&self) -> Result<()> {
        let mut state = self.lock();
        let entries: Vec<(PathBuf, String)> = state
            .manifest
            .iter()
            .map(|(path, id)| (path.to_path_buf(), id.to_string()))
            .collect();

        let mut purged = 0usize;
        for (path, id) in entries {
            if path.exists() {
                if let Err(e) = self.refresh(&mut state, &path, &id) {
                    log::error!("cannot restore {}: {e}", path.display());
                }
                continue;
            }
            log::info!("purging vanished resource {}", path.display());
            let dir = self.layout.resource_dir(&id);
            if let Err(e) = fsio::remove_dir_if_exists(&dir) {
                log::warn!("cannot remove {}: {e}", dir.display());
            }
            state.manifest.remove(&path);
            state.by_id.remove(&id);
            purged += 1;
        }

        if purged > 0 {
            let manifest_path = self.layout.manifest_path();
            state
                .manifest
                .save(&manifest_path)
                .map_err(|e| StoreError::init(&manifest_path, e))?;
        }
        Ok(())
    }

    /// Start managing `path`. Nothing is recorded unless every artifact
    /// was written.
    fn manage(&self, state: &mut State, path: PathBuf) -> Result<()> {
        let id = layout::resource_id(&path);
        let dir = self.layout.resource_dir(&id);
        // Leftovers from a manifest that was lost.
        fsio::remove_dir_if_exists(&dir).map_err(StoreError::artifact(&dir))?;

        if let Err(e) = self.refresh(state, &path, &id) {
            self.abandon(state, &path, &dir);
            return Err(e);
        }

        state.manifest.insert(path.clone(), id.clone());
        state.by_id.insert(id.clone(), path.clone());
        if let Err(e) = self.save_manifest(state) {
            state.manifest.remove(&path);
            state.by_id.remove(&id);
            self.abandon(state, &path, &dir);
            return Err(e);
        }
        log::info!("managing {} as {id}", path.display());
        Ok(())
    }

    fn abandon(&self, state: &mut State, path: &Path, dir: &Path) {
        state.contents.remove(path);
        self.versions.remove(path);
        if let Err(e) = fsio::remove_dir_if_exists(dir) {
            log::warn!("cannot clean up {}: {e}", dir.display());
        }
    }

    /// Re-read `path`, store its version if new, bring the deltas in line
    /// with it, publish it as current and set the fence.
    fn refresh(&self, state: &mut State, path: &Path, id: &str) -> Result<()> {
        let dir = self.layout.resource_dir(id);
        fs::create_dir_all(&dir).map_err(StoreError::artifact(&dir))?;

        // Taken before the read: a save that lands mid-refresh leaves the
        // fence stale instead of hiding behind it.
        let stamp = fsio::mtime(path).map_err(StoreError::artifact(path))?;
        let (bytes, hash) = fsio::read_with_digest(path).map_err(StoreError::artifact(path))?;
        let version = self.layout.version_path(id, &hash);
        if !version.is_file() {
            fsio::atomic_write(&version, &bytes).map_err(StoreError::artifact(&version))?;
            log::debug!("wrote {}", version.display());
        }
        let text = fsio::decode_text(&bytes);

        let written = self.sync_deltas(id, &hash, &text)?;
        if self.versions.get(path).as_deref() != Some(hash.as_str()) {
            log::info!(
                "{} is at version {hash} ({written} new deltas)",
                path.display()
            );
        }

        self.versions.set(path.to_path_buf(), hash);
        if self.config.keep_in_memory {
            state.contents.insert(path.to_path_buf(), bytes);
        } else {
            state.contents.remove(path);
        }

        // Last: every write above bumps the folder mtime.
        fsio::set_fence(&dir, stamp).map_err(StoreError::artifact(&dir))
    }

    /// Make the folder hold exactly one delta from each other version to
    /// `current`. Returns the number of delta files written.
    fn sync_deltas(&self, id: &str, current: &str, content: &str) -> Result<usize> {
        let dir = self.layout.resource_dir(id);
        let artifacts = self
            .layout
            .artifacts(id)
            .map_err(StoreError::artifact(&dir))?;

        let mut covered = HashSet::new();
        let mut older = Vec::new();
        for (artifact, file) in artifacts {
            match artifact {
                Artifact::Diff { from, to } if to == current => {
                    covered.insert(from);
                }
                Artifact::Diff { .. } => {
                    fs::remove_file(&file).map_err(StoreError::artifact(&file))?;
                    log::debug!("removed stale delta {}", file.display());
                }
                Artifact::Version { hash } if hash != current => older.push((hash, file)),
                Artifact::Version { .. } => {}
            }
        }
        older.retain(|(hash, _)| !covered.contains(hash));
        if older.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        for (from, payload) in self.compute_deltas(&older, content)? {
            // Distinct bytes, same text (UTF-8 vs Latin-1): send it whole.
            let payload = payload.unwrap_or_else(|| full_content_payload(content));
            let file = self.layout.diff_path(id, &from, current);
            fsio::atomic_write(&file, payload.as_bytes()).map_err(StoreError::artifact(&file))?;
            log::debug!("wrote {}", file.display());
            written += 1;
        }
        Ok(written)
    }

    #[cfg(feature = "parallel")]
    fn compute_deltas(&self, older: &[(String, PathBuf)], target: &str) -> Result<Vec<PendingDelta>> {
        older
            .par_iter()
            .map(|(hash, file)| self.delta_from(hash, file, target))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn compute_deltas(&self, older: &[(String, PathBuf)], target: &str) -> Result<Vec<PendingDelta>> {
        older
            .iter()
            .map(|(hash, file)| self.delta_from(hash, file, target))
            .collect()
    }

    fn delta_from(&self, hash: &str, file: &Path, target: &str) -> Result<PendingDelta> {
        let base = fsio::read_text(file).map_err(StoreError::artifact(file))?;
        Ok((hash.to_string(), self.codec.diff_payload(&base, target)))
    }

    /// Current stored bytes and version, from memory when configured so.
    fn current_content(&self, state: &State, path: &Path, id: &str) -> Option<(Vec<u8>, String)> {
        let version = self.versions.get(path)?;
        if self.config.keep_in_memory
            && let Some(content) = state.contents.get(path)
        {
            return Some((content.clone(), version));
        }
        let file = self.layout.version_path(id, &version);
        match fs::read(&file) {
            Ok(content) => Some((content, version)),
            Err(e) => {
                log::warn!("cannot read {}: {e}", file.display());
                None
            }
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(StoreError::artifact(path))
}

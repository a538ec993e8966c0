//! Diffable: versioned web assets with block-based text deltas.
//!
//! The crate provides:
//! - A rolling-hash block index and delta codec (`hash`, `engine`, `delta`)
//! - A content-addressed resource store that precomputes deltas from every
//!   retained version to the current one (`store`)
//! - A background folder monitor feeding the store (`monitor`)
//! - Typed configuration and the properties text format (`config`,
//!   `properties`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use diffable::engine::DeltaCodec;
//! use diffable::hash::config::HashParams;
//!
//! let codec = DeltaCodec::rolling(3, HashParams::default());
//! let script = codec.diff("abcdef", "defghiabc").unwrap();
//! assert_eq!(script.to_payload(), r#"[3,3,"ghi",0,3,]"#);
//! assert_eq!(script.apply("abcdef").unwrap(), "defghiabc");
//! ```
//!
//! Serving a managed file:
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use diffable::config::DiffableConfig;
//! use diffable::store::{ResourceRequest, VersionMap, VersionedResourceStore};
//!
//! let versions = Arc::new(VersionMap::new());
//! let store = VersionedResourceStore::initialize(
//!     Path::new("/srv/webapp"),
//!     DiffableConfig::default(),
//!     Arc::clone(&versions),
//! )?;
//! store.put(Path::new("/srv/webapp/js/app.js"))?;
//! let id = store.resource_id(Path::new("/srv/webapp/js/app.js")).unwrap_or_default();
//! let response = store.get(&ResourceRequest::parse(&id)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod delta;
pub mod engine;
pub mod hash;
pub mod io;
pub mod monitor;
pub mod properties;
pub mod store;

#[cfg(feature = "cli")]
pub mod cli;

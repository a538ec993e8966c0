use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Store-level failures.
///
/// `Init` and `Config` are fatal at startup. `Artifact` and `NotManaged`
/// concern one resource and leave the store usable.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store root {path} is unusable: {reason}")]
    Init { path: PathBuf, reason: String },
    #[error("artifact error at {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0} is not a managed resource")]
    NotManaged(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StoreError {
    pub(crate) fn artifact(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Artifact { path, source }
    }

    pub(crate) fn init(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StoreError::Init {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

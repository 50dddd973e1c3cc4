//! Local cache resolver
//!
//! When a copy has no destination, the source is materialized under
//! `<cache-root>/<kind>/<relative-address>`. The mapping depends only on the
//! source address, so repeated copies of the same source land in the same
//! place. Entries are never invalidated.

use std::path::{Component, Path, PathBuf};

use crate::error::Result;
use crate::kind::StorageKind;

/// Directory name of the default cache root inside the system temp dir
pub const CACHE_DIR_NAME: &str = "AnyPath";

/// Directory below the cache root holding scratch space for staged copies
const STAGING_DIR_NAME: &str = ".staging";

/// Maps source addresses to stable local cache locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResolver {
    root: PathBuf,
}

impl Default for CacheResolver {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}

impl CacheResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<system temp dir>/AnyPath`
    pub fn default_root() -> PathBuf {
        std::env::temp_dir().join(CACHE_DIR_NAME)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parent of the scratch directories used while staging cross-backend copies
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR_NAME)
    }

    /// Cache location of a source, without touching the filesystem
    ///
    /// Only plain components of `relative` are kept, so the result never
    /// escapes the kind's partition.
    pub fn location(&self, kind: StorageKind, relative: &str) -> PathBuf {
        let mut location = self.root.join(kind.as_str());
        for component in Path::new(relative).components() {
            if let Component::Normal(part) = component {
                location.push(part);
            }
        }
        location
    }

    /// Cache location of a source, creating what the copy needs
    ///
    /// Directory sources get the location itself created, file sources
    /// only its parent.
    pub async fn resolve(&self, kind: StorageKind, relative: &str, is_dir: bool) -> Result<PathBuf> {
        let location = self.location(kind, relative);
        let to_create = if is_dir {
            Some(location.as_path())
        } else {
            location.parent()
        };
        if let Some(dir) = to_create {
            tokio::fs::create_dir_all(dir).await?;
        }
        tracing::debug!(location = %location.display(), "Resolved cache location");
        Ok(location)
    }
}

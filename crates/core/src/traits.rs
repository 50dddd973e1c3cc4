//! Backend traits
//!
//! Two seams separate the engine from concrete stores:
//! - [`PathHandler`] is the capability set every storage kind provides to
//!   [`AnyPath`](crate::AnyPath) and the copy orchestrator.
//! - [`ObjectStore`] is the per-object primitive set an SDK adapter
//!   implements. [`ObjectStoreHandler`](crate::handler::ObjectStoreHandler)
//!   turns any `ObjectStore` into a `PathHandler`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::kind::StorageKind;
use crate::path::RemotePath;

/// Default number of concurrent object transfers within one bulk operation
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Metadata for an object or prefix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key or prefix, relative to the container
    pub key: String,

    /// Size in bytes (None for prefixes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,

    /// Human-readable size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<jiff::Timestamp>,

    /// ETag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Whether this is a directory/prefix
    pub is_dir: bool,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for a file
    pub fn file(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: Some(size),
            size_human: Some(humansize::format_size(size.max(0) as u64, humansize::BINARY)),
            last_modified: None,
            etag: None,
            is_dir: false,
        }
    }

    /// Create a new ObjectInfo for a directory/prefix
    pub fn dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size_bytes: None,
            size_human: None,
            last_modified: None,
            etag: None,
            is_dir: true,
        }
    }
}

/// Result of a list operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResult {
    /// Listed objects
    pub items: Vec<ObjectInfo>,

    /// Whether the result is truncated (more items available)
    pub truncated: bool,

    /// Continuation token for pagination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// Options for list operations
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Maximum number of keys to return per request
    pub max_keys: Option<i32>,

    /// Key prefix to list; the path's key is ignored when set
    pub prefix: Option<String>,

    /// Continuation token for pagination
    pub continuation_token: Option<String>,

    /// Whether to list recursively (no `/` delimiter)
    pub recursive: bool,
}

/// Per-object primitives of a remote store
///
/// Implemented by the SDK adapters; can be replaced by an in-memory store
/// in tests. Missing objects are reported as [`Error::NotFound`](crate::Error::NotFound).
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Get object metadata
    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo>;

    /// List one page of objects under a prefix
    ///
    /// Non-recursive listings group deeper keys into prefixes ending in `/`.
    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult>;

    /// Stream an object into a local file, returning the bytes written
    async fn download_object(&self, path: &RemotePath, destination: &Path) -> Result<u64>;

    /// Upload a local file as an object
    async fn upload_object(&self, source: &Path, path: &RemotePath) -> Result<ObjectInfo>;

    /// Delete a single object
    async fn delete_object(&self, path: &RemotePath) -> Result<()>;

    /// Delete many objects of one container, returning the deleted keys
    async fn delete_objects(&self, container: &RemotePath, keys: Vec<String>) -> Result<Vec<String>> {
        let mut deleted = Vec::with_capacity(keys.len());
        for key in keys {
            self.delete_object(&container.with_key(&key)).await?;
            deleted.push(key);
        }
        Ok(deleted)
    }

    /// Server-side copy of a single object
    async fn copy_object(&self, src: &RemotePath, dst: &RemotePath) -> Result<()>;

    /// Make sure the bucket or container of `path` exists, creating it if needed
    async fn ensure_container(&self, path: &RemotePath) -> Result<()>;
}

/// Knobs shared by every transfer
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Replace destination files that already exist
    pub force_overwrite: bool,
    /// Log every object transfer
    pub verbose: bool,
    /// Maximum concurrent object transfers in one bulk operation
    pub concurrency: usize,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            force_overwrite: true,
            verbose: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl TransferOptions {
    pub fn force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }
}

/// Outcome of a directory download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryDownload {
    /// Local directory the hierarchy was recreated under
    pub root: PathBuf,
    /// Every file materialized below `root`
    pub files: Vec<PathBuf>,
}

/// Capability set of one storage kind
///
/// Every address argument is in the handler's normalized form (see
/// [`PathHandler::normalize`]). Handlers are shared by all paths of a kind.
#[async_trait]
pub trait PathHandler: Send + Sync {
    /// Storage kind served by this handler
    fn kind(&self) -> StorageKind;

    /// Normalize a raw address of this kind
    fn normalize(&self, raw: &str) -> Result<String>;

    /// Whether a file or directory exists at the address
    async fn exists(&self, address: &str) -> Result<bool>;

    /// Whether an object exists at exactly this address
    async fn is_file(&self, address: &str) -> Result<bool>;

    /// Whether anything exists below this address
    async fn is_dir(&self, address: &str) -> Result<bool>;

    /// Direct children: files and immediate subdirectories
    async fn list_children(&self, address: &str) -> Result<Vec<String>>;

    /// Direct children whose name matches a shell-style pattern
    async fn list_matching(&self, address: &str, pattern: &str) -> Result<Vec<String>>;

    /// Files at any depth whose name matches a shell-style pattern
    async fn list_matching_recursive(&self, address: &str, pattern: &str) -> Result<Vec<String>>;

    /// Remove a file, or everything below a directory
    ///
    /// Removing a missing path succeeds unless `strict` is set.
    async fn remove(&self, address: &str, strict: bool) -> Result<()>;

    /// Pull a single file to local disk
    async fn download_file(
        &self,
        source: &str,
        destination: &Path,
        force_overwrite: bool,
    ) -> Result<PathBuf>;

    /// Pull a directory to local disk, recreating its hierarchy
    ///
    /// Returns `None` when the source holds no objects.
    async fn download_directory(
        &self,
        source: &str,
        destination: &Path,
        options: &TransferOptions,
    ) -> Result<Option<DirectoryDownload>>;

    /// Push a single local file
    async fn upload_file(&self, source: &Path, destination: &str) -> Result<()>;

    /// Push a local directory, returning the addresses written
    async fn upload_directory(
        &self,
        source: &Path,
        destination: &str,
        options: &TransferOptions,
    ) -> Result<Vec<String>>;

    /// Copy inside this backend without staging through local disk
    async fn copy_within(
        &self,
        source: &str,
        destination: &str,
        options: &TransferOptions,
    ) -> Result<()>;

    /// Parent address
    fn parent(&self, address: &str) -> String;

    /// Final component
    fn name(&self, address: &str) -> String;

    /// Final component without its extension
    fn stem(&self, address: &str) -> String;

    /// Address of `child` below `address`
    fn join(&self, address: &str, child: &str) -> String;

    /// Address relative to the backend root, used to lay out the local cache
    fn relative_address(&self, address: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_info_file() {
        let info = ObjectInfo::file("test.txt", 1024);
        assert_eq!(info.key, "test.txt");
        assert_eq!(info.size_bytes, Some(1024));
        assert_eq!(info.size_human.as_deref(), Some("1 KiB"));
        assert!(!info.is_dir);
    }

    #[test]
    fn test_object_info_dir() {
        let info = ObjectInfo::dir("path/to/dir/");
        assert_eq!(info.key, "path/to/dir/");
        assert!(info.is_dir);
        assert!(info.size_bytes.is_none());
    }

    #[test]
    fn test_transfer_options_builder() {
        let options = TransferOptions::default()
            .force_overwrite(false)
            .verbose(true)
            .concurrency(0);
        assert!(!options.force_overwrite);
        assert!(options.verbose);
        assert_eq!(options.concurrency, 1);
    }

    #[test]
    fn test_transfer_options_default() {
        let options = TransferOptions::default();
        assert!(options.force_overwrite);
        assert!(!options.verbose);
        assert_eq!(options.concurrency, DEFAULT_CONCURRENCY);
    }
}

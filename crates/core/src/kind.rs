//! Storage kinds and address classification
//!
//! Every address handled by anypath belongs to exactly one [`StorageKind`].
//! [`classify`] decides which one from the address text alone, without any
//! network access.

use serde::{Deserialize, Serialize};
use url::Url;

/// Host suffix of Azure Blob Storage endpoints
pub const BLOB_DOMAIN: &str = "blob.core.windows.net";

/// Host suffix of AWS S3 endpoints
pub const BUCKET_DOMAIN: &str = "amazonaws.com";

/// Native scheme of bucket-store addresses
pub const BUCKET_SCHEME: &str = "s3";

/// The storage system an address lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Local filesystem
    Local,
    /// S3 and S3-compatible bucket stores
    BucketStore,
    /// Azure Blob Storage containers
    BlobContainerStore,
}

impl StorageKind {
    /// All kinds, in declaration order
    pub const ALL: [StorageKind; 3] = [
        StorageKind::Local,
        StorageKind::BucketStore,
        StorageKind::BlobContainerStore,
    ];

    /// Stable lowercase name, used to partition the local cache
    pub const fn as_str(self) -> &'static str {
        match self {
            StorageKind::Local => "local",
            StorageKind::BucketStore => "s3",
            StorageKind::BlobContainerStore => "azure",
        }
    }

    /// Whether this kind is backed by a remote object store
    pub const fn is_remote(self) -> bool {
        !matches!(self, StorageKind::Local)
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a raw address into a storage kind
///
/// Rules, in order:
/// 1. HTTP(S) URL whose host contains the blob domain: blob container store
/// 2. HTTP(S) URL whose host ends in the AWS domain or contains `s3`, or the
///    `s3` scheme: bucket store
/// 3. Anything else, including unknown schemes: local
pub fn classify(address: &str) -> StorageKind {
    let Ok(url) = Url::parse(address) else {
        return StorageKind::Local;
    };

    match url.scheme() {
        "http" | "https" => {
            let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
            if host.contains(BLOB_DOMAIN) {
                StorageKind::BlobContainerStore
            } else if is_bucket_host(&host) {
                StorageKind::BucketStore
            } else {
                StorageKind::Local
            }
        }
        BUCKET_SCHEME => StorageKind::BucketStore,
        _ => StorageKind::Local,
    }
}

/// Whether an HTTP host names an S3 endpoint
///
/// Any `*.amazonaws.com` host, or any host with `s3` anywhere in it. The
/// loose second half is what lets S3-compatible endpoints such as
/// `minio-s3.internal` classify without configuration.
pub(crate) fn is_bucket_host(host: &str) -> bool {
    host.ends_with(BUCKET_DOMAIN) || host.contains(BUCKET_SCHEME)
}

//! Remote address parsing and decomposition
//!
//! Remote addresses are split into account, container and key:
//! - bucket stores: `s3://bucket/key` (account is empty)
//! - blob containers: `https://account.blob.core.windows.net/container/key`
//!
//! All navigation (`parent`, `name`, `join`) works on the key so it never
//! touches the network.

use crate::error::{Error, Result};
use crate::kind::{self, BLOB_DOMAIN, BUCKET_SCHEME, StorageKind};

/// A parsed remote path pointing to an object or a prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePath {
    /// Storage kind this path belongs to
    pub kind: StorageKind,
    /// Storage account (blob containers only, empty for bucket stores)
    pub account: String,
    /// Bucket or container name
    pub container: String,
    /// Object key without leading or trailing separators (empty for container root)
    pub key: String,
}

impl RemotePath {
    /// Create a new RemotePath, cleaning up separators in the key
    pub fn new(
        kind: StorageKind,
        account: impl Into<String>,
        container: impl Into<String>,
        key: impl AsRef<str>,
    ) -> Self {
        Self {
            kind,
            account: account.into(),
            container: container.into(),
            key: clean_key(key.as_ref()),
        }
    }

    /// Parse a remote address
    pub fn parse(address: &str) -> Result<Self> {
        match kind::classify(address) {
            StorageKind::BucketStore => parse_bucket_address(address),
            StorageKind::BlobContainerStore => parse_blob_address(address),
            StorageKind::Local => Err(Error::InvalidPath(format!(
                "'{address}' is not a remote address"
            ))),
        }
    }

    /// Format back into the normalized address
    pub fn to_address(&self) -> String {
        let base = match self.kind {
            StorageKind::BucketStore => format!("{BUCKET_SCHEME}://{}", self.container),
            StorageKind::BlobContainerStore => format!(
                "https://{}.{BLOB_DOMAIN}/{}",
                self.account, self.container
            ),
            StorageKind::Local => return self.key.clone(),
        };
        if self.key.is_empty() {
            base
        } else {
            format!("{base}/{}", self.key)
        }
    }

    /// Address relative to the store: `container/key`
    pub fn relative(&self) -> String {
        if self.key.is_empty() {
            self.container.clone()
        } else {
            format!("{}/{}", self.container, self.key)
        }
    }

    /// Key prefix that selects everything below this path (`key/`)
    pub fn dir_prefix(&self) -> String {
        if self.key.is_empty() {
            String::new()
        } else {
            format!("{}/", self.key)
        }
    }

    /// Same container, different key
    pub fn with_key(&self, key: impl AsRef<str>) -> Self {
        Self::new(self.kind, self.account.clone(), self.container.clone(), key)
    }

    /// Get the parent path (one level up)
    ///
    /// The container root is its own parent.
    pub fn parent(&self) -> Self {
        match self.key.rfind('/') {
            Some(pos) => self.with_key(&self.key[..pos]),
            None => self.with_key(""),
        }
    }

    /// Join a child path component
    pub fn join(&self, child: &str) -> Self {
        let child = clean_key(child);
        if self.key.is_empty() {
            self.with_key(child)
        } else if child.is_empty() {
            self.clone()
        } else {
            self.with_key(format!("{}/{child}", self.key))
        }
    }

    /// Last key segment, or the container name at the container root
    pub fn name(&self) -> &str {
        if self.key.is_empty() {
            &self.container
        } else {
            self.key.rsplit('/').next().unwrap_or(&self.key)
        }
    }

    /// Name without its final extension
    pub fn stem(&self) -> String {
        stem_of(self.name())
    }

    /// Key of `object_key` relative to this path, if it lies below it
    pub fn relative_key<'a>(&self, object_key: &'a str) -> Option<&'a str> {
        if self.key.is_empty() {
            Some(object_key)
        } else {
            object_key.strip_prefix(&self.dir_prefix())
        }
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_address())
    }
}

/// Final component without its extension, with `Path::file_stem` semantics
pub fn stem_of(name: &str) -> String {
    std::path::Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Drop empty segments, which removes doubled, leading and trailing separators
pub(crate) fn clean_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split `scheme://authority/rest` into `(authority, rest)`
///
/// Tolerates a collapsed `scheme:/` marker and repeated slashes.
fn split_authority<'a>(address: &'a str, scheme: &str) -> Option<(&'a str, &'a str)> {
    let rest = address
        .get(..scheme.len() + 1)
        .filter(|prefix| prefix.eq_ignore_ascii_case(&format!("{scheme}:")))
        .map(|_| &address[scheme.len() + 1..])?;
    let rest = rest.trim_start_matches('/');
    match rest.find('/') {
        Some(pos) => Some((&rest[..pos], &rest[pos + 1..])),
        None => Some((rest, "")),
    }
}

fn parse_bucket_address(address: &str) -> Result<RemotePath> {
    let invalid = || Error::InvalidPath(format!("'{address}' does not name a bucket"));

    if let Some((bucket, key)) = split_authority(address, BUCKET_SCHEME) {
        if bucket.is_empty() {
            return Err(invalid());
        }
        return Ok(RemotePath::new(StorageKind::BucketStore, "", bucket, key));
    }

    let (host, path) = split_authority(address, "https")
        .or_else(|| split_authority(address, "http"))
        .ok_or_else(invalid)?;
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
    let labels: Vec<&str> = host.split('.').collect();
    let s3_label = labels
        .iter()
        .position(|label| *label == "s3" || label.starts_with("s3-"));

    match s3_label {
        // Virtual-hosted style: bucket.s3.region.amazonaws.com/key
        Some(pos) if pos > 0 => {
            let bucket = labels[..pos].join(".");
            Ok(RemotePath::new(StorageKind::BucketStore, "", bucket, path))
        }
        // Path style: s3.region.amazonaws.com/bucket/key
        _ => {
            let path = clean_key(path);
            let (bucket, key) = path.split_once('/').unwrap_or((path.as_str(), ""));
            if bucket.is_empty() {
                return Err(invalid());
            }
            Ok(RemotePath::new(StorageKind::BucketStore, "", bucket, key))
        }
    }
}

fn parse_blob_address(address: &str) -> Result<RemotePath> {
    let invalid = || Error::InvalidPath(format!("'{address}' does not name a blob container"));

    let (host, path) = split_authority(address, "https")
        .or_else(|| split_authority(address, "http"))
        .ok_or_else(invalid)?;
    let account = host.split('.').next().unwrap_or_default();
    let path = clean_key(path);
    let (container, key) = path.split_once('/').unwrap_or((path.as_str(), ""));
    if account.is_empty() || container.is_empty() {
        return Err(invalid());
    }
    Ok(RemotePath::new(
        StorageKind::BlobContainerStore,
        account,
        container,
        key,
    ))
}

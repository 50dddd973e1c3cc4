//! The unified path type

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::copy;
use crate::error::Result;
use crate::kind::{self, StorageKind};
use crate::registry::HandlerRegistry;
use crate::traits::{PathHandler, TransferOptions};

/// A path on the local filesystem or in a remote object store
///
/// Construction classifies and normalizes the address once. Every operation
/// is delegated to the handler registered for the path's kind. Two paths are
/// equal when their normalized addresses are equal.
#[derive(Clone)]
pub struct AnyPath {
    address: String,
    kind: StorageKind,
    handler: Arc<dyn PathHandler>,
    registry: Arc<HandlerRegistry>,
}

impl AnyPath {
    /// Classify and normalize a raw address
    pub fn new(address: &str, registry: &Arc<HandlerRegistry>) -> Result<Self> {
        Self::with_kind(address, kind::classify(address), registry)
    }

    /// A local path, skipping classification
    pub fn from_local(path: &Path, registry: &Arc<HandlerRegistry>) -> Result<Self> {
        Self::with_kind(&path.to_string_lossy(), StorageKind::Local, registry)
    }

    fn with_kind(address: &str, kind: StorageKind, registry: &Arc<HandlerRegistry>) -> Result<Self> {
        let handler = registry.handler(kind)?;
        let address = handler.normalize(address)?;
        Ok(Self {
            address,
            kind,
            handler,
            registry: Arc::clone(registry),
        })
    }

    /// Another path of the same kind; `address` is already normalized
    fn derive(&self, address: String) -> Self {
        Self {
            address,
            kind: self.kind,
            handler: Arc::clone(&self.handler),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Normalized address
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub fn is_local(&self) -> bool {
        self.kind == StorageKind::Local
    }

    /// Filesystem path, for local paths only
    pub fn local_path(&self) -> Option<PathBuf> {
        self.is_local().then(|| PathBuf::from(&self.address))
    }

    pub(crate) fn handler(&self) -> &dyn PathHandler {
        self.handler.as_ref()
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub async fn exists(&self) -> Result<bool> {
        self.handler.exists(&self.address).await
    }

    pub async fn is_file(&self) -> Result<bool> {
        self.handler.is_file(&self.address).await
    }

    pub async fn is_dir(&self) -> Result<bool> {
        self.handler.is_dir(&self.address).await
    }

    /// Direct children, files and immediate subdirectories
    pub async fn list_children(&self) -> Result<Vec<AnyPath>> {
        Ok(self
            .handler
            .list_children(&self.address)
            .await?
            .into_iter()
            .map(|child| self.derive(child))
            .collect())
    }

    /// Direct children whose name matches `pattern`
    pub async fn glob(&self, pattern: &str) -> Result<Vec<AnyPath>> {
        Ok(self
            .handler
            .list_matching(&self.address, pattern)
            .await?
            .into_iter()
            .map(|child| self.derive(child))
            .collect())
    }

    /// Files at any depth whose name matches `pattern`
    pub async fn rglob(&self, pattern: &str) -> Result<Vec<AnyPath>> {
        Ok(self
            .handler
            .list_matching_recursive(&self.address, pattern)
            .await?
            .into_iter()
            .map(|child| self.derive(child))
            .collect())
    }

    /// Remove this file or directory
    ///
    /// Missing paths are ignored unless `strict` is set.
    pub async fn remove(&self, strict: bool) -> Result<()> {
        self.handler.remove(&self.address, strict).await
    }

    pub fn parent(&self) -> AnyPath {
        self.derive(self.handler.parent(&self.address))
    }

    pub fn name(&self) -> String {
        self.handler.name(&self.address)
    }

    pub fn stem(&self) -> String {
        self.handler.stem(&self.address)
    }

    pub fn join(&self, child: &str) -> AnyPath {
        self.derive(self.handler.join(&self.address, child))
    }

    /// Address relative to the backend root
    pub fn relative_address(&self) -> String {
        self.handler.relative_address(&self.address)
    }

    /// Copy with the registry's default transfer options
    ///
    /// Without a target the source lands in the local cache.
    pub async fn copy(&self, target: Option<&AnyPath>) -> Result<AnyPath> {
        let options = self.registry.transfer_options().clone();
        copy::copy(self, target, &options).await
    }

    pub async fn copy_with(
        &self,
        target: Option<&AnyPath>,
        options: &TransferOptions,
    ) -> Result<AnyPath> {
        copy::copy(self, target, options).await
    }
}

impl PartialEq for AnyPath {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for AnyPath {}

impl Hash for AnyPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl std::fmt::Debug for AnyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyPath")
            .field("address", &self.address)
            .field("kind", &self.kind)
            .finish()
    }
}

impl std::fmt::Display for AnyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}

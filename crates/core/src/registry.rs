//! Handler registry
//!
//! Holds exactly one handler per storage kind, shared by every [`AnyPath`]
//! of that kind, along with the cache resolver and transfer defaults used
//! by copies.

use std::sync::Arc;

use crate::anypath::AnyPath;
use crate::cache::CacheResolver;
use crate::error::{Error, Result};
use crate::handler::LocalHandler;
use crate::kind::StorageKind;
use crate::traits::{PathHandler, TransferOptions};

/// Dispatch table from storage kind to handler
pub struct HandlerRegistry {
    local: Arc<dyn PathHandler>,
    bucket_store: Option<Arc<dyn PathHandler>>,
    blob_container_store: Option<Arc<dyn PathHandler>>,
    cache: CacheResolver,
    transfer_options: TransferOptions,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("bucket_store", &self.bucket_store.is_some())
            .field("blob_container_store", &self.blob_container_store.is_some())
            .field("cache", &self.cache)
            .field("transfer_options", &self.transfer_options)
            .finish()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    /// Registry serving local paths only
    pub fn new() -> Self {
        Self {
            local: Arc::new(LocalHandler::new()),
            bucket_store: None,
            blob_container_store: None,
            cache: CacheResolver::default(),
            transfer_options: TransferOptions::default(),
        }
    }

    /// Register the handler for a kind, replacing any previous one
    pub fn with_handler(mut self, handler: Arc<dyn PathHandler>) -> Self {
        match handler.kind() {
            StorageKind::Local => self.local = handler,
            StorageKind::BucketStore => self.bucket_store = Some(handler),
            StorageKind::BlobContainerStore => self.blob_container_store = Some(handler),
        }
        self
    }

    pub fn with_cache(mut self, cache: CacheResolver) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_transfer_options(mut self, options: TransferOptions) -> Self {
        self.transfer_options = options;
        self
    }

    /// Handler for a kind
    ///
    /// Fails with [`Error::UnsupportedFeature`] when no backend was registered.
    pub fn handler(&self, kind: StorageKind) -> Result<Arc<dyn PathHandler>> {
        let handler = match kind {
            StorageKind::Local => Some(&self.local),
            StorageKind::BucketStore => self.bucket_store.as_ref(),
            StorageKind::BlobContainerStore => self.blob_container_store.as_ref(),
        };
        handler.cloned().ok_or_else(|| {
            Error::UnsupportedFeature(format!("No backend registered for {kind} paths"))
        })
    }

    pub fn cache(&self) -> &CacheResolver {
        &self.cache
    }

    /// Transfer options used when a caller has none of its own
    pub fn transfer_options(&self) -> &TransferOptions {
        &self.transfer_options
    }

    /// Construct a path from a raw address
    pub fn path(self: &Arc<Self>, address: &str) -> Result<AnyPath> {
        AnyPath::new(address, self)
    }
}

//! Handler registry construction from configuration

use std::sync::Arc;

use ap_azure::BlobClient;
use ap_core::{
    CacheResolver, Config, HandlerRegistry, ObjectStoreHandler, StorageKind, TransferOptions,
};
use ap_s3::S3Client;

/// Registry with every backend registered
///
/// SDK clients are built lazily, so this does no I/O and needs no credentials.
pub fn build_registry(config: &Config) -> HandlerRegistry {
    let cache = config
        .defaults
        .cache_root
        .clone()
        .map(CacheResolver::new)
        .unwrap_or_default();

    let s3 = ObjectStoreHandler::new(StorageKind::BucketStore, S3Client::new(config.s3.clone()));
    let azure = ObjectStoreHandler::new(
        StorageKind::BlobContainerStore,
        BlobClient::new(config.azure.clone()),
    );

    tracing::debug!(cache = %cache.root().display(), "Building handler registry");

    HandlerRegistry::new()
        .with_handler(Arc::new(s3))
        .with_handler(Arc::new(azure))
        .with_cache(cache)
        .with_transfer_options(TransferOptions::default().concurrency(config.defaults.concurrency))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_core::PathHandler as _;

    #[test]
    fn test_all_kinds_registered() {
        let registry = build_registry(&Config::default());
        for kind in StorageKind::ALL {
            let handler = registry.handler(kind).unwrap();
            assert_eq!(handler.kind(), kind);
        }
    }

    #[test]
    fn test_config_applied() {
        let mut config = Config::default();
        config.defaults.cache_root = Some("/var/cache/anypath".into());
        config.defaults.concurrency = 3;

        let registry = build_registry(&config);
        assert_eq!(
            registry.cache().root(),
            std::path::Path::new("/var/cache/anypath")
        );
        assert_eq!(registry.transfer_options().concurrency, 3);
    }
}

//! ap-core: Core library for anypath
//!
//! This crate provides the storage-independent part of anypath, including:
//! - Address classification into storage kinds
//! - The `AnyPath` type and the handler registry it dispatches through
//! - The `PathHandler` and `ObjectStore` traits backends implement
//! - Local filesystem handling and a generic object-store handler
//! - Copy orchestration, the local cache and the bulk transfer pool
//! - Configuration management
//!
//! This crate is designed to be independent of any specific cloud SDK;
//! the S3 and Azure adapters live in their own crates.

pub mod anypath;
pub mod cache;
pub mod config;
pub mod copy;
pub mod error;
pub mod handler;
pub mod kind;
pub mod path;
pub mod pool;
pub mod registry;
pub mod traits;

#[cfg(test)]
mod testing;

pub use anypath::AnyPath;
pub use cache::CacheResolver;
pub use config::{Config, ConfigManager};
pub use copy::{TransferPlan, TransferStrategy};
pub use error::{Error, Result, TransferFailure};
pub use handler::{LocalHandler, ObjectStoreHandler};
pub use kind::{StorageKind, classify};
pub use path::RemotePath;
pub use pool::{TransferJob, TransferPool};
pub use registry::HandlerRegistry;
pub use traits::{
    DirectoryDownload, ListOptions, ListResult, ObjectInfo, ObjectStore, PathHandler,
    TransferOptions,
};

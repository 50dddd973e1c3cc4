//! ap-azure: Azure Blob Storage adapter for anypath
//!
//! This crate provides the implementation of the ObjectStore trait on top
//! of the `object_store` crate's Azure client, with the Azure storage SDK
//! used for creating containers. It is the only crate that talks to Azure.

pub mod client;
mod container;

pub use client::BlobClient;

//! Path handler for remote object stores
//!
//! Object stores have no directories. A path is a file when an object with
//! exactly its key exists, and a directory when any object lives below
//! `key/`. Everything here is expressed through [`ObjectStore`], so the same
//! handler serves every remote kind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::{compile_pattern, log_transfer, to_key, walk_local};
use crate::error::{Error, Result};
use crate::kind::StorageKind;
use crate::path::RemotePath;
use crate::pool::{TransferJob, TransferPool};
use crate::traits::{
    DirectoryDownload, ListOptions, ObjectInfo, ObjectStore, PathHandler, TransferOptions,
};

/// [`PathHandler`] for one remote storage kind backed by an [`ObjectStore`]
pub struct ObjectStoreHandler<S: ObjectStore> {
    kind: StorageKind,
    store: Arc<S>,
}

impl<S: ObjectStore> std::fmt::Debug for ObjectStoreHandler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreHandler")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<S: ObjectStore> ObjectStoreHandler<S> {
    pub fn new(kind: StorageKind, store: S) -> Self {
        Self::from_shared(kind, Arc::new(store))
    }

    pub fn from_shared(kind: StorageKind, store: Arc<S>) -> Self {
        Self { kind, store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Parse an address and check it belongs to this handler's kind
    fn remote(&self, address: &str) -> Result<RemotePath> {
        let path = RemotePath::parse(address)?;
        if path.kind != self.kind {
            return Err(Error::InvalidPath(format!(
                "'{address}' is a {} address, expected {}",
                path.kind, self.kind
            )));
        }
        Ok(path)
    }

    /// Apply a pure transformation, leaving unparsable addresses untouched
    fn map_remote(&self, address: &str, f: impl FnOnce(RemotePath) -> String) -> String {
        self.remote(address)
            .map(f)
            .unwrap_or_else(|_| address.to_string())
    }

    async fn object_exists(&self, path: &RemotePath) -> Result<bool> {
        if path.key.is_empty() {
            return Ok(false);
        }
        match self.store.head_object(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn has_objects_below(&self, path: &RemotePath) -> Result<bool> {
        let options = ListOptions {
            prefix: Some(path.dir_prefix()),
            max_keys: Some(1),
            recursive: true,
            ..Default::default()
        };
        match self.store.list_objects(path, options).await {
            Ok(page) => Ok(!page.items.is_empty()),
            // A missing bucket or container holds nothing
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Every entry below `path`, following continuation tokens
    async fn list_all(&self, path: &RemotePath, recursive: bool) -> Result<Vec<ObjectInfo>> {
        let mut items = Vec::new();
        let mut continuation_token = None;
        loop {
            let options = ListOptions {
                prefix: Some(path.dir_prefix()),
                continuation_token: continuation_token.take(),
                recursive,
                ..Default::default()
            };
            let page = match self.store.list_objects(path, options).await {
                Ok(page) => page,
                Err(e) if e.is_not_found() => break,
                Err(e) => return Err(e),
            };
            items.extend(page.items);
            match page.continuation_token {
                Some(token) if page.truncated => continuation_token = Some(token),
                _ => break,
            }
        }
        Ok(items)
    }

    /// Keys of every file object below `path`
    async fn file_keys_below(&self, path: &RemotePath) -> Result<Vec<String>> {
        Ok(self
            .list_all(path, true)
            .await?
            .into_iter()
            .filter(|info| !info.is_dir && !info.key.ends_with('/'))
            .filter(|info| path.relative_key(&info.key).is_some_and(|rel| !rel.is_empty()))
            .map(|info| info.key)
            .collect())
    }
}

async fn download_object<S: ObjectStore>(
    store: &S,
    source: &RemotePath,
    destination: &Path,
    force_overwrite: bool,
    verbose: bool,
) -> Result<PathBuf> {
    if !force_overwrite && tokio::fs::try_exists(destination).await? {
        tracing::debug!(destination = %destination.display(), "Destination exists, skipping");
        return Ok(destination.to_path_buf());
    }
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    store.download_object(source, destination).await?;
    log_transfer(verbose, &source.to_address(), &destination.to_string_lossy());
    Ok(destination.to_path_buf())
}

#[async_trait]
impl<S: ObjectStore> PathHandler for ObjectStoreHandler<S> {
    fn kind(&self) -> StorageKind {
        self.kind
    }

    fn normalize(&self, raw: &str) -> Result<String> {
        Ok(self.remote(raw)?.to_address())
    }

    async fn exists(&self, address: &str) -> Result<bool> {
        let path = self.remote(address)?;
        Ok(self.object_exists(&path).await? || self.has_objects_below(&path).await?)
    }

    async fn is_file(&self, address: &str) -> Result<bool> {
        let path = self.remote(address)?;
        self.object_exists(&path).await
    }

    async fn is_dir(&self, address: &str) -> Result<bool> {
        let path = self.remote(address)?;
        Ok(!self.object_exists(&path).await? && self.has_objects_below(&path).await?)
    }

    async fn list_children(&self, address: &str) -> Result<Vec<String>> {
        let path = self.remote(address)?;
        let mut children: Vec<String> = self
            .list_all(&path, false)
            .await?
            .into_iter()
            .filter(|info| {
                path.relative_key(&info.key)
                    .is_some_and(|rel| !rel.trim_end_matches('/').is_empty())
            })
            .map(|info| path.with_key(&info.key).to_address())
            .collect();
        children.sort();
        children.dedup();
        Ok(children)
    }

    async fn list_matching(&self, address: &str, pattern: &str) -> Result<Vec<String>> {
        let pattern = compile_pattern(pattern)?;
        Ok(self
            .list_children(address)
            .await?
            .into_iter()
            .filter(|child| pattern.matches(&self.name(child)))
            .collect())
    }

    async fn list_matching_recursive(&self, address: &str, pattern: &str) -> Result<Vec<String>> {
        let pattern = compile_pattern(pattern)?;
        let path = self.remote(address)?;
        let mut matches: Vec<String> = self
            .file_keys_below(&path)
            .await?
            .into_iter()
            .map(|key| path.with_key(key))
            .filter(|file| pattern.matches(file.name()))
            .map(|file| file.to_address())
            .collect();
        matches.sort();
        Ok(matches)
    }

    async fn remove(&self, address: &str, strict: bool) -> Result<()> {
        let path = self.remote(address)?;
        let mut keys = Vec::new();
        if self.object_exists(&path).await? {
            keys.push(path.key.clone());
        }
        keys.extend(self.file_keys_below(&path).await?);

        if keys.is_empty() {
            if strict {
                return Err(Error::NotFound(address.to_string()));
            }
            tracing::debug!(address, "Nothing to remove");
            return Ok(());
        }

        let requested = keys.len();
        let deleted = self.store.delete_objects(&path, keys).await?;
        tracing::debug!(address, requested, deleted = deleted.len(), "Removed objects");
        Ok(())
    }

    async fn download_file(
        &self,
        source: &str,
        destination: &Path,
        force_overwrite: bool,
    ) -> Result<PathBuf> {
        let path = self.remote(source)?;
        download_object(self.store.as_ref(), &path, destination, force_overwrite, false).await
    }

    async fn download_directory(
        &self,
        source: &str,
        destination: &Path,
        options: &TransferOptions,
    ) -> Result<Option<DirectoryDownload>> {
        let path = self.remote(source)?;
        let keys = self.file_keys_below(&path).await?;
        if keys.is_empty() {
            return Ok(None);
        }

        tokio::fs::create_dir_all(destination).await?;
        let jobs: Vec<_> = keys
            .iter()
            .filter_map(|key| {
                let relative = path.relative_key(key)?;
                let object = path.with_key(key);
                let local = destination.join(relative);
                Some(TransferJob::new(object.to_address(), (object, local)))
            })
            .collect();

        let store = Arc::clone(&self.store);
        let force_overwrite = options.force_overwrite;
        let verbose = options.verbose;
        let mut files = TransferPool::new(options.concurrency)
            .run(jobs, move |(object, local): (RemotePath, PathBuf)| {
                let store = Arc::clone(&store);
                async move {
                    download_object(store.as_ref(), &object, &local, force_overwrite, verbose).await
                }
            })
            .await?;
        files.sort();

        Ok(Some(DirectoryDownload {
            root: destination.to_path_buf(),
            files,
        }))
    }

    async fn upload_file(&self, source: &Path, destination: &str) -> Result<()> {
        let path = self.remote(destination)?;
        self.store.ensure_container(&path).await?;
        self.store.upload_object(source, &path).await?;
        log_transfer(false, &source.to_string_lossy(), destination);
        Ok(())
    }

    async fn upload_directory(
        &self,
        source: &Path,
        destination: &str,
        options: &TransferOptions,
    ) -> Result<Vec<String>> {
        let path = self.remote(destination)?;
        self.store.ensure_container(&path).await?;

        let tree = walk_local(source).await?;
        let jobs: Vec<_> = tree
            .files
            .iter()
            .map(|relative| {
                let local = source.join(relative);
                let label = local.to_string_lossy().into_owned();
                TransferJob::new(label, (local, path.join(&to_key(relative))))
            })
            .collect();

        let store = Arc::clone(&self.store);
        let verbose = options.verbose;
        let mut uploaded = TransferPool::new(options.concurrency)
            .run(jobs, move |(local, object): (PathBuf, RemotePath)| {
                let store = Arc::clone(&store);
                async move {
                    store.upload_object(&local, &object).await?;
                    let address = object.to_address();
                    log_transfer(verbose, &local.to_string_lossy(), &address);
                    Ok(address)
                }
            })
            .await?;
        uploaded.sort();
        Ok(uploaded)
    }

    async fn copy_within(
        &self,
        source: &str,
        destination: &str,
        options: &TransferOptions,
    ) -> Result<()> {
        let from = self.remote(source)?;
        let to = self.remote(destination)?;
        self.store.ensure_container(&to).await?;

        if self.object_exists(&from).await? {
            self.store.copy_object(&from, &to).await?;
            log_transfer(options.verbose, source, destination);
            return Ok(());
        }

        let jobs: Vec<_> = self
            .file_keys_below(&from)
            .await?
            .iter()
            .filter_map(|key| {
                let relative = from.relative_key(key)?;
                let object = from.with_key(key);
                Some(TransferJob::new(object.to_address(), (object, to.join(relative))))
            })
            .collect();

        let store = Arc::clone(&self.store);
        let verbose = options.verbose;
        TransferPool::new(options.concurrency)
            .run(jobs, move |(object, target): (RemotePath, RemotePath)| {
                let store = Arc::clone(&store);
                async move {
                    store.copy_object(&object, &target).await?;
                    log_transfer(verbose, &object.to_address(), &target.to_address());
                    Ok(())
                }
            })
            .await?;
        Ok(())
    }

    fn parent(&self, address: &str) -> String {
        self.map_remote(address, |path| path.parent().to_address())
    }

    fn name(&self, address: &str) -> String {
        self.map_remote(address, |path| path.name().to_string())
    }

    fn stem(&self, address: &str) -> String {
        self.map_remote(address, |path| path.stem())
    }

    fn join(&self, address: &str, child: &str) -> String {
        self.map_remote(address, |path| path.join(child).to_address())
    }

    fn relative_address(&self, address: &str) -> String {
        self.map_remote(address, |path| path.relative())
    }
}

//! In-memory object store for unit tests

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::path::RemotePath;
use crate::traits::{ListOptions, ListResult, ObjectInfo, ObjectStore};

/// Flat key space per container, listed the way S3 lists with a `/` delimiter
pub(crate) struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    containers: Mutex<BTreeSet<String>>,
    failing: Mutex<HashSet<String>>,
    copies: AtomicUsize,
    page_size: usize,
    strict_containers: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            containers: Mutex::new(BTreeSet::new()),
            failing: Mutex::new(HashSet::new()),
            copies: AtomicUsize::new(0),
            page_size: 1000,
            strict_containers: false,
        }
    }

    /// Answer `NotFound` for heads and listings in unknown containers, as S3 does
    pub fn with_strict_containers(mut self) -> Self {
        self.strict_containers = true;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn insert(&self, container: &str, key: &str, data: &[u8]) {
        self.containers.lock().unwrap().insert(container.to_string());
        self.objects
            .lock()
            .unwrap()
            .insert((container.to_string(), key.to_string()), data.to_vec());
    }

    pub fn read(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    /// Make every transfer touching `key` fail
    pub fn fail_on(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn copy_count(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    pub fn has_container(&self, container: &str) -> bool {
        self.containers.lock().unwrap().contains(container)
    }

    fn check_container(&self, path: &RemotePath) -> Result<()> {
        if self.strict_containers && !self.has_container(&path.container) {
            return Err(Error::NotFound(path.to_string()));
        }
        Ok(())
    }

    fn check_failure(&self, path: &RemotePath) -> Result<()> {
        if self.failing.lock().unwrap().contains(&path.key) {
            return Err(Error::Transfer(format!("injected failure for {path}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo> {
        self.check_container(path)?;
        self.objects
            .lock()
            .unwrap()
            .get(&(path.container.clone(), path.key.clone()))
            .map(|data| ObjectInfo::file(path.key.clone(), data.len() as i64))
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        self.check_container(path)?;
        let prefix = options.prefix.unwrap_or_else(|| path.dir_prefix());
        let mut entries: Vec<ObjectInfo> = Vec::new();
        for ((container, key), data) in self.objects.lock().unwrap().iter() {
            if container != &path.container || !key.starts_with(&prefix) {
                continue;
            }
            let rest = &key[prefix.len()..];
            match rest.find('/') {
                Some(pos) if !options.recursive => {
                    let dir = format!("{prefix}{}", &rest[..=pos]);
                    if entries.last().is_none_or(|last| last.key != dir) {
                        entries.push(ObjectInfo::dir(dir));
                    }
                }
                _ => entries.push(ObjectInfo::file(key.clone(), data.len() as i64)),
            }
        }

        let start: usize = options
            .continuation_token
            .as_deref()
            .and_then(|token| token.parse().ok())
            .unwrap_or(0);
        let limit = options
            .max_keys
            .map(|n| n as usize)
            .unwrap_or(self.page_size)
            .min(self.page_size);
        let end = (start + limit).min(entries.len());
        let truncated = end < entries.len();

        Ok(ListResult {
            items: entries.get(start..end).map(<[_]>::to_vec).unwrap_or_default(),
            truncated,
            continuation_token: truncated.then(|| end.to_string()),
        })
    }

    async fn download_object(&self, path: &RemotePath, destination: &Path) -> Result<u64> {
        self.check_failure(path)?;
        let data = self
            .read(&path.container, &path.key)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        tokio::fs::write(destination, &data).await?;
        Ok(data.len() as u64)
    }

    async fn upload_object(&self, source: &Path, path: &RemotePath) -> Result<ObjectInfo> {
        self.check_failure(path)?;
        let data = tokio::fs::read(source).await?;
        self.insert(&path.container, &path.key, &data);
        Ok(ObjectInfo::file(path.key.clone(), data.len() as i64))
    }

    async fn delete_object(&self, path: &RemotePath) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(&(path.container.clone(), path.key.clone()));
        Ok(())
    }

    async fn copy_object(&self, src: &RemotePath, dst: &RemotePath) -> Result<()> {
        self.check_failure(src)?;
        self.copies.fetch_add(1, Ordering::SeqCst);
        let data = self
            .read(&src.container, &src.key)
            .ok_or_else(|| Error::NotFound(src.to_string()))?;
        self.insert(&dst.container, &dst.key, &data);
        Ok(())
    }

    async fn ensure_container(&self, path: &RemotePath) -> Result<()> {
        self.containers.lock().unwrap().insert(path.container.clone());
        Ok(())
    }
}

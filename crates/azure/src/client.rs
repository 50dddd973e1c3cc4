//! Azure Blob Storage client implementation
//!
//! Wraps `object_store`'s Azure client and implements the ObjectStore trait
//! from ap-core. `object_store` binds one client to one container, so a
//! client is built per (account, container) on first use and cached.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::azure::{MicrosoftAzure, MicrosoftAzureBuilder};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore as _, PutPayload, WriteMultipart};
use object_store::{GetResult, MultipartUpload};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use ap_core::config::AzureSettings;
use ap_core::{Error, ListOptions, ListResult, ObjectInfo, ObjectStore, RemotePath, Result};

use crate::container::{self, Credentials};

/// Files above this size are streamed as block-list uploads (64 MiB)
const MULTIPART_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Read buffer for streamed uploads (8 MiB)
const UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Blocks in flight per streamed upload
const UPLOAD_CONCURRENCY: usize = 4;

type ContainerKey = (String, String);

/// Azure Blob Storage client wrapper
pub struct BlobClient {
    settings: AzureSettings,
    containers: Mutex<HashMap<ContainerKey, Arc<MicrosoftAzure>>>,
    /// Containers known to exist
    ready: Mutex<HashSet<ContainerKey>>,
}

impl std::fmt::Debug for BlobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobClient")
            .field("endpoint", &self.settings.endpoint)
            .field("allow_http", &self.settings.allow_http)
            .finish_non_exhaustive()
    }
}

impl BlobClient {
    /// Create a client from settings; credentials come from the `AZURE_*` environment
    pub fn new(settings: AzureSettings) -> Self {
        Self {
            settings,
            containers: Mutex::new(HashMap::new()),
            ready: Mutex::new(HashSet::new()),
        }
    }

    /// Number of container clients built so far
    pub fn cached_containers(&self) -> usize {
        self.containers.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Client bound to the container of `path`, built on first use
    fn container(&self, path: &RemotePath) -> Result<Arc<MicrosoftAzure>> {
        let key = (path.account.clone(), path.container.clone());
        let mut containers = self
            .containers
            .lock()
            .map_err(|_| Error::General("Azure client cache poisoned".into()))?;
        if let Some(client) = containers.get(&key) {
            return Ok(Arc::clone(client));
        }

        let mut builder = MicrosoftAzureBuilder::from_env()
            .with_account(&path.account)
            .with_container_name(&path.container)
            .with_allow_http(self.settings.allow_http);
        if let Some(endpoint) = &self.settings.endpoint {
            builder = builder.with_endpoint(endpoint.clone());
        }
        let client = Arc::new(builder.build().map_err(|e| {
            Error::Config(format!(
                "Cannot create Azure client for {}/{}: {e}",
                path.account, path.container
            ))
        })?);

        tracing::debug!(
            account = %path.account,
            container = %path.container,
            "Initialized Azure container client"
        );
        containers.insert(key, Arc::clone(&client));
        Ok(client)
    }
}

/// Translate an object_store failure into an ap-core error
///
/// Listing a missing container surfaces as a generic failure carrying the
/// service's `ContainerNotFound` code.
fn map_store_error(err: object_store::Error, target: &str) -> Error {
    match err {
        object_store::Error::NotFound { .. } => Error::NotFound(target.to_string()),
        object_store::Error::Unauthenticated { .. } | object_store::Error::PermissionDenied { .. } => {
            Error::Auth(format!("{target}: {err}"))
        }
        other if other.to_string().contains("ContainerNotFound") => {
            Error::NotFound(target.to_string())
        }
        other => Error::Transfer(format!("{target}: {other}")),
    }
}

/// Stream a downloaded object into a multipart upload, one chunk at a time
///
/// The upload is aborted when either side fails. Returns the bytes written.
async fn stream_into(
    download: GetResult,
    upload: Box<dyn MultipartUpload>,
    from: &str,
    to: &str,
) -> Result<u64> {
    let mut writer = WriteMultipart::new_with_chunk_size(upload, UPLOAD_CHUNK_SIZE);
    let mut stream = download.into_stream();
    let mut written = 0u64;

    let outcome: Result<()> = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_store_error(e, from))?;
            writer
                .wait_for_capacity(UPLOAD_CONCURRENCY)
                .await
                .map_err(|e| map_store_error(e, to))?;
            writer.write(&chunk);
            written += chunk.len() as u64;
        }
        Ok(())
    }
    .await;

    match outcome {
        Ok(()) => {
            writer.finish().await.map_err(|e| map_store_error(e, to))?;
            Ok(written)
        }
        Err(e) => {
            if let Err(abort) = writer.abort().await {
                tracing::warn!(object = %to, error = %abort, "Failed to abort upload");
            }
            Err(e)
        }
    }
}

fn object_path(key: &str) -> ObjectPath {
    ObjectPath::from(key)
}

fn to_object_info(meta: &ObjectMeta) -> ObjectInfo {
    let mut info = ObjectInfo::file(meta.location.to_string(), meta.size as i64);
    info.last_modified =
        jiff::Timestamp::from_millisecond(meta.last_modified.timestamp_millis()).ok();
    info.etag = meta.e_tag.clone();
    info
}

/// Listing prefix as an object_store path, `None` for the container root
fn list_prefix(path: &RemotePath, options: &ListOptions) -> Option<ObjectPath> {
    let prefix = options.prefix.clone().unwrap_or_else(|| path.dir_prefix());
    let prefix = prefix.trim_end_matches('/');
    (!prefix.is_empty()).then(|| object_path(prefix))
}

#[async_trait]
impl ObjectStore for BlobClient {
    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo> {
        let meta = self
            .container(path)?
            .head(&object_path(&path.key))
            .await
            .map_err(|e| map_store_error(e, &path.to_string()))?;
        Ok(to_object_info(&meta))
    }

    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        let store = self.container(path)?;
        let prefix = list_prefix(path, &options);
        let target = path.to_string();

        let items = if options.recursive {
            let limit = options.max_keys.map_or(usize::MAX, |n| n.max(0) as usize);
            store
                .list(prefix.as_ref())
                .take(limit)
                .map_ok(|meta| to_object_info(&meta))
                .try_collect::<Vec<_>>()
                .await
                .map_err(|e| map_store_error(e, &target))?
        } else {
            let listing = store
                .list_with_delimiter(prefix.as_ref())
                .await
                .map_err(|e| map_store_error(e, &target))?;
            listing
                .common_prefixes
                .iter()
                .map(|dir| ObjectInfo::dir(format!("{dir}/")))
                .chain(listing.objects.iter().map(to_object_info))
                .collect()
        };

        // object_store follows continuation tokens internally
        Ok(ListResult {
            items,
            truncated: false,
            continuation_token: None,
        })
    }

    async fn download_object(&self, path: &RemotePath, destination: &Path) -> Result<u64> {
        let target = path.to_string();
        let response = self
            .container(path)?
            .get(&object_path(&path.key))
            .await
            .map_err(|e| map_store_error(e, &target))?;

        let mut stream = response.into_stream();
        let mut file = tokio::fs::File::create(destination).await?;
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_store_error(e, &target))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    async fn upload_object(&self, source: &Path, path: &RemotePath) -> Result<ObjectInfo> {
        let store = self.container(path)?;
        let location = object_path(&path.key);
        let target = path.to_string();
        let size = tokio::fs::metadata(source).await?.len();

        let result = if size > MULTIPART_THRESHOLD {
            let upload = store
                .put_multipart(&location)
                .await
                .map_err(|e| map_store_error(e, &target))?;
            let mut writer = WriteMultipart::new(upload);
            let mut file = tokio::fs::File::open(source).await?;
            let mut buffer = vec![0u8; UPLOAD_CHUNK_SIZE];
            loop {
                let read = file.read(&mut buffer).await?;
                if read == 0 {
                    break;
                }
                writer
                    .wait_for_capacity(UPLOAD_CONCURRENCY)
                    .await
                    .map_err(|e| map_store_error(e, &target))?;
                writer.write(&buffer[..read]);
            }
            writer
                .finish()
                .await
                .map_err(|e| map_store_error(e, &target))?
        } else {
            let data = Bytes::from(tokio::fs::read(source).await?);
            store
                .put(&location, PutPayload::from(data))
                .await
                .map_err(|e| map_store_error(e, &target))?
        };

        let mut info = ObjectInfo::file(&path.key, size as i64);
        info.etag = result.e_tag;
        info.last_modified = Some(jiff::Timestamp::now());
        Ok(info)
    }

    async fn delete_object(&self, path: &RemotePath) -> Result<()> {
        self.container(path)?
            .delete(&object_path(&path.key))
            .await
            .map_err(|e| map_store_error(e, &path.to_string()))
    }

    async fn copy_object(&self, src: &RemotePath, dst: &RemotePath) -> Result<()> {
        let source = self.container(src)?;
        let from = object_path(&src.key);
        let to = object_path(&dst.key);

        if src.account == dst.account && src.container == dst.container {
            return source
                .copy(&from, &to)
                .await
                .map_err(|e| map_store_error(e, &src.to_string()));
        }

        // No server-side copy across containers through object_store
        let download = source
            .get(&from)
            .await
            .map_err(|e| map_store_error(e, &src.to_string()))?;
        let upload = self
            .container(dst)?
            .put_multipart(&to)
            .await
            .map_err(|e| map_store_error(e, &dst.to_string()))?;
        let bytes = stream_into(download, upload, &src.to_string(), &dst.to_string()).await?;
        tracing::debug!(source = %src, destination = %dst, bytes, "Streamed blob across containers");
        Ok(())
    }

    async fn ensure_container(&self, path: &RemotePath) -> Result<()> {
        let key = (path.account.clone(), path.container.clone());
        if self.ready.lock().is_ok_and(|ready| ready.contains(&key)) {
            return Ok(());
        }

        match Credentials::from_env() {
            Some(credentials) => container::create_container(&self.settings, path, credentials).await?,
            None => {
                // Token-credential setups cannot sign the create call; require the container
                let container = path.with_key("").to_string();
                let store = self.container(path)?;
                if let Some(Err(e)) = store.list(None).next().await {
                    return Err(match map_store_error(e, &container) {
                        Error::NotFound(_) => Error::NotFound(format!(
                            "container {container} does not exist; set AZURE_STORAGE_ACCOUNT_KEY, \
                             AZURE_STORAGE_SAS_KEY or AZURE_STORAGE_TOKEN to create it"
                        )),
                        other => other,
                    });
                }
            }
        }

        if let Ok(mut ready) = self.ready.lock() {
            ready.insert(key);
        }
        Ok(())
    }
}

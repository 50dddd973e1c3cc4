//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from ap-core.
//! The SDK client is built on first use and shared afterwards.

use std::path::Path;

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use aws_smithy_types::byte_stream::ByteStream;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;

use ap_core::config::S3Settings;
use ap_core::{Error, ListOptions, ListResult, ObjectInfo, ObjectStore, RemotePath, Result};

use crate::multipart::{self, MultipartConfig};

/// Maximum keys per DeleteObjects request
const DELETE_BATCH_SIZE: usize = 1000;

/// Region used for bucket creation when the client has none
const DEFAULT_REGION: &str = "us-east-1";

/// S3 client wrapper
pub struct S3Client {
    settings: S3Settings,
    multipart: MultipartConfig,
    inner: OnceCell<aws_sdk_s3::Client>,
}

impl std::fmt::Debug for S3Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Client")
            .field("endpoint", &self.settings.endpoint)
            .field("region", &self.settings.region)
            .field("initialized", &self.inner.initialized())
            .finish()
    }
}

impl S3Client {
    /// Create a client from settings; nothing is contacted until first use
    pub fn new(settings: S3Settings) -> Self {
        let multipart = MultipartConfig::new()
            .part_size(settings.part_size)
            .threshold(settings.multipart_threshold);
        Self {
            settings,
            multipart,
            inner: OnceCell::new(),
        }
    }

    /// Whether the SDK client has been built yet
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized()
    }

    /// Get the underlying aws-sdk-s3 client, building it on first call
    pub async fn inner(&self) -> &aws_sdk_s3::Client {
        self.inner.get_or_init(|| self.build_client()).await
    }

    async fn build_client(&self) -> aws_sdk_s3::Client {
        let region = RegionProviderChain::default_provider()
            .or_else(aws_config::Region::new(self.settings.region.clone()));
        let mut loader =
            aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

        if let Some(endpoint) = &self.settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        if let (Some(access_key), Some(secret_key)) =
            (&self.settings.access_key, &self.settings.secret_key)
        {
            let credentials = aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                None, // session token
                None, // expiry
                "anypath-static-credentials",
            );
            loader = loader.credentials_provider(credentials);
        }

        let config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(self.settings.force_path_style)
            .build();

        tracing::debug!(
            endpoint = ?self.settings.endpoint,
            path_style = self.settings.force_path_style,
            "Initialized S3 client"
        );
        aws_sdk_s3::Client::from_conf(s3_config)
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let client = self.inner().await;
        let region = client
            .config()
            .region()
            .map(|r| r.as_ref().to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut request = client.create_bucket().bucket(bucket);
        // us-east-1 rejects an explicit location constraint
        if region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                tracing::info!(bucket, "Created bucket");
                Ok(())
            }
            Err(e) if e.code() == Some("BucketAlreadyOwnedByYou") => Ok(()),
            Err(e) => Err(map_sdk_error(e, bucket)),
        }
    }
}

/// Translate an SDK failure into an ap-core error
pub(crate) fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, target: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|response| response.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();
    classify_failure(status, code.as_deref(), target, message)
}

fn classify_failure(status: Option<u16>, code: Option<&str>, target: &str, message: String) -> Error {
    match (status, code) {
        (Some(404), _) | (_, Some("NoSuchKey" | "NoSuchBucket" | "NotFound")) => {
            Error::NotFound(target.to_string())
        }
        (Some(401 | 403), _)
        | (
            _,
            Some(
                "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken",
            ),
        ) => Error::Auth(format!("{target}: {message}")),
        _ if message.to_ascii_lowercase().contains("credentials") => {
            Error::Auth(format!("{target}: {message}"))
        }
        _ => Error::Transfer(format!("{target}: {message}")),
    }
}

fn to_timestamp(value: &aws_smithy_types::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(value.secs()).ok()
}

fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

/// Percent-encode a `bucket/key` copy source, keeping `/` separators
fn encode_copy_source(bucket: &str, key: &str) -> String {
    let mut encoded = String::with_capacity(bucket.len() + key.len() + 1);
    for byte in format!("{bucket}/{key}").bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo> {
        let response = self
            .inner()
            .await
            .head_object()
            .bucket(&path.container)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        let size = response.content_length().unwrap_or(0);
        let mut info = ObjectInfo::file(&path.key, size);
        info.last_modified = response.last_modified().and_then(to_timestamp);
        info.etag = response.e_tag().map(trim_etag);
        Ok(info)
    }

    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        let mut request = self
            .inner()
            .await
            .list_objects_v2()
            .bucket(&path.container);

        let prefix = options.prefix.unwrap_or_else(|| path.dir_prefix());
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }

        // Set delimiter (for non-recursive listing)
        if !options.recursive {
            request = request.delimiter("/");
        }

        if let Some(max) = options.max_keys {
            request = request.max_keys(max);
        }

        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        let mut items = Vec::new();

        // Add common prefixes (directories)
        for prefix in response.common_prefixes() {
            if let Some(p) = prefix.prefix() {
                items.push(ObjectInfo::dir(p));
            }
        }

        for object in response.contents() {
            let key = object.key().unwrap_or_default();
            let mut info = ObjectInfo::file(key, object.size().unwrap_or(0));
            info.last_modified = object.last_modified().and_then(to_timestamp);
            info.etag = object.e_tag().map(trim_etag);
            items.push(info);
        }

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(str::to_string),
        })
    }

    async fn download_object(&self, path: &RemotePath, destination: &Path) -> Result<u64> {
        let target = path.to_string();
        let response = self
            .inner()
            .await
            .get_object()
            .bucket(&path.container)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &target))?;

        let mut body = response.body.into_async_read();
        let mut file = tokio::fs::File::create(destination).await?;
        let written = tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| Error::Transfer(format!("{target}: {e}")))?;
        file.flush().await?;
        Ok(written)
    }

    async fn upload_object(&self, source: &Path, path: &RemotePath) -> Result<ObjectInfo> {
        let size = tokio::fs::metadata(source).await?.len();
        let content_type = mime_guess::from_path(source)
            .first_or_octet_stream()
            .to_string();
        let client = self.inner().await;

        let etag = if self.multipart.applies_to(size) {
            multipart::upload(client, &self.multipart, source, path, size, &content_type).await?
        } else {
            let body = ByteStream::from_path(source)
                .await
                .map_err(|e| Error::Transfer(format!("{}: {e}", source.display())))?;
            let response = client
                .put_object()
                .bucket(&path.container)
                .key(&path.key)
                .content_type(content_type)
                .body(body)
                .send()
                .await
                .map_err(|e| map_sdk_error(e, &path.to_string()))?;
            response.e_tag().map(trim_etag)
        };

        let mut info = ObjectInfo::file(&path.key, size as i64);
        info.etag = etag;
        info.last_modified = Some(jiff::Timestamp::now());
        Ok(info)
    }

    async fn delete_object(&self, path: &RemotePath) -> Result<()> {
        self.inner()
            .await
            .delete_object()
            .bucket(&path.container)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;
        Ok(())
    }

    async fn delete_objects(&self, container: &RemotePath, keys: Vec<String>) -> Result<Vec<String>> {
        let client = self.inner().await;
        let mut deleted = Vec::with_capacity(keys.len());

        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            let objects = batch
                .iter()
                .map(|key| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(|e| Error::General(e.to_string()))
                })
                .collect::<Result<Vec<_>>>()?;

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(false)
                .build()
                .map_err(|e| Error::General(e.to_string()))?;

            let response = client
                .delete_objects()
                .bucket(&container.container)
                .delete(delete)
                .send()
                .await
                .map_err(|e| map_sdk_error(e, &container.to_string()))?;

            deleted.extend(
                response
                    .deleted()
                    .iter()
                    .filter_map(|d| d.key().map(str::to_string)),
            );

            if let Some(first) = response.errors().first() {
                return Err(Error::Transfer(format!(
                    "Failed to delete {} objects (first: {}: {})",
                    response.errors().len(),
                    first.key().unwrap_or_default(),
                    first.message().unwrap_or_default()
                )));
            }
        }

        Ok(deleted)
    }

    async fn copy_object(&self, src: &RemotePath, dst: &RemotePath) -> Result<()> {
        self.inner()
            .await
            .copy_object()
            .copy_source(encode_copy_source(&src.container, &src.key))
            .bucket(&dst.container)
            .key(&dst.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &src.to_string()))?;
        Ok(())
    }

    async fn ensure_container(&self, path: &RemotePath) -> Result<()> {
        match self
            .inner()
            .await
            .head_bucket()
            .bucket(&path.container)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => match map_sdk_error(e, &path.container) {
                Error::NotFound(_) => self.create_bucket(&path.container).await,
                other => Err(other),
            },
        }
    }
}

//! Multipart upload support
//!
//! Files above the configured threshold are uploaded in parts read straight
//! from disk, so memory use stays bounded by one part.

use std::path::Path;

use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_smithy_types::byte_stream::{ByteStream, Length};

use ap_core::{Error, RemotePath, Result};

use crate::client::map_sdk_error;

/// Default part size: 8 MiB
pub const DEFAULT_PART_SIZE: u64 = ap_core::config::DEFAULT_PART_SIZE;

/// Default threshold above which multipart upload is used: 64 MiB
pub const DEFAULT_THRESHOLD: u64 = ap_core::config::DEFAULT_MULTIPART_THRESHOLD;

/// Minimum part size: 5 MiB (S3 requirement)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum part size: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts: 10,000 (S3 limit)
pub const MAX_PARTS: usize = 10_000;

/// Multipart upload configuration
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Part size in bytes
    pub part_size: u64,

    /// Files larger than this are uploaded in parts
    pub threshold: u64,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl MultipartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part_size(mut self, size: u64) -> Self {
        self.part_size = size.clamp(MIN_PART_SIZE, MAX_PART_SIZE);
        self
    }

    pub fn threshold(mut self, size: u64) -> Self {
        self.threshold = size.max(MIN_PART_SIZE);
        self
    }

    /// Whether a file of this size goes through multipart upload
    pub fn applies_to(&self, file_size: u64) -> bool {
        file_size > self.threshold
    }

    /// Calculate appropriate part size for a file
    pub fn calculate_part_size(&self, file_size: u64) -> u64 {
        // If file fits in one part, use minimum
        if file_size <= MIN_PART_SIZE {
            return MIN_PART_SIZE;
        }

        let parts = file_size.div_ceil(self.part_size);

        if parts <= MAX_PARTS as u64 {
            self.part_size
        } else {
            // Need larger parts to fit within 10,000 limit
            let required_size = file_size.div_ceil(MAX_PARTS as u64);
            required_size.clamp(MIN_PART_SIZE, MAX_PART_SIZE)
        }
    }
}

/// Calculate number of parts for a file
pub fn calculate_parts(file_size: u64, part_size: u64) -> usize {
    file_size.div_ceil(part_size) as usize
}

/// Get byte range for a part
pub fn part_byte_range(part_number: i32, part_size: u64, total_size: u64) -> (u64, u64) {
    let start = (part_number as u64 - 1) * part_size;
    let end = (start + part_size).min(total_size);
    (start, end)
}

/// Upload a local file in parts, aborting the upload on failure
pub(crate) async fn upload(
    client: &aws_sdk_s3::Client,
    config: &MultipartConfig,
    source: &Path,
    path: &RemotePath,
    file_size: u64,
    content_type: &str,
) -> Result<Option<String>> {
    let target = path.to_string();
    let created = client
        .create_multipart_upload()
        .bucket(&path.container)
        .key(&path.key)
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| map_sdk_error(e, &target))?;
    let upload_id = created
        .upload_id()
        .ok_or_else(|| Error::Transfer(format!("{target}: no upload id returned")))?
        .to_string();

    let part_size = config.calculate_part_size(file_size);
    tracing::debug!(
        object = %target,
        parts = calculate_parts(file_size, part_size),
        part_size,
        "Starting multipart upload"
    );

    let parts = match upload_parts(client, source, path, &upload_id, part_size, file_size).await {
        Ok(parts) => parts,
        Err(e) => {
            if let Err(abort_err) = client
                .abort_multipart_upload()
                .bucket(&path.container)
                .key(&path.key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                tracing::warn!(object = %target, error = %abort_err, "Failed to abort multipart upload");
            }
            return Err(e);
        }
    };

    let completed = client
        .complete_multipart_upload()
        .bucket(&path.container)
        .key(&path.key)
        .upload_id(&upload_id)
        .multipart_upload(
            CompletedMultipartUpload::builder()
                .set_parts(Some(parts))
                .build(),
        )
        .send()
        .await
        .map_err(|e| map_sdk_error(e, &target))?;

    Ok(completed.e_tag().map(|etag| etag.trim_matches('"').to_string()))
}

async fn upload_parts(
    client: &aws_sdk_s3::Client,
    source: &Path,
    path: &RemotePath,
    upload_id: &str,
    part_size: u64,
    file_size: u64,
) -> Result<Vec<CompletedPart>> {
    let target = path.to_string();
    let count = calculate_parts(file_size, part_size);
    let mut parts = Vec::with_capacity(count);

    for part_number in 1..=count as i32 {
        let (start, end) = part_byte_range(part_number, part_size, file_size);
        let body = ByteStream::read_from()
            .path(source)
            .offset(start)
            .length(Length::Exact(end - start))
            .build()
            .await
            .map_err(|e| Error::Transfer(format!("{}: {e}", source.display())))?;

        let uploaded = client
            .upload_part()
            .bucket(&path.container)
            .key(&path.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(body)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &target))?;

        parts.push(
            CompletedPart::builder()
                .part_number(part_number)
                .set_e_tag(uploaded.e_tag().map(str::to_string))
                .build(),
        );
    }

    Ok(parts)
}

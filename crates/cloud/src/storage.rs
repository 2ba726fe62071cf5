//! Object storage for audio files and artwork: presigned transfers and
//! multipart uploads.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use serde::{Deserialize, Serialize};

use crate::{sdk_error, CloudError};

const SERVICE: &str = "s3";

/// Part receipt returned to the client after a part upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// URL the client can `PUT` the object to until `ttl` elapses.
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, CloudError>;

    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, CloudError>;

    async fn object_exists(&self, key: &str) -> Result<bool, CloudError>;

    /// Remove an object. Deleting a missing key succeeds.
    async fn delete_object(&self, key: &str) -> Result<(), CloudError>;

    /// Start a multipart upload, returning its upload id.
    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, CloudError>;

    async fn presign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        ttl: Duration,
    ) -> Result<String, CloudError>;

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), CloudError>;

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<(), CloudError>;
}

// ---------------------------------------------------------------------------
// S3
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct S3ObjectStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStorage {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub async fn from_env(bucket: String) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }

    fn presigning(ttl: Duration) -> Result<PresigningConfig, CloudError> {
        PresigningConfig::expires_in(ttl).map_err(|e| CloudError::Config(e.to_string()))
    }
}

fn part_number(n: u32) -> Result<i32, CloudError> {
    i32::try_from(n).map_err(|_| CloudError::Config(format!("part number {n} out of range")))
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, CloudError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(Self::presigning(ttl)?)
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;
        Ok(request.uri().to_string())
    }

    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, CloudError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presigning(ttl)?)
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;
        Ok(request.uri().to_string())
    }

    async fn object_exists(&self, key: &str) -> Result<bool, CloudError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(sdk_error(SERVICE, err)),
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), CloudError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;
        tracing::debug!(key, "Deleted object");
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, CloudError> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;
        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| CloudError::service(SERVICE, "multipart upload returned no upload id"))
    }

    async fn presign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number_value: u32,
        ttl: Duration,
    ) -> Result<String, CloudError> {
        let request = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number(part_number_value)?)
            .presigned(Self::presigning(ttl)?)
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;
        Ok(request.uri().to_string())
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), CloudError> {
        let mut completed = Vec::with_capacity(parts.len());
        for part in parts {
            completed.push(
                S3CompletedPart::builder()
                    .part_number(part_number(part.part_number)?)
                    .e_tag(&part.etag)
                    .build(),
            );
        }
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;
        tracing::info!(key, upload_id, parts = parts.len(), "Completed multipart upload");
        Ok(())
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<(), CloudError> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;
        tracing::info!(key, upload_id, "Aborted multipart upload");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory double
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StorageState {
    objects: HashSet<String>,
    /// upload id -> object key
    multipart: HashMap<String, String>,
    next_upload: u64,
}

/// In-process object store. Presigned URLs use a `memory://` scheme; tests
/// simulate the client transfer with [`MemoryObjectStorage::put_object`].
#[derive(Debug, Default)]
pub struct MemoryObjectStorage {
    bucket: String,
    state: Mutex<StorageState>,
}

impl MemoryObjectStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            state: Mutex::default(),
        }
    }

    pub fn put_object(&self, key: &str) {
        self.lock().objects.insert(key.to_string());
    }

    pub fn has_object(&self, key: &str) -> bool {
        self.lock().objects.contains(key)
    }

    pub fn open_multipart_uploads(&self) -> usize {
        self.lock().multipart.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StorageState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn url(&self, key: &str, query: &str) -> String {
        format!("memory://{}/{key}?{query}", self.bucket)
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, CloudError> {
        Ok(self.url(
            key,
            &format!("op=put&content-type={content_type}&ttl={}", ttl.as_secs()),
        ))
    }

    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, CloudError> {
        Ok(self.url(key, &format!("op=get&ttl={}", ttl.as_secs())))
    }

    async fn object_exists(&self, key: &str) -> Result<bool, CloudError> {
        Ok(self.lock().objects.contains(key))
    }

    async fn delete_object(&self, key: &str) -> Result<(), CloudError> {
        self.lock().objects.remove(key);
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, CloudError> {
        let mut state = self.lock();
        state.next_upload += 1;
        let upload_id = format!("mpu-{}", state.next_upload);
        state.multipart.insert(upload_id.clone(), key.to_string());
        Ok(upload_id)
    }

    async fn presign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        ttl: Duration,
    ) -> Result<String, CloudError> {
        Ok(self.url(
            key,
            &format!(
                "op=upload-part&upload-id={upload_id}&part={part_number}&ttl={}",
                ttl.as_secs()
            ),
        ))
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), CloudError> {
        if parts.is_empty() {
            return Err(CloudError::service(SERVICE, "no parts to complete"));
        }
        let mut state = self.lock();
        match state.multipart.remove(upload_id) {
            Some(k) if k == key => {
                state.objects.insert(k);
                Ok(())
            }
            _ => Err(CloudError::service(
                SERVICE,
                format!("no such upload {upload_id} for {key}"),
            )),
        }
    }

    async fn abort_multipart_upload(&self, _key: &str, upload_id: &str) -> Result<(), CloudError> {
        self.lock().multipart.remove(upload_id);
        Ok(())
    }
}

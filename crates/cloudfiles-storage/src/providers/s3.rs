//! S3-compatible object store (requires the `s3` feature).

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream as S3Body;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::{Bytes, BytesMut};
use futures::stream::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use cloudfiles_core::config::storage::S3StorageConfig;
use cloudfiles_core::error::{AppError, ErrorKind};
use cloudfiles_core::result::AppResult;
use cloudfiles_core::traits::storage::{ByteStream, ObjectStore};

/// Smallest part size S3 accepts for every part but the last.
const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Object store backed by an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    part_size: usize,
}

impl S3ObjectStore {
    /// Build a client from configuration.
    ///
    /// With explicit keys the client is configured directly. Without them the
    /// default AWS credential chain is used.
    pub async fn new(config: &S3StorageConfig) -> AppResult<Self> {
        if config.bucket.is_empty() {
            return Err(AppError::configuration("storage.s3.bucket must be set"));
        }

        info!(
            endpoint = %config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            "Initializing S3 object store"
        );

        let region = Region::new(config.region.clone());
        let explicit_keys = !config.access_key.is_empty() && !config.secret_key.is_empty();
        let mut builder = if explicit_keys {
            aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(Credentials::new(
                    &config.access_key,
                    &config.secret_key,
                    None,
                    None,
                    "cloudfiles-config",
                ))
        } else {
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load()
                .await;
            aws_sdk_s3::config::Builder::from(&shared)
        };
        builder = builder.force_path_style(config.force_path_style);
        if !config.endpoint.is_empty() {
            builder = builder.endpoint_url(&config.endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            part_size: (config.multipart_part_size_bytes as usize).max(MIN_PART_SIZE),
        })
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> AppResult<CompletedPart> {
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(S3Body::from(data))
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to upload part {part_number} of {key}"),
                    e,
                )
            })?;

        Ok(CompletedPart::builder()
            .set_e_tag(output.e_tag().map(str::to_string))
            .part_number(part_number)
            .build())
    }

    /// Upload every part of `stream` and complete the multipart upload.
    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        first: Bytes,
        mut buffer: BytesMut,
        mut stream: ByteStream,
    ) -> AppResult<u64> {
        let mut total = first.len() as u64;
        let mut parts = vec![self.upload_part(key, upload_id, 1, first).await?];

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AppError::with_source(ErrorKind::Storage, "Stream read error", e))?;
            buffer.extend_from_slice(&chunk);
            while buffer.len() >= self.part_size {
                let part = buffer.split_to(self.part_size).freeze();
                total += part.len() as u64;
                let number = parts.len() as i32 + 1;
                parts.push(self.upload_part(key, upload_id, number, part).await?);
            }
        }
        if !buffer.is_empty() {
            total += buffer.len() as u64;
            let number = parts.len() as i32 + 1;
            parts.push(self.upload_part(key, upload_id, number, buffer.freeze()).await?);
        }

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to complete upload of {key}"),
                    e,
                )
            })?;

        Ok(total)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok())
    }

    async fn get(&self, key: &str) -> AppResult<ByteStream> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    AppError::not_found(format!("Object not found: {key}"))
                } else {
                    AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to download object: {key}"),
                        e,
                    )
                }
            })?;

        Ok(Box::pin(ReaderStream::new(output.body.into_async_read())))
    }

    async fn put_stream(&self, key: &str, mut stream: ByteStream) -> AppResult<u64> {
        let mut buffer = BytesMut::with_capacity(self.part_size);
        while buffer.len() < self.part_size {
            match stream.next().await {
                Some(chunk) => {
                    let chunk = chunk.map_err(|e| {
                        AppError::with_source(ErrorKind::Storage, "Stream read error", e)
                    })?;
                    buffer.extend_from_slice(&chunk);
                }
                None => break,
            }
        }

        // Fits in one request.
        if buffer.len() < self.part_size {
            let size = buffer.len() as u64;
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(S3Body::from(buffer.freeze()))
                .send()
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to upload object: {key}"),
                        e,
                    )
                })?;
            debug!(key, bytes = size, "Uploaded object");
            return Ok(size);
        }

        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to start upload of {key}"),
                    e,
                )
            })?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| AppError::storage(format!("No upload id returned for {key}")))?
            .to_string();

        let first = buffer.split_to(self.part_size).freeze();
        match self.upload_parts(key, &upload_id, first, buffer, stream).await {
            Ok(total) => {
                debug!(key, bytes = total, "Uploaded object in parts");
                Ok(total)
            }
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(key, error = %abort_err, "Failed to abort multipart upload");
                }
                Err(e)
            }
        }
    }

    async fn put_file(&self, key: &str, source: &Path) -> AppResult<u64> {
        let file = tokio::fs::File::open(source).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to open {}", source.display()),
                e,
            )
        })?;
        self.put_stream(key, Box::pin(ReaderStream::new(file)))
            .await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to stat object: {key}"),
                e,
            )),
        }
    }
}

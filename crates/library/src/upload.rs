//! Upload lifecycle: presigned (single or multipart) transfer, then the
//! `pending -> processing -> {completed, failed}` state machine with
//! resumable processing steps.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use soundshelf_cloud::storage::{CompletedPart, ObjectStorage};
use soundshelf_core::cursor::{Page, PageRequest};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys;
use soundshelf_core::types::new_id;
use soundshelf_core::upload::{
    self, validate_transition, ProcessingStep, TransitionTrigger, UploadStatus, UploadSteps,
    MULTIPART_PART_SIZE_BYTES,
};
use soundshelf_db::models::upload::{InitiateUpload, Upload, UploadPartUrl, UploadTicket};
use soundshelf_db::repositories::UploadRepo;
use soundshelf_db::store::ItemStore;

use crate::paging::Pager;
use crate::{external, validate_input};

#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn ItemStore>,
    storage: Arc<dyn ObjectStorage>,
    pager: Pager,
    url_ttl: Duration,
}

impl UploadService {
    pub fn new(
        store: Arc<dyn ItemStore>,
        storage: Arc<dyn ObjectStorage>,
        pager: Pager,
        url_ttl: Duration,
    ) -> Self {
        Self {
            store,
            storage,
            pager,
            url_ttl,
        }
    }

    /// Register a pending upload and hand out the URL(s) to send it to.
    ///
    /// Files above the multipart threshold get one presigned URL per part.
    pub async fn initiate_upload(
        &self,
        owner_id: &str,
        input: InitiateUpload,
    ) -> Result<UploadTicket, CoreError> {
        validate_input(&input)?;
        keys::validate_segment("owner id", owner_id)?;
        let id = new_id();
        let storage_key = format!("uploads/{owner_id}/{id}/{}", input.file_name);
        let now = Utc::now();

        let mut record = Upload {
            id,
            owner_id: owner_id.to_string(),
            file_name: input.file_name,
            content_type: input.content_type,
            file_size: input.file_size,
            storage_key,
            status: UploadStatus::Pending,
            multipart_upload_id: None,
            part_count: None,
            steps: UploadSteps::default(),
            track_id: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        let (upload_url, part_urls) = if upload::requires_multipart(record.file_size) {
            let parts = upload::part_count(record.file_size, MULTIPART_PART_SIZE_BYTES)?;
            let upload_id = self
                .storage
                .create_multipart_upload(&record.storage_key, &record.content_type)
                .await
                .map_err(|e| external("storage", e))?;
            record.multipart_upload_id = Some(upload_id.clone());
            record.part_count = Some(parts);

            match self.presign_parts(&record.storage_key, &upload_id, parts).await {
                Ok(urls) => (None, urls),
                Err(e) => {
                    self.abort_quietly(&record.storage_key, &upload_id).await;
                    return Err(e);
                }
            }
        } else {
            let url = self
                .storage
                .presign_upload(&record.storage_key, &record.content_type, self.url_ttl)
                .await
                .map_err(|e| external("storage", e))?;
            (Some(url), Vec::new())
        };

        if let Err(e) = UploadRepo::create(self.store.as_ref(), &record).await {
            if let Some(upload_id) = &record.multipart_upload_id {
                self.abort_quietly(&record.storage_key, upload_id).await;
            }
            return Err(e);
        }

        tracing::info!(
            upload_id = %record.id,
            owner_id,
            file_size = record.file_size,
            parts = record.part_count.unwrap_or(1),
            "Upload initiated"
        );
        Ok(UploadTicket {
            upload: record,
            upload_url,
            part_urls,
        })
    }

    /// Move a single-part upload to `processing` once its object exists.
    pub async fn confirm_upload(&self, owner_id: &str, upload_id: &str) -> Result<Upload, CoreError> {
        let mut record = UploadRepo::get(self.store.as_ref(), owner_id, upload_id).await?;
        if record.multipart_upload_id.is_some() {
            return Err(CoreError::Validation(
                "Multipart uploads are confirmed by completing them".into(),
            ));
        }
        validate_transition(record.status, UploadStatus::Processing, TransitionTrigger::Progress)?;

        let exists = self
            .storage
            .object_exists(&record.storage_key)
            .await
            .map_err(|e| external("storage", e))?;
        if !exists {
            return Err(CoreError::Validation(format!(
                "No uploaded object found for upload {upload_id}"
            )));
        }

        self.transition(&mut record, UploadStatus::Processing).await?;
        Ok(record)
    }

    /// Assemble the uploaded parts and move the upload to `processing`.
    pub async fn complete_multipart(
        &self,
        owner_id: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<Upload, CoreError> {
        let mut record = UploadRepo::get(self.store.as_ref(), owner_id, upload_id).await?;
        let Some(multipart_id) = record.multipart_upload_id.clone() else {
            return Err(CoreError::Validation(format!(
                "Upload {upload_id} is not a multipart upload"
            )));
        };
        validate_transition(record.status, UploadStatus::Processing, TransitionTrigger::Progress)?;
        validate_parts(&parts, record.part_count.unwrap_or(0))?;

        let mut parts = parts;
        parts.sort_by_key(|p| p.part_number);
        self.storage
            .complete_multipart_upload(&record.storage_key, &multipart_id, &parts)
            .await
            .map_err(|e| external("storage", e))?;

        self.transition(&mut record, UploadStatus::Processing).await?;
        Ok(record)
    }

    /// Record one finished processing step.
    pub async fn mark_step(
        &self,
        owner_id: &str,
        upload_id: &str,
        step: ProcessingStep,
    ) -> Result<Upload, CoreError> {
        let mut record = UploadRepo::get(self.store.as_ref(), owner_id, upload_id).await?;
        if record.status != UploadStatus::Processing {
            return Err(CoreError::Validation(format!(
                "Cannot record step '{}' (current status: {})",
                step.name(),
                record.status.name()
            )));
        }
        record.steps.mark(step);
        record.updated_at = Utc::now();
        UploadRepo::update(self.store.as_ref(), &record).await?;
        tracing::debug!(upload_id, step = step.name(), "Upload step done");
        Ok(record)
    }

    pub async fn mark_completed(
        &self,
        owner_id: &str,
        upload_id: &str,
        track_id: &str,
    ) -> Result<Upload, CoreError> {
        let mut record = UploadRepo::get(self.store.as_ref(), owner_id, upload_id).await?;
        validate_transition(record.status, UploadStatus::Completed, TransitionTrigger::Progress)?;
        record.track_id = Some(track_id.to_string());
        record.steps.mark(ProcessingStep::CreateTrack);
        record.error_message = None;
        self.transition(&mut record, UploadStatus::Completed).await?;
        Ok(record)
    }

    pub async fn mark_failed(
        &self,
        owner_id: &str,
        upload_id: &str,
        message: &str,
    ) -> Result<Upload, CoreError> {
        let mut record = UploadRepo::get(self.store.as_ref(), owner_id, upload_id).await?;
        validate_transition(record.status, UploadStatus::Failed, TransitionTrigger::Progress)?;
        record.error_message = Some(message.to_string());
        self.transition(&mut record, UploadStatus::Failed).await?;
        tracing::warn!(upload_id, error = message, "Upload processing failed");
        Ok(record)
    }

    /// Re-run a failed upload from `from_step`, or from the first
    /// unfinished step when none is given.
    pub async fn reprocess(
        &self,
        owner_id: &str,
        upload_id: &str,
        from_step: Option<ProcessingStep>,
    ) -> Result<Upload, CoreError> {
        let mut record = UploadRepo::get(self.store.as_ref(), owner_id, upload_id).await?;
        validate_transition(record.status, UploadStatus::Processing, TransitionTrigger::Reprocess)?;

        let from = from_step
            .or_else(|| record.steps.next_pending())
            .unwrap_or(ProcessingStep::ExtractMetadata);
        record.steps.reset_from(from);
        record.error_message = None;
        self.transition(&mut record, UploadStatus::Processing).await?;
        tracing::info!(upload_id, from = from.name(), "Upload reprocessing");
        Ok(record)
    }

    pub async fn get_upload(&self, owner_id: &str, upload_id: &str) -> Result<Upload, CoreError> {
        UploadRepo::get(self.store.as_ref(), owner_id, upload_id).await
    }

    pub async fn list_uploads_by_status(
        &self,
        status: UploadStatus,
        request: &PageRequest,
    ) -> Result<Page<Upload>, CoreError> {
        let (limit, start) = self.pager.start(request)?;
        let page = UploadRepo::list_by_status(self.store.as_ref(), status, limit, start).await?;
        self.pager.finish(page)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn transition(&self, record: &mut Upload, next: UploadStatus) -> Result<(), CoreError> {
        let from = record.status;
        record.status = next;
        record.updated_at = Utc::now();
        UploadRepo::update(self.store.as_ref(), record).await?;
        tracing::info!(upload_id = %record.id, from = from.name(), to = next.name(), "Upload status changed");
        Ok(())
    }

    async fn presign_parts(
        &self,
        key: &str,
        upload_id: &str,
        parts: u32,
    ) -> Result<Vec<UploadPartUrl>, CoreError> {
        let mut urls = Vec::with_capacity(parts as usize);
        for part_number in 1..=parts {
            let url = self
                .storage
                .presign_upload_part(key, upload_id, part_number, self.url_ttl)
                .await
                .map_err(|e| external("storage", e))?;
            urls.push(UploadPartUrl { part_number, url });
        }
        Ok(urls)
    }

    async fn abort_quietly(&self, key: &str, upload_id: &str) {
        if let Err(e) = self.storage.abort_multipart_upload(key, upload_id).await {
            tracing::warn!(upload_id, error = %e, "Failed to abort multipart upload");
        }
    }
}

/// Every expected part exactly once, each with an ETag.
fn validate_parts(parts: &[CompletedPart], expected: u32) -> Result<(), CoreError> {
    let numbers: BTreeSet<u32> = parts.iter().map(|p| p.part_number).collect();
    if numbers.len() != parts.len() {
        return Err(CoreError::Validation("Duplicate part numbers".into()));
    }
    if parts.iter().any(|p| p.etag.trim().is_empty()) {
        return Err(CoreError::Validation("Every part needs an ETag".into()));
    }
    let complete = numbers.len() == expected as usize
        && numbers.iter().copied().eq(1..=expected);
    if !complete {
        return Err(CoreError::Validation(format!(
            "Expected parts 1..={expected}, got {}",
            parts.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn part(n: u32) -> CompletedPart {
        CompletedPart {
            part_number: n,
            etag: format!("\"etag-{n}\""),
        }
    }

    #[test]
    fn parts_must_cover_every_number_once() {
        assert!(validate_parts(&[part(2), part(1), part(3)], 3).is_ok());
        assert_matches!(validate_parts(&[part(1), part(3)], 3), Err(CoreError::Validation(_)));
        assert_matches!(
            validate_parts(&[part(1), part(1), part(2)], 3),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn parts_need_etags() {
        let blank = CompletedPart {
            part_number: 1,
            etag: " ".into(),
        };
        assert_matches!(validate_parts(&[blank], 1), Err(CoreError::Validation(_)));
    }
}

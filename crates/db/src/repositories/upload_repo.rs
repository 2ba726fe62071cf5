//! Repository for upload tracking items.

use soundshelf_core::cursor::StartKey;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName};
use soundshelf_core::upload::UploadStatus;

use super::{fetch, insert, page, replace, EntityPage};
use crate::models::upload::Upload;
use crate::store::{ItemStore, Query};

/// Provides CRUD operations for uploads.
pub struct UploadRepo;

impl UploadRepo {
    pub async fn create(store: &dyn ItemStore, upload: &Upload) -> Result<(), CoreError> {
        insert(store, upload, &upload.id).await
    }

    pub async fn find(
        store: &dyn ItemStore,
        owner_id: &str,
        upload_id: &str,
    ) -> Result<Option<Upload>, CoreError> {
        let key = keys::primary_key(EntityType::Upload, owner_id, upload_id)?;
        fetch(store, &key).await
    }

    pub async fn get(
        store: &dyn ItemStore,
        owner_id: &str,
        upload_id: &str,
    ) -> Result<Upload, CoreError> {
        Self::find(store, owner_id, upload_id)
            .await?
            .ok_or_else(|| CoreError::not_found("upload", upload_id))
    }

    /// Guarded replace; the status projection moves with the status.
    pub async fn update(store: &dyn ItemStore, upload: &Upload) -> Result<(), CoreError> {
        replace(store, upload, &upload.id).await
    }

    /// Uploads in `status`, oldest first, across all owners.
    pub async fn list_by_status(
        store: &dyn ItemStore,
        status: UploadStatus,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<Upload>, CoreError> {
        let query = Query::index(IndexName::Index1, keys::upload_status_partition(status.name()))
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }
}

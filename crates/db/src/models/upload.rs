//! Upload tracking model and DTOs.

use serde::{Deserialize, Serialize};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName, ItemKey};
use soundshelf_core::types::{EntityId, Timestamp};
use soundshelf_core::upload::{UploadStatus, UploadSteps};
use validator::Validate;

use crate::item::Storable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upload {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub file_name: String,
    pub content_type: String,
    pub file_size: u64,
    /// Object-storage key the client uploads to.
    pub storage_key: String,
    pub status: UploadStatus,
    /// Set when the object is uploaded in parts.
    pub multipart_upload_id: Option<String>,
    pub part_count: Option<u32>,
    #[serde(default)]
    pub steps: UploadSteps,
    pub track_id: Option<EntityId>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Storable for Upload {
    const ENTITY_TYPE: EntityType = EntityType::Upload;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::primary_key(EntityType::Upload, &self.owner_id, &self.id)
    }

    fn indexes(&self) -> Vec<(IndexName, ItemKey)> {
        vec![(
            IndexName::Index1,
            keys::upload_status_index_key(self.status.name(), &self.created_at, &self.id),
        )]
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InitiateUpload {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(min = 1, max = 100))]
    pub content_type: String,
    #[validate(range(min = 1))]
    pub file_size: u64,
}

/// Presigned target for one part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadPartUrl {
    pub part_number: u32,
    pub url: String,
}

/// What the client needs to start sending bytes.
#[derive(Debug, Clone, Serialize)]
pub struct UploadTicket {
    pub upload: Upload,
    /// Single PUT target, for uploads below the multipart threshold.
    pub upload_url: Option<String>,
    pub part_urls: Vec<UploadPartUrl>,
}

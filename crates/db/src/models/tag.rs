//! Tag and track-tag join models.

use serde::{Deserialize, Serialize};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName, ItemKey};
use soundshelf_core::types::{EntityId, Timestamp};
use validator::Validate;

use crate::item::Storable;

/// A named label an owner applies to tracks. The name is the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub owner_id: EntityId,
    pub name: String,
    pub color: Option<String>,
    pub created_at: Timestamp,
}

impl Storable for Tag {
    const ENTITY_TYPE: EntityType = EntityType::Tag;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::primary_key(EntityType::Tag, &self.owner_id, &self.name)
    }
}

/// Join item placed under the track, projected into the tag's partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackTag {
    pub owner_id: EntityId,
    pub track_id: EntityId,
    pub tag_name: String,
    pub created_at: Timestamp,
}

impl Storable for TrackTag {
    const ENTITY_TYPE: EntityType = EntityType::TrackTag;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::validate_segment("owner id", &self.owner_id)?;
        keys::validate_segment("track id", &self.track_id)?;
        keys::validate_segment("tag name", &self.tag_name)?;
        Ok(keys::track_tag_key(&self.owner_id, &self.track_id, &self.tag_name))
    }

    fn indexes(&self) -> Vec<(IndexName, ItemKey)> {
        vec![(
            IndexName::Index1,
            keys::tag_index_key(&self.owner_id, &self.tag_name, &self.track_id),
        )]
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTag {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    pub color: Option<String>,
}

/// Result of tagging a track with several tags at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagTrackOutcome {
    pub tagged: Vec<String>,
    /// Tags that were already applied or failed validation, with the reason.
    pub skipped: Vec<(String, String)>,
}

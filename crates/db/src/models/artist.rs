//! Artist entity model and DTOs.

use serde::{Deserialize, Serialize};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName, ItemKey};
use soundshelf_core::types::{EntityId, Timestamp};
use validator::Validate;

use crate::item::Storable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub name: String,
    /// Name used for ordering; see [`soundshelf_core::naming::generate_sort_name`].
    pub sort_name: String,
    pub bio: Option<String>,
    pub image_key: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Storable for Artist {
    const ENTITY_TYPE: EntityType = EntityType::Artist;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::primary_key(EntityType::Artist, &self.owner_id, &self.id)
    }

    fn indexes(&self) -> Vec<(IndexName, ItemKey)> {
        vec![(
            IndexName::Index1,
            keys::artist_name_index_key(&self.owner_id, &self.sort_name),
        )]
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateArtist {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub bio: Option<String>,
    pub image_key: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateArtist {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub bio: Option<String>,
    pub image_key: Option<String>,
    pub genres: Option<Vec<String>>,
}

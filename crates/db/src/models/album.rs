//! Album entity model and DTOs.

use serde::{Deserialize, Serialize};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName, ItemKey};
use soundshelf_core::types::{EntityId, Timestamp};
use validator::Validate;

use crate::item::Storable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub title: String,
    pub artist: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub cover_art_key: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Storable for Album {
    const ENTITY_TYPE: EntityType = EntityType::Album;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::primary_key(EntityType::Album, &self.owner_id, &self.id)
    }

    /// Albums list under their artist, ordered by release year.
    fn indexes(&self) -> Vec<(IndexName, ItemKey)> {
        vec![(
            IndexName::Index1,
            keys::album_artist_index_key(&self.owner_id, &self.artist, self.year),
        )]
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAlbum {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(min = 1, max = 200))]
    pub artist: String,
    #[validate(range(min = 1000, max = 9999))]
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub cover_art_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAlbum {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub artist: Option<String>,
    #[validate(range(min = 1000, max = 9999))]
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub cover_art_key: Option<String>,
}

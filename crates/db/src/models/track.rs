//! Track entity model and DTOs.

use serde::{Deserialize, Serialize};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, DiscoveryKind, EntityType, IndexName, ItemKey};
use soundshelf_core::types::{EntityId, Timestamp};
use soundshelf_core::visibility::Visibility;
use validator::Validate;

use crate::item::Storable;

/// A track owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub album_id: Option<EntityId>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub track_number: Option<u32>,
    pub duration_secs: u32,
    /// Object-storage key of the audio file.
    pub file_key: String,
    pub cover_art_key: Option<String>,
    pub file_size: u64,
    pub format: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub play_count: u64,
    pub last_played_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Storable for Track {
    const ENTITY_TYPE: EntityType = EntityType::Track;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::primary_key(EntityType::Track, &self.owner_id, &self.id)
    }

    fn indexes(&self) -> Vec<(IndexName, ItemKey)> {
        let mut indexes = vec![(
            IndexName::Index1,
            keys::track_artist_index_key(&self.owner_id, &self.artist, &self.id),
        )];
        if self.visibility.is_discoverable() {
            indexes.push((
                IndexName::Index2,
                keys::discovery_key(DiscoveryKind::Track, &self.created_at, &self.id),
            ));
        }
        indexes
    }
}

/// DTO for creating a new track.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTrack {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(min = 1, max = 200))]
    pub artist: String,
    pub album: Option<String>,
    pub album_id: Option<EntityId>,
    pub genre: Option<String>,
    #[validate(range(min = 1000, max = 9999))]
    pub year: Option<i32>,
    pub track_number: Option<u32>,
    pub duration_secs: u32,
    #[validate(length(min = 1))]
    pub file_key: String,
    pub cover_art_key: Option<String>,
    #[serde(default)]
    pub file_size: u64,
    pub format: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
}

/// DTO for updating an existing track. Visibility changes go through the
/// visibility service so the discovery index stays in step.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTrack {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_id: Option<EntityId>,
    pub genre: Option<String>,
    #[validate(range(min = 1000, max = 9999))]
    pub year: Option<i32>,
    pub track_number: Option<u32>,
    pub cover_art_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn track(visibility: Visibility) -> Track {
        let now = Utc::now();
        Track {
            id: "t1".into(),
            owner_id: "u1".into(),
            title: "Song".into(),
            artist: "Band".into(),
            album: None,
            album_id: None,
            genre: None,
            year: None,
            track_number: None,
            duration_secs: 180,
            file_key: "media/u1/t1.mp3".into(),
            cover_art_key: None,
            file_size: 0,
            format: None,
            visibility,
            play_count: 0,
            last_played_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn private_track_has_no_discovery_entry() {
        let item = track(Visibility::Private).to_item().unwrap();
        assert!(item.index2.is_none());
        assert_eq!(
            item.index1.unwrap().pk,
            keys::artist_partition("u1", "Band")
        );
    }

    #[test]
    fn public_track_projects_into_discovery() {
        let item = track(Visibility::Public).to_item().unwrap();
        assert_eq!(item.index2.unwrap().pk, keys::PUBLIC_TRACK_PARTITION);
    }

    #[test]
    fn unlisted_track_is_not_discoverable() {
        let item = track(Visibility::Unlisted).to_item().unwrap();
        assert!(item.index2.is_none());
    }

    #[test]
    fn round_trips_through_item() {
        let original = track(Visibility::Public);
        let item = original.to_item().unwrap();
        assert_eq!(Track::from_item(&item).unwrap(), original);
    }
}

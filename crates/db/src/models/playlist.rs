//! Playlist and playlist membership models.

use serde::{Deserialize, Serialize};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, DiscoveryKind, EntityType, IndexName, ItemKey};
use soundshelf_core::types::{EntityId, Timestamp};
use soundshelf_core::visibility::Visibility;
use validator::Validate;

use crate::item::Storable;
use crate::models::track::Track;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    pub cover_art_key: Option<String>,
    /// Recomputed from membership on every mutation.
    #[serde(default)]
    pub track_count: u32,
    #[serde(default)]
    pub total_duration_secs: u64,
    /// Bumped by every write of the playlist item; writes are accepted only
    /// against the version they read.
    #[serde(default)]
    pub version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Storable for Playlist {
    const ENTITY_TYPE: EntityType = EntityType::Playlist;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::primary_key(EntityType::Playlist, &self.owner_id, &self.id)
    }

    fn indexes(&self) -> Vec<(IndexName, ItemKey)> {
        if self.visibility.is_discoverable() {
            vec![(
                IndexName::Index2,
                keys::discovery_key(DiscoveryKind::Playlist, &self.created_at, &self.id),
            )]
        } else {
            Vec::new()
        }
    }
}

/// One occupied position of a playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    pub playlist_id: EntityId,
    pub track_id: EntityId,
    pub position: usize,
    /// Duration captured when the track was added, used for playlist stats.
    pub duration_secs: u32,
    pub added_at: Timestamp,
}

impl Storable for PlaylistTrack {
    const ENTITY_TYPE: EntityType = EntityType::PlaylistTrack;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::validate_segment("playlist id", &self.playlist_id)?;
        Ok(keys::playlist_position_key(&self.playlist_id, self.position))
    }
}

/// Playlist with its ordered membership, as returned by `get_playlist`.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistWithTracks {
    pub playlist: Playlist,
    pub entries: Vec<PlaylistTrack>,
    /// Tracks in playlist order. Entries whose track has since been deleted
    /// are omitted here but still listed in `entries`.
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePlaylist {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    pub cover_art_key: Option<String>,
}

/// Visibility changes go through the visibility service.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePlaylist {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub cover_art_key: Option<String>,
}

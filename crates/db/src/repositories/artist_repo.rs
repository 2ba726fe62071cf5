//! Repository for artist items.

use soundshelf_core::cursor::StartKey;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName};

use super::{fetch, insert, page, remove, replace, EntityPage};
use crate::models::artist::Artist;
use crate::store::{ItemStore, Query};

/// Provides CRUD operations for artists.
pub struct ArtistRepo;

impl ArtistRepo {
    pub async fn create(store: &dyn ItemStore, artist: &Artist) -> Result<(), CoreError> {
        insert(store, artist, &artist.id).await
    }

    pub async fn find(
        store: &dyn ItemStore,
        owner_id: &str,
        artist_id: &str,
    ) -> Result<Option<Artist>, CoreError> {
        let key = keys::primary_key(EntityType::Artist, owner_id, artist_id)?;
        fetch(store, &key).await
    }

    pub async fn update(store: &dyn ItemStore, artist: &Artist) -> Result<(), CoreError> {
        replace(store, artist, &artist.id).await
    }

    pub async fn delete(
        store: &dyn ItemStore,
        owner_id: &str,
        artist_id: &str,
    ) -> Result<(), CoreError> {
        let key = keys::primary_key(EntityType::Artist, owner_id, artist_id)?;
        remove(store, &key, "artist", artist_id).await
    }

    /// Artists of an owner ordered by sort name.
    pub async fn list_sorted(
        store: &dyn ItemStore,
        owner_id: &str,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<Artist>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        let query = Query::index(IndexName::Index1, keys::artist_name_partition(owner_id))
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }
}

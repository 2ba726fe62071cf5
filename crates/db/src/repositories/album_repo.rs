//! Repository for album items.

use soundshelf_core::cursor::StartKey;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName};

use super::{fetch, insert, page, remove, replace, EntityPage};
use crate::models::album::Album;
use crate::store::{ItemStore, Query};

/// Provides CRUD operations for albums.
pub struct AlbumRepo;

impl AlbumRepo {
    pub async fn create(store: &dyn ItemStore, album: &Album) -> Result<(), CoreError> {
        insert(store, album, &album.id).await
    }

    pub async fn find(
        store: &dyn ItemStore,
        owner_id: &str,
        album_id: &str,
    ) -> Result<Option<Album>, CoreError> {
        let key = keys::primary_key(EntityType::Album, owner_id, album_id)?;
        fetch(store, &key).await
    }

    pub async fn update(store: &dyn ItemStore, album: &Album) -> Result<(), CoreError> {
        replace(store, album, &album.id).await
    }

    pub async fn delete(
        store: &dyn ItemStore,
        owner_id: &str,
        album_id: &str,
    ) -> Result<(), CoreError> {
        let key = keys::primary_key(EntityType::Album, owner_id, album_id)?;
        remove(store, &key, "album", album_id).await
    }

    pub async fn list_by_owner(
        store: &dyn ItemStore,
        owner_id: &str,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<Album>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        let query = Query::partition(keys::owner_pk(owner_id))
            .prefix(EntityType::Album.sk_prefix())
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }

    /// Albums credited to `artist`, oldest release first.
    pub async fn list_by_artist(
        store: &dyn ItemStore,
        owner_id: &str,
        artist: &str,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<Album>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        let query = Query::index(IndexName::Index1, keys::artist_partition(owner_id, artist))
            .prefix(EntityType::Album.sk_prefix())
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }
}

//! Repository for track items.

use soundshelf_core::cursor::StartKey;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, DiscoveryKind, EntityType, IndexName, ItemKey};

use super::{fetch, insert, page, remove, replace, EntityPage};
use crate::models::track::Track;
use crate::store::{relabel, ItemStore, Query, WriteOp};

/// Provides CRUD and browse operations for tracks.
pub struct TrackRepo;

impl TrackRepo {
    pub async fn create(store: &dyn ItemStore, track: &Track) -> Result<(), CoreError> {
        insert(store, track, &track.id).await
    }

    pub async fn find(
        store: &dyn ItemStore,
        owner_id: &str,
        track_id: &str,
    ) -> Result<Option<Track>, CoreError> {
        let key = keys::primary_key(EntityType::Track, owner_id, track_id)?;
        fetch(store, &key).await
    }

    /// Like [`TrackRepo::find`], but absence is an error.
    pub async fn get(
        store: &dyn ItemStore,
        owner_id: &str,
        track_id: &str,
    ) -> Result<Track, CoreError> {
        Self::find(store, owner_id, track_id)
            .await?
            .ok_or_else(|| CoreError::not_found("track", track_id))
    }

    pub async fn update(store: &dyn ItemStore, track: &Track) -> Result<(), CoreError> {
        replace(store, track, &track.id).await
    }

    pub async fn delete(
        store: &dyn ItemStore,
        owner_id: &str,
        track_id: &str,
    ) -> Result<(), CoreError> {
        let key = keys::primary_key(EntityType::Track, owner_id, track_id)?;
        remove(store, &key, "track", track_id).await
    }

    /// Delete a track together with dependent items (tag joins, rights) in
    /// one transaction.
    pub async fn delete_with_dependents(
        store: &dyn ItemStore,
        owner_id: &str,
        track_id: &str,
        dependents: Vec<ItemKey>,
    ) -> Result<(), CoreError> {
        let key = keys::primary_key(EntityType::Track, owner_id, track_id)?;
        let mut ops = vec![WriteOp::Delete(key)];
        ops.extend(dependents.into_iter().map(WriteOp::Delete));
        store
            .transact_write(ops)
            .await
            .map_err(|e| relabel(e, "track", track_id))
    }

    /// Tracks of an owner in id order.
    pub async fn list_by_owner(
        store: &dyn ItemStore,
        owner_id: &str,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<Track>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        let query = Query::partition(keys::owner_pk(owner_id))
            .prefix(EntityType::Track.sk_prefix())
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }

    /// Tracks of an owner credited to `artist`.
    pub async fn list_by_artist(
        store: &dyn ItemStore,
        owner_id: &str,
        artist: &str,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<Track>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        let query = Query::index(IndexName::Index1, keys::artist_partition(owner_id, artist))
            .prefix(EntityType::Track.sk_prefix())
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }

    /// Publicly discoverable tracks, newest first.
    pub async fn list_public(
        store: &dyn ItemStore,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<Track>, CoreError> {
        let query = Query::index(IndexName::Index2, DiscoveryKind::Track.partition())
            .descending()
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }
}

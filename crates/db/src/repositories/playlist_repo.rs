//! Repository for playlists and their position items.
//!
//! Membership is stored as one item per occupied position
//! (`PLAYLIST#{id}` / `POSITION#{%08d}`). Every membership change is written
//! together with the recomputed playlist stats in a single transaction.
//!
//! Each write of the playlist item is guarded on the `version` it was read
//! at, so two changes computed from the same membership cannot both commit.

use soundshelf_core::cursor::StartKey;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, DiscoveryKind, EntityType, IndexName};
use soundshelf_core::ordering;

use serde_json::json;

use super::{all, fetch, insert, page, EntityPage};
use crate::item::Storable;
use crate::models::playlist::{Playlist, PlaylistTrack};
use crate::store::{relabel, ItemStore, Query, WriteOp};

const VERSION: &str = "version";

/// Provides CRUD and membership operations for playlists.
pub struct PlaylistRepo;

impl PlaylistRepo {
    pub async fn create(store: &dyn ItemStore, playlist: &Playlist) -> Result<(), CoreError> {
        insert(store, playlist, &playlist.id).await
    }

    pub async fn find(
        store: &dyn ItemStore,
        owner_id: &str,
        playlist_id: &str,
    ) -> Result<Option<Playlist>, CoreError> {
        let key = keys::primary_key(EntityType::Playlist, owner_id, playlist_id)?;
        fetch(store, &key).await
    }

    pub async fn get(
        store: &dyn ItemStore,
        owner_id: &str,
        playlist_id: &str,
    ) -> Result<Playlist, CoreError> {
        Self::find(store, owner_id, playlist_id)
            .await?
            .ok_or_else(|| CoreError::not_found("playlist", playlist_id))
    }

    /// Replace the playlist item, failing with `Conflict` if it changed
    /// since `playlist` was read. Bumps `playlist.version` on success.
    pub async fn update(store: &dyn ItemStore, playlist: &mut Playlist) -> Result<(), CoreError> {
        let op = Self::versioned_write(playlist)?;
        store
            .transact_write(vec![op])
            .await
            .map_err(|e| relabel(e, "playlist", &playlist.id))?;
        playlist.version += 1;
        Ok(())
    }

    /// Guarded write of `playlist` at the next version.
    fn versioned_write(playlist: &Playlist) -> Result<WriteOp, CoreError> {
        let mut next = playlist.clone();
        next.version += 1;
        Ok(WriteOp::UpdateIf {
            item: next.to_item()?,
            attribute: VERSION,
            expected: json!(playlist.version),
        })
    }

    /// Delete the playlist and every position item in one transaction.
    ///
    /// The playlist item is version-checked before it is removed, so a
    /// membership change that commits in between fails the delete instead of
    /// leaving orphaned position items.
    pub async fn delete_with_members(
        store: &dyn ItemStore,
        owner_id: &str,
        playlist_id: &str,
    ) -> Result<usize, CoreError> {
        let playlist = Self::get(store, owner_id, playlist_id).await?;
        let members = Self::members(store, playlist_id).await?;
        let removed = members.len();
        let mut ops = vec![
            Self::versioned_write(&playlist)?,
            WriteOp::Delete(playlist.key()?),
        ];
        ops.extend(
            (0..removed).map(|pos| WriteOp::Delete(keys::playlist_position_key(playlist_id, pos))),
        );
        store
            .transact_write(ops)
            .await
            .map_err(|e| relabel(e, "playlist", playlist_id))?;
        Ok(removed)
    }

    pub async fn list_by_owner(
        store: &dyn ItemStore,
        owner_id: &str,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<Playlist>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        let query = Query::partition(keys::owner_pk(owner_id))
            .prefix(EntityType::Playlist.sk_prefix())
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }

    /// Publicly discoverable playlists, newest first.
    pub async fn list_public(
        store: &dyn ItemStore,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<Playlist>, CoreError> {
        let query = Query::index(IndexName::Index2, DiscoveryKind::Playlist.partition())
            .descending()
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }

    /// Membership in position order.
    pub async fn members(
        store: &dyn ItemStore,
        playlist_id: &str,
    ) -> Result<Vec<PlaylistTrack>, CoreError> {
        keys::validate_segment("playlist id", playlist_id)?;
        let query =
            Query::partition(keys::playlist_partition(playlist_id)).prefix(keys::position_prefix());
        all(store, query).await
    }

    /// Persist the change from `before` to `after` membership plus the
    /// playlist item, all-or-nothing.
    ///
    /// Only the suffix that differs is written. `before` must have been read
    /// after `playlist`: the transaction commits only while the playlist is
    /// still at the version read, so any concurrent membership change makes
    /// one of the two writers fail with `Conflict`. Bumps `playlist.version`
    /// on success.
    pub async fn write_membership(
        store: &dyn ItemStore,
        playlist: &mut Playlist,
        before: &[PlaylistTrack],
        after: &[PlaylistTrack],
    ) -> Result<(), CoreError> {
        let before_ids: Vec<&str> = before.iter().map(|m| m.track_id.as_str()).collect();
        let after_ids: Vec<&str> = after.iter().map(|m| m.track_id.as_str()).collect();
        let plan = ordering::rewrite_plan(&before_ids, &after_ids);

        let mut ops = Vec::with_capacity(plan.write.len() + plan.delete.len() + 1);
        for pos in plan.write.clone() {
            let mut entry = after[pos].clone();
            entry.position = pos;
            let item = entry.to_item()?;
            ops.push(if pos < before.len() {
                WriteOp::Put(item)
            } else {
                WriteOp::Create(item)
            });
        }
        for pos in plan.delete.clone() {
            ops.push(WriteOp::Delete(keys::playlist_position_key(&playlist.id, pos)));
        }
        ops.push(Self::versioned_write(playlist)?);

        tracing::debug!(
            playlist_id = %playlist.id,
            written = plan.write.len(),
            deleted = plan.delete.len(),
            "Rewriting playlist membership"
        );
        store
            .transact_write(ops)
            .await
            .map_err(|e| relabel(e, "playlist", &playlist.id))?;
        playlist.version += 1;
        Ok(())
    }
}

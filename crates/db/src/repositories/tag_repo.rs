//! Repository for tags and track-tag joins.

use soundshelf_core::cursor::StartKey;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName, ItemKey};

use super::{all, fetch, insert, page, remove, EntityPage};
use crate::models::tag::{Tag, TrackTag};
use crate::store::{relabel, ItemStore, Query, WriteOp};

/// Provides operations for tags and the tags applied to tracks.
pub struct TagRepo;

impl TagRepo {
    pub async fn create(store: &dyn ItemStore, tag: &Tag) -> Result<(), CoreError> {
        insert(store, tag, &tag.name).await
    }

    pub async fn find(
        store: &dyn ItemStore,
        owner_id: &str,
        name: &str,
    ) -> Result<Option<Tag>, CoreError> {
        let key = keys::primary_key(EntityType::Tag, owner_id, name)?;
        fetch(store, &key).await
    }

    pub async fn list(
        store: &dyn ItemStore,
        owner_id: &str,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<Tag>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        let query = Query::partition(keys::owner_pk(owner_id))
            .prefix(EntityType::Tag.sk_prefix())
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }

    /// Delete a tag and every join that applies it, in one transaction.
    pub async fn delete_with_joins(
        store: &dyn ItemStore,
        owner_id: &str,
        name: &str,
    ) -> Result<usize, CoreError> {
        let key = keys::primary_key(EntityType::Tag, owner_id, name)?;
        let joins: Vec<TrackTag> = all(
            store,
            Query::index(IndexName::Index1, keys::tag_index_partition(owner_id, name)),
        )
        .await?;
        let removed = joins.len();
        let mut ops = vec![WriteOp::Delete(key)];
        ops.extend(joins.iter().map(|j| {
            WriteOp::Delete(keys::track_tag_key(&j.owner_id, &j.track_id, &j.tag_name))
        }));
        store
            .transact_write(ops)
            .await
            .map_err(|e| relabel(e, "tag", name))?;
        Ok(removed)
    }

    /// Create the join and its tag-partition projection in one guarded write.
    pub async fn add_to_track(store: &dyn ItemStore, join: &TrackTag) -> Result<(), CoreError> {
        insert(store, join, &format!("{}:{}", join.track_id, join.tag_name)).await
    }

    pub async fn remove_from_track(
        store: &dyn ItemStore,
        owner_id: &str,
        track_id: &str,
        name: &str,
    ) -> Result<(), CoreError> {
        keys::validate_segment("track id", track_id)?;
        keys::validate_segment("tag name", name)?;
        let key = keys::track_tag_key(owner_id, track_id, name);
        remove(store, &key, "track tag", &format!("{track_id}:{name}")).await
    }

    pub async fn tags_for_track(
        store: &dyn ItemStore,
        owner_id: &str,
        track_id: &str,
    ) -> Result<Vec<TrackTag>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        keys::validate_segment("track id", track_id)?;
        let query =
            Query::partition(keys::track_tags_partition(owner_id, track_id)).prefix(keys::tag_sk(""));
        all(store, query).await
    }

    /// Keys of every join under a track, for cascading deletes.
    pub async fn join_keys_for_track(
        store: &dyn ItemStore,
        owner_id: &str,
        track_id: &str,
    ) -> Result<Vec<ItemKey>, CoreError> {
        Ok(Self::tags_for_track(store, owner_id, track_id)
            .await?
            .iter()
            .map(|j| keys::track_tag_key(&j.owner_id, &j.track_id, &j.tag_name))
            .collect())
    }

    /// Tracks carrying `name`, via the tag-partition projection.
    pub async fn tracks_by_tag(
        store: &dyn ItemStore,
        owner_id: &str,
        name: &str,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<TrackTag>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        keys::validate_segment("tag name", name)?;
        let query = Query::index(IndexName::Index1, keys::tag_index_partition(owner_id, name))
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }
}

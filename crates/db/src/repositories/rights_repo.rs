//! Repository for track rights and rights holders.

use soundshelf_core::cursor::StartKey;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, ItemKey};
use soundshelf_core::rights::RightType;

use super::{all, fetch, insert, page, remove, replace, EntityPage};
use crate::item::Storable;
use crate::models::rights::{RightsHolder, TrackRights};
use crate::store::{relabel, ItemStore, Query, WriteOp};

/// Provides operations for rights sets and holders.
pub struct RightsRepo;

impl RightsRepo {
    /// Rights of a track, optionally narrowed to one right type.
    pub async fn for_track(
        store: &dyn ItemStore,
        owner_id: &str,
        track_id: &str,
        right_type: Option<RightType>,
    ) -> Result<Vec<TrackRights>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        keys::validate_segment("track id", track_id)?;
        let query = Query::partition(keys::owner_pk(owner_id))
            .prefix(keys::rights_prefix(track_id, right_type.map(RightType::name)));
        all(store, query).await
    }

    /// Keys of every rights item of a track, for cascading deletes.
    pub async fn keys_for_track(
        store: &dyn ItemStore,
        owner_id: &str,
        track_id: &str,
    ) -> Result<Vec<ItemKey>, CoreError> {
        Self::for_track(store, owner_id, track_id, None)
            .await?
            .iter()
            .map(TrackRights::key)
            .collect()
    }

    /// Rights entries of any of the owner's tracks that name `holder_id`.
    pub async fn referencing_holder(
        store: &dyn ItemStore,
        owner_id: &str,
        holder_id: &str,
    ) -> Result<Vec<TrackRights>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        let query = Query::partition(keys::owner_pk(owner_id))
            .prefix(EntityType::TrackRights.sk_prefix());
        let rights: Vec<TrackRights> = all(store, query).await?;
        Ok(rights
            .into_iter()
            .filter(|r| r.holder_id == holder_id)
            .collect())
    }

    /// Replace the whole (track, right type) set in one transaction.
    ///
    /// Holders absent from `entries` are deleted; the rest are upserted.
    /// Every named holder must still exist when the transaction commits.
    pub async fn replace_set(
        store: &dyn ItemStore,
        owner_id: &str,
        track_id: &str,
        right_type: RightType,
        entries: &[TrackRights],
    ) -> Result<(), CoreError> {
        let existing = Self::for_track(store, owner_id, track_id, Some(right_type)).await?;

        let mut ops = Vec::with_capacity(existing.len() + entries.len());
        for old in &existing {
            if !entries.iter().any(|e| e.holder_id == old.holder_id) {
                ops.push(WriteOp::Delete(old.key()?));
            }
        }
        for entry in entries {
            ops.push(WriteOp::Put(entry.to_item()?));
            ops.push(WriteOp::ConditionCheck(keys::primary_key(
                EntityType::RightsHolder,
                owner_id,
                &entry.holder_id,
            )?));
        }
        store
            .transact_write(ops)
            .await
            .map_err(|e| relabel(e, "track rights", track_id))
    }

    pub async fn create_holder(
        store: &dyn ItemStore,
        holder: &RightsHolder,
    ) -> Result<(), CoreError> {
        insert(store, holder, &holder.id).await
    }

    pub async fn find_holder(
        store: &dyn ItemStore,
        owner_id: &str,
        holder_id: &str,
    ) -> Result<Option<RightsHolder>, CoreError> {
        let key = keys::primary_key(EntityType::RightsHolder, owner_id, holder_id)?;
        fetch(store, &key).await
    }

    pub async fn update_holder(
        store: &dyn ItemStore,
        holder: &RightsHolder,
    ) -> Result<(), CoreError> {
        replace(store, holder, &holder.id).await
    }

    pub async fn delete_holder(
        store: &dyn ItemStore,
        owner_id: &str,
        holder_id: &str,
    ) -> Result<(), CoreError> {
        let key = keys::primary_key(EntityType::RightsHolder, owner_id, holder_id)?;
        remove(store, &key, "rights holder", holder_id).await
    }

    pub async fn list_holders(
        store: &dyn ItemStore,
        owner_id: &str,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<RightsHolder>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        let query = Query::partition(keys::owner_pk(owner_id))
            .prefix(EntityType::RightsHolder.sk_prefix())
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }
}

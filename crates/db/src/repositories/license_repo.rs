//! Repository for license items.

use soundshelf_core::cursor::StartKey;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName};

use super::{fetch, insert, page, replace, EntityPage};
use crate::models::license::License;
use crate::store::{ItemStore, Query};

/// Provides CRUD operations for licenses.
pub struct LicenseRepo;

impl LicenseRepo {
    pub async fn create(store: &dyn ItemStore, license: &License) -> Result<(), CoreError> {
        insert(store, license, &license.id).await
    }

    pub async fn find(
        store: &dyn ItemStore,
        owner_id: &str,
        license_id: &str,
    ) -> Result<Option<License>, CoreError> {
        let key = keys::primary_key(EntityType::License, owner_id, license_id)?;
        fetch(store, &key).await
    }

    pub async fn update(store: &dyn ItemStore, license: &License) -> Result<(), CoreError> {
        replace(store, license, &license.id).await
    }

    /// An owner's licenses granted over a track, by start date.
    pub async fn list_by_track(
        store: &dyn ItemStore,
        owner_id: &str,
        track_id: &str,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<License>, CoreError> {
        keys::validate_segment("owner id", owner_id)?;
        keys::validate_segment("track id", track_id)?;
        let query = Query::index(IndexName::Index1, keys::license_track_partition(owner_id, track_id))
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }
}

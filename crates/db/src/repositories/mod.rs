//! Repository layer: one zero-sized struct per entity, each taking the
//! [`ItemStore`] as its first argument.
//!
//! Shared helpers below translate between entities and items and attach
//! entity labels to the store's guard errors.

use soundshelf_core::cursor::StartKey;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::ItemKey;

use crate::item::Storable;
use crate::store::{self, relabel, ItemStore, Query};

pub mod album_repo;
pub mod artist_repo;
pub mod follow_repo;
pub mod license_repo;
pub mod playlist_repo;
pub mod rights_repo;
pub mod tag_repo;
pub mod track_repo;
pub mod upload_repo;
pub mod user_repo;

pub use album_repo::AlbumRepo;
pub use artist_repo::ArtistRepo;
pub use follow_repo::FollowRepo;
pub use license_repo::LicenseRepo;
pub use playlist_repo::PlaylistRepo;
pub use rights_repo::RightsRepo;
pub use tag_repo::TagRepo;
pub use track_repo::TrackRepo;
pub use upload_repo::UploadRepo;
pub use user_repo::UserRepo;

/// One page of decoded entities plus the raw resume position.
#[derive(Debug, Clone)]
pub struct EntityPage<T> {
    pub items: Vec<T>,
    pub last_key: Option<StartKey>,
}

impl<T> EntityPage<T> {
    pub fn has_more(&self) -> bool {
        self.last_key.is_some()
    }
}

/// Guarded create of an entity.
pub(crate) async fn insert<T: Storable>(
    store: &dyn ItemStore,
    entity: &T,
    id: &str,
) -> Result<(), CoreError> {
    store
        .create(entity.to_item()?)
        .await
        .map_err(|e| relabel(e, T::ENTITY_TYPE.label(), id))
}

/// Guarded replace of an existing entity (projections follow the new state).
pub(crate) async fn replace<T: Storable>(
    store: &dyn ItemStore,
    entity: &T,
    id: &str,
) -> Result<(), CoreError> {
    store
        .update(entity.to_item()?)
        .await
        .map_err(|e| relabel(e, T::ENTITY_TYPE.label(), id))
}

pub(crate) async fn fetch<T: Storable>(
    store: &dyn ItemStore,
    key: &ItemKey,
) -> Result<Option<T>, CoreError> {
    store
        .get(key)
        .await?
        .map(|item| T::from_item(&item))
        .transpose()
}

pub(crate) async fn remove(
    store: &dyn ItemStore,
    key: &ItemKey,
    entity: &'static str,
    id: &str,
) -> Result<(), CoreError> {
    store
        .delete(key)
        .await
        .map_err(|e| relabel(e, entity, id))
}

pub(crate) async fn page<T: Storable>(
    store: &dyn ItemStore,
    query: &Query,
) -> Result<EntityPage<T>, CoreError> {
    let raw = store.query(query).await?;
    let items = raw
        .items
        .iter()
        .map(T::from_item)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(EntityPage {
        items,
        last_key: raw.last_key,
    })
}

pub(crate) async fn all<T: Storable>(
    store: &dyn ItemStore,
    query: Query,
) -> Result<Vec<T>, CoreError> {
    store::query_all(store, query)
        .await?
        .iter()
        .map(T::from_item)
        .collect()
}

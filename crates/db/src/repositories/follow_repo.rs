//! Repository for follow edges.
//!
//! Each edge is one item: the forward entry under the follower's partition
//! with the `FOLLOWERS#` projection on Index-1.

use soundshelf_core::cursor::StartKey;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, IndexName};

use super::{fetch, page, EntityPage};
use crate::item::Storable;
use crate::models::follow::Follow;
use crate::store::{query_all, relabel, ItemStore, Query};

/// Provides edge operations over the follow graph.
pub struct FollowRepo;

fn edge_id(follower_id: &str, followed_id: &str) -> String {
    format!("{follower_id}->{followed_id}")
}

impl FollowRepo {
    /// Create the edge and its reverse projection in one guarded write.
    pub async fn create(store: &dyn ItemStore, follow: &Follow) -> Result<(), CoreError> {
        store
            .create(follow.to_item()?)
            .await
            .map_err(|e| relabel(e, "follow", &edge_id(&follow.follower_id, &follow.followed_id)))
    }

    /// Remove the edge and its projection; `NotFound` if absent.
    pub async fn delete(
        store: &dyn ItemStore,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<(), CoreError> {
        keys::validate_segment("follower id", follower_id)?;
        keys::validate_segment("followed id", followed_id)?;
        store
            .delete(&keys::follow_key(follower_id, followed_id))
            .await
            .map_err(|e| relabel(e, "follow", &edge_id(follower_id, followed_id)))
    }

    pub async fn find(
        store: &dyn ItemStore,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<Option<Follow>, CoreError> {
        keys::validate_segment("follower id", follower_id)?;
        keys::validate_segment("followed id", followed_id)?;
        fetch(store, &keys::follow_key(follower_id, followed_id)).await
    }

    /// Users `follower_id` follows, via the forward entries.
    pub async fn list_following(
        store: &dyn ItemStore,
        follower_id: &str,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<Follow>, CoreError> {
        keys::validate_segment("follower id", follower_id)?;
        let query = Query::partition(keys::owner_pk(follower_id))
            .prefix(keys::following_prefix())
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }

    /// Users following `followed_id`, via the reverse projection.
    pub async fn list_followers(
        store: &dyn ItemStore,
        followed_id: &str,
        limit: usize,
        start: Option<StartKey>,
    ) -> Result<EntityPage<Follow>, CoreError> {
        keys::validate_segment("followed id", followed_id)?;
        let query = Query::index(IndexName::Index1, keys::followers_partition(followed_id))
            .limit(limit)
            .start_after(start);
        page(store, &query).await
    }

    pub async fn count_followers(
        store: &dyn ItemStore,
        followed_id: &str,
    ) -> Result<usize, CoreError> {
        keys::validate_segment("followed id", followed_id)?;
        let items = query_all(
            store,
            Query::index(IndexName::Index1, keys::followers_partition(followed_id)),
        )
        .await?;
        Ok(items.len())
    }
}

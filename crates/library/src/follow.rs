//! Follow graph between users.
//!
//! One follow item carries both directions: its primary key lists it under
//! the follower, its Index-1 projection under the followed user. Creating
//! or deleting the item therefore moves both halves together.

use std::sync::Arc;

use chrono::Utc;
use soundshelf_core::cursor::{Page, PageRequest};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys;
use soundshelf_db::models::follow::Follow;
use soundshelf_db::repositories::{FollowRepo, UserRepo};
use soundshelf_db::store::ItemStore;

use crate::paging::Pager;

#[derive(Clone)]
pub struct FollowService {
    store: Arc<dyn ItemStore>,
    pager: Pager,
}

impl FollowService {
    pub fn new(store: Arc<dyn ItemStore>, pager: Pager) -> Self {
        Self { store, pager }
    }

    pub async fn follow(&self, follower_id: &str, followed_id: &str) -> Result<Follow, CoreError> {
        keys::validate_segment("follower id", follower_id)?;
        keys::validate_segment("followed id", followed_id)?;
        if follower_id == followed_id {
            return Err(CoreError::Validation("Users cannot follow themselves".into()));
        }
        UserRepo::get(self.store.as_ref(), follower_id).await?;
        UserRepo::get(self.store.as_ref(), followed_id).await?;

        let follow = Follow {
            follower_id: follower_id.to_string(),
            followed_id: followed_id.to_string(),
            created_at: Utc::now(),
        };
        FollowRepo::create(self.store.as_ref(), &follow).await?;
        tracing::info!(follower_id, followed_id, "User followed");
        Ok(follow)
    }

    pub async fn unfollow(&self, follower_id: &str, followed_id: &str) -> Result<(), CoreError> {
        FollowRepo::delete(self.store.as_ref(), follower_id, followed_id).await?;
        tracing::info!(follower_id, followed_id, "User unfollowed");
        Ok(())
    }

    pub async fn is_following(&self, follower_id: &str, followed_id: &str) -> Result<bool, CoreError> {
        Ok(FollowRepo::find(self.store.as_ref(), follower_id, followed_id)
            .await?
            .is_some())
    }

    pub async fn list_followers(
        &self,
        user_id: &str,
        request: &PageRequest,
    ) -> Result<Page<Follow>, CoreError> {
        let (limit, start) = self.pager.start(request)?;
        let page = FollowRepo::list_followers(self.store.as_ref(), user_id, limit, start).await?;
        self.pager.finish(page)
    }

    pub async fn list_following(
        &self,
        user_id: &str,
        request: &PageRequest,
    ) -> Result<Page<Follow>, CoreError> {
        let (limit, start) = self.pager.start(request)?;
        let page = FollowRepo::list_following(self.store.as_ref(), user_id, limit, start).await?;
        self.pager.finish(page)
    }

    pub async fn follower_count(&self, user_id: &str) -> Result<usize, CoreError> {
        FollowRepo::count_followers(self.store.as_ref(), user_id).await
    }
}

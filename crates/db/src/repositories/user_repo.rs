//! Repository for user profile items.

use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName};

use super::{fetch, insert, replace};
use crate::item::Storable;
use crate::models::user::User;
use crate::store::{ItemStore, Query};

/// Provides CRUD operations for user profiles.
pub struct UserRepo;

impl UserRepo {
    pub async fn create(store: &dyn ItemStore, user: &User) -> Result<(), CoreError> {
        insert(store, user, &user.id).await
    }

    pub async fn find(store: &dyn ItemStore, user_id: &str) -> Result<Option<User>, CoreError> {
        let key = keys::primary_key(EntityType::User, user_id, user_id)?;
        fetch(store, &key).await
    }

    pub async fn get(store: &dyn ItemStore, user_id: &str) -> Result<User, CoreError> {
        Self::find(store, user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", user_id))
    }

    /// Resolve a user through the email projection (case-insensitive).
    pub async fn find_by_email(
        store: &dyn ItemStore,
        email: &str,
    ) -> Result<Option<User>, CoreError> {
        let query = Query::index(IndexName::Index1, keys::email_partition(email))
            .prefix(EntityType::User.sk_prefix())
            .limit(1);
        let page = store.query(&query).await?;
        page.items.first().map(User::from_item).transpose()
    }

    /// Guarded replace; fails with `NotFound` if the profile was removed.
    pub async fn update(store: &dyn ItemStore, user: &User) -> Result<(), CoreError> {
        replace(store, user, &user.id).await
    }
}

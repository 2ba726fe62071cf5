//! User profile model and DTOs.

use serde::{Deserialize, Serialize};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName, ItemKey};
use soundshelf_core::roles::UserRole;
use soundshelf_core::types::{EntityId, Timestamp};
use validator::Validate;

use crate::item::Storable;

/// A user profile. The user's own partition is `OWNER#{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub role: UserRole,
    /// Mirrors the enabled flag in the identity service.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    pub avatar_key: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn enabled_default() -> bool {
    true
}

impl Storable for User {
    const ENTITY_TYPE: EntityType = EntityType::User;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::primary_key(EntityType::User, &self.id, &self.id)
    }

    fn indexes(&self) -> Vec<(IndexName, ItemKey)> {
        vec![(IndexName::Index1, keys::email_index_key(&self.email, &self.id))]
    }
}

/// DTO for creating a profile. The id comes from the identity service.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 128))]
    pub id: EntityId,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
}

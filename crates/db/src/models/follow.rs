//! Follow edge model.

use serde::{Deserialize, Serialize};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName, ItemKey};
use soundshelf_core::types::{EntityId, Timestamp};

use crate::item::Storable;

/// `follower_id` follows `followed_id`.
///
/// The forward entry (`OWNER#{follower}` / `FOLLOWING#{followed}`) and the
/// reverse projection (`FOLLOWERS#{followed}` / `OWNER#{follower}`) are the
/// same stored row, so one conditional write creates or removes both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub follower_id: EntityId,
    pub followed_id: EntityId,
    pub created_at: Timestamp,
}

impl Storable for Follow {
    const ENTITY_TYPE: EntityType = EntityType::Follow;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::validate_segment("follower id", &self.follower_id)?;
        keys::validate_segment("followed id", &self.followed_id)?;
        Ok(keys::follow_key(&self.follower_id, &self.followed_id))
    }

    fn indexes(&self) -> Vec<(IndexName, ItemKey)> {
        vec![(
            IndexName::Index1,
            keys::followers_index_key(&self.follower_id, &self.followed_id),
        )]
    }
}

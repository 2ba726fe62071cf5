//! Track rights and rights-holder models.

use serde::{Deserialize, Serialize};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, ItemKey};
use soundshelf_core::rights::{HolderType, RightType};
use soundshelf_core::types::{EntityId, Timestamp};
use validator::Validate;

use crate::item::Storable;

/// One holder's share of one right type over a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRights {
    pub owner_id: EntityId,
    pub track_id: EntityId,
    pub right_type: RightType,
    pub holder_id: EntityId,
    pub share_percent: f64,
    pub territories: Vec<String>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Storable for TrackRights {
    const ENTITY_TYPE: EntityType = EntityType::TrackRights;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::validate_segment("owner id", &self.owner_id)?;
        keys::validate_segment("track id", &self.track_id)?;
        keys::validate_segment("holder id", &self.holder_id)?;
        Ok(keys::rights_key(
            &self.owner_id,
            &self.track_id,
            self.right_type.name(),
            &self.holder_id,
        ))
    }
}

/// A holder's entry in a rights set being replaced.
#[derive(Debug, Clone, Deserialize)]
pub struct RightsShare {
    pub holder_id: EntityId,
    pub share_percent: f64,
    pub territories: Vec<String>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
}

/// A label, publisher, PRO, distributor or artist that can hold rights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RightsHolder {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub name: String,
    pub holder_type: HolderType,
    pub ipi: Option<String>,
    pub isni: Option<String>,
    pub email: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Storable for RightsHolder {
    const ENTITY_TYPE: EntityType = EntityType::RightsHolder;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::primary_key(EntityType::RightsHolder, &self.owner_id, &self.id)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRightsHolder {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub holder_type: HolderType,
    pub ipi: Option<String>,
    pub isni: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRightsHolder {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub holder_type: Option<HolderType>,
    pub ipi: Option<String>,
    pub isni: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

//! License model and DTOs.

use serde::{Deserialize, Serialize};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{self, EntityType, IndexName, ItemKey};
use soundshelf_core::rights::{self, LicenseStatus};
use soundshelf_core::types::{EntityId, Timestamp};
use validator::Validate;

use crate::item::Storable;

/// A grant of use over a track to a licensee.
///
/// `is_active` / `is_expired` are derived from status and the clock and are
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub track_id: EntityId,
    pub licensee: String,
    pub license_type: String,
    pub territories: Vec<String>,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    /// Fee in minor currency units.
    pub fee: i64,
    pub currency: Option<String>,
    pub status: LicenseStatus,
    #[serde(default)]
    pub auto_renew: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl License {
    pub fn is_active(&self, now: &Timestamp) -> bool {
        rights::license_is_active(self.status, &self.start_date, &self.end_date, now)
    }

    pub fn is_expired(&self, now: &Timestamp) -> bool {
        rights::license_is_expired(self.status, &self.end_date, now)
    }

    pub fn can_auto_renew(&self, now: &Timestamp) -> bool {
        rights::license_can_auto_renew(self.auto_renew, self.status, &self.end_date, now)
    }

    /// Worldwide licenses cover every territory.
    pub fn covers_territory(&self, code: &str) -> bool {
        self.territories.iter().any(|t| t == code || t == "WW")
    }
}

impl Storable for License {
    const ENTITY_TYPE: EntityType = EntityType::License;

    fn key(&self) -> Result<ItemKey, CoreError> {
        keys::primary_key(EntityType::License, &self.owner_id, &self.id)
    }

    fn indexes(&self) -> Vec<(IndexName, ItemKey)> {
        vec![(
            IndexName::Index1,
            keys::license_track_index_key(&self.owner_id, &self.track_id, &self.start_date, &self.id),
        )]
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLicense {
    pub track_id: EntityId,
    #[validate(length(min = 1, max = 200))]
    pub licensee: String,
    #[validate(length(min = 1, max = 50))]
    pub license_type: String,
    pub territories: Vec<String>,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    #[serde(default)]
    pub fee: i64,
    pub currency: Option<String>,
    #[serde(default = "pending_status")]
    pub status: LicenseStatus,
    #[serde(default)]
    pub auto_renew: bool,
}

fn pending_status() -> LicenseStatus {
    LicenseStatus::Pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn license(status: LicenseStatus, territories: &[&str]) -> License {
        let now = Utc::now();
        License {
            id: "l1".into(),
            owner_id: "u1".into(),
            track_id: "t1".into(),
            licensee: "Studio".into(),
            license_type: "sync".into(),
            territories: territories.iter().map(|t| t.to_string()).collect(),
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(30),
            fee: 5000,
            currency: Some("USD".into()),
            status,
            auto_renew: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn active_within_window() {
        let l = license(LicenseStatus::Active, &["US"]);
        let now = Utc::now();
        assert!(l.is_active(&now));
        assert!(!l.is_expired(&now));
        assert!(l.can_auto_renew(&now));
        assert!(!l.is_active(&(now + Duration::days(60))));
        assert!(l.is_expired(&(now + Duration::days(60))));
    }

    #[test]
    fn worldwide_covers_everything() {
        assert!(license(LicenseStatus::Active, &["WW"]).covers_territory("JP"));
        assert!(!license(LicenseStatus::Active, &["US"]).covers_territory("JP"));
    }

    #[test]
    fn index_orders_by_start_date() {
        let item = license(LicenseStatus::Pending, &["US"]).to_item().unwrap();
        assert_eq!(
            item.index1.unwrap().pk,
            keys::license_track_partition("u1", "t1")
        );
    }
}

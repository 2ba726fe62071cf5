//! Track rights splits and rights holders.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use soundshelf_core::cursor::{Page, PageRequest};
use soundshelf_core::error::CoreError;
use soundshelf_core::rights::{self, RightType};
use soundshelf_core::types::new_id;
use soundshelf_db::models::rights::{
    CreateRightsHolder, RightsHolder, RightsShare, TrackRights, UpdateRightsHolder,
};
use soundshelf_db::repositories::{RightsRepo, TrackRepo};
use soundshelf_db::store::ItemStore;

use crate::paging::Pager;
use crate::validate_input;

#[derive(Clone)]
pub struct RightsService {
    store: Arc<dyn ItemStore>,
    pager: Pager,
}

impl RightsService {
    pub fn new(store: Arc<dyn ItemStore>, pager: Pager) -> Self {
        Self { store, pager }
    }

    /// Replace the holders of one right type on a track.
    ///
    /// The shares must sum to 100% (within a hundredth); the old set and
    /// the new set swap in one transaction.
    pub async fn set_track_rights(
        &self,
        owner_id: &str,
        track_id: &str,
        right_type: RightType,
        shares: Vec<RightsShare>,
    ) -> Result<Vec<TrackRights>, CoreError> {
        TrackRepo::get(self.store.as_ref(), owner_id, track_id).await?;

        let mut seen = HashSet::new();
        for share in &shares {
            if !seen.insert(share.holder_id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Holder {} appears more than once",
                    share.holder_id
                )));
            }
            rights::validate_share_percent(share.share_percent)?;
            rights::validate_territories(&share.territories)?;
            rights::validate_date_range(share.start_date.as_ref(), share.end_date.as_ref())?;
        }
        let percents: Vec<f64> = shares.iter().map(|s| s.share_percent).collect();
        rights::validate_share_sum(right_type, &percents)?;

        for share in &shares {
            if RightsRepo::find_holder(self.store.as_ref(), owner_id, &share.holder_id)
                .await?
                .is_none()
            {
                return Err(CoreError::not_found("rights holder", &share.holder_id));
            }
        }

        let now = Utc::now();
        let entries: Vec<TrackRights> = shares
            .into_iter()
            .map(|share| TrackRights {
                owner_id: owner_id.to_string(),
                track_id: track_id.to_string(),
                right_type,
                holder_id: share.holder_id,
                share_percent: share.share_percent,
                territories: share.territories,
                start_date: share.start_date,
                end_date: share.end_date,
                created_at: now,
            })
            .collect();
        RightsRepo::replace_set(self.store.as_ref(), owner_id, track_id, right_type, &entries).await?;

        tracing::info!(
            track_id,
            right_type = right_type.name(),
            holders = entries.len(),
            "Track rights replaced"
        );
        Ok(entries)
    }

    /// Every rights entry of a track, grouped by right type.
    pub async fn rights_for_track(
        &self,
        owner_id: &str,
        track_id: &str,
    ) -> Result<Vec<TrackRights>, CoreError> {
        RightsRepo::for_track(self.store.as_ref(), owner_id, track_id, None).await
    }

    // -----------------------------------------------------------------------
    // Holders
    // -----------------------------------------------------------------------

    pub async fn create_holder(
        &self,
        owner_id: &str,
        input: CreateRightsHolder,
    ) -> Result<RightsHolder, CoreError> {
        validate_input(&input)?;
        check_identifiers(input.ipi.as_deref(), input.isni.as_deref())?;
        let now = Utc::now();
        let holder = RightsHolder {
            id: new_id(),
            owner_id: owner_id.to_string(),
            name: input.name,
            holder_type: input.holder_type,
            ipi: input.ipi,
            isni: input.isni,
            email: input.email,
            created_at: now,
            updated_at: now,
        };
        RightsRepo::create_holder(self.store.as_ref(), &holder).await?;
        tracing::info!(holder_id = %holder.id, holder_type = holder.holder_type.name(), "Rights holder created");
        Ok(holder)
    }

    pub async fn get_holder(&self, owner_id: &str, holder_id: &str) -> Result<RightsHolder, CoreError> {
        RightsRepo::find_holder(self.store.as_ref(), owner_id, holder_id)
            .await?
            .ok_or_else(|| CoreError::not_found("rights holder", holder_id))
    }

    pub async fn update_holder(
        &self,
        owner_id: &str,
        holder_id: &str,
        input: UpdateRightsHolder,
    ) -> Result<RightsHolder, CoreError> {
        validate_input(&input)?;
        check_identifiers(input.ipi.as_deref(), input.isni.as_deref())?;
        let mut holder = self.get_holder(owner_id, holder_id).await?;
        if let Some(name) = input.name {
            holder.name = name;
        }
        if let Some(holder_type) = input.holder_type {
            holder.holder_type = holder_type;
        }
        if input.ipi.is_some() {
            holder.ipi = input.ipi;
        }
        if input.isni.is_some() {
            holder.isni = input.isni;
        }
        if input.email.is_some() {
            holder.email = input.email;
        }
        holder.updated_at = Utc::now();
        RightsRepo::update_holder(self.store.as_ref(), &holder).await?;
        Ok(holder)
    }

    /// Holders named by any rights set cannot be deleted; replace those
    /// sets first.
    pub async fn delete_holder(&self, owner_id: &str, holder_id: &str) -> Result<(), CoreError> {
        let references =
            RightsRepo::referencing_holder(self.store.as_ref(), owner_id, holder_id).await?;
        if let Some(first) = references.first() {
            return Err(CoreError::Conflict(format!(
                "Rights holder {holder_id} is named by {} rights entries (first on track {})",
                references.len(),
                first.track_id
            )));
        }
        RightsRepo::delete_holder(self.store.as_ref(), owner_id, holder_id).await?;
        tracing::info!(owner_id, holder_id, "Rights holder deleted");
        Ok(())
    }

    pub async fn list_holders(
        &self,
        owner_id: &str,
        request: &PageRequest,
    ) -> Result<Page<RightsHolder>, CoreError> {
        let (limit, start) = self.pager.start(request)?;
        let page = RightsRepo::list_holders(self.store.as_ref(), owner_id, limit, start).await?;
        self.pager.finish(page)
    }
}

fn check_identifiers(ipi: Option<&str>, isni: Option<&str>) -> Result<(), CoreError> {
    if let Some(ipi) = ipi.filter(|v| !rights::is_valid_ipi(v)) {
        return Err(CoreError::Validation(format!(
            "IPI '{ipi}' must be 9 to 11 digits"
        )));
    }
    if let Some(isni) = isni.filter(|v| !rights::is_valid_isni(v)) {
        return Err(CoreError::Validation(format!(
            "ISNI '{isni}' must be 16 characters (digits, optional trailing X)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn identifiers_are_checked_when_present() {
        assert!(check_identifiers(None, None).is_ok());
        assert!(check_identifiers(Some("123456789"), Some("000000012146438X")).is_ok());
        assert_matches!(check_identifiers(Some("12"), None), Err(CoreError::Validation(_)));
        assert_matches!(check_identifiers(None, Some("abc")), Err(CoreError::Validation(_)));
    }
}

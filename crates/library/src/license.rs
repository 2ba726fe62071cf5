//! Track licences.

use std::sync::Arc;

use chrono::Utc;
use soundshelf_core::cursor::{Page, PageRequest};
use soundshelf_core::error::CoreError;
use soundshelf_core::rights::{self, LicenseStatus};
use soundshelf_core::types::new_id;
use soundshelf_db::models::license::{CreateLicense, License};
use soundshelf_db::repositories::{LicenseRepo, TrackRepo};
use soundshelf_db::store::ItemStore;

use crate::paging::Pager;
use crate::validate_input;

#[derive(Clone)]
pub struct LicenseService {
    store: Arc<dyn ItemStore>,
    pager: Pager,
}

impl LicenseService {
    pub fn new(store: Arc<dyn ItemStore>, pager: Pager) -> Self {
        Self { store, pager }
    }

    pub async fn create_license(&self, owner_id: &str, input: CreateLicense) -> Result<License, CoreError> {
        validate_input(&input)?;
        rights::validate_territories(&input.territories)?;
        rights::validate_date_range(Some(&input.start_date), Some(&input.end_date))?;
        rights::validate_license_terms(input.fee, input.currency.as_deref())?;
        TrackRepo::get(self.store.as_ref(), owner_id, &input.track_id).await?;

        let now = Utc::now();
        let license = License {
            id: new_id(),
            owner_id: owner_id.to_string(),
            track_id: input.track_id,
            licensee: input.licensee,
            license_type: input.license_type,
            territories: input.territories,
            start_date: input.start_date,
            end_date: input.end_date,
            fee: input.fee,
            currency: input.currency,
            status: input.status,
            auto_renew: input.auto_renew,
            created_at: now,
            updated_at: now,
        };
        LicenseRepo::create(self.store.as_ref(), &license).await?;
        tracing::info!(license_id = %license.id, track_id = %license.track_id, "License created");
        Ok(license)
    }

    pub async fn get_license(&self, owner_id: &str, license_id: &str) -> Result<License, CoreError> {
        LicenseRepo::find(self.store.as_ref(), owner_id, license_id)
            .await?
            .ok_or_else(|| CoreError::not_found("license", license_id))
    }

    /// Licences of one of the owner's tracks, by start date.
    pub async fn list_licenses_for_track(
        &self,
        owner_id: &str,
        track_id: &str,
        request: &PageRequest,
    ) -> Result<Page<License>, CoreError> {
        TrackRepo::get(self.store.as_ref(), owner_id, track_id).await?;
        let (limit, start) = self.pager.start(request)?;
        let page = LicenseRepo::list_by_track(self.store.as_ref(), owner_id, track_id, limit, start).await?;
        self.pager.finish(page)
    }

    /// Expired and terminated licences are final.
    pub async fn update_license_status(
        &self,
        owner_id: &str,
        license_id: &str,
        status: LicenseStatus,
    ) -> Result<License, CoreError> {
        let mut license = self.get_license(owner_id, license_id).await?;
        if license.status == status {
            return Ok(license);
        }
        if matches!(license.status, LicenseStatus::Expired | LicenseStatus::Terminated) {
            return Err(CoreError::Validation(format!(
                "Cannot change license status to '{}' (current status: {})",
                status.name(),
                license.status.name()
            )));
        }
        let from = license.status;
        license.status = status;
        license.updated_at = Utc::now();
        LicenseRepo::update(self.store.as_ref(), &license).await?;
        tracing::info!(license_id, from = from.name(), to = status.name(), "License status changed");
        Ok(license)
    }
}

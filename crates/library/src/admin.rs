//! Administrative user changes that span the item store and the identity
//! service.
//!
//! Each change follows the same protocol:
//!
//! 1. guarded update of the user item to the new value (skipped when the
//!    item already holds it, so a retry after a partial failure only
//!    reconciles the identity side);
//! 2. identity-service mutation, each call bounded by `identity_timeout`;
//! 3. on failure, a compensating update back to the prior value and an
//!    `ExternalSystem` error. A failed compensation surfaces as
//!    `CompensationFailed` carrying both messages.
//!
//! The protocol runs on a spawned task, so dropping the caller's future
//! does not abandon it between steps. A concurrent write to the same user
//! between steps 1 and 3 can be overwritten by the compensation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use soundshelf_cloud::identity::IdentityProvider;
use soundshelf_cloud::CloudError;
use soundshelf_core::error::CoreError;
use soundshelf_core::roles::{Permission, UserRole};
use soundshelf_db::models::user::User;
use soundshelf_db::repositories::UserRepo;
use soundshelf_db::store::ItemStore;

const IDENTITY: &str = "identity";

/// Identity failure plus the role groups already removed before it.
struct GroupSyncFailure {
    error: CoreError,
    removed: Vec<String>,
}

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn ItemStore>,
    identity: Arc<dyn IdentityProvider>,
    identity_timeout: Duration,
}

impl AdminService {
    pub fn new(
        store: Arc<dyn ItemStore>,
        identity: Arc<dyn IdentityProvider>,
        identity_timeout: Duration,
    ) -> Self {
        Self {
            store,
            identity,
            identity_timeout,
        }
    }

    /// Change a user's role in the store and their group in the identity
    /// service.
    pub async fn update_user_role(&self, user_id: &str, role: UserRole) -> Result<User, CoreError> {
        let this = self.clone();
        let user_id = user_id.to_string();
        tokio::spawn(async move { this.run_role_update(&user_id, role).await })
            .await
            .map_err(|e| CoreError::Internal(format!("role update task: {e}")))?
    }

    /// [`Self::update_user_role`] on behalf of an administrator, who may not
    /// change their own role.
    pub async fn update_user_role_by_admin(
        &self,
        admin_id: &str,
        user_id: &str,
        role: UserRole,
    ) -> Result<User, CoreError> {
        if admin_id == user_id {
            return Err(CoreError::Validation(
                "Administrators cannot change their own role".into(),
            ));
        }
        let admin = UserRepo::get(self.store.as_ref(), admin_id).await?;
        if !admin.role.has_permission(Permission::ManageUsers) {
            return Err(CoreError::Validation(format!(
                "Role '{}' cannot manage users",
                admin.role.name()
            )));
        }
        tracing::info!(admin_id, user_id, role = role.name(), "Role change requested by admin");
        self.update_user_role(user_id, role).await
    }

    /// Enable or disable a user in the store and the identity service.
    pub async fn set_user_status(&self, user_id: &str, enabled: bool) -> Result<User, CoreError> {
        let this = self.clone();
        let user_id = user_id.to_string();
        tokio::spawn(async move { this.run_status_update(&user_id, enabled).await })
            .await
            .map_err(|e| CoreError::Internal(format!("status update task: {e}")))?
    }

    // -----------------------------------------------------------------------
    // Protocol
    // -----------------------------------------------------------------------

    async fn run_role_update(&self, user_id: &str, role: UserRole) -> Result<User, CoreError> {
        let prior = UserRepo::get(self.store.as_ref(), user_id).await?;
        let updated = if prior.role == role {
            tracing::debug!(user_id, role = role.name(), "Role already stored; reconciling groups");
            None
        } else {
            let mut next = prior.clone();
            next.role = role;
            next.updated_at = Utc::now();
            UserRepo::update(self.store.as_ref(), &next).await?;
            Some(next)
        };

        match self.sync_role_group(user_id, role).await {
            Ok(()) => {
                tracing::info!(
                    user_id,
                    from = prior.role.name(),
                    to = role.name(),
                    "User role updated"
                );
                Ok(updated.unwrap_or(prior))
            }
            Err(failure) => {
                self.restore_groups(user_id, &failure.removed).await;
                match updated {
                    Some(_) => Err(self.compensate("update_user_role", &prior, failure.error).await),
                    None => Err(failure.error),
                }
            }
        }
    }

    async fn run_status_update(&self, user_id: &str, enabled: bool) -> Result<User, CoreError> {
        let prior = UserRepo::get(self.store.as_ref(), user_id).await?;
        let updated = if prior.enabled == enabled {
            None
        } else {
            let mut next = prior.clone();
            next.enabled = enabled;
            next.updated_at = Utc::now();
            UserRepo::update(self.store.as_ref(), &next).await?;
            Some(next)
        };

        let result = self
            .bounded("set_enabled", self.identity.set_enabled(user_id, enabled))
            .await;
        match (result, updated) {
            (Ok(()), updated) => {
                tracing::info!(user_id, enabled, "User status updated");
                Ok(updated.unwrap_or(prior))
            }
            (Err(error), Some(_)) => Err(self.compensate("set_user_status", &prior, error).await),
            (Err(error), None) => Err(error),
        }
    }

    /// Leave the user in exactly the role group of `role`, keeping any
    /// non-role groups.
    async fn sync_role_group(&self, user_id: &str, role: UserRole) -> Result<(), GroupSyncFailure> {
        let target = role.group_name();
        let current = self
            .bounded("list_groups", self.identity.list_groups(user_id))
            .await
            .map_err(|error| GroupSyncFailure {
                error,
                removed: Vec::new(),
            })?;

        let mut removed = Vec::new();
        for group in current
            .iter()
            .filter(|g| g.as_str() != target && UserRole::from_group(g).is_some())
        {
            if let Err(error) = self
                .bounded("remove_from_group", self.identity.remove_from_group(user_id, group))
                .await
            {
                return Err(GroupSyncFailure { error, removed });
            }
            removed.push(group.clone());
        }

        if !current.iter().any(|g| g == target) {
            if let Err(error) = self
                .bounded("add_to_group", self.identity.add_to_group(user_id, target))
                .await
            {
                return Err(GroupSyncFailure { error, removed });
            }
        }
        Ok(())
    }

    /// Best-effort re-add of groups removed before a failure.
    async fn restore_groups(&self, user_id: &str, groups: &[String]) {
        for group in groups {
            if let Err(e) = self
                .bounded("add_to_group", self.identity.add_to_group(user_id, group))
                .await
            {
                tracing::warn!(user_id, group = %group, error = %e, "Failed to restore identity group");
            }
        }
    }

    /// Write `prior` back and build the error the caller sees.
    async fn compensate(&self, operation: &'static str, prior: &User, original: CoreError) -> CoreError {
        let mut restored = prior.clone();
        restored.updated_at = Utc::now();
        match UserRepo::update(self.store.as_ref(), &restored).await {
            Ok(()) => {
                tracing::warn!(user_id = %prior.id, operation, error = %original, "Identity update failed; store change reverted");
                original
            }
            Err(compensation) => {
                tracing::error!(
                    user_id = %prior.id,
                    operation,
                    original = %original,
                    compensation = %compensation,
                    "Compensation failed; store and identity service disagree"
                );
                CoreError::CompensationFailed {
                    operation,
                    original: original.to_string(),
                    compensation: compensation.to_string(),
                }
            }
        }
    }

    /// Run one identity call under the configured timeout.
    async fn bounded<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, CloudError>>,
    ) -> Result<T, CoreError> {
        match tokio::time::timeout(self.identity_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CoreError::external(IDENTITY, format!("{op}: {e}"))),
            Err(_) => Err(CoreError::external(
                IDENTITY,
                format!("{op} timed out after {:?}", self.identity_timeout),
            )),
        }
    }
}

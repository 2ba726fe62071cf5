//! Identity service: group membership and account enablement.
//!
//! The library keeps user roles in the primary store and mirrors them as
//! identity groups named after the role.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::{sdk_error, CloudError};

const SERVICE: &str = "cognito";

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn add_to_group(&self, user_id: &str, group: &str) -> Result<(), CloudError>;

    async fn remove_from_group(&self, user_id: &str, group: &str) -> Result<(), CloudError>;

    async fn list_groups(&self, user_id: &str) -> Result<Vec<String>, CloudError>;

    async fn set_enabled(&self, user_id: &str, enabled: bool) -> Result<(), CloudError>;
}

// ---------------------------------------------------------------------------
// Cognito
// ---------------------------------------------------------------------------

/// [`IdentityProvider`] backed by a Cognito user pool (admin APIs).
#[derive(Debug, Clone)]
pub struct CognitoIdentityProvider {
    client: aws_sdk_cognitoidentityprovider::Client,
    user_pool_id: String,
}

impl CognitoIdentityProvider {
    pub fn new(client: aws_sdk_cognitoidentityprovider::Client, user_pool_id: String) -> Self {
        Self {
            client,
            user_pool_id,
        }
    }

    /// Build a client from the ambient AWS configuration (env, profile, IMDS).
    pub async fn from_env(user_pool_id: String) -> Result<Self, CloudError> {
        if user_pool_id.is_empty() {
            return Err(CloudError::Config(
                "IDENTITY_USER_POOL_ID must be set".into(),
            ));
        }
        let config = aws_config::load_from_env().await;
        Ok(Self::new(
            aws_sdk_cognitoidentityprovider::Client::new(&config),
            user_pool_id,
        ))
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn add_to_group(&self, user_id: &str, group: &str) -> Result<(), CloudError> {
        self.client
            .admin_add_user_to_group()
            .user_pool_id(&self.user_pool_id)
            .username(user_id)
            .group_name(group)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;
        tracing::debug!(user_id, group, "Added user to identity group");
        Ok(())
    }

    async fn remove_from_group(&self, user_id: &str, group: &str) -> Result<(), CloudError> {
        self.client
            .admin_remove_user_from_group()
            .user_pool_id(&self.user_pool_id)
            .username(user_id)
            .group_name(group)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;
        tracing::debug!(user_id, group, "Removed user from identity group");
        Ok(())
    }

    async fn list_groups(&self, user_id: &str) -> Result<Vec<String>, CloudError> {
        let mut groups = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .client
                .admin_list_groups_for_user()
                .user_pool_id(&self.user_pool_id)
                .username(user_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, e))?;
            groups.extend(
                output
                    .groups()
                    .iter()
                    .filter_map(|g| g.group_name().map(str::to_string)),
            );
            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => return Ok(groups),
            }
        }
    }

    async fn set_enabled(&self, user_id: &str, enabled: bool) -> Result<(), CloudError> {
        if enabled {
            self.client
                .admin_enable_user()
                .user_pool_id(&self.user_pool_id)
                .username(user_id)
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, e))?;
        } else {
            self.client
                .admin_disable_user()
                .user_pool_id(&self.user_pool_id)
                .username(user_id)
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, e))?;
        }
        tracing::debug!(user_id, enabled, "Updated identity account status");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory double
// ---------------------------------------------------------------------------

/// Operations of [`MemoryIdentityProvider`] that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityOp {
    AddToGroup,
    RemoveFromGroup,
    ListGroups,
    SetEnabled,
}

#[derive(Debug, Default)]
struct IdentityState {
    groups: HashMap<String, BTreeSet<String>>,
    disabled: HashSet<String>,
    failing: HashSet<IdentityOp>,
    delay: Option<Duration>,
}

/// In-process identity service with per-operation failure injection.
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    state: Mutex<IdentityState>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of `op` fail until [`Self::clear_failures`].
    pub fn fail_on(&self, op: IdentityOp) {
        self.lock().failing.insert(op);
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    /// Delay every call, to exercise caller timeouts.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    /// Current groups of a user, sorted.
    pub fn groups_of(&self, user_id: &str) -> Vec<String> {
        self.lock()
            .groups
            .get(user_id)
            .map(|g| g.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_enabled(&self, user_id: &str) -> bool {
        !self.lock().disabled.contains(user_id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IdentityState> {
        // A poisoned lock only means a test thread panicked mid-call.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn enter(&self, op: IdentityOp) -> Result<(), CloudError> {
        let (delay, failing) = {
            let state = self.lock();
            (state.delay, state.failing.contains(&op))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(CloudError::service(
                SERVICE,
                format!("injected failure in {op:?}"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn add_to_group(&self, user_id: &str, group: &str) -> Result<(), CloudError> {
        self.enter(IdentityOp::AddToGroup).await?;
        self.lock()
            .groups
            .entry(user_id.to_string())
            .or_default()
            .insert(group.to_string());
        Ok(())
    }

    async fn remove_from_group(&self, user_id: &str, group: &str) -> Result<(), CloudError> {
        self.enter(IdentityOp::RemoveFromGroup).await?;
        if let Some(groups) = self.lock().groups.get_mut(user_id) {
            groups.remove(group);
        }
        Ok(())
    }

    async fn list_groups(&self, user_id: &str) -> Result<Vec<String>, CloudError> {
        self.enter(IdentityOp::ListGroups).await?;
        Ok(self.groups_of(user_id))
    }

    async fn set_enabled(&self, user_id: &str, enabled: bool) -> Result<(), CloudError> {
        self.enter(IdentityOp::SetEnabled).await?;
        let mut state = self.lock();
        if enabled {
            state.disabled.remove(user_id);
        } else {
            state.disabled.insert(user_id.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn memory_groups_round_trip() {
        let idp = MemoryIdentityProvider::new();
        idp.add_to_group("u1", "artist").await.unwrap();
        idp.add_to_group("u1", "subscriber").await.unwrap();
        idp.remove_from_group("u1", "subscriber").await.unwrap();
        assert_eq!(idp.list_groups("u1").await.unwrap(), ["artist"]);
    }

    #[tokio::test]
    async fn injected_failure_leaves_state_untouched() {
        let idp = MemoryIdentityProvider::new();
        idp.fail_on(IdentityOp::AddToGroup);
        assert_matches!(
            idp.add_to_group("u1", "admin").await,
            Err(CloudError::Service { .. })
        );
        assert!(idp.groups_of("u1").is_empty());

        idp.clear_failures();
        idp.add_to_group("u1", "admin").await.unwrap();
        assert_eq!(idp.groups_of("u1"), ["admin"]);
    }

    #[tokio::test]
    async fn enablement_is_tracked() {
        let idp = MemoryIdentityProvider::new();
        assert!(idp.is_enabled("u1"));
        idp.set_enabled("u1", false).await.unwrap();
        assert!(!idp.is_enabled("u1"));
    }
}

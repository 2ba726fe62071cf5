//! User roles and the permissions each one grants.
//!
//! The identity-service group for a role has the same name as the role.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_GUEST: &str = "guest";
pub const ROLE_SUBSCRIBER: &str = "subscriber";
pub const ROLE_ARTIST: &str = "artist";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Guest,
    #[default]
    Subscriber,
    Artist,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Browse,
    Listen,
    UploadTracks,
    PublishTracks,
    CreatePlaylists,
    CreatePublicPlaylists,
    FollowArtists,
    HaveFollowers,
    ManageOwnContent,
    ModerateContent,
    ManageUsers,
    ViewGlobal,
}

const GUEST_PERMISSIONS: &[Permission] = &[Permission::Browse];

const SUBSCRIBER_PERMISSIONS: &[Permission] = &[
    Permission::Browse,
    Permission::Listen,
    Permission::CreatePlaylists,
    Permission::CreatePublicPlaylists,
    Permission::FollowArtists,
    Permission::ManageOwnContent,
];

const ARTIST_PERMISSIONS: &[Permission] = &[
    Permission::Browse,
    Permission::Listen,
    Permission::UploadTracks,
    Permission::PublishTracks,
    Permission::CreatePlaylists,
    Permission::CreatePublicPlaylists,
    Permission::FollowArtists,
    Permission::HaveFollowers,
    Permission::ManageOwnContent,
];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::Browse,
    Permission::Listen,
    Permission::UploadTracks,
    Permission::PublishTracks,
    Permission::CreatePlaylists,
    Permission::CreatePublicPlaylists,
    Permission::FollowArtists,
    Permission::HaveFollowers,
    Permission::ManageOwnContent,
    Permission::ModerateContent,
    Permission::ManageUsers,
    Permission::ViewGlobal,
];

impl UserRole {
    pub const ALL: [UserRole; 4] = [Self::Guest, Self::Subscriber, Self::Artist, Self::Admin];

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            ROLE_GUEST => Ok(Self::Guest),
            ROLE_SUBSCRIBER => Ok(Self::Subscriber),
            ROLE_ARTIST => Ok(Self::Artist),
            ROLE_ADMIN => Ok(Self::Admin),
            other => Err(CoreError::Validation(format!(
                "Invalid role '{other}'. Must be one of: guest, subscriber, artist, admin"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Guest => ROLE_GUEST,
            Self::Subscriber => ROLE_SUBSCRIBER,
            Self::Artist => ROLE_ARTIST,
            Self::Admin => ROLE_ADMIN,
        }
    }

    /// Identity-service group backing this role.
    pub fn group_name(self) -> &'static str {
        self.name()
    }

    /// Role whose group is `group`, if the group is a role group.
    pub fn from_group(group: &str) -> Option<Self> {
        Self::from_name(group).ok()
    }

    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Self::Guest => GUEST_PERMISSIONS,
            Self::Subscriber => SUBSCRIBER_PERMISSIONS,
            Self::Artist => ARTIST_PERMISSIONS,
            Self::Admin => ADMIN_PERMISSIONS,
        }
    }

    pub fn has_permission(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn can_upload_tracks(self) -> bool {
        self.has_permission(Permission::UploadTracks)
    }

    pub fn can_have_followers(self) -> bool {
        self.has_permission(Permission::HaveFollowers)
    }

    pub fn can_moderate_content(self) -> bool {
        self.has_permission(Permission::ModerateContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_role_is_subscriber() {
        assert_eq!(UserRole::default(), UserRole::Subscriber);
    }

    #[test]
    fn guest_can_only_browse() {
        assert_eq!(UserRole::Guest.permissions(), &[Permission::Browse]);
        assert!(!UserRole::Guest.has_permission(Permission::Listen));
    }

    #[test]
    fn only_artists_and_admins_upload() {
        assert!(!UserRole::Subscriber.can_upload_tracks());
        assert!(UserRole::Artist.can_upload_tracks());
        assert!(UserRole::Admin.can_upload_tracks());
    }

    #[test]
    fn only_admin_moderates() {
        assert!(UserRole::Admin.can_moderate_content());
        assert!(!UserRole::Artist.can_moderate_content());
        assert!(UserRole::Artist.can_have_followers());
    }

    #[test]
    fn group_name_matches_role_name() {
        for role in UserRole::ALL {
            assert_eq!(role.group_name(), role.name());
            assert_eq!(UserRole::from_group(role.group_name()), Some(role));
        }
        assert_eq!(UserRole::from_group("beta-testers"), None);
    }

    #[test]
    fn invalid_role_name_is_rejected() {
        assert!(UserRole::from_name("superuser").is_err());
    }
}

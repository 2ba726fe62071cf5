//! Visibility of tracks and playlists.
//!
//! Only [`Visibility::Public`] entities carry a discovery-index entry.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Who can see an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Only the owner.
    #[default]
    Private,
    /// Anyone holding the link; not listed in discovery.
    Unlisted,
    /// Anyone; listed in discovery.
    Public,
}

impl Visibility {
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "private" => Ok(Self::Private),
            "unlisted" => Ok(Self::Unlisted),
            "public" => Ok(Self::Public),
            other => Err(CoreError::Validation(format!(
                "Invalid visibility '{other}'. Must be one of: private, unlisted, public"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Unlisted => "unlisted",
            Self::Public => "public",
        }
    }

    /// Whether the entity must have a discovery-index entry.
    pub fn is_discoverable(self) -> bool {
        self == Self::Public
    }

    /// Whether non-owners may open the entity.
    pub fn is_publicly_accessible(self) -> bool {
        matches!(self, Self::Public | Self::Unlisted)
    }

    /// Map the legacy boolean flag.
    pub fn from_is_public(is_public: bool) -> Self {
        if is_public {
            Self::Public
        } else {
            Self::Private
        }
    }
}

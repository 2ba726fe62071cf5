//! Name normalisation and validation for library entities.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::keys::SEPARATOR;

/// Longest accepted tag name (characters).
pub const MAX_TAG_NAME_LEN: usize = 50;

/// Leading articles ignored when sorting artists.
const SORT_PREFIXES: &[&str] = &["The ", "A ", "An "];

/// Artist name used for sorting: a leading "The ", "A " or "An " is dropped.
///
/// ```
/// use soundshelf_core::naming::generate_sort_name;
///
/// assert_eq!(generate_sort_name("The Beatles"), "Beatles");
/// assert_eq!(generate_sort_name("Abba"), "Abba");
/// assert_eq!(generate_sort_name("The "), "The ");
/// ```
pub fn generate_sort_name(name: &str) -> String {
    SORT_PREFIXES
        .iter()
        .find_map(|prefix| {
            name.strip_prefix(prefix)
                .filter(|rest| !rest.is_empty())
        })
        .unwrap_or(name)
        .to_string()
}

/// Role an artist plays on a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtistRole {
    Main,
    Featuring,
    Remixer,
    Producer,
}

impl ArtistRole {
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "main" => Ok(Self::Main),
            "featuring" => Ok(Self::Featuring),
            "remixer" => Ok(Self::Remixer),
            "producer" => Ok(Self::Producer),
            other => Err(CoreError::Validation(format!(
                "Invalid artist role '{other}'"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Featuring => "featuring",
            Self::Remixer => "remixer",
            Self::Producer => "producer",
        }
    }
}

/// Tag names are 1-50 characters and cannot contain the key separator.
pub fn validate_tag_name(name: &str) -> Result<(), CoreError> {
    let len = name.chars().count();
    if len == 0 || len > MAX_TAG_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Tag name must be 1-{MAX_TAG_NAME_LEN} characters"
        )));
    }
    if name.contains(SEPARATOR) {
        return Err(CoreError::Validation(format!(
            "Tag name must not contain '{SEPARATOR}'"
        )));
    }
    Ok(())
}

/// Tag colours are `#RRGGBB`.
pub fn validate_hex_color(color: &str) -> Result<(), CoreError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Color '{color}' must be a hex code like #1A2B3C"
        )))
    }
}

/// `m:ss` (or `h:mm:ss`) display form of a duration in seconds.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

//! Key grammar for the single-table layout.
//!
//! Every partition/sort key written by the library is produced here. The
//! functions are pure and deterministic: the same logical entity always maps
//! to the same key.
//!
//! | Entity        | PK                              | SK                          |
//! |---------------|---------------------------------|-----------------------------|
//! | owner-scoped  | `OWNER#{owner}`                 | `{TYPE}#{id}`               |
//! | playlist slot | `PLAYLIST#{playlist}`           | `POSITION#{index:08}`       |
//! | track tag     | `OWNER#{owner}#TRACK#{track}`   | `TAG#{name}`                |
//! | follow edge   | `OWNER#{follower}`              | `FOLLOWING#{followed}`      |
//! | track rights  | `OWNER#{owner}`                 | `RIGHTS#{track}#{type}#{holder}` |
//! | track licenses (index 1) | `OWNER#{owner}#TRACK#{track}#LICENSE` | `{start}#{license}` |

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{sort_timestamp, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Separator between key segments. Never allowed inside an id.
pub const SEPARATOR: char = '#';

/// Width of the zero-padded playlist position.
pub const POSITION_WIDTH: usize = 8;

/// Fixed partition of the public track discovery index.
pub const PUBLIC_TRACK_PARTITION: &str = "PUBLIC_TRACK";

/// Fixed partition of the public playlist discovery index.
pub const PUBLIC_PLAYLIST_PARTITION: &str = "PUBLIC_PLAYLIST";

const OWNER_PREFIX: &str = "OWNER#";
const PLAYLIST_PREFIX: &str = "PLAYLIST#";
const POSITION_PREFIX: &str = "POSITION#";
const FOLLOWING_PREFIX: &str = "FOLLOWING#";
const FOLLOWERS_PREFIX: &str = "FOLLOWERS#";

// ---------------------------------------------------------------------------
// Key types
// ---------------------------------------------------------------------------

/// A (partition, sort) key pair. Used for primary keys and index entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub pk: String,
    pub sk: String,
}

impl ItemKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.pk, self.sk)
    }
}

/// The three alternate access paths carried by an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexName {
    /// Lookups: followers, tracks-by-tag, artist listings, email, upload status.
    Index1,
    /// Public discovery (`PUBLIC_TRACK` / `PUBLIC_PLAYLIST`).
    Index2,
    /// Reserved for secondary listings.
    Index3,
}

/// Entity discriminator stored with every item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    User,
    Track,
    Album,
    Artist,
    Playlist,
    PlaylistTrack,
    Upload,
    Tag,
    TrackTag,
    Follow,
    TrackRights,
    RightsHolder,
    License,
}

impl EntityType {
    /// Parse from the stored `item_type` value.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "USER" => Ok(Self::User),
            "TRACK" => Ok(Self::Track),
            "ALBUM" => Ok(Self::Album),
            "ARTIST" => Ok(Self::Artist),
            "PLAYLIST" => Ok(Self::Playlist),
            "PLAYLIST_TRACK" => Ok(Self::PlaylistTrack),
            "UPLOAD" => Ok(Self::Upload),
            "TAG" => Ok(Self::Tag),
            "TRACK_TAG" => Ok(Self::TrackTag),
            "FOLLOW" => Ok(Self::Follow),
            "RIGHTS" => Ok(Self::TrackRights),
            "HOLDER" => Ok(Self::RightsHolder),
            "LICENSE" => Ok(Self::License),
            other => Err(CoreError::Validation(format!(
                "Unknown entity type '{other}'"
            ))),
        }
    }

    /// Stored `item_type` value.
    pub fn name(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Track => "TRACK",
            Self::Album => "ALBUM",
            Self::Artist => "ARTIST",
            Self::Playlist => "PLAYLIST",
            Self::PlaylistTrack => "PLAYLIST_TRACK",
            Self::Upload => "UPLOAD",
            Self::Tag => "TAG",
            Self::TrackTag => "TRACK_TAG",
            Self::Follow => "FOLLOW",
            Self::TrackRights => "RIGHTS",
            Self::RightsHolder => "HOLDER",
            Self::License => "LICENSE",
        }
    }

    /// Human-readable label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Track => "track",
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Playlist => "playlist",
            Self::PlaylistTrack => "playlist track",
            Self::Upload => "upload",
            Self::Tag => "tag",
            Self::TrackTag => "track tag",
            Self::Follow => "follow",
            Self::TrackRights => "track rights",
            Self::RightsHolder => "rights holder",
            Self::License => "license",
        }
    }

    /// Whether the entity lives directly under `OWNER#{owner}` as `{TYPE}#{id}`.
    pub fn is_owner_scoped(self) -> bool {
        matches!(
            self,
            Self::User
                | Self::Track
                | Self::Album
                | Self::Artist
                | Self::Playlist
                | Self::Upload
                | Self::Tag
                | Self::RightsHolder
                | Self::License
        )
    }

    /// Sort-key prefix for owner-scoped entities, e.g. `TRACK#`.
    pub fn sk_prefix(self) -> String {
        format!("{}{SEPARATOR}", self.name())
    }
}

// ---------------------------------------------------------------------------
// Segment validation
// ---------------------------------------------------------------------------

/// Reject empty ids and ids that contain the key separator.
pub fn validate_segment(field: &str, value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if value.contains(SEPARATOR) {
        return Err(CoreError::Validation(format!(
            "{field} must not contain '{SEPARATOR}'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Primary keys
// ---------------------------------------------------------------------------

/// Partition holding everything an owner has.
pub fn owner_pk(owner_id: &str) -> String {
    format!("{OWNER_PREFIX}{owner_id}")
}

/// Primary key for an owner-scoped entity.
pub fn primary_key(
    entity_type: EntityType,
    owner_id: &str,
    entity_id: &str,
) -> Result<ItemKey, CoreError> {
    if !entity_type.is_owner_scoped() {
        return Err(CoreError::Validation(format!(
            "{} is not an owner-scoped entity",
            entity_type.label()
        )));
    }
    validate_segment("owner id", owner_id)?;
    validate_segment("entity id", entity_id)?;
    Ok(ItemKey::new(
        owner_pk(owner_id),
        format!("{}{entity_id}", entity_type.sk_prefix()),
    ))
}

/// Strip the `{TYPE}#` prefix from a sort key, returning the entity id.
pub fn entity_id_from_sk(entity_type: EntityType, sk: &str) -> Option<String> {
    sk.strip_prefix(&entity_type.sk_prefix()).map(str::to_string)
}

// ---------------------------------------------------------------------------
// Playlist membership
// ---------------------------------------------------------------------------

pub fn playlist_partition(playlist_id: &str) -> String {
    format!("{PLAYLIST_PREFIX}{playlist_id}")
}

pub fn position_sk(position: usize) -> String {
    format!("{POSITION_PREFIX}{position:0width$}", width = POSITION_WIDTH)
}

/// Key of the membership slot at `position`.
pub fn playlist_position_key(playlist_id: &str, position: usize) -> ItemKey {
    ItemKey::new(playlist_partition(playlist_id), position_sk(position))
}

/// Inverse of [`position_sk`].
pub fn parse_position(sk: &str) -> Result<usize, CoreError> {
    sk.strip_prefix(POSITION_PREFIX)
        .and_then(|digits| digits.parse::<usize>().ok())
        .ok_or_else(|| CoreError::Internal(format!("Malformed position sort key '{sk}'")))
}

pub fn position_prefix() -> &'static str {
    POSITION_PREFIX
}

// ---------------------------------------------------------------------------
// Discovery index
// ---------------------------------------------------------------------------

/// Which public discovery index an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryKind {
    Track,
    Playlist,
}

impl DiscoveryKind {
    pub fn partition(self) -> &'static str {
        match self {
            Self::Track => PUBLIC_TRACK_PARTITION,
            Self::Playlist => PUBLIC_PLAYLIST_PARTITION,
        }
    }
}

/// Index-2 entry for a publicly discoverable entity.
pub fn discovery_key(kind: DiscoveryKind, created_at: &Timestamp, entity_id: &str) -> ItemKey {
    ItemKey::new(
        kind.partition(),
        format!("{}{SEPARATOR}{entity_id}", sort_timestamp(created_at)),
    )
}

// ---------------------------------------------------------------------------
// Follow graph
// ---------------------------------------------------------------------------

/// Forward edge: what `follower_id` follows.
pub fn follow_key(follower_id: &str, followed_id: &str) -> ItemKey {
    ItemKey::new(
        owner_pk(follower_id),
        format!("{FOLLOWING_PREFIX}{followed_id}"),
    )
}

/// Reverse projection: who follows `followed_id`.
pub fn followers_index_key(follower_id: &str, followed_id: &str) -> ItemKey {
    ItemKey::new(followers_partition(followed_id), owner_pk(follower_id))
}

pub fn followers_partition(followed_id: &str) -> String {
    format!("{FOLLOWERS_PREFIX}{followed_id}")
}

pub fn following_prefix() -> &'static str {
    FOLLOWING_PREFIX
}

/// Id of the followed user encoded in a forward-edge sort key.
pub fn followed_id_from_sk(sk: &str) -> Option<&str> {
    sk.strip_prefix(FOLLOWING_PREFIX)
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

pub fn track_tags_partition(owner_id: &str, track_id: &str) -> String {
    format!("{}{SEPARATOR}TRACK{SEPARATOR}{track_id}", owner_pk(owner_id))
}

pub fn tag_sk(tag_name: &str) -> String {
    format!("{}{tag_name}", EntityType::Tag.sk_prefix())
}

/// Join item placed under the tagged track.
pub fn track_tag_key(owner_id: &str, track_id: &str, tag_name: &str) -> ItemKey {
    ItemKey::new(track_tags_partition(owner_id, track_id), tag_sk(tag_name))
}

pub fn tag_index_partition(owner_id: &str, tag_name: &str) -> String {
    format!("{}{SEPARATOR}TAG{SEPARATOR}{tag_name}", owner_pk(owner_id))
}

/// Index-1 projection of a track tag, enabling "tracks by tag".
pub fn tag_index_key(owner_id: &str, tag_name: &str, track_id: &str) -> ItemKey {
    ItemKey::new(
        tag_index_partition(owner_id, tag_name),
        format!("{}{track_id}", EntityType::Track.sk_prefix()),
    )
}

// ---------------------------------------------------------------------------
// Library browse indexes
// ---------------------------------------------------------------------------

pub fn artist_partition(owner_id: &str, artist_name: &str) -> String {
    format!("{}{SEPARATOR}ARTIST{SEPARATOR}{artist_name}", owner_pk(owner_id))
}

/// Index-1 entry listing a track under its artist.
pub fn track_artist_index_key(owner_id: &str, artist_name: &str, track_id: &str) -> ItemKey {
    ItemKey::new(
        artist_partition(owner_id, artist_name),
        format!("{}{track_id}", EntityType::Track.sk_prefix()),
    )
}

/// Index-1 entry listing an album under its artist, ordered by year.
pub fn album_artist_index_key(owner_id: &str, artist_name: &str, year: Option<i32>) -> ItemKey {
    ItemKey::new(
        artist_partition(owner_id, artist_name),
        format!(
            "{}{:04}",
            EntityType::Album.sk_prefix(),
            year.unwrap_or_default()
        ),
    )
}

pub fn artist_name_partition(owner_id: &str) -> String {
    format!("{}{SEPARATOR}ARTIST", owner_pk(owner_id))
}

/// Index-1 entry ordering artists by sort name.
pub fn artist_name_index_key(owner_id: &str, sort_name: &str) -> ItemKey {
    ItemKey::new(artist_name_partition(owner_id), sort_name.to_lowercase())
}

pub fn email_partition(email: &str) -> String {
    format!("EMAIL{SEPARATOR}{}", email.to_lowercase())
}

/// Index-1 entry resolving a user by email.
pub fn email_index_key(email: &str, user_id: &str) -> ItemKey {
    ItemKey::new(
        email_partition(email),
        format!("{}{user_id}", EntityType::User.sk_prefix()),
    )
}

pub fn upload_status_partition(status: &str) -> String {
    format!("UPLOAD{SEPARATOR}STATUS{SEPARATOR}{status}")
}

/// Index-1 entry listing uploads by status, oldest first.
pub fn upload_status_index_key(status: &str, created_at: &Timestamp, upload_id: &str) -> ItemKey {
    ItemKey::new(
        upload_status_partition(status),
        format!("{}{SEPARATOR}{upload_id}", sort_timestamp(created_at)),
    )
}

// ---------------------------------------------------------------------------
// Rights and licensing
// ---------------------------------------------------------------------------

/// Sort-key prefix of every rights item of a track, optionally narrowed to one
/// right type.
pub fn rights_prefix(track_id: &str, right_type: Option<&str>) -> String {
    let base = format!("{}{track_id}{SEPARATOR}", EntityType::TrackRights.sk_prefix());
    match right_type {
        Some(rt) => format!("{base}{rt}{SEPARATOR}"),
        None => base,
    }
}

/// One rights item per (track, right type, holder).
pub fn rights_key(owner_id: &str, track_id: &str, right_type: &str, holder_id: &str) -> ItemKey {
    ItemKey::new(
        owner_pk(owner_id),
        format!("{}{holder_id}", rights_prefix(track_id, Some(right_type))),
    )
}

pub fn license_track_partition(owner_id: &str, track_id: &str) -> String {
    format!(
        "{}{SEPARATOR}{}{track_id}{SEPARATOR}LICENSE",
        owner_pk(owner_id),
        EntityType::Track.sk_prefix()
    )
}

/// Index-1 entry listing an owner's licenses of a track by start date.
pub fn license_track_index_key(
    owner_id: &str,
    track_id: &str,
    start_date: &Timestamp,
    license_id: &str,
) -> ItemKey {
    ItemKey::new(
        license_track_partition(owner_id, track_id),
        format!("{}{SEPARATOR}{license_id}", sort_timestamp(start_date)),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    #[test]
    fn owner_scoped_primary_key() {
        let key = primary_key(EntityType::Track, "u1", "t1").unwrap();
        assert_eq!(key.pk, "OWNER#u1");
        assert_eq!(key.sk, "TRACK#t1");
    }

    #[test]
    fn license_index_is_owner_scoped() {
        let start = chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let key = license_track_index_key("u1", "t1", &start, "l1");
        assert_eq!(key.pk, "OWNER#u1#TRACK#t1#LICENSE");
        assert!(key.sk.ends_with("#l1"));
        assert_ne!(
            license_track_partition("u1", "t1"),
            license_track_partition("u2", "t1")
        );
    }

    #[test]
    fn primary_key_is_deterministic() {
        let a = primary_key(EntityType::Playlist, "u1", "p1").unwrap();
        let b = primary_key(EntityType::Playlist, "u1", "p1").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn primary_key_rejects_separator_in_id() {
        assert_matches!(
            primary_key(EntityType::Track, "u#1", "t1"),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            primary_key(EntityType::Track, "u1", ""),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn primary_key_rejects_non_owner_scoped() {
        assert_matches!(
            primary_key(EntityType::Follow, "u1", "u2"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn position_is_zero_padded() {
        let key = playlist_position_key("p1", 7);
        assert_eq!(key.pk, "PLAYLIST#p1");
        assert_eq!(key.sk, "POSITION#00000007");
    }

    #[test]
    fn position_round_trips() {
        assert_eq!(parse_position(&position_sk(12345)).unwrap(), 12345);
        assert_matches!(parse_position("POSITION#abc"), Err(CoreError::Internal(_)));
    }

    #[test]
    fn padded_positions_sort_numerically() {
        assert!(position_sk(9) < position_sk(10));
    }

    #[test]
    fn discovery_key_uses_fixed_partition() {
        let ts = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let key = discovery_key(DiscoveryKind::Track, &ts, "t1");
        assert_eq!(key.pk, "PUBLIC_TRACK");
        assert_eq!(key.sk, "2026-03-01T12:00:00.000Z#t1");
        assert_eq!(
            discovery_key(DiscoveryKind::Playlist, &ts, "p1").pk,
            "PUBLIC_PLAYLIST"
        );
    }

    #[test]
    fn follow_keys_mirror_each_other() {
        let fwd = follow_key("a", "b");
        let rev = followers_index_key("a", "b");
        assert_eq!(fwd, ItemKey::new("OWNER#a", "FOLLOWING#b"));
        assert_eq!(rev, ItemKey::new("FOLLOWERS#b", "OWNER#a"));
        assert_eq!(followed_id_from_sk(&fwd.sk), Some("b"));
    }

    #[test]
    fn track_tag_keys() {
        assert_eq!(
            track_tag_key("u1", "t1", "rock"),
            ItemKey::new("OWNER#u1#TRACK#t1", "TAG#rock")
        );
        assert_eq!(
            tag_index_key("u1", "rock", "t1"),
            ItemKey::new("OWNER#u1#TAG#rock", "TRACK#t1")
        );
    }

    #[test]
    fn rights_prefix_narrows_by_type() {
        let key = rights_key("u1", "t1", "mechanical", "h1");
        assert_eq!(key.sk, "RIGHTS#t1#mechanical#h1");
        assert!(key.sk.starts_with(&rights_prefix("t1", Some("mechanical"))));
        assert!(key.sk.starts_with(&rights_prefix("t1", None)));
        assert!(!key.sk.starts_with(&rights_prefix("t1", Some("sync"))));
    }

    #[test]
    fn entity_type_names_round_trip() {
        for et in [
            EntityType::User,
            EntityType::PlaylistTrack,
            EntityType::TrackTag,
            EntityType::TrackRights,
            EntityType::License,
        ] {
            assert_eq!(EntityType::from_name(et.name()).unwrap(), et);
        }
        assert_matches!(EntityType::from_name("NOPE"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn entity_id_strips_prefix() {
        assert_eq!(
            entity_id_from_sk(EntityType::Album, "ALBUM#a9"),
            Some("a9".to_string())
        );
        assert_eq!(entity_id_from_sk(EntityType::Album, "TRACK#a9"), None);
    }
}

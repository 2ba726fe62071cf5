//! Entity models and DTOs.
//!
//! Each submodule contains:
//! - A `Serialize + Deserialize` entity struct stored as an item's attributes,
//!   with a [`Storable`](crate::item::Storable) impl describing its keys
//! - A `Deserialize + Validate` create DTO
//! - A `Deserialize` update DTO (all `Option` fields) for patches, where the
//!   entity is mutable

pub mod album;
pub mod artist;
pub mod follow;
pub mod license;
pub mod playlist;
pub mod rights;
pub mod tag;
pub mod track;
pub mod upload;
pub mod user;

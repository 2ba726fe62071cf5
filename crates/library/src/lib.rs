//! Service layer of the media library.
//!
//! Services hold their collaborators as `Arc<dyn Trait>` handed in through
//! their constructors; [`Library`] wires a full set from one
//! [`LibraryConfig`].

pub mod admin;
pub mod album;
pub mod artist;
pub mod config;
pub mod context;
pub mod follow;
pub mod license;
pub mod paging;
pub mod playlist;
pub mod rights;
pub mod tag;
pub mod track;
pub mod upload;
pub mod user;
pub mod visibility;

pub use config::LibraryConfig;
pub use context::Library;
pub use paging::Pager;

use soundshelf_cloud::CloudError;
use soundshelf_core::error::CoreError;
use validator::Validate;

/// Run derive-based DTO validation, mapping failures into the domain error.
pub(crate) fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))
}

pub(crate) fn external(system: &'static str, err: CloudError) -> CoreError {
    CoreError::external(system, err.to_string())
}

pub mod cursor;
pub mod error;
pub mod keys;
pub mod naming;
pub mod ordering;
pub mod rights;
pub mod roles;
pub mod types;
pub mod upload;
pub mod visibility;

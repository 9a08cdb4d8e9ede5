//! Storage layer: the static facility directory, loaded once per process.

mod directory;
mod error;

pub use directory::FacilityDirectory;
pub use error::StoreError;

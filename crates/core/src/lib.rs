//! Collaborator seams for ordered command processing.
//!
//! The processing layer never talks to a concrete store. It goes through:
//!
//! - [`GridStore`]: a partitioned key-value store with atomic per-entry
//!   operations
//! - [`codec`]: the byte encoding every stored value uses
//! - [`GridCache`]: a typed view of one named cache of a [`GridStore`]

pub mod codec;
mod cache;
mod store;

pub use cache::GridCache;
pub use codec::CodecError;
pub use store::{EntryProcessor, GridStore, StoreError};

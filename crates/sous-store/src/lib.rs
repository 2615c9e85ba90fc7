//! Data model and persistence contract for sous timelines.
//!
//! `models` holds the wire/data types (tasks, timelines, conflicts, the
//! meal input model). `store` defines the abstract [`TimelineStore`]
//! contract the rest of the system persists through; `memory` is the
//! bundled in-memory backend.

pub mod memory;
pub mod models;
pub mod store;

pub use memory::MemoryStore;
pub use store::{StoreError, TimelineStore};

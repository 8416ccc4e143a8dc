//! Durable artifact stores

pub mod local;
pub mod traits;

pub use local::LocalDiskStore;
pub use traits::{ArtifactStore, StoredReference};

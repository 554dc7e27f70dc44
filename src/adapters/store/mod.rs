//! Content store abstraction and the in-memory installation

pub mod memory;
pub mod traits;

pub use memory::{MemoryStore, StoreSnapshot};
pub use traits::ContentStore;

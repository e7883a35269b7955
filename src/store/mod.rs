//! Hierarchical survey store
//!
//! The dataset is a read-only tree of five fixed partitions, each keyed
//! region -> subregion -> entity-id. The engine reaches it only through
//! the `TreeStore` trait; `MemoryStore` is the bundled JSON-file-backed
//! implementation.

mod errors;
mod memory;
mod partition;
mod tree;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use partition::Partition;
pub use tree::{EntityKey, TreeStore};

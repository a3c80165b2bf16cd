// Adapters layer: concrete repositories the engine can read the profile tree from.

pub mod http;
pub mod memory;

pub use http::HttpRepository;
pub use memory::{MemoryRepository, Snapshot};

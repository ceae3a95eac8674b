pub mod memory;

#[cfg(feature = "weaviate")]
pub mod weaviate;

pub use memory::MemoryStore;

#[cfg(feature = "weaviate")]
pub use weaviate::WeaviateStore;

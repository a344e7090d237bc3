pub mod memory;
#[cfg(feature = "qdrant")]
pub mod qdrant;

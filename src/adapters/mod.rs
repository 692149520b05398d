// Adapters layer: concrete implementations of the domain ports for external systems.

pub mod log_sink;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

pub use log_sink::{MemoryLogSink, NullLogSink};
pub use memory::MemoryStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

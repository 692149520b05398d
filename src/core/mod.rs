pub mod destination;
pub mod encoding;
pub mod engine;
pub mod store_client;

pub use crate::domain::ports::{FileProcessor, LogSink, MediaUploader, ObjectStore};
pub use crate::utils::error::Result;
pub use destination::DestinationClient;
pub use engine::TransferEngine;
pub use store_client::SourceStoreClient;

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, RunMode};
pub use config::TransferConfig;

pub use core::{DestinationClient, SourceStoreClient, TransferEngine};
pub use domain::model::{
    AuthMode, DestinationConfig, MappingItem, SourceStoreConfig, TransferEvent, TransferProgress,
    TransferStatus, TransferSummary,
};
pub use utils::error::{Result, TransferError};

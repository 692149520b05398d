#[cfg(feature = "cli")]
pub mod cli;
pub mod mapping_csv;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, RunMode};
pub use mapping_csv::{load_mapping_file, parse_mapping};
pub use toml_config::{LoggingConfig, MappingConfig, MappingEntry, TransferConfig};

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "media-transfer")]
#[command(about = "Transfer media folders from object storage to a destination API")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "transfer-config.toml")]
    pub config: PathBuf,

    /// Mapping CSV file, overrides mapping.csv_path
    #[arg(short, long)]
    pub mapping: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Log CPU and memory usage at start and end
    #[arg(long)]
    pub monitor: bool,

    /// Check connectivity to the object store and the destination API, then exit
    #[arg(long, conflicts_with_all = ["list_folders", "dry_run"])]
    pub test_connection: bool,

    /// List folders under the base path, then exit
    #[arg(long, conflicts_with = "dry_run")]
    pub list_folders: bool,

    /// List the files each mapped folder would upload without uploading
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Transfer,
    TestConnection,
    ListFolders,
    DryRun,
}

impl CliConfig {
    pub fn mode(&self) -> RunMode {
        if self.test_connection {
            RunMode::TestConnection
        } else if self.list_folders {
            RunMode::ListFolders
        } else if self.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Transfer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = CliConfig::try_parse_from(["media-transfer"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("transfer-config.toml"));
        assert!(cli.mapping.is_none());
        assert_eq!(cli.mode(), RunMode::Transfer);
    }

    #[test]
    fn test_modes_and_flags() {
        let cli = CliConfig::try_parse_from([
            "media-transfer",
            "-c",
            "prod.toml",
            "--mapping",
            "map.csv",
            "--json-logs",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("prod.toml"));
        assert_eq!(cli.mapping, Some(PathBuf::from("map.csv")));
        assert!(cli.json_logs);
        assert_eq!(cli.mode(), RunMode::DryRun);

        let cli = CliConfig::try_parse_from(["media-transfer", "--test-connection"]).unwrap();
        assert_eq!(cli.mode(), RunMode::TestConnection);
    }

    #[test]
    fn test_conflicting_modes_rejected() {
        assert!(
            CliConfig::try_parse_from(["media-transfer", "--test-connection", "--dry-run"]).is_err()
        );
        assert!(CliConfig::try_parse_from(["media-transfer", "--list-folders", "--dry-run"]).is_err());
    }
}

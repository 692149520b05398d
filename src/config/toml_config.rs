use crate::config::mapping_csv::load_mapping_file;
use crate::domain::model::{DestinationConfig, MappingItem, SourceStoreConfig};
use crate::utils::error::{Result, TransferError};
use crate::utils::validation::{validate_non_empty_string, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    pub source: SourceStoreConfig,
    pub destination: DestinationConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    pub csv_path: Option<String>,
    /// 直接寫在設定檔裡的對應，接在 CSV 內容之後
    #[serde(default)]
    pub items: Vec<MappingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub folder: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub json: bool,
    /// 設定後 LogSink 會同步寫入這個檔案
    pub log_file: Option<String>,
}

impl TransferConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${SECRET_KEY})；未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| TransferError::configuration(format!("Invalid env pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        self.source.validate()?;
        self.destination.validate()?;

        for (index, entry) in self.mapping.items.iter().enumerate() {
            validate_non_empty_string(&format!("mapping.items[{}].folder", index), &entry.folder)?;
            validate_non_empty_string(
                &format!("mapping.items[{}].category", index),
                &entry.category,
            )?;
        }
        Ok(())
    }

    /// 組出所有對應項目：CSV（`override_path` 優先於 `csv_path`）加上 inline 項目
    pub fn load_mapping(&self, override_path: Option<&Path>) -> Result<Vec<MappingItem>> {
        let csv_path = override_path.or(self.mapping.csv_path.as_deref().map(Path::new));

        let mut items = match csv_path {
            Some(path) => load_mapping_file(path)?,
            None => Vec::new(),
        };
        items.extend(
            self.mapping
                .items
                .iter()
                .map(|entry| MappingItem::new(&entry.folder, &entry.category)),
        );

        if items.is_empty() {
            return Err(TransferError::validation(
                "mapping",
                "no mapping items configured (set mapping.csv_path, mapping.items or --mapping)",
            ));
        }
        Ok(items)
    }
}

impl Validate for TransferConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

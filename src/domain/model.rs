use crate::utils::error::Result;
use crate::utils::validation::{
    validate_http_method, validate_non_empty_string, validate_present, validate_range,
    validate_url, Validate,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_BASE_PATH: &str = "downloaded_images";
pub const DEFAULT_UPLOAD_METHOD: &str = "POST";

fn default_base_path() -> String {
    DEFAULT_BASE_PATH.to_string()
}

fn default_upload_method() -> String {
    DEFAULT_UPLOAD_METHOD.to_string()
}

/// 來源物件儲存設定（bucket、區域、金鑰、基礎路徑）
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceStoreConfig {
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// S3 相容服務（MinIO 等）的自訂端點
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl SourceStoreConfig {
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            base_path: default_base_path(),
            endpoint: None,
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// 去除前後斜線的基礎路徑
    pub fn normalized_base_path(&self) -> &str {
        self.base_path.trim_matches('/')
    }
}

impl fmt::Debug for SourceStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceStoreConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key", &"***")
            .field("secret_key", &"***")
            .field("base_path", &self.base_path)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Validate for SourceStoreConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("source.bucket", &self.bucket)?;
        validate_non_empty_string("source.region", &self.region)?;
        validate_non_empty_string("source.access_key", &self.access_key)?;
        validate_non_empty_string("source.secret_key", &self.secret_key)?;
        if let Some(endpoint) = &self.endpoint {
            validate_url("source.endpoint", endpoint)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// 使用 username/password 的 Basic 驗證
    #[default]
    None,
    Bearer,
    #[serde(alias = "oauth2")]
    OAuth,
    #[serde(alias = "api_key")]
    ApiKey,
    Jwt,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthMode::None => "None",
            AuthMode::Bearer => "Bearer",
            AuthMode::OAuth => "OAuth",
            AuthMode::ApiKey => "ApiKey",
            AuthMode::Jwt => "JWT",
        };
        f.write_str(name)
    }
}

/// 目的地 API 設定
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct DestinationConfig {
    pub base_url: String,
    /// 可包含 `{categoryId}` 佔位符
    pub endpoint: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub auth_mode: AuthMode,
    #[serde(default)]
    pub token: String,

    // 動態取得 token 用的欄位，目前只保存不使用
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub token_request_method: Option<String>,
    #[serde(default)]
    pub username_field: Option<String>,
    #[serde(default)]
    pub password_field: Option<String>,
    #[serde(default)]
    pub token_response_path: Option<String>,

    #[serde(default = "default_upload_method")]
    pub upload_method: String,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl DestinationConfig {
    pub fn new(base_url: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint: endpoint.into(),
            username: None,
            password: None,
            auth_mode: AuthMode::None,
            token: String::new(),
            token_endpoint: None,
            token_request_method: None,
            username_field: None,
            password_field: None,
            token_response_path: None,
            upload_method: default_upload_method(),
            timeout_seconds: None,
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth_mode = AuthMode::None;
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_token(mut self, auth_mode: AuthMode, token: impl Into<String>) -> Self {
        self.auth_mode = auth_mode;
        self.token = token.into();
        self
    }
}

impl fmt::Debug for DestinationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationConfig")
            .field("base_url", &self.base_url)
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("auth_mode", &self.auth_mode)
            .field("token", &if self.token.is_empty() { "" } else { "***" })
            .field("token_endpoint", &self.token_endpoint)
            .field("upload_method", &self.upload_method)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Validate for DestinationConfig {
    fn validate(&self) -> Result<()> {
        validate_url("destination.base_url", &self.base_url)?;
        validate_non_empty_string("destination.endpoint", &self.endpoint)?;

        match self.auth_mode {
            AuthMode::None => {
                validate_present("destination.username", self.username.as_deref())?;
                validate_present("destination.password", self.password.as_deref())?;
            }
            _ => validate_non_empty_string("destination.token", &self.token)?,
        }

        validate_http_method("destination.upload_method", &self.upload_method)?;
        if let Some(timeout) = self.timeout_seconds {
            validate_range("destination.timeout_seconds", timeout, 1, 3600)?;
        }
        if let Some(token_endpoint) = &self.token_endpoint {
            validate_non_empty_string("destination.token_endpoint", token_endpoint)?;
        }
        Ok(())
    }
}

/// 一組「來源資料夾 → 目的地分類」對應，以及處理結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingItem {
    pub folder_name: String,
    pub category_id: String,

    pub processed: bool,
    pub process_start_time: Option<DateTime<Utc>>,
    pub process_end_time: Option<DateTime<Utc>>,
    pub processed_media_count: usize,
    pub success_media_count: usize,
    pub failure_media_count: usize,
    pub error_message: Option<String>,
    pub success: bool,
}

impl MappingItem {
    pub fn new(folder_name: impl Into<String>, category_id: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            category_id: category_id.into(),
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// 已處理且沒有錯誤、至少上傳成功一個檔案
    pub fn is_successful(&self) -> bool {
        self.processed && self.success && self.error_message.is_none()
    }

    pub fn is_failed(&self) -> bool {
        self.processed && !self.is_successful()
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.process_end_time? - self.process_start_time?)
    }

    pub(crate) fn reset_results(&mut self) {
        self.processed = false;
        self.process_start_time = None;
        self.process_end_time = None;
        self.processed_media_count = 0;
        self.success_media_count = 0;
        self.failure_media_count = 0;
        self.error_message = None;
        self.success = false;
    }
}

impl Validate for MappingItem {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("folder_name", &self.folder_name)?;
        validate_non_empty_string("category_id", &self.category_id)?;
        Ok(())
    }
}

/// 傳輸狀態機：Ready → Running → {Completed | Failed | Cancelled}
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    #[default]
    Ready,
    Running,
    /// 保留狀態，目前沒有任何轉換會進入
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    pub total_items: usize,
    pub processed_items: usize,
    pub successful_items: usize,
    pub failed_items: usize,
    pub current_item: Option<MappingItem>,
    pub progress_percentage: u8,
}

impl TransferProgress {
    pub fn new(
        total_items: usize,
        processed_items: usize,
        successful_items: usize,
        failed_items: usize,
        current_item: Option<MappingItem>,
    ) -> Self {
        let progress_percentage = if total_items == 0 {
            0
        } else {
            (processed_items.min(total_items) * 100 / total_items) as u8
        };
        Self {
            total_items,
            processed_items,
            successful_items,
            failed_items,
            current_item,
            progress_percentage,
        }
    }
}

/// 引擎發出的事件，依序送進呼叫端提供的 channel
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    StatusChanged(TransferStatus),
    ProgressChanged(TransferProgress),
}

/// 整個引擎生命週期內累計的媒體上傳計數
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadCounters {
    pub total_processed_media: usize,
    pub successful_uploads: usize,
    pub failed_uploads: usize,
}

impl UploadCounters {
    pub fn record(&mut self, uploaded: bool) {
        self.total_processed_media += 1;
        if uploaded {
            self.successful_uploads += 1;
        } else {
            self.failed_uploads += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferSummary {
    pub total_items: usize,
    pub processed_items: usize,
    pub successful_items: usize,
    pub failed_items: usize,
    pub total_processed_media: usize,
    pub successful_uploads: usize,
    pub failed_uploads: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl TransferSummary {
    pub fn compute(
        items: &[MappingItem],
        counters: UploadCounters,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        let processed_items = items.iter().filter(|i| i.processed).count();
        let successful_items = items.iter().filter(|i| i.is_successful()).count();

        Self {
            total_items: items.len(),
            processed_items,
            successful_items,
            failed_items: processed_items - successful_items,
            total_processed_media: counters.total_processed_media,
            successful_uploads: counters.successful_uploads,
            failed_uploads: counters.failed_uploads,
            start_time,
            end_time,
        }
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.end_time? - self.start_time?)
    }
}

/// 上傳到目的地 API 的 JSON 內容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadPayload {
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "Description")]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 日誌的關聯欄位
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    pub category_id: Option<String>,
    pub folder_name: Option<String>,
    pub file_name: Option<String>,
    pub error_details: Option<String>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn folder(mut self, folder_name: impl Into<String>) -> Self {
        self.folder_name = Some(folder_name.into());
        self
    }

    pub fn file(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn details(mut self, error_details: impl Into<String>) -> Self {
        self.error_details = Some(error_details.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.category_id.is_none() && self.folder_name.is_none() && self.file_name.is_none()
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            ("Category", &self.category_id),
            ("Folder", &self.folder_name),
            ("File", &self.file_name),
        ]
        .iter()
        .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v)))
        .collect();
        f.write_str(&parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(flatten)]
    pub context: LogContext,
}

impl LogRecord {
    /// `<timestamp> [<Level>] <context> - <message>`
    pub fn to_log_line(&self) -> String {
        let timestamp = self.timestamp.format("%Y-%m-%d %H:%M:%S");
        let mut line = if self.context.is_empty() {
            format!("{} [{}] {}", timestamp, self.level, self.message)
        } else {
            format!("{} [{}] {} - {}", timestamp, self.level, self.context, self.message)
        };
        if let Some(details) = &self.context.error_details {
            line.push_str(&format!(" | Details: {}", details));
        }
        line
    }
}

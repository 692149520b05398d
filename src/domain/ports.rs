use crate::domain::model::{LogContext, LogLevel, LogRecord, SourceStoreConfig};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// 一次 delimiter 列表請求的結果（單頁）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// 物件的完整 key
    pub keys: Vec<String>,
    /// 以 delimiter 分組的共同前綴（含結尾的 delimiter）
    pub common_prefixes: Vec<String>,
    /// 還有下一頁時才會有值
    pub next_continuation_token: Option<String>,
}

/// 扁平的物件儲存後端（S3、記憶體）
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 以新設定重建底層連線
    fn configure(&mut self, config: &SourceStoreConfig) -> Result<()>;

    async fn list_page(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<String>,
    ) -> Result<ListPage>;

    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;
}

/// 上傳媒體到目的地 API
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn test_connection(&self) -> Result<bool>;

    /// HTTP 層失敗回傳 `Ok(false)`，傳輸層失敗回傳 `Err`；
    /// 送出前已取消則回傳 `TransferError::Cancelled`，已送出的請求不會被中斷
    async fn upload_media(
        &self,
        category_id: &str,
        file_name: &str,
        base64_content: &str,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<bool>;
}

/// `process_folder_files` 對每個下載完成的檔案呼叫一次
#[async_trait]
pub trait FileProcessor: Send + Sync {
    async fn process(&self, file_name: &str, content: Cursor<Vec<u8>>) -> Result<bool>;
}

static NEXT_LOG_ID: AtomicU64 = AtomicU64::new(1);

/// 結構化事件紀錄。引擎只負責寫入，儲存方式由實作決定。
pub trait LogSink: Send + Sync {
    fn append(&self, record: LogRecord);

    fn all_logs(&self) -> Vec<LogRecord>;

    fn log(&self, level: LogLevel, message: &str, context: LogContext) -> LogRecord {
        let record = LogRecord {
            id: NEXT_LOG_ID.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            context,
        };

        let ctx = &record.context;
        match level {
            LogLevel::Info | LogLevel::Success => tracing::info!(
                category = ctx.category_id.as_deref(),
                folder = ctx.folder_name.as_deref(),
                file = ctx.file_name.as_deref(),
                "{}",
                message
            ),
            LogLevel::Warning => tracing::warn!(
                category = ctx.category_id.as_deref(),
                folder = ctx.folder_name.as_deref(),
                file = ctx.file_name.as_deref(),
                "{}",
                message
            ),
            LogLevel::Error => tracing::error!(
                category = ctx.category_id.as_deref(),
                folder = ctx.folder_name.as_deref(),
                file = ctx.file_name.as_deref(),
                details = ctx.error_details.as_deref(),
                "{}",
                message
            ),
        }

        self.append(record.clone());
        record
    }

    fn log_info(&self, message: &str, context: LogContext) -> LogRecord {
        self.log(LogLevel::Info, message, context)
    }

    fn log_warning(&self, message: &str, context: LogContext) -> LogRecord {
        self.log(LogLevel::Warning, message, context)
    }

    fn log_error(&self, message: &str, context: LogContext) -> LogRecord {
        self.log(LogLevel::Error, message, context)
    }

    fn log_success(&self, message: &str, context: LogContext) -> LogRecord {
        self.log(LogLevel::Success, message, context)
    }
}

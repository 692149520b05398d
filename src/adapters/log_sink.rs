use crate::domain::model::LogRecord;
use crate::domain::ports::LogSink;
use crate::utils::error::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

const LOG_CHANNEL_CAPACITY: usize = 1024;

/// 保存在記憶體中的日誌，可選擇同時寫入檔案。
///
/// 引擎從背景工作寫入，UI 或 CLI 從其他執行緒讀取，所以清單以 mutex 保護。
pub struct MemoryLogSink {
    records: Mutex<Vec<LogRecord>>,
    sender: broadcast::Sender<LogRecord>,
    file: Option<Mutex<File>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(LOG_CHANNEL_CAPACITY);
        Self {
            records: Mutex::new(Vec::new()),
            sender,
            file: None,
        }
    }

    /// 每筆紀錄額外附加一行到指定檔案
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut sink = Self::new();
        sink.file = Some(Mutex::new(file));
        Ok(sink)
    }

    /// 新紀錄事件（OnLogAdded）
    pub fn subscribe(&self) -> broadcast::Receiver<LogRecord> {
        self.sender.subscribe()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn clear(&self) {
        self.records().clear();
    }

    fn records(&self) -> MutexGuard<'_, Vec<LogRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_line(&self, record: &LogRecord) {
        let Some(file) = &self.file else {
            return;
        };
        let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(file, "{}", record.to_log_line()) {
            tracing::warn!("⚠️ Failed to write log file: {}", e);
        }
    }
}

impl Default for MemoryLogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for MemoryLogSink {
    fn append(&self, record: LogRecord) {
        self.write_line(&record);
        self.records().push(record.clone());
        // 沒有訂閱者時 send 會失敗，可忽略
        let _ = self.sender.send(record);
    }

    fn all_logs(&self) -> Vec<LogRecord> {
        self.records().clone()
    }
}

/// 丟棄所有紀錄（仍會轉送到 tracing）
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn append(&self, _record: LogRecord) {}

    fn all_logs(&self) -> Vec<LogRecord> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{LogContext, LogLevel};
    use std::sync::Arc;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryLogSink::new();
        sink.log_info("first", LogContext::new());
        sink.log_warning("second", LogContext::new().folder("cats"));
        sink.log_error("third", LogContext::new().details("boom"));

        let logs = sink.all_logs();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "first");
        assert_eq!(logs[1].level, LogLevel::Warning);
        assert_eq!(logs[1].context.folder_name.as_deref(), Some("cats"));
        assert_eq!(logs[2].context.error_details.as_deref(), Some("boom"));
        assert!(logs[0].id < logs[1].id && logs[1].id < logs[2].id);
    }

    #[tokio::test]
    async fn test_subscribe_receives_new_records() {
        let sink = MemoryLogSink::new();
        let mut rx = sink.subscribe();

        let record = sink.log_success("uploaded", LogContext::new().category("1001"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received, record);
    }

    #[test]
    fn test_concurrent_append_and_read() {
        let sink = Arc::new(MemoryLogSink::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        sink.log_info(&format!("thread {} entry {}", t, i), LogContext::new());
                        let _ = sink.all_logs();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.len(), 200);
    }

    #[test]
    fn test_file_sink_appends_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("transfer.log");

        let sink = MemoryLogSink::with_file(&path).unwrap();
        sink.log_info("Starting transfer", LogContext::new());
        sink.log_error(
            "Upload failed",
            LogContext::new().category("1001").file("a.png"),
        );

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[Info] Starting transfer"));
        assert!(lines[1].contains("[Error] Category: 1001, File: a.png - Upload failed"));
    }

    #[test]
    fn test_null_sink_discards() {
        let sink = NullLogSink;
        let record = sink.log_info("ignored", LogContext::new());
        assert_eq!(record.message, "ignored");
        assert!(sink.all_logs().is_empty());
    }
}

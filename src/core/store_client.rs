use crate::domain::model::{LogContext, SourceStoreConfig};
use crate::domain::ports::{FileProcessor, LogSink, ObjectStore};
use crate::utils::error::{Result, TransferError};
use crate::utils::validation::Validate;
use std::io::Cursor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DELIMITER: &str = "/";

/// 來源端客戶端：在扁平的物件儲存上模擬「資料夾」
pub struct SourceStoreClient<S: ObjectStore> {
    store: S,
    config: SourceStoreConfig,
    log: Arc<dyn LogSink>,
}

impl<S: ObjectStore> SourceStoreClient<S> {
    pub fn new(mut store: S, config: SourceStoreConfig, log: Arc<dyn LogSink>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| TransferError::configuration(e.to_string()))?;
        store.configure(&config)?;

        Ok(Self { store, config, log })
    }

    /// 驗證並以新設定重建底層客戶端
    pub fn configure(&mut self, config: SourceStoreConfig) -> Result<()> {
        config
            .validate()
            .map_err(|e| TransferError::configuration(e.to_string()))?;
        self.store.configure(&config)?;

        self.log.log_info(
            &format!(
                "Object store configured: bucket '{}', base path '{}'",
                config.bucket, config.base_path
            ),
            LogContext::new(),
        );
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &SourceStoreConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// `basePath/path/`，空片段會被略過
    pub fn folder_prefix(&self, path: &str) -> String {
        let joined = [self.config.normalized_base_path(), path.trim_matches('/')]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(DELIMITER);

        if joined.is_empty() {
            joined
        } else {
            format!("{}{}", joined, DELIMITER)
        }
    }

    /// 列出基礎路徑；能連上回傳 `true`，連線失敗回傳錯誤
    pub async fn test_connection(&self) -> Result<bool> {
        let prefix = self.folder_prefix("");
        match self.store.list_page(&prefix, Some(DELIMITER), None).await {
            Ok(_) => {
                self.log.log_success(
                    &format!("Connected to bucket '{}'", self.config.bucket),
                    LogContext::new(),
                );
                Ok(true)
            }
            Err(e) => {
                self.log.log_error(
                    "Object store connection test failed",
                    LogContext::new().details(e.to_string()),
                );
                Err(e)
            }
        }
    }

    /// 第一層「資料夾」名稱（不含完整路徑）
    pub async fn list_folders(&self, prefix: &str) -> Result<Vec<String>> {
        let list_prefix = self.folder_prefix(prefix);
        let mut folders = Vec::new();
        let mut token = None;

        loop {
            let page = match self.store.list_page(&list_prefix, Some(DELIMITER), token).await {
                Ok(page) => page,
                Err(e) => {
                    self.log.log_error(
                        &format!("Failed to list folders under '{}'", list_prefix),
                        LogContext::new().details(e.to_string()),
                    );
                    return Err(e);
                }
            };

            folders.extend(page.common_prefixes.iter().filter_map(|common| {
                let name = common
                    .strip_prefix(list_prefix.as_str())
                    .unwrap_or(common)
                    .trim_end_matches(DELIMITER);
                (!name.is_empty()).then(|| name.to_string())
            }));

            token = page.next_continuation_token;
            if token.is_none() {
                break;
            }
        }

        self.log.log_info(
            &format!("Found {} folders under '{}'", folders.len(), list_prefix),
            LogContext::new(),
        );
        Ok(folders)
    }

    /// 資料夾底下（不含子資料夾）的完整 key，排除資料夾標記物件
    pub async fn list_files(&self, folder_path: &str) -> Result<Vec<String>> {
        let list_prefix = self.folder_prefix(folder_path);
        let mut files = Vec::new();
        let mut token = None;

        loop {
            let page = match self.store.list_page(&list_prefix, Some(DELIMITER), token).await {
                Ok(page) => page,
                Err(e) => {
                    self.log.log_error(
                        &format!("Failed to list files under '{}'", list_prefix),
                        LogContext::new().folder(folder_path).details(e.to_string()),
                    );
                    return Err(e);
                }
            };

            files.extend(page.keys.into_iter().filter(|key| *key != list_prefix));

            token = page.next_continuation_token;
            if token.is_none() {
                break;
            }
        }

        self.log.log_info(
            &format!("Found {} files in folder", files.len()),
            LogContext::new().folder(folder_path),
        );
        Ok(files)
    }

    /// 完整下載到記憶體，回傳位於開頭的 cursor
    pub async fn download_file(&self, key: &str) -> Result<Cursor<Vec<u8>>> {
        match self.store.get_object(key).await {
            Ok(data) => {
                tracing::debug!("⬇️ Downloaded {} ({} bytes)", key, data.len());
                Ok(Cursor::new(data))
            }
            Err(e) => {
                self.log.log_error(
                    "Failed to download file",
                    LogContext::new().file(key).details(e.to_string()),
                );
                Err(e)
            }
        }
    }

    /// 逐一下載資料夾中的檔案並交給 `processor`。
    ///
    /// 每個檔案前檢查取消訊號，取消時提前結束（不是錯誤）。單一檔案下載或處理失敗
    /// 只會記錄並略過。回傳 `processor` 回報成功的次數。列表失敗則回傳錯誤。
    pub async fn process_folder_files<P>(
        &self,
        folder_path: &str,
        processor: &P,
        cancel: &CancellationToken,
    ) -> Result<usize>
    where
        P: FileProcessor + ?Sized,
    {
        let keys = self.list_files(folder_path).await?;
        let total = keys.len();
        let mut processed = 0;

        for key in keys {
            if cancel.is_cancelled() {
                self.log.log_warning(
                    "Folder processing cancelled",
                    LogContext::new().folder(folder_path),
                );
                break;
            }

            let file_name = key.rsplit(DELIMITER).next().unwrap_or(key.as_str()).to_string();

            let content = match self.download_file(&key).await {
                Ok(content) => content,
                Err(_) => continue,
            };

            match processor.process(&file_name, content).await {
                Ok(true) => processed += 1,
                Ok(false) => {}
                Err(e) => {
                    self.log.log_error(
                        "Error while processing file",
                        LogContext::new()
                            .folder(folder_path)
                            .file(&file_name)
                            .details(e.to_string()),
                    );
                }
            }
        }

        self.log.log_info(
            &format!("Processed {}/{} files", processed, total),
            LogContext::new().folder(folder_path),
        );
        Ok(processed)
    }
}

//! 傳輸引擎：依序處理每個對應項目，「列出檔案 → 下載 → 編碼 → 上傳」，
//! 累計結果、送出進度事件，並支援協作式取消。

use crate::core::encoding::stream_to_base64;
use crate::core::store_client::SourceStoreClient;
use crate::domain::model::{
    LogContext, MappingItem, TransferEvent, TransferProgress, TransferStatus, TransferSummary,
    UploadCounters,
};
use crate::domain::ports::{FileProcessor, LogSink, MediaUploader, ObjectStore};
use crate::utils::error::{Result, TransferError};
use crate::utils::validation::Validate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct EngineState {
    status: TransferStatus,
    items: Vec<MappingItem>,
    counters: UploadCounters,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

pub struct TransferEngine<S: ObjectStore, U: MediaUploader> {
    store: SourceStoreClient<S>,
    uploader: U,
    log: Arc<dyn LogSink>,
    state: Mutex<EngineState>,
    /// 執行中才有值：呼叫端 token 的 child，`stop_transfer` 只取消這一個
    stop: Mutex<Option<CancellationToken>>,
}

/// 執行結束（含 future 被丟棄）時清掉內部取消來源；仍停在 Running 就改成 Cancelled
struct RunGuard<'a> {
    state: &'a Mutex<EngineState>,
    stop: &'a Mutex<Option<CancellationToken>>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        lock(self.stop).take();
        let mut state = lock(self.state);
        if state.status == TransferStatus::Running {
            state.status = TransferStatus::Cancelled;
            state.end_time.get_or_insert_with(Utc::now);
        }
    }
}

impl<S: ObjectStore, U: MediaUploader> TransferEngine<S, U> {
    pub fn new(store: SourceStoreClient<S>, uploader: U, log: Arc<dyn LogSink>) -> Self {
        Self {
            store,
            uploader,
            log,
            state: Mutex::new(EngineState::default()),
            stop: Mutex::new(None),
        }
    }

    pub fn store_client(&self) -> &SourceStoreClient<S> {
        &self.store
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    /// 依序處理所有對應項目。
    ///
    /// 只有參數驗證與狀態檢查會回傳 `Err`；執行中的任何錯誤都記錄在項目上並算作失敗。
    /// 回傳值表示「至少一個項目成功」，與最終狀態（有任何失敗即 `Failed`）彼此獨立。
    pub async fn start_transfer(
        &self,
        items: Vec<MappingItem>,
        events: Option<mpsc::Sender<TransferEvent>>,
        cancel: CancellationToken,
    ) -> Result<bool> {
        if items.is_empty() {
            return Err(TransferError::validation(
                "items",
                "at least one mapping item is required",
            ));
        }

        let total = items.len();
        let combined = cancel.child_token();
        {
            let mut state = lock(&self.state);
            if state.status == TransferStatus::Running {
                return Err(TransferError::invalid_state("a transfer is already running"));
            }

            state.status = TransferStatus::Running;
            state.start_time = Some(Utc::now());
            state.end_time = None;
            state.counters = UploadCounters::default();
            state.items = items;
            state.items.iter_mut().for_each(MappingItem::reset_results);
            *lock(&self.stop) = Some(combined.clone());
        }
        let _guard = RunGuard {
            state: &self.state,
            stop: &self.stop,
        };

        emit(&events, TransferEvent::StatusChanged(TransferStatus::Running)).await;
        self.log
            .log_info(&format!("🚀 Transfer started: {} mapping items", total), LogContext::new());

        let (mut processed, mut successful, mut failed) = (0usize, 0usize, 0usize);

        for index in 0..total {
            if combined.is_cancelled() {
                return Ok(self.cancel_run(&events, processed, total).await);
            }

            let mut item = lock(&self.state).items[index].clone();
            emit(
                &events,
                TransferEvent::ProgressChanged(TransferProgress::new(
                    total,
                    processed,
                    successful,
                    failed,
                    Some(item.clone()),
                )),
            )
            .await;

            let ok = match self.process_mapping_item(&mut item, &combined).await {
                Ok(ok) => ok,
                Err(e) => {
                    item.processed = true;
                    item.process_end_time = Some(Utc::now());
                    item.error_message = Some(e.to_string());
                    item.success = false;
                    self.log.log_error(
                        "Mapping item failed",
                        LogContext::new()
                            .category(&item.category_id)
                            .folder(&item.folder_name)
                            .details(e.to_string()),
                    );
                    false
                }
            };

            processed += 1;
            if ok {
                successful += 1;
            } else {
                failed += 1;
            }
            lock(&self.state).items[index] = item;
        }

        // 最後一個項目途中收到停止：檔案迴圈已提前結束，整體仍算取消
        if combined.is_cancelled() {
            return Ok(self.cancel_run(&events, processed, total).await);
        }

        let status = if failed > 0 {
            TransferStatus::Failed
        } else {
            TransferStatus::Completed
        };
        self.finish(status);

        emit(&events, TransferEvent::StatusChanged(status)).await;
        emit(
            &events,
            TransferEvent::ProgressChanged(TransferProgress::new(
                total, processed, successful, failed, None,
            )),
        )
        .await;

        let summary = self.summary();
        self.log.log_info(
            &format!(
                "🏁 Transfer {}: {}/{} items succeeded, {} media uploaded, {} failed",
                status,
                summary.successful_items,
                summary.total_items,
                summary.successful_uploads,
                summary.failed_uploads
            ),
            LogContext::new(),
        );

        Ok(successful > 0)
    }

    fn finish(&self, status: TransferStatus) {
        let mut state = lock(&self.state);
        state.status = status;
        state.end_time = Some(Utc::now());
    }

    async fn cancel_run(
        &self,
        events: &Option<mpsc::Sender<TransferEvent>>,
        processed: usize,
        total: usize,
    ) -> bool {
        self.log.log_warning(
            &format!("Transfer cancelled after {}/{} items", processed, total),
            LogContext::new(),
        );
        self.finish(TransferStatus::Cancelled);
        emit(events, TransferEvent::StatusChanged(TransferStatus::Cancelled)).await;
        false
    }

    /// 要求停止目前的傳輸；實際停止發生在下一個項目或檔案的檢查點
    pub fn stop_transfer(&self) {
        if self.status() != TransferStatus::Running {
            return;
        }
        if let Some(token) = lock(&self.stop).as_ref() {
            token.cancel();
            self.log
                .log_warning("Stop requested; finishing current file", LogContext::new());
        }
    }

    /// 處理單一對應項目並把結果寫回 `item`。
    ///
    /// 項目無效時回傳 `Validation` 錯誤；其他失敗（例如列出檔案失敗）記在
    /// `error_message`，回傳 `Ok(false)`。
    pub async fn process_mapping_item(
        &self,
        item: &mut MappingItem,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        item.validate()?;

        item.reset_results();
        item.process_start_time = Some(Utc::now());
        let context = LogContext::new()
            .category(&item.category_id)
            .folder(&item.folder_name);
        self.log.log_info("Processing folder", context.clone());

        let processor = UploadProcessor {
            uploader: &self.uploader,
            category_id: &item.category_id,
            engine_state: &self.state,
            item_counters: Mutex::new(UploadCounters::default()),
            log: self.log.as_ref(),
            cancel,
        };
        let result = self
            .store
            .process_folder_files(&item.folder_name, &processor, cancel)
            .await;
        let counters = *lock(&processor.item_counters);

        item.process_end_time = Some(Utc::now());
        item.processed = true;
        item.success_media_count = counters.successful_uploads;
        item.failure_media_count = counters.failed_uploads;

        match result {
            Ok(count) => {
                item.processed_media_count = count;
                item.success = count > 0;
                self.log.log_success(
                    &format!(
                        "Folder done: {} uploaded, {} failed",
                        counters.successful_uploads, counters.failed_uploads
                    ),
                    context,
                );
                Ok(item.success)
            }
            Err(e) => {
                item.error_message = Some(e.to_string());
                item.success = false;
                self.log
                    .log_error("Folder processing failed", context.details(e.to_string()));
                Ok(false)
            }
        }
    }

    pub fn status(&self) -> TransferStatus {
        lock(&self.state).status
    }

    pub fn is_running(&self) -> bool {
        self.status() == TransferStatus::Running
    }

    pub fn summary(&self) -> TransferSummary {
        let state = lock(&self.state);
        TransferSummary::compute(&state.items, state.counters, state.start_time, state.end_time)
    }

    /// 目前（或上一次）執行的項目與結果
    pub fn results(&self) -> Vec<MappingItem> {
        lock(&self.state).items.clone()
    }

    pub fn counters(&self) -> UploadCounters {
        lock(&self.state).counters
    }
}

async fn emit(events: &Option<mpsc::Sender<TransferEvent>>, event: TransferEvent) {
    if let Some(tx) = events {
        // 接收端關閉不影響傳輸
        let _ = tx.send(event).await;
    }
}

/// 單一項目的逐檔上傳：編碼、上傳並更新計數
struct UploadProcessor<'a, U: MediaUploader> {
    uploader: &'a U,
    category_id: &'a str,
    engine_state: &'a Mutex<EngineState>,
    item_counters: Mutex<UploadCounters>,
    log: &'a dyn LogSink,
    cancel: &'a CancellationToken,
}

impl<U: MediaUploader> UploadProcessor<'_, U> {
    async fn upload(&self, file_name: &str, content: Cursor<Vec<u8>>) -> Result<bool> {
        let encoded = stream_to_base64(content, file_name)?;
        self.uploader
            .upload_media(self.category_id, file_name, &encoded, "", self.cancel)
            .await
    }

    fn record(&self, uploaded: bool) {
        lock(&self.item_counters).record(uploaded);
        lock(self.engine_state).counters.record(uploaded);
    }
}

#[async_trait]
impl<'a, U: MediaUploader> FileProcessor for UploadProcessor<'a, U> {
    async fn process(&self, file_name: &str, content: Cursor<Vec<u8>>) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Ok(false);
        }

        let uploaded = match self.upload(file_name, content).await {
            Ok(uploaded) => uploaded,
            // 沒有送出，不算失敗
            Err(TransferError::Cancelled) => return Ok(false),
            Err(e) => {
                self.log.log_error(
                    "Failed to upload file",
                    LogContext::new()
                        .category(self.category_id)
                        .file(file_name)
                        .details(e.to_string()),
                );
                false
            }
        };

        self.record(uploaded);
        Ok(uploaded)
    }
}

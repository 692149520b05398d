use anyhow::Context;
use clap::Parser;
use media_transfer::adapters::{MemoryLogSink, S3Store};
use media_transfer::config::{CliConfig, RunMode, TransferConfig};
use media_transfer::core::{DestinationClient, MediaUploader, ObjectStore, SourceStoreClient, TransferEngine};
use media_transfer::domain::model::{MappingItem, TransferEvent, TransferStatus};
use media_transfer::utils::error::{ErrorSeverity, TransferError};
use media_transfer::utils::{logger, monitor::TransferMonitor, validation::Validate};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => report_error(&e),
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
}

async fn run(cli: CliConfig) -> anyhow::Result<i32> {
    let config = TransferConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config file '{}'", cli.config.display()))?;

    // 初始化日誌：命令列旗標與設定檔任一開啟即生效
    logger::init_cli_logger(
        cli.verbose || config.logging.verbose,
        cli.json_logs || config.logging.json,
    );

    tracing::info!("🚀 Starting media-transfer");
    tracing::info!("📁 Configuration: {}", cli.config.display());
    tracing::debug!("Config: {:?}", config);

    config.validate()?;
    tracing::info!("✅ Configuration loaded and validated successfully");

    let log = match &config.logging.log_file {
        Some(path) => Arc::new(
            MemoryLogSink::with_file(path)
                .with_context(|| format!("Failed to open log file '{}'", path))?,
        ),
        None => Arc::new(MemoryLogSink::new()),
    };

    let monitor = Arc::new(TransferMonitor::new(cli.monitor));
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
        monitor.log_checkpoint("Startup");
    }

    let store = SourceStoreClient::new(
        S3Store::new(&config.source)?,
        config.source.clone(),
        log.clone(),
    )?;

    match cli.mode() {
        RunMode::ListFolders => {
            for folder in store.list_folders("").await? {
                println!("{}", folder);
            }
            return Ok(0);
        }
        RunMode::DryRun => {
            tracing::info!("🔍 DRY RUN MODE - nothing will be uploaded");
            let items = config.load_mapping(cli.mapping.as_deref())?;
            perform_dry_run(&store, &items).await;
            return Ok(0);
        }
        RunMode::TestConnection | RunMode::Transfer => {}
    }

    let uploader = DestinationClient::new(config.destination.clone(), log.clone())?;

    if cli.mode() == RunMode::TestConnection {
        return Ok(test_connections(&store, &uploader).await);
    }

    let items = config.load_mapping(cli.mapping.as_deref())?;
    let engine = TransferEngine::new(store, uploader, log.clone());

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("🛑 Interrupt received, stopping after the current file");
                cancel.cancel();
            }
        }
    });

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let printer = tokio::spawn(print_events(rx, monitor.clone()));

    let any_success = engine.start_transfer(items, Some(tx), cancel).await?;
    join_printer(printer).await;

    monitor.log_checkpoint("Finished");
    print_summary(&engine);

    Ok(match engine.status() {
        TransferStatus::Completed => 0,
        TransferStatus::Cancelled => EXIT_INTERRUPTED,
        _ if any_success => 2,
        _ => 1,
    })
}

/// 等待進度輸出任務結束；任務 panic 時只記錄警告，不影響結束碼
async fn join_printer(printer: tokio::task::JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("⚠️ Progress printer stopped unexpectedly: {}", e);
            false
        }
    }
}

async fn print_events(mut rx: mpsc::Receiver<TransferEvent>, monitor: Arc<TransferMonitor>) {
    while let Some(event) = rx.recv().await {
        match event {
            TransferEvent::StatusChanged(status) => println!("📌 Status: {}", status),
            TransferEvent::ProgressChanged(progress) => match &progress.current_item {
                Some(item) => {
                    monitor.log_checkpoint(&format!("Item {}", item.folder_name));
                    println!(
                        "[{:>3}%] {}/{} {} → {}",
                        progress.progress_percentage,
                        progress.processed_items + 1,
                        progress.total_items,
                        item.folder_name,
                        item.category_id
                    );
                }
                None => println!(
                    "[{:>3}%] {} succeeded, {} failed",
                    progress.progress_percentage, progress.successful_items, progress.failed_items
                ),
            },
        }
    }
}

async fn perform_dry_run<S: ObjectStore>(store: &SourceStoreClient<S>, items: &[MappingItem]) {
    println!("📋 {} mapping items", items.len());
    for item in items {
        match store.list_files(&item.folder_name).await {
            Ok(keys) => {
                println!(
                    "  {} → {}: {} files",
                    item.folder_name,
                    item.category_id,
                    keys.len()
                );
                for key in keys {
                    println!("    - {}", key);
                }
            }
            Err(e) => println!("  {} → {}: ❌ {}", item.folder_name, item.category_id, e),
        }
    }
}

async fn test_connections<S: ObjectStore, U: MediaUploader>(
    store: &SourceStoreClient<S>,
    uploader: &U,
) -> i32 {
    let source_ok = print_check("Object store", store.test_connection().await);
    let destination_ok = print_check("Destination API", uploader.test_connection().await);

    if source_ok && destination_ok {
        0
    } else {
        2
    }
}

fn print_check(name: &str, result: Result<bool, TransferError>) -> bool {
    match result {
        Ok(true) => {
            println!("✅ {}: connected", name);
            true
        }
        Ok(false) => {
            println!("⚠️ {}: reachable but returned an error status", name);
            false
        }
        Err(e) => {
            println!("❌ {}: {}", name, e.user_friendly_message());
            println!("💡 {}", e.recovery_suggestion());
            false
        }
    }
}

fn print_summary<S: ObjectStore, U: MediaUploader>(engine: &TransferEngine<S, U>) {
    let summary = engine.summary();

    println!();
    println!("📊 Transfer {}", engine.status());
    for item in engine.results() {
        let state = if !item.processed {
            "skipped"
        } else if item.is_successful() {
            "ok"
        } else {
            "failed"
        };
        println!(
            "  {:<8} {} → {}: {} uploaded, {} failed{}",
            state,
            item.folder_name,
            item.category_id,
            item.success_media_count,
            item.failure_media_count,
            item.error_message
                .as_deref()
                .map(|e| format!(" ({})", e))
                .unwrap_or_default()
        );
    }
    println!(
        "  Items: {}/{} processed, {} succeeded, {} failed",
        summary.processed_items, summary.total_items, summary.successful_items, summary.failed_items
    );
    println!(
        "  Media: {} processed, {} uploaded, {} failed",
        summary.total_processed_media, summary.successful_uploads, summary.failed_uploads
    );
    if let Some(duration) = summary.duration() {
        println!("  Duration: {:.1}s", duration.num_milliseconds() as f64 / 1000.0);
    }
}

/// 依錯誤嚴重程度決定退出碼
fn report_error(error: &anyhow::Error) -> i32 {
    let Some(e) = error.downcast_ref::<TransferError>() else {
        tracing::error!("❌ {:#}", error);
        eprintln!("❌ {:#}", error);
        return 1;
    };

    tracing::error!(
        "❌ {:#} (Category: {:?}, Severity: {:?})",
        error,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

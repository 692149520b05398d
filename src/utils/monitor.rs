#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// 一次取樣的行程資源狀態
#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct ResourceSample {
    pub cpu_usage: f32,
    pub memory_mb: u64,
    pub peak_memory_mb: u64,
    /// 自監控開始的總時間
    pub elapsed: Duration,
    /// 自上一個檢查點以來的時間
    pub since_checkpoint: Duration,
}

#[cfg(feature = "cli")]
struct Checkpoints {
    system: System,
    peak_memory_mb: u64,
    last: Instant,
}

/// 傳輸期間的資源監控（CLI `--monitor`）
///
/// 每個對應項目開始時記一個檢查點，log 出該行程的 CPU、記憶體與
/// 上一個項目花費的時間。取不到目前 PID 時自動停用。
#[cfg(feature = "cli")]
pub struct TransferMonitor {
    pid: Option<Pid>,
    started: Instant,
    state: Mutex<Checkpoints>,
}

#[cfg(feature = "cli")]
impl TransferMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = if enabled {
            sysinfo::get_current_pid()
                .map_err(|e| tracing::warn!("⚠️ Cannot resolve current PID, monitoring disabled: {}", e))
                .ok()
        } else {
            None
        };

        let now = Instant::now();
        Self {
            pid,
            started: now,
            state: Mutex::new(Checkpoints {
                system: System::new(),
                peak_memory_mb: 0,
                last: now,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.pid.is_some()
    }

    /// 取樣並把檢查點推進到現在
    pub fn checkpoint(&self) -> Option<ResourceSample> {
        let pid = self.pid?;
        let mut state = self.state.lock().ok()?;

        state.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
        let process = state.system.process(pid)?;
        let cpu_usage = process.cpu_usage();
        let memory_mb = process.memory() / 1024 / 1024;

        state.peak_memory_mb = state.peak_memory_mb.max(memory_mb);
        let now = Instant::now();
        let since_checkpoint = now.duration_since(state.last);
        state.last = now;

        Some(ResourceSample {
            cpu_usage,
            memory_mb,
            peak_memory_mb: state.peak_memory_mb,
            elapsed: now.duration_since(self.started),
            since_checkpoint,
        })
    }

    pub fn log_checkpoint(&self, label: &str) {
        if let Some(sample) = self.checkpoint() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Step: {:?}, Total: {:?}",
                label,
                sample.cpu_usage,
                sample.memory_mb,
                sample.peak_memory_mb,
                sample.since_checkpoint,
                sample.elapsed
            );
        }
    }
}

// 非 CLI 環境的空實現
#[cfg(not(feature = "cli"))]
pub struct TransferMonitor;

#[cfg(not(feature = "cli"))]
impl TransferMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn is_enabled(&self) -> bool {
        false
    }

    pub fn log_checkpoint(&self, _label: &str) {}
}

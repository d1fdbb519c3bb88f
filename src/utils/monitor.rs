#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct StageStats {
    pub stage: String,
    pub records: usize,
    pub elapsed: Duration,
    pub memory_mb: Option<u64>,
}

/// Times pipeline stages and, when enabled, samples process memory.
pub struct StageMonitor {
    start_time: Instant,
    last_mark: Instant,
    enabled: bool,
    #[cfg(feature = "cli")]
    system: Mutex<System>,
    #[cfg(feature = "cli")]
    pid: Option<Pid>,
}

impl StageMonitor {
    pub fn new(enabled: bool) -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_mark: now,
            enabled,
            #[cfg(feature = "cli")]
            system: Mutex::new(System::new()),
            #[cfg(feature = "cli")]
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(feature = "cli")]
    fn memory_mb(&self) -> Option<u64> {
        if !self.enabled {
            return None;
        }
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system.process(pid).map(|p| p.memory() / 1024 / 1024)
    }

    #[cfg(not(feature = "cli"))]
    fn memory_mb(&self) -> Option<u64> {
        None
    }

    /// 記錄階段耗時與筆數
    pub fn mark(&mut self, stage: &str, records: usize) -> StageStats {
        let now = Instant::now();
        let stats = StageStats {
            stage: stage.to_string(),
            records,
            elapsed: now.duration_since(self.last_mark),
            memory_mb: self.memory_mb(),
        };
        self.last_mark = now;

        match stats.memory_mb {
            Some(memory) => tracing::info!(
                "📊 {} - {} records in {:?}, memory {}MB",
                stats.stage,
                stats.records,
                stats.elapsed,
                memory
            ),
            None => tracing::debug!(
                "{} - {} records in {:?}",
                stats.stage,
                stats.records,
                stats.elapsed
            ),
        }
        stats
    }

    pub fn total_elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn log_final_stats(&self) {
        if self.enabled {
            tracing::info!("📊 Final Stats - Total Time: {:?}", self.total_elapsed());
        }
    }
}

impl Default for StageMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

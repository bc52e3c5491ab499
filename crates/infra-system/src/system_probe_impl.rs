// System probe implementation
// reason: sysinfo for cross-platform system monitoring
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use sysinfo::System;
use tracing::debug;

use foldbench_core::port::system_probe::{SystemMetrics, SystemProbe};

/// System probe implementation using sysinfo
pub struct SystemProbeImpl {
    system: Arc<Mutex<System>>,
}

impl SystemProbeImpl {
    /// Create a new system probe
    ///
    /// # Example
    /// ```ignore
    /// let probe = SystemProbeImpl::new();
    /// let workers = probe.get_metrics().await.worker_budget(0.8);
    /// ```
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new_all())),
        }
    }
}

impl Default for SystemProbeImpl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SystemProbe for SystemProbeImpl {
    async fn get_metrics(&self) -> SystemMetrics {
        let mut sys = self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        sys.refresh_cpu();
        sys.refresh_memory();

        let cpu_count = sys.cpus().len().max(1);
        let cpu_usage_percent = sys.global_cpu_info().cpu_usage();
        let memory_used_mb = sys.used_memory() / 1024 / 1024;
        let memory_total_mb = sys.total_memory() / 1024 / 1024;

        debug!(
            cpus = cpu_count,
            cpu = %cpu_usage_percent,
            mem_used_mb = %memory_used_mb,
            mem_total_mb = %memory_total_mb,
            "System metrics collected"
        );

        SystemMetrics {
            cpu_count,
            cpu_usage_percent,
            memory_used_mb,
            memory_total_mb,
        }
    }
}

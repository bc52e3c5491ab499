// System resource monitoring port
// reason: async-trait, probes may refresh blocking OS counters
use async_trait::async_trait;

/// Fraction of logical CPUs handed to CPU-bound local work
pub const DEFAULT_CPU_FRACTION: f64 = 0.8;

/// System resource metrics
#[derive(Debug, Clone)]
pub struct SystemMetrics {
    pub cpu_count: usize,
    pub cpu_usage_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
}

impl SystemMetrics {
    /// Worker count for a CPU fraction, at least one
    pub fn worker_budget(&self, fraction: f64) -> usize {
        ((self.cpu_count as f64) * fraction).floor().max(1.0) as usize
    }
}

/// System probe port for resource monitoring
///
/// Used to size worker pools and to log the machine a run happened on
#[async_trait]
pub trait SystemProbe: Send + Sync {
    /// Get current system metrics
    ///
    /// # Example
    /// ```text
    /// let metrics = probe.get_metrics().await;
    /// let workers = metrics.worker_budget(DEFAULT_CPU_FRACTION);
    /// ```
    async fn get_metrics(&self) -> SystemMetrics;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};
    /// Mock SystemProbe for testing
    pub struct MockSystemProbe {
        metrics: Arc<Mutex<SystemMetrics>>,
    }
    impl MockSystemProbe {
        pub fn new(cpu_count: usize) -> Self {
            Self {
                metrics: Arc::new(Mutex::new(SystemMetrics {
                    cpu_count,
                    cpu_usage_percent: 10.0,
                    memory_used_mb: 1024,
                    memory_total_mb: 2048,
                })),
            }
        }
        pub fn set_cpu_usage(&self, cpu_usage_percent: f32) {
            self.metrics.lock().unwrap().cpu_usage_percent = cpu_usage_percent;
        }
    }
    #[async_trait]
    impl SystemProbe for MockSystemProbe {
        async fn get_metrics(&self) -> SystemMetrics {
            self.metrics.lock().unwrap().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::MockSystemProbe;
    use super::*;

    #[test]
    fn test_worker_budget() {
        let probe = MockSystemProbe::new(10);
        let metrics = tokio_test::block_on(probe.get_metrics());
        assert_eq!(metrics.worker_budget(DEFAULT_CPU_FRACTION), 8);

        probe.set_cpu_usage(95.0);
        let metrics = tokio_test::block_on(probe.get_metrics());
        assert_eq!(metrics.cpu_usage_percent, 95.0);

        let metrics = tokio_test::block_on(MockSystemProbe::new(1).get_metrics());
        assert_eq!(metrics.worker_budget(DEFAULT_CPU_FRACTION), 1);
    }
}

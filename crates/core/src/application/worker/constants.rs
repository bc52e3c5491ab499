// Worker constants (no magic values)
use std::time::Duration;

/// Concurrent `ost` runs per target
pub const DEFAULT_OST_WORKERS: usize = 64;

/// Concurrent DockQ runs per target
pub const DEFAULT_DOCKQ_WORKERS: usize = 32;

/// Log a progress line every N finished jobs
pub const PROGRESS_LOG_EVERY: usize = 50;

/// Upper bound for a single external tool run (30 minutes)
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Graceful process shutdown timeout (5 seconds)
/// SIGTERM first, SIGKILL once this elapses
pub const GRACEFUL_SHUTDOWN_TIMEOUT_MS: i64 = 5000;

/// Poll interval while waiting for a terminated process to exit
pub const KILL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Chain-sequence mismatches DockQ tolerates when mapping chains
pub const DEFAULT_ALLOWED_MISMATCHES: u32 = 4;

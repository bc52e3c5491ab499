// foldbench Infrastructure - System Adapters
// Implements: ScoringTool (ost / DockQ subprocesses), SystemProbe

pub mod scoring_tool_impl;
pub mod system_probe_impl;

pub use scoring_tool_impl::{OstDockqTool, ToolConfig, DEFAULT_ENV_ALLOWLIST};
pub use system_probe_impl::SystemProbeImpl;

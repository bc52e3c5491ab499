// Scoring tool implementation
// reason: tokio::process for async subprocess management, nix for signals
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use foldbench_core::application::worker::constants::{
    DEFAULT_TOOL_TIMEOUT, GRACEFUL_SHUTDOWN_TIMEOUT_MS, KILL_POLL_INTERVAL,
};
use foldbench_core::port::scoring_tool::{
    ComparisonRequest, DockqRequest, ScoringTool, ToolError, ToolOutcome, ToolStatus,
};
use foldbench_core::port::TimeProvider;

/// Environment variables passed through to the tools by default
pub const DEFAULT_ENV_ALLOWLIST: [&str; 6] = [
    "PATH",
    "HOME",
    "USER",
    "LD_LIBRARY_PATH",
    "PYTHONPATH",
    "CONDA_PREFIX",
];

/// Executables and limits for the external tools
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub ost_executable: String,
    pub dockq_executable: String,
    /// Per-run limit; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Time between SIGTERM and SIGKILL
    pub graceful_timeout_ms: i64,
    pub env_allowlist: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ost_executable: "ost".to_string(),
            dockq_executable: "DockQ".to_string(),
            timeout: Some(DEFAULT_TOOL_TIMEOUT),
            graceful_timeout_ms: GRACEFUL_SHUTDOWN_TIMEOUT_MS,
            env_allowlist: DEFAULT_ENV_ALLOWLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// `ost` and `DockQ` run as child processes
///
/// Children get a cleared environment plus the allowlisted variables of the
/// parent. A run over the timeout is sent SIGTERM, then SIGKILL.
pub struct OstDockqTool {
    config: ToolConfig,
    time_provider: Arc<dyn TimeProvider>,
}

impl OstDockqTool {
    pub fn new(config: ToolConfig, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            config,
            time_provider,
        }
    }

    /// Allowlisted variables of the current environment
    fn filtered_env(&self) -> Vec<(String, OsString)> {
        std::env::vars_os()
            .filter_map(|(k, v)| {
                let key = k.into_string().ok()?;
                self.config.env_allowlist.contains(&key).then_some((key, v))
            })
            .collect()
    }

    async fn run(&self, program: &str, args: Vec<OsString>) -> Result<ToolOutcome, ToolError> {
        let start_time = self.time_provider.now_millis();
        debug!(program = %program, args = ?args, "Starting tool");

        let child = Command::new(program)
            .args(&args)
            .env_clear()
            .envs(self.filtered_env())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolError::SpawnFailed(format!("{}: {}", program, e)))?;
        let pid = child.id();

        let output = match self.config.timeout {
            Some(limit) => match timeout(limit, child.wait_with_output()).await {
                Ok(result) => result.map_err(|e| ToolError::IoError(e.to_string()))?,
                Err(_) => {
                    let limit_ms = limit.as_millis() as i64;
                    warn!(program = %program, pid = ?pid, timeout_ms = limit_ms, "Tool timed out");
                    if let Some(pid) = pid {
                        self.kill_graceful(pid as i32).await?;
                    }
                    return Err(ToolError::Timeout(limit_ms));
                }
            },
            None => child
                .wait_with_output()
                .await
                .map_err(|e| ToolError::IoError(e.to_string()))?,
        };

        let duration_ms = self.time_provider.elapsed_since(start_time);
        let status = if output.status.success() {
            ToolStatus::Success
        } else {
            ToolStatus::Failed
        };

        info!(
            program = %program,
            duration_ms = %duration_ms,
            exit_code = ?output.status.code(),
            status = ?status,
            "Tool finished"
        );

        Ok(ToolOutcome {
            status,
            duration_ms,
            exit_code: output.status.code(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        })
    }

    /// Kill process with SIGTERM first, then SIGKILL if needed
    async fn kill_graceful(&self, pid: i32) -> Result<(), ToolError> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            info!(pid = %pid, "Sending SIGTERM");
            kill(Pid::from_raw(pid), Signal::SIGTERM)
                .map_err(|e| ToolError::Killed(format!("SIGTERM failed: {}", e)))?;

            let start_time = self.time_provider.now_millis();
            loop {
                tokio::time::sleep(KILL_POLL_INTERVAL).await;

                // Signal 0 only checks for existence
                if kill(Pid::from_raw(pid), None).is_err() {
                    info!(pid = %pid, "Process exited after SIGTERM");
                    return Ok(());
                }

                if self.time_provider.elapsed_since(start_time) > self.config.graceful_timeout_ms {
                    warn!(pid = %pid, "Process did not exit after SIGTERM, sending SIGKILL");
                    kill(Pid::from_raw(pid), Signal::SIGKILL)
                        .map_err(|e| ToolError::Killed(format!("SIGKILL failed: {}", e)))?;
                    return Ok(());
                }
            }
        }

        #[cfg(windows)]
        {
            use std::process::Command;

            info!(pid = %pid, "Killing process on Windows");
            let output = Command::new("taskkill")
                .args(["/F", "/PID", &pid.to_string()])
                .output()
                .map_err(|e| ToolError::Killed(e.to_string()))?;

            if !output.status.success() {
                return Err(ToolError::Killed(format!(
                    "taskkill failed: {}",
                    String::from_utf8_lossy(&output.stderr)
                )));
            }

            Ok(())
        }
    }
}

fn os(path: &Path) -> OsString {
    path.as_os_str().to_os_string()
}

fn flags<'a>(values: &'a [&'a str]) -> impl Iterator<Item = OsString> + 'a {
    values.iter().map(OsString::from)
}

/// Arguments of `ost compare-structures`
pub fn structure_args(request: &ComparisonRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["compare-structures".into(), "-m".into()];
    args.push(os(&request.model));
    args.push("-r".into());
    args.push(os(&request.reference));
    args.push("-o".into());
    args.push(os(&request.output));
    args.extend(flags(&[
        "--fault-tolerant",
        "--min-pep-length",
        "4",
        "--min-nuc-length",
        "4",
        "--lddt",
        "--rigid-scores",
        "--tm-score",
        "--dockq",
    ]));
    args
}

/// Arguments of `ost compare-ligand-structures`
pub fn ligand_args(request: &ComparisonRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["compare-ligand-structures".into(), "-m".into()];
    args.push(os(&request.model));
    args.push("-r".into());
    args.push(os(&request.reference));
    args.extend(flags(&["--fault-tolerant", "--lddt-pli", "--rmsd", "-o"]));
    args.push(os(&request.output));
    args
}

/// Arguments of `DockQ`
///
/// `--mapping :AB` fixes the native chains and leaves the model side to the
/// tool's own chain-permutation search.
pub fn dockq_args(request: &DockqRequest) -> Vec<OsString> {
    let mut args = vec![os(&request.model), os(&request.native), "--json".into()];
    args.push(os(&request.output));
    args.push("--mapping".into());
    args.push(format!(":{}", request.native_chains.concat()).into());
    args.push("--allowed_mismatches".into());
    args.push(request.allowed_mismatches.to_string().into());
    if request.small_molecule {
        args.push("--small_molecule".into());
    }
    args
}

#[async_trait]
impl ScoringTool for OstDockqTool {
    async fn compare_structures(
        &self,
        request: &ComparisonRequest,
    ) -> Result<ToolOutcome, ToolError> {
        self.run(&self.config.ost_executable, structure_args(request))
            .await
    }

    async fn compare_ligands(
        &self,
        request: &ComparisonRequest,
    ) -> Result<ToolOutcome, ToolError> {
        self.run(&self.config.ost_executable, ligand_args(request))
            .await
    }

    async fn dockq(&self, request: &DockqRequest) -> Result<ToolOutcome, ToolError> {
        self.run(&self.config.dockq_executable, dockq_args(request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foldbench_core::port::time_provider::SystemTimeProvider;
    use std::path::PathBuf;

    fn request() -> ComparisonRequest {
        ComparisonRequest {
            model: PathBuf::from("/p/model.cif"),
            reference: PathBuf::from("/gt/1abc.cif"),
            output: PathBuf::from("/d/1abc_42_0_structure_ost.json"),
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_structure_args() {
        let args = strings(structure_args(&request()));
        assert_eq!(&args[..3], &["compare-structures", "-m", "/p/model.cif"]);
        assert!(args.contains(&"--dockq".to_string()));
        assert_eq!(args.iter().filter(|a| *a == "4").count(), 2);
    }

    #[test]
    fn test_ligand_args_end_with_output() {
        let args = strings(ligand_args(&request()));
        assert_eq!(args[0], "compare-ligand-structures");
        assert_eq!(
            &args[args.len() - 2..],
            &["-o", "/d/1abc_42_0_structure_ost.json"]
        );
    }

    #[test]
    fn test_dockq_args() {
        let args = strings(dockq_args(&DockqRequest {
            model: PathBuf::from("/p/model.cif"),
            native: PathBuf::from("/gt/1abc.cif"),
            native_chains: vec!["A".to_string(), "C".to_string()],
            small_molecule: true,
            allowed_mismatches: 4,
            output: PathBuf::from("/d/out.json"),
        }));
        assert_eq!(
            args,
            vec![
                "/p/model.cif",
                "/gt/1abc.cif",
                "--json",
                "/d/out.json",
                "--mapping",
                ":AC",
                "--allowed_mismatches",
                "4",
                "--small_molecule"
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_exit_status_and_stderr() {
        let tool = OstDockqTool::new(ToolConfig::default(), Arc::new(SystemTimeProvider));

        let ok = tool.run("true", vec![]).await.unwrap();
        assert_eq!(ok.status, ToolStatus::Success);

        let failed = tool
            .run("sh", vec!["-c".into(), "echo broken >&2; exit 3".into()])
            .await
            .unwrap();
        assert_eq!(failed.status, ToolStatus::Failed);
        assert_eq!(failed.exit_code, Some(3));
        assert!(failed.stderr.unwrap_or_default().contains("broken"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_timeout() {
        let config = ToolConfig {
            timeout: Some(Duration::from_millis(100)),
            graceful_timeout_ms: 500,
            ..ToolConfig::default()
        };
        let tool = OstDockqTool::new(config, Arc::new(SystemTimeProvider));

        let result = tool.run("sleep", vec!["10".into()]).await;

        assert!(matches!(result, Err(ToolError::Timeout(100))));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let config = ToolConfig {
            ost_executable: "/definitely/not/ost".to_string(),
            ..ToolConfig::default()
        };
        let tool = OstDockqTool::new(config, Arc::new(SystemTimeProvider));

        let result = tool.compare_structures(&request()).await;

        assert!(matches!(result, Err(ToolError::SpawnFailed(_))));
    }

    #[test]
    fn test_env_filtering() {
        std::env::set_var("FOLDBENCH_TEST_BLOCKED", "1");
        let config = ToolConfig {
            env_allowlist: vec!["PATH".to_string()],
            ..ToolConfig::default()
        };
        let tool = OstDockqTool::new(config, Arc::new(SystemTimeProvider));

        let env = tool.filtered_env();
        assert!(env.iter().all(|(k, _)| k == "PATH"));
    }
}

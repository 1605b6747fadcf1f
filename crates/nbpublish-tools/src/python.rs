//! Python bridge publisher.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::PublishError;
use crate::outcome::PublishOutcome;
use crate::publisher::Publisher;
use crate::request::PublishRequest;

/// Module providing `publish(path, **kwargs)`.
pub const DEFAULT_MODULE: &str = "jupyter_to_medium";

/// Bridge script run by the interpreter.
///
/// Reads `{module, path, kwargs}` as JSON on stdin, calls
/// `module.publish(path, **kwargs)` and prints the response as JSON. Any
/// exception escapes with its traceback on stderr and a non-zero exit code.
const BRIDGE_SCRIPT: &str = r#"
import importlib
import json
import sys

payload = json.loads(sys.stdin.read())
module = importlib.import_module(payload["module"])
result = module.publish(payload["path"], **payload["kwargs"])

sys.stdout.write("\n" + json.dumps(result, default=str) + "\n")
"#;

/// Python publisher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PythonConfig {
    /// Python interpreter to use (default: "python3").
    #[serde(default = "default_python")]
    pub python: String,

    /// Module exposing the publish function.
    #[serde(default = "default_module")]
    pub module: String,

    /// Additional environment variables for the interpreter.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

fn default_python() -> String {
    std::env::var("PYTHON_PATH").unwrap_or_else(|_| "python3".to_string())
}

fn default_module() -> String {
    DEFAULT_MODULE.to_string()
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            module: default_module(),
            env: HashMap::new(),
            timeout_seconds: None,
        }
    }
}

/// Publishes by calling the Python publishing library in a subprocess.
///
/// The token travels on stdin, never on the command line.
pub struct PythonPublisher {
    config: PythonConfig,
}

impl PythonPublisher {
    /// Create a new Python publisher.
    pub fn new(config: PythonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PythonConfig {
        &self.config
    }

    fn payload(&self, request: &PublishRequest) -> serde_json::Value {
        serde_json::json!({
            "module": self.config.module,
            "path": request.path().to_string_lossy(),
            "kwargs": request.to_kwargs(),
        })
    }
}

impl Default for PythonPublisher {
    fn default() -> Self {
        Self::new(PythonConfig::default())
    }
}

#[async_trait]
impl Publisher for PythonPublisher {
    fn name(&self) -> &'static str {
        "python"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome, PublishError> {
        let start = std::time::Instant::now();

        let script = NamedTempFile::new()
            .map_err(|e| PublishError::Process(format!("Failed to create temp file: {}", e)))?;

        tokio::fs::write(script.path(), BRIDGE_SCRIPT.as_bytes())
            .await
            .map_err(|e| PublishError::Process(format!("Failed to write bridge script: {}", e)))?;

        let mut cmd = Command::new(&self.config.python);
        cmd.arg(script.path());

        for (k, v) in &self.config.env {
            cmd.env(k, v);
        }

        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        // Dropping the wait future on timeout kills the child.
        cmd.kill_on_drop(true);
        // Own process group, so a timeout also reaches browsers the library
        // started for table conversion.
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!(
            python = %self.config.python,
            module = %self.config.module,
            path = %request.path().display(),
            "Spawning publisher bridge"
        );

        let mut child = cmd.spawn().map_err(|e| {
            PublishError::Process(format!(
                "Failed to spawn Python process '{}': {}",
                self.config.python, e
            ))
        })?;

        let child_id = child.id();

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(&self.payload(request))?;
            // A broken pipe here means the interpreter died early; its exit
            // status and stderr carry the real error.
            let _ = stdin.write_all(&payload).await;
            let _ = stdin.shutdown().await;
        }

        let output = match self.config.timeout_seconds {
            Some(secs) => match timeout(Duration::from_secs(secs), child.wait_with_output()).await
            {
                Ok(result) => result.map_err(|e| {
                    PublishError::Process(format!("Failed to wait for process: {}", e))
                })?,
                Err(_) => {
                    tracing::warn!(timeout_seconds = secs, pid = ?child_id, "Publisher timed out");
                    if let Some(pid) = child_id {
                        kill_process_group(pid).await;
                    }
                    return Err(PublishError::Timeout(secs));
                }
            },
            None => child.wait_with_output().await.map_err(|e| {
                PublishError::Process(format!("Failed to wait for process: {}", e))
            })?,
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let duration_ms = start.elapsed().as_millis() as u64;

        if exit_code != 0 {
            return Err(PublishError::Publisher { exit_code, stderr });
        }

        Ok(PublishOutcome::from_process(stdout, stderr).with_duration(duration_ms))
    }
}

/// Kill the bridge and everything it spawned.
#[cfg(unix)]
async fn kill_process_group(pid: u32) {
    let status = Command::new("kill")
        .args(["-9", "--", &format!("-{}", pid)])
        .status()
        .await;
    if let Err(e) = status {
        tracing::warn!(pid, error = %e, "Failed to kill publisher process group");
    }
}

#[cfg(windows)]
async fn kill_process_group(pid: u32) {
    let status = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .status()
        .await;
    if let Err(e) = status {
        tracing::warn!(pid, error = %e, "Failed to kill publisher process tree");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::PublishOptions;

    fn request() -> PublishRequest {
        PublishRequest::new("report.ipynb", "abc123", PublishOptions::default()).unwrap()
    }

    #[test]
    fn test_python_config_defaults() {
        let config: PythonConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(config.python, default_python());
        assert_eq!(config.module, "jupyter_to_medium");
        assert!(config.env.is_empty());
        assert!(config.timeout_seconds.is_none());
    }

    #[test]
    fn test_payload_shape() {
        let publisher = PythonPublisher::default();
        let payload = publisher.payload(&request());

        assert_eq!(payload["module"], "jupyter_to_medium");
        assert_eq!(payload["path"], "report.ipynb");
        assert_eq!(payload["kwargs"]["integration_token"], "abc123");
        assert_eq!(payload["kwargs"]["table_conversion"], "chrome");
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let publisher = PythonPublisher::new(PythonConfig {
            python: "nbpublish-no-such-python".to_string(),
            ..PythonConfig::default()
        });

        let err = publisher.publish(&request()).await.unwrap_err();
        assert!(matches!(err, PublishError::Process(_)));
    }

    #[tokio::test]
    async fn test_missing_module_is_not_suppressed() {
        let publisher = PythonPublisher::new(PythonConfig {
            python: "python3".to_string(),
            module: "nbpublish_missing_module".to_string(),
            ..PythonConfig::default()
        });

        // Either the import fails inside python, or python3 itself is absent.
        let err = publisher.publish(&request()).await.unwrap_err();
        match err {
            PublishError::Publisher { exit_code, stderr } => {
                assert_ne!(exit_code, 0);
                assert!(stderr.contains("nbpublish_missing_module"));
            }
            PublishError::Process(_) => {}
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_bridge_calls_publish_with_kwargs() {
        if std::process::Command::new("python3").arg("--version").output().is_err() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("fake_publisher.py"),
            "def publish(path, **kwargs):\n    print('uploading', path)\n    return {'data': {'id': 'p1', 'url': 'https://example.com/' + path}, 'kwargs': kwargs}\n",
        )
        .unwrap();

        let mut env = HashMap::new();
        env.insert(
            "PYTHONPATH".to_string(),
            dir.path().to_string_lossy().to_string(),
        );

        let publisher = PythonPublisher::new(PythonConfig {
            python: "python3".to_string(),
            module: "fake_publisher".to_string(),
            env,
            timeout_seconds: Some(30),
        });

        let outcome = publisher.publish(&request()).await.unwrap();
        assert_eq!(outcome.url(), Some("https://example.com/report.ipynb"));
        assert_eq!(outcome.post_id(), Some("p1"));

        let kwargs = &outcome.data.as_ref().unwrap()["kwargs"];
        assert_eq!(kwargs["integration_token"], "abc123");
        assert_eq!(kwargs["publish_status"], "draft");
        assert_eq!(kwargs["license"], "all-rights-reserved");
        assert_eq!(kwargs["notify_followers"], false);
        assert!(kwargs["title"].is_null());
    }

    #[tokio::test]
    async fn test_bridge_timeout() {
        if std::process::Command::new("python3").arg("--version").output().is_err() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("slow_publisher.py"),
            "import time\n\ndef publish(path, **kwargs):\n    time.sleep(10)\n",
        )
        .unwrap();

        let mut env = HashMap::new();
        env.insert(
            "PYTHONPATH".to_string(),
            dir.path().to_string_lossy().to_string(),
        );

        let publisher = PythonPublisher::new(PythonConfig {
            python: "python3".to_string(),
            module: "slow_publisher".to_string(),
            env,
            timeout_seconds: Some(1),
        });

        let err = publisher.publish(&request()).await.unwrap_err();
        assert!(matches!(err, PublishError::Timeout(1)));
    }

    #[cfg(target_os = "linux")]
    fn is_running(pid: &str) -> bool {
        // A zombie has already exited; it only waits to be reaped.
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => !stat.contains(") Z "),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_spawned_processes() {
        if std::process::Command::new("python3").arg("--version").output().is_err() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("browser_publisher.py"),
            "import subprocess\nimport time\n\ndef publish(path, **kwargs):\n    browser = subprocess.Popen(['sleep', '30'])\n    with open(path, 'w') as f:\n        f.write(str(browser.pid))\n    time.sleep(30)\n",
        )
        .unwrap();

        let mut env = HashMap::new();
        env.insert(
            "PYTHONPATH".to_string(),
            dir.path().to_string_lossy().to_string(),
        );

        let publisher = PythonPublisher::new(PythonConfig {
            python: "python3".to_string(),
            module: "browser_publisher".to_string(),
            env,
            timeout_seconds: Some(3),
        });

        let pid_file = dir.path().join("browser.pid");
        let request =
            PublishRequest::new(&pid_file, "abc123", PublishOptions::default()).unwrap();

        let err = publisher.publish(&request).await.unwrap_err();
        assert!(matches!(err, PublishError::Timeout(3)));

        tokio::time::sleep(Duration::from_millis(300)).await;
        let pid = std::fs::read_to_string(&pid_file).unwrap();
        assert!(!is_running(pid.trim()));
    }
}

//! Publish outcome types.

use serde::{Deserialize, Serialize};

/// Result of a successful publish call.
///
/// `data` is whatever the external publisher returned, not interpreted further.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// Publisher response (parsed JSON, or raw stdout wrapped in an object).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Publish duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl PublishOutcome {
    /// Create an outcome carrying the publisher response.
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Create an outcome from a finished publisher process.
    ///
    /// Stdout is parsed as JSON when possible. Publishers may print progress
    /// before the response, so the last non-empty line is tried too.
    pub fn from_process(stdout: String, stderr: String) -> Self {
        let data = serde_json::from_str(stdout.trim()).ok().or_else(|| {
            stdout
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .and_then(|line| serde_json::from_str(line.trim()).ok())
        });

        Self {
            data: data.or_else(|| Some(serde_json::json!({ "stdout": stdout }))),
            stdout: Some(stdout),
            stderr: Some(stderr),
            exit_code: Some(0),
            duration_ms: None,
        }
    }

    /// Set the publish duration.
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// URL of the created post, if the response has one.
    pub fn url(&self) -> Option<&str> {
        self.post_field("url")
    }

    /// Platform id of the created post, if the response has one.
    pub fn post_id(&self) -> Option<&str> {
        self.post_field("id")
    }

    /// The platform wraps the post as `{"data": {...}}`; flat responses are
    /// accepted too.
    fn post_field(&self, key: &str) -> Option<&str> {
        let data = self.data.as_ref()?;
        data.get("data")
            .and_then(|post| post.get(key))
            .or_else(|| data.get(key))?
            .as_str()
    }
}

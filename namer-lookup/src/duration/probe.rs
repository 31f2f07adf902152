//! ffprobe-based duration probing
//!
//! The slow tier: runs `ffprobe` on the file and reads the container duration
//! from its JSON output. Every invocation is bounded by a timeout, and the
//! child process is killed if the probe future is dropped (timeout or caller
//! cancellation).

use super::{DurationTier, TierOutcome};
use crate::types::{FileIdentity, Seconds};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Probe errors
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Probe executable not found
    #[error("Probe binary not found: {0}")]
    BinaryNotFound(String),

    /// Failed to spawn or wait on the probe process
    #[error("Failed to execute probe: {0}")]
    ExecutionError(String),

    /// Probe ran but exited unsuccessfully (corrupt or unreadable media)
    #[error("Probe exited with status {status:?}: {stderr}")]
    ToolFailed { status: Option<i32>, stderr: String },

    /// Probe did not finish in time and was killed
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    /// Probe output is not the expected JSON
    #[error("Failed to parse probe output: {0}")]
    ParseError(String),
}

/// Parsed probe output
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeDescriptor {
    #[serde(default)]
    pub format: ProbeFormat,
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

/// Container-level information
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeFormat {
    /// Duration in (fractional) seconds
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    pub format_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bit_rate: Option<u64>,
}

/// Per-stream information
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
}

impl ProbeDescriptor {
    /// Duration in fractional seconds
    ///
    /// Container duration first; some containers only report it on the
    /// video stream.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.format.duration.or_else(|| {
            self.video_stream()
                .and_then(|s| s.duration)
        })
    }

    /// Duration truncated to whole seconds
    pub fn duration(&self) -> Option<Seconds> {
        self.duration_seconds().and_then(Seconds::from_fractional)
    }

    /// First video stream, if any
    pub fn video_stream(&self) -> Option<&ProbeStream> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
    }
}

/// ffprobe reports most numbers as strings (`"1234.500000"`)
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Media inspection tool returning a parsed descriptor
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<ProbeDescriptor, ProbeError>;
}

/// [`DurationProbe`] running the ffprobe executable
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }
}

#[async_trait]
impl DurationProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<ProbeDescriptor, ProbeError> {
        tracing::debug!(
            file = %path.display(),
            ffprobe = %self.ffprobe_path.display(),
            "Running ffprobe"
        );

        let mut command = Command::new(&self.ffprobe_path);
        command
            .args(["-loglevel", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => return Err(ProbeError::Timeout(self.timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProbeError::BinaryNotFound(
                    self.ffprobe_path.display().to_string(),
                ))
            }
            Ok(Err(e)) => return Err(ProbeError::ExecutionError(e.to_string())),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            return Err(ProbeError::ToolFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| ProbeError::ParseError(e.to_string()))
    }
}

/// Resolution tier invoking a [`DurationProbe`]
pub struct ProbeTier {
    probe: Arc<dyn DurationProbe>,
}

impl ProbeTier {
    pub fn new(probe: Arc<dyn DurationProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl DurationTier for ProbeTier {
    fn name(&self) -> &'static str {
        "probe"
    }

    async fn try_resolve(&self, identity: &FileIdentity) -> TierOutcome {
        match self.probe.probe(identity.path()).await {
            Ok(descriptor) => match descriptor.duration() {
                Some(duration) => TierOutcome::Resolved(duration),
                None => TierOutcome::Failed("probe output has no usable duration".to_string()),
            },
            Err(e) => TierOutcome::Failed(e.to_string()),
        }
    }
}

//! Fake cache and probe implementations that count their calls

use async_trait::async_trait;
use namer_lookup::duration::probe::ProbeFormat;
use namer_lookup::duration::{CachedFile, DurationCache, DurationProbe, ProbeDescriptor, ProbeError};
use namer_lookup::{FileIdentity, Seconds};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Probe returning a fixed fractional duration (or a failure)
pub struct CountingProbe {
    duration: Option<f64>,
    calls: AtomicUsize,
}

impl CountingProbe {
    pub fn returning(seconds: f64) -> Self {
        Self {
            duration: Some(seconds),
            calls: AtomicUsize::new(0),
        }
    }

    /// Probe that fails as if the media were corrupt
    pub fn failing() -> Self {
        Self {
            duration: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurationProbe for CountingProbe {
    async fn probe(&self, _path: &Path) -> Result<ProbeDescriptor, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.duration {
            Some(duration) => Ok(ProbeDescriptor {
                format: ProbeFormat {
                    duration: Some(duration),
                    ..Default::default()
                },
                streams: Vec::new(),
            }),
            None => Err(ProbeError::ToolFailed {
                status: Some(1),
                stderr: "Invalid data found when processing input".to_string(),
            }),
        }
    }
}

/// In-memory cache keyed by file name
#[derive(Default)]
pub struct CountingCache {
    entries: HashMap<String, CachedFile>,
    calls: AtomicUsize,
}

impl CountingCache {
    pub fn with(mut self, file_name: &str, duration: Option<u64>) -> Self {
        self.entries.insert(
            file_name.to_string(),
            CachedFile {
                duration: duration.map(Seconds::new),
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurationCache for CountingCache {
    async fn lookup(&self, identity: &FileIdentity) -> namer_common::Result<Option<CachedFile>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let file_name = identity
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.entries.get(&file_name).copied())
    }
}

/// Cache whose store is unreachable
pub struct FailingCache;

#[async_trait]
impl DurationCache for FailingCache {
    async fn lookup(&self, _identity: &FileIdentity) -> namer_common::Result<Option<CachedFile>> {
        Err(namer_common::Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "database is locked",
        )))
    }
}

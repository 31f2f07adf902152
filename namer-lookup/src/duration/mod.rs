//! File duration resolution
//!
//! Tiered strategy: cheap already-materialized sources first, the expensive
//! probe last. The default chain is:
//!
//! 1. [`cache::CacheTier`] - duration previously recorded in the namer database
//! 2. [`probe::ProbeTier`] - ffprobe on the file itself
//!
//! Resolution is best-effort. A missing file, a cache error and a probe
//! failure all surface as an absent duration to callers of
//! [`DurationResolver::resolve`]; [`DurationResolver::resolve_detailed`] keeps
//! them apart for diagnostics.

pub mod cache;
pub mod probe;

use crate::types::{FileIdentity, Seconds};
use async_trait::async_trait;
use namer_common::TomlConfig;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub use cache::{CacheTier, CachedFile, DurationCache, SqliteDurationCache};
pub use probe::{DurationProbe, FfprobeProbe, ProbeDescriptor, ProbeError, ProbeTier};

/// Outcome of a single resolution tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    /// Tier produced a duration; later tiers are skipped
    Resolved(Seconds),
    /// Tier has nothing for this file; try the next one
    Miss,
    /// Tier errored; logged, then the next tier is tried
    Failed(String),
}

/// One step of the resolution chain
#[async_trait]
pub trait DurationTier: Send + Sync {
    /// Tier identifier used in diagnostics (e.g. "cache", "probe")
    fn name(&self) -> &'static str;

    async fn try_resolve(&self, identity: &FileIdentity) -> TierOutcome;
}

/// Detailed resolution result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Duration found by the named tier
    Resolved { duration: Seconds, tier: &'static str },
    /// Target file does not exist; no tier was consulted
    NotFound,
    /// Every tier missed or failed
    Unresolved { failures: Vec<(&'static str, String)> },
}

impl Resolution {
    pub fn duration(&self) -> Option<Seconds> {
        match self {
            Resolution::Resolved { duration, .. } => Some(*duration),
            _ => None,
        }
    }
}

/// Cache-first, probe-fallback duration resolver for files in the failed directory
pub struct DurationResolver {
    failed_dir: PathBuf,
    tiers: Vec<Box<dyn DurationTier>>,
}

impl DurationResolver {
    /// Resolver with an empty chain; add tiers with [`with_tier`](Self::with_tier)
    pub fn new(failed_dir: impl Into<PathBuf>) -> Self {
        Self {
            failed_dir: failed_dir.into(),
            tiers: Vec::new(),
        }
    }

    /// Append a tier to the end of the chain
    pub fn with_tier(mut self, tier: impl DurationTier + 'static) -> Self {
        self.tiers.push(Box::new(tier));
        self
    }

    /// Default chain from configuration: optional cache, then ffprobe
    pub fn from_config(config: &TomlConfig, cache: Option<Arc<dyn DurationCache>>) -> Self {
        let mut resolver = Self::new(&config.failed_dir);
        if let Some(cache) = cache {
            resolver = resolver.with_tier(CacheTier::new(cache));
        }
        let probe = FfprobeProbe::new(&config.ffprobe_path, config.probe_timeout());
        resolver.with_tier(ProbeTier::new(Arc::new(probe)))
    }

    pub fn failed_dir(&self) -> &Path {
        &self.failed_dir
    }

    /// Tier names in evaluation order
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Absolute candidate path for a file name relative to the failed directory
    ///
    /// `None` when the name is absolute or climbs out of the failed directory.
    pub fn candidate_path(&self, file_name: &str) -> Option<PathBuf> {
        let relative = Path::new(file_name);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return None;
        }
        std::path::absolute(self.failed_dir.join(relative)).ok()
    }

    /// Resolve the duration of `file_name`, or `None` if it cannot be determined
    pub async fn resolve(&self, file_name: &str) -> Option<Seconds> {
        self.resolve_detailed(file_name).await.duration()
    }

    /// Resolve with the reason for an absent duration preserved
    pub async fn resolve_detailed(&self, file_name: &str) -> Resolution {
        if file_name.trim().is_empty() {
            debug!("Empty file name, nothing to resolve");
            return Resolution::NotFound;
        }

        let Some(path) = self.candidate_path(file_name) else {
            warn!(file = %file_name, "File name outside the failed directory, not resolving");
            return Resolution::NotFound;
        };
        if !is_existing_file(&path).await {
            debug!(file = %path.display(), "File not found, duration unavailable");
            return Resolution::NotFound;
        }

        let identity = FileIdentity::new(path);
        let mut failures = Vec::new();

        for tier in &self.tiers {
            match tier.try_resolve(&identity).await {
                TierOutcome::Resolved(duration) => {
                    debug!(
                        file = %identity,
                        tier = tier.name(),
                        duration = duration.get(),
                        "Duration resolved"
                    );
                    return Resolution::Resolved {
                        duration,
                        tier: tier.name(),
                    };
                }
                TierOutcome::Miss => {
                    debug!(file = %identity, tier = tier.name(), "Tier miss");
                }
                TierOutcome::Failed(reason) => {
                    warn!(
                        file = %identity,
                        tier = tier.name(),
                        "Duration tier failed: {}",
                        reason
                    );
                    failures.push((tier.name(), reason));
                }
            }
        }

        Resolution::Unresolved { failures }
    }
}

async fn is_existing_file(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(file = %path.display(), "Cannot stat file: {}", e);
            false
        }
    }
}

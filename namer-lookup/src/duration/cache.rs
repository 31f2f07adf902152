//! Cached durations
//!
//! The fast tier: durations namer already recorded for a file. Read-only
//! from the resolver's point of view.

use super::{DurationTier, TierOutcome};
use crate::db::files;
use crate::types::{FileIdentity, Seconds};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Cached view of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedFile {
    /// Populated duration, `None` if the record exists but was never measured
    pub duration: Option<Seconds>,
}

/// Keyed store of previously recorded durations
#[async_trait]
pub trait DurationCache: Send + Sync {
    /// Look up the record for `identity`, `Ok(None)` when unknown
    async fn lookup(&self, identity: &FileIdentity) -> namer_common::Result<Option<CachedFile>>;
}

/// Duration cache backed by the namer SQLite `files` table
#[derive(Debug, Clone)]
pub struct SqliteDurationCache {
    pool: SqlitePool,
}

impl SqliteDurationCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DurationCache for SqliteDurationCache {
    async fn lookup(&self, identity: &FileIdentity) -> namer_common::Result<Option<CachedFile>> {
        let record = files::find_file(&self.pool, identity).await?;
        Ok(record.map(|r| CachedFile {
            duration: r.populated_duration(),
        }))
    }
}

/// Resolution tier consulting a [`DurationCache`]
pub struct CacheTier {
    cache: Arc<dyn DurationCache>,
}

impl CacheTier {
    pub fn new(cache: Arc<dyn DurationCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl DurationTier for CacheTier {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn try_resolve(&self, identity: &FileIdentity) -> TierOutcome {
        match self.cache.lookup(identity).await {
            Ok(Some(CachedFile {
                duration: Some(duration),
            })) => TierOutcome::Resolved(duration),
            Ok(Some(_)) => {
                tracing::debug!(file = %identity, "Cached record has no duration");
                TierOutcome::Miss
            }
            Ok(None) => TierOutcome::Miss,
            Err(e) => TierOutcome::Failed(format!("cache lookup failed: {}", e)),
        }
    }
}

//! Test Helper Utilities
//!
//! Shared fakes and fixtures for namer-lookup integration tests

#![allow(dead_code)]

pub mod fakes;

pub use fakes::{CountingCache, CountingProbe, FailingCache};

use anyhow::Result;
use namer_lookup::db;
use namer_lookup::duration::{CacheTier, DurationResolver, ProbeTier, SqliteDurationCache};
use namer_lookup::{FileIdentity, Seconds};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Failed directory containing the given (empty-ish) media files
pub fn create_failed_dir(file_names: &[&str]) -> Result<TempDir> {
    let dir = TempDir::new()?;
    for name in file_names {
        std::fs::write(dir.path().join(name), b"fake media")?;
    }
    Ok(dir)
}

/// Temporary on-disk namer database with tables created
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let pool = db::init_database_pool(&temp_dir.path().join("namer.db")).await?;
    Ok((temp_dir, pool))
}

/// Record a duration for `file_name` inside `failed_dir`
pub async fn seed_duration(
    pool: &SqlitePool,
    failed_dir: &Path,
    file_name: &str,
    duration: Option<u64>,
) -> Result<()> {
    let identity = FileIdentity::new(failed_dir.join(file_name));
    db::files::record_file(pool, &identity, Some(1024), duration.map(Seconds::new)).await?;
    Ok(())
}

/// Cache-then-probe resolver over a SQLite cache and a fake probe
pub fn sqlite_resolver(failed_dir: &Path, pool: SqlitePool, probe: Arc<CountingProbe>) -> DurationResolver {
    DurationResolver::new(failed_dir)
        .with_tier(CacheTier::new(Arc::new(SqliteDurationCache::new(pool))))
        .with_tier(ProbeTier::new(probe))
}

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Raw body of a JSON fixture
pub fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("fixture {} unreadable: {}", name, e))
}

/// Executable shell script standing in for ffprobe
#[cfg(unix)]
pub fn write_fake_ffprobe(dir: &Path, script_body: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffprobe");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", script_body))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

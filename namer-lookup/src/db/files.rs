//! File records
//!
//! One row per media file namer has seen, keyed by path. `duration` is whole
//! seconds; `NULL` or `0` means it was never measured.

use crate::types::{FileIdentity, Seconds};
use namer_common::Result;
use sqlx::{Row, SqlitePool};

/// Stored file record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub duration: Option<i64>,
}

impl FileRecord {
    /// Recorded duration, if one was actually measured
    pub fn populated_duration(&self) -> Option<Seconds> {
        self.duration
            .filter(|d| *d > 0)
            .map(|d| Seconds::new(d as u64))
    }
}

/// Look up a file by its cache key
pub async fn find_file(pool: &SqlitePool, identity: &FileIdentity) -> Result<Option<FileRecord>> {
    let row = sqlx::query("SELECT path, file_name, file_size, duration FROM files WHERE path = ?")
        .bind(identity.cache_key())
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| FileRecord {
        path: row.get("path"),
        file_name: row.get("file_name"),
        file_size: row.get("file_size"),
        duration: row.get("duration"),
    }))
}

/// Insert or replace a file record
pub async fn record_file(
    pool: &SqlitePool,
    identity: &FileIdentity,
    file_size: Option<i64>,
    duration: Option<Seconds>,
) -> Result<()> {
    let file_name = identity
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    sqlx::query(
        r#"
        INSERT INTO files (path, file_name, file_size, duration, updated_at)
        VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(path) DO UPDATE SET
            file_name = excluded.file_name,
            file_size = excluded.file_size,
            duration = excluded.duration,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(identity.cache_key())
    .bind(file_name)
    .bind(file_size)
    .bind(duration.map(|d| d.get() as i64))
    .execute(pool)
    .await?;

    tracing::debug!(path = %identity, duration = ?duration, "Recorded file");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_find_missing_file() {
        let pool = setup_test_db().await;
        let identity = FileIdentity::new("/tmp/failed/missing.mp4");

        assert_eq!(find_file(&pool, &identity).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_record_then_find() {
        let pool = setup_test_db().await;
        let identity = FileIdentity::new("/tmp/failed/scene.mp4");

        record_file(&pool, &identity, Some(1024), Some(Seconds::new(3661)))
            .await
            .unwrap();

        let record = find_file(&pool, &identity).await.unwrap().unwrap();
        assert_eq!(record.file_name, "scene.mp4");
        assert_eq!(record.file_size, Some(1024));
        assert_eq!(record.populated_duration(), Some(Seconds::new(3661)));
    }

    #[tokio::test]
    async fn test_record_overwrites_existing_row() {
        let pool = setup_test_db().await;
        let identity = FileIdentity::new("/tmp/failed/scene.mp4");

        record_file(&pool, &identity, None, None).await.unwrap();
        record_file(&pool, &identity, None, Some(Seconds::new(60)))
            .await
            .unwrap();

        let record = find_file(&pool, &identity).await.unwrap().unwrap();
        assert_eq!(record.duration, Some(60));
    }

    #[test]
    fn test_zero_or_null_duration_is_unpopulated() {
        let mut record = FileRecord {
            path: "a.mp4".to_string(),
            file_name: "a.mp4".to_string(),
            file_size: None,
            duration: None,
        };
        assert_eq!(record.populated_duration(), None);

        record.duration = Some(0);
        assert_eq!(record.populated_duration(), None);
    }
}

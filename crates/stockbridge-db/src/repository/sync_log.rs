//! # Sync Log Repository
//!
//! The audit trail of sync runs and webhook events in `sync_logs`.
//!
//! ## Entry Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products / products_full                                               │
//! │     one append per run: completed | failed                              │
//! │                                                                         │
//! │  webhook                                                                │
//! │     append(running) ──► dispatch ──► finalize(completed | failed)       │
//! │                                        sets completed_at                │
//! │                                                                         │
//! │  Delta cursor: latest_completed(products).created_at                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{count_from_db, count_to_db, SyncLogStore};
use stockbridge_core::{NewSyncLogEntry, SyncLogEntry, SyncStats, SyncStatus, SyncType};

/// Raw `sync_logs` row; enum columns are TEXT.
#[derive(Debug, sqlx::FromRow)]
struct SyncLogRow {
    id: Uuid,
    sync_type: String,
    status: String,
    records_processed: i32,
    records_created: i32,
    records_updated: i32,
    records_failed: i32,
    details: Value,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SyncLogRow> for SyncLogEntry {
    type Error = DbError;

    fn try_from(row: SyncLogRow) -> Result<Self, Self::Error> {
        Ok(SyncLogEntry {
            id: row.id,
            sync_type: row.sync_type.parse::<SyncType>()?,
            status: row.status.parse::<SyncStatus>()?,
            records_processed: count_from_db(row.records_processed),
            records_created: count_from_db(row.records_created),
            records_updated: count_from_db(row.records_updated),
            records_failed: count_from_db(row.records_failed),
            details: row.details,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    id, sync_type, status,
    records_processed, records_created, records_updated, records_failed,
    details, created_at, completed_at
"#;

/// Repository for sync log operations.
#[derive(Debug, Clone)]
pub struct SyncLogRepository {
    pool: PgPool,
}

impl SyncLogRepository {
    /// Creates a new SyncLogRepository.
    pub fn new(pool: PgPool) -> Self {
        SyncLogRepository { pool }
    }
}

#[async_trait]
impl SyncLogStore for SyncLogRepository {
    async fn append(&self, entry: &NewSyncLogEntry) -> DbResult<SyncLogEntry> {
        debug!(
            sync_type = %entry.sync_type,
            status = %entry.status,
            processed = entry.stats.processed,
            "Appending sync log entry"
        );

        let sql = format!(
            r#"
            INSERT INTO sync_logs (
                id, sync_type, status,
                records_processed, records_created, records_updated, records_failed,
                details, created_at, completed_at
            ) VALUES (
                $1, $2, $3,
                $4, $5, $6, $7,
                $8, NOW(), CASE WHEN $3 = 'running' THEN NULL ELSE NOW() END
            )
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );

        let row = sqlx::query_as::<_, SyncLogRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(entry.sync_type.as_str())
            .bind(entry.status.as_str())
            .bind(count_to_db(entry.stats.processed))
            .bind(count_to_db(entry.stats.created))
            .bind(count_to_db(entry.stats.updated))
            .bind(count_to_db(entry.stats.failed))
            .bind(&entry.details)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn finalize(
        &self,
        id: Uuid,
        status: SyncStatus,
        stats: SyncStats,
        details: Value,
    ) -> DbResult<()> {
        debug!(%id, status = %status, "Finalizing sync log entry");

        let result = sqlx::query(
            r#"
            UPDATE sync_logs SET
                status = $2,
                records_processed = $3,
                records_created = $4,
                records_updated = $5,
                records_failed = $6,
                details = $7,
                completed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(count_to_db(stats.processed))
        .bind(count_to_db(stats.created))
        .bind(count_to_db(stats.updated))
        .bind(count_to_db(stats.failed))
        .bind(details)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SyncLogEntry", id));
        }

        Ok(())
    }

    async fn latest_completed(&self, sync_type: SyncType) -> DbResult<Option<SyncLogEntry>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM sync_logs
            WHERE sync_type = $1 AND status = 'completed'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            SELECT_COLUMNS
        );

        let row = sqlx::query_as::<_, SyncLogRow>(&sql)
            .bind(sync_type.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(SyncLogEntry::try_from).transpose()
    }

    async fn recent(&self, limit: u32) -> DbResult<Vec<SyncLogEntry>> {
        let sql = format!(
            "SELECT {} FROM sync_logs ORDER BY created_at DESC LIMIT $1",
            SELECT_COLUMNS
        );

        let rows = sqlx::query_as::<_, SyncLogRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(SyncLogEntry::try_from).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(sync_type: &str, status: &str) -> SyncLogRow {
        SyncLogRow {
            id: Uuid::new_v4(),
            sync_type: sync_type.to_string(),
            status: status.to_string(),
            records_processed: 4,
            records_created: 1,
            records_updated: 2,
            records_failed: 1,
            details: json!({ "errors": ["X: bad"] }),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_row_converts_to_entry() {
        let entry = SyncLogEntry::try_from(row("products_full", "completed")).unwrap();
        assert_eq!(entry.sync_type, SyncType::ProductsFull);
        assert_eq!(entry.status, SyncStatus::Completed);
        assert_eq!(
            entry.stats(),
            SyncStats {
                processed: 4,
                created: 1,
                updated: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn test_unknown_stored_status_is_invalid_data() {
        let err = SyncLogEntry::try_from(row("products", "paused")).unwrap_err();
        assert!(matches!(err, DbError::InvalidData(_)));
    }

    #[test]
    fn test_negative_count_clamps_to_zero() {
        let mut raw = row("webhook", "failed");
        raw.records_failed = -1;
        let entry = SyncLogEntry::try_from(raw).unwrap();
        assert_eq!(entry.records_failed, 0);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a disposable Postgres database"]
    async fn test_append_finalize_and_cursor() {
        use crate::pool::{Database, DbConfig};

        let url = std::env::var("DATABASE_URL").unwrap();
        let db = Database::new(DbConfig::new(url).run_migrations(true))
            .await
            .unwrap();
        let repo = db.sync_logs();

        let running = repo
            .append(&NewSyncLogEntry::new(
                SyncType::Webhook,
                SyncStatus::Running,
                SyncStats::default(),
                json!({ "event": "item.updated" }),
            ))
            .await
            .unwrap();
        assert!(running.completed_at.is_none());

        repo.finalize(
            running.id,
            SyncStatus::Completed,
            SyncStats {
                processed: 1,
                updated: 1,
                ..SyncStats::default()
            },
            json!({ "event": "item.updated" }),
        )
        .await
        .unwrap();

        let completed = repo
            .append(&NewSyncLogEntry::new(
                SyncType::Products,
                SyncStatus::Completed,
                SyncStats::default(),
                json!({}),
            ))
            .await
            .unwrap();
        let latest = repo
            .latest_completed(SyncType::Products)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, completed.id);
        assert!(latest.completed_at.is_some());
    }
}

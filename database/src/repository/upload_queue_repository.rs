use std::sync::Arc;

use core_types::{ContentUri, UploadErrorKind, UploadItemState};
use sqlx::{Pool, Row, Sqlite, prelude::FromRow, sqlite::SqliteRow};

use crate::{
    clock::Clock,
    database_error::DatabaseError,
    models::{
        UploadEnqueueRequest, UploadItemRow, UploadQueueItem, UploadQueueStats, UploadSourceInfo,
    },
};

/// Items left in `processing` longer than this are considered abandoned.
pub const STUCK_TIMEOUT_MS: i64 = 5 * 60 * 1_000;
/// Window in which succeeded items are counted by [`UploadQueueRepository::get_queue_stats`].
pub const SUCCEEDED_RETENTION_MS: i64 = 24 * 60 * 60 * 1_000;

const UPLOAD_ITEM_COLUMNS: &str = "id, photo_id, idempotency_key, uri, display_name, size, state, created_at, updated_at, last_error_kind, http_code, last_error_message";

impl FromRow<'_, SqliteRow> for UploadItemRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let state: String = row.try_get("state")?;
        let state = UploadItemState::from_db_str(&state).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: "state".to_string(),
                source: Box::new(e),
            }
        })?;
        let last_error_kind: Option<String> = row.try_get("last_error_kind")?;
        let last_error_kind = last_error_kind
            .map(|kind| UploadErrorKind::from_db_str(&kind))
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "last_error_kind".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            photo_id: row.try_get("photo_id")?,
            idempotency_key: row.try_get("idempotency_key")?,
            uri: row.try_get("uri")?,
            display_name: row.try_get("display_name")?,
            size: row.try_get("size")?,
            state,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            last_error_kind,
            http_code: row.try_get("http_code")?,
            last_error_message: row.try_get("last_error_message")?,
        })
    }
}

impl UploadItemRow {
    fn into_queue_item(self) -> Option<UploadQueueItem> {
        let uri = ContentUri::parse(&self.uri).ok()?;
        Some(UploadQueueItem {
            id: self.id,
            photo_id: self.photo_id,
            uri,
            idempotency_key: self.idempotency_key,
            display_name: self.display_name,
            size: self.size,
            state: self.state,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_error_kind: self.last_error_kind,
            last_error_http_code: self.http_code,
            last_error_message: self.last_error_message,
        })
    }
}

#[derive(Debug)]
pub struct UploadQueueRepository {
    pool: Arc<Pool<Sqlite>>,
    clock: Arc<dyn Clock>,
}

impl UploadQueueRepository {
    pub fn new(pool: Arc<Pool<Sqlite>>, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Adds the photo to the upload queue and returns the upload item id.
    ///
    /// Without an explicit photo id the photo is looked up by URI and a new id is generated
    /// when it is unknown. An existing upload item of the same photo is requeued.
    #[tracing::instrument(skip_all, fields(uri = %request.uri), err)]
    pub async fn enqueue(&self, request: UploadEnqueueRequest<'_>) -> Result<i64, DatabaseError> {
        let now = self.clock.now_millis();
        let size = request.size.unwrap_or(0).max(0);
        let mut transaction = self.pool.begin().await?;

        let photo_id = match request.photo_id {
            Some(photo_id) => photo_id.to_string(),
            None => {
                let existing: Option<String> =
                    sqlx::query_scalar("SELECT id FROM photo WHERE uri = ?")
                        .bind(request.uri.as_str())
                        .fetch_optional(&mut *transaction)
                        .await?;
                existing.unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
            }
        };

        sqlx::query(
            "INSERT INTO photo (id, uri, size)
             VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET uri = excluded.uri, size = excluded.size",
        )
        .bind(&photo_id)
        .bind(request.uri.as_str())
        .bind(size)
        .execute(&mut *transaction)
        .await?;

        let display_name = request.display_name.unwrap_or("photo.jpg");
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO upload_item
                (photo_id, idempotency_key, uri, display_name, size, state, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(photo_id) DO UPDATE SET
                idempotency_key = excluded.idempotency_key,
                uri = excluded.uri,
                display_name = excluded.display_name,
                size = excluded.size,
                state = excluded.state,
                updated_at = excluded.updated_at,
                last_error_kind = NULL,
                http_code = NULL,
                last_error_message = NULL
             RETURNING id",
        )
        .bind(&photo_id)
        .bind(request.idempotency_key)
        .bind(request.uri.as_str())
        .bind(display_name)
        .bind(size)
        .bind(UploadItemState::Queued.as_db_str())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *transaction)
        .await?;

        transaction.commit().await?;
        tracing::info!(id, photo_id, "Upload item queued");
        Ok(id)
    }

    /// Oldest queued items, at most `limit`.
    ///
    /// Rows whose URI is blank or unparsable are marked failed with kind `unexpected` and are
    /// left out of the result.
    pub async fn fetch_queued(
        &self,
        limit: i64,
        recover_stuck: bool,
    ) -> Result<Vec<UploadQueueItem>, DatabaseError> {
        if recover_stuck {
            self.recover_stuck_processing().await?;
        }
        let rows = sqlx::query_as::<_, UploadItemRow>(&format!(
            "SELECT {} FROM upload_item
             WHERE state = ?
             ORDER BY created_at ASC, id ASC
             LIMIT ?",
            UPLOAD_ITEM_COLUMNS
        ))
        .bind(UploadItemState::Queued.as_db_str())
        .bind(limit.max(0))
        .fetch_all(&*self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            let raw_uri = row.uri.clone();
            match row.into_queue_item() {
                Some(item) => items.push(item),
                None => {
                    tracing::warn!(id, uri = raw_uri, "Upload item has an invalid URI");
                    self.mark_failed(
                        id,
                        UploadErrorKind::Unexpected,
                        None,
                        false,
                        Some("invalid content uri"),
                    )
                    .await?;
                }
            }
        }
        Ok(items)
    }

    /// Moves a queued item to processing. Returns false when the item was not queued.
    pub async fn mark_processing(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE upload_item SET state = ?, updated_at = ?
             WHERE id = ? AND state = ?",
        )
        .bind(UploadItemState::Processing.as_db_str())
        .bind(self.clock.now_millis())
        .bind(id)
        .bind(UploadItemState::Queued.as_db_str())
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn mark_succeeded(&self, id: i64) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE upload_item
             SET state = ?, updated_at = ?, last_error_kind = NULL, http_code = NULL,
                 last_error_message = NULL
             WHERE id = ?",
        )
        .bind(UploadItemState::Succeeded.as_db_str())
        .bind(self.clock.now_millis())
        .bind(id)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// Records a failure. With `requeue` the item goes back to the queue, otherwise it is
    /// failed for good.
    pub async fn mark_failed(
        &self,
        id: i64,
        kind: UploadErrorKind,
        http_code: Option<i64>,
        requeue: bool,
        message: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let state = if requeue {
            UploadItemState::Queued
        } else {
            UploadItemState::Failed
        };
        sqlx::query(
            "UPDATE upload_item
             SET state = ?, updated_at = ?, last_error_kind = ?, http_code = ?,
                 last_error_message = ?
             WHERE id = ?",
        )
        .bind(state.as_db_str())
        .bind(self.clock.now_millis())
        .bind(kind.as_db_str())
        .bind(http_code)
        .bind(message)
        .bind(id)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    pub async fn has_queued(&self) -> Result<bool, DatabaseError> {
        let exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM upload_item WHERE state = ?)")
                .bind(UploadItemState::Queued.as_db_str())
                .fetch_one(&*self.pool)
                .await?;
        Ok(exists != 0)
    }

    /// Requeues items that have been processing for longer than [`STUCK_TIMEOUT_MS`].
    pub async fn recover_stuck_processing(&self) -> Result<u64, DatabaseError> {
        self.recover_stuck_processing_before(self.clock.now_millis() - STUCK_TIMEOUT_MS)
            .await
    }

    pub async fn recover_stuck_processing_before(
        &self,
        threshold: i64,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE upload_item SET state = ?, updated_at = ?
             WHERE state = ? AND COALESCE(updated_at, created_at) < ?",
        )
        .bind(UploadItemState::Queued.as_db_str())
        .bind(self.clock.now_millis())
        .bind(UploadItemState::Processing.as_db_str())
        .bind(threshold)
        .execute(&*self.pool)
        .await?;
        let recovered = result.rows_affected();
        if recovered > 0 {
            tracing::info!(recovered, threshold, "Requeued stuck upload items");
        }
        Ok(recovered)
    }

    pub async fn requeue_all_processing(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("UPDATE upload_item SET state = ?, updated_at = ? WHERE state = ?")
            .bind(UploadItemState::Queued.as_db_str())
            .bind(self.clock.now_millis())
            .bind(UploadItemState::Processing.as_db_str())
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_source_for_item(
        &self,
        id: i64,
    ) -> Result<Option<UploadSourceInfo>, DatabaseError> {
        let row = sqlx::query(
            "SELECT p.id AS photo_id, p.uri AS uri, p.size AS size
             FROM upload_item u
             JOIN photo p ON p.id = u.photo_id
             WHERE u.id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let uri: String = row.try_get("uri")?;
        let size: i64 = row.try_get("size")?;
        Ok(Some(UploadSourceInfo {
            photo_id: row.try_get("photo_id")?,
            uri: ContentUri::parse(&uri).ok(),
            size_bytes: (size > 0).then_some(size),
        }))
    }

    pub async fn get_state(&self, id: i64) -> Result<Option<UploadItemState>, DatabaseError> {
        let state: Option<String> =
            sqlx::query_scalar("SELECT state FROM upload_item WHERE id = ?")
                .bind(id)
                .fetch_optional(&*self.pool)
                .await?;
        state
            .map(|state| UploadItemState::from_db_str(&state))
            .transpose()
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))
    }

    pub async fn get_item(&self, id: i64) -> Result<Option<UploadQueueItem>, DatabaseError> {
        let row = sqlx::query_as::<_, UploadItemRow>(&format!(
            "SELECT {} FROM upload_item WHERE id = ?",
            UPLOAD_ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.and_then(UploadItemRow::into_queue_item))
    }

    pub async fn get_queue_stats(&self) -> Result<UploadQueueStats, DatabaseError> {
        let succeeded_since = self.clock.now_millis() - SUCCEEDED_RETENTION_MS;
        let row = sqlx::query(
            "SELECT
                COALESCE(SUM(CASE WHEN state = ? THEN 1 ELSE 0 END), 0) AS queued,
                COALESCE(SUM(CASE WHEN state = ? THEN 1 ELSE 0 END), 0) AS processing,
                COALESCE(SUM(CASE WHEN state = ? AND COALESCE(updated_at, created_at) >= ? THEN 1 ELSE 0 END), 0) AS succeeded,
                COALESCE(SUM(CASE WHEN state = ? THEN 1 ELSE 0 END), 0) AS failed
             FROM upload_item",
        )
        .bind(UploadItemState::Queued.as_db_str())
        .bind(UploadItemState::Processing.as_db_str())
        .bind(UploadItemState::Succeeded.as_db_str())
        .bind(succeeded_since)
        .bind(UploadItemState::Failed.as_db_str())
        .fetch_one(&*self.pool)
        .await?;

        Ok(UploadQueueStats {
            queued: row.try_get("queued")?,
            processing: row.try_get("processing")?,
            succeeded: row.try_get("succeeded")?,
            failed: row.try_get("failed")?,
        })
    }

    /// Cancels every item that has not finished yet.
    #[tracing::instrument(skip(self), err)]
    pub async fn cancel_all(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE upload_item SET state = ?, updated_at = ?
             WHERE state IN (?, ?)",
        )
        .bind(UploadItemState::Cancelled.as_db_str())
        .bind(self.clock.now_millis())
        .bind(UploadItemState::Queued.as_db_str())
        .bind(UploadItemState::Processing.as_db_str())
        .execute(&*self.pool)
        .await?;
        tracing::info!(cancelled = result.rows_affected(), "Upload queue cancelled");
        Ok(result.rows_affected())
    }
}

use std::sync::Arc;

use core_types::DeletionStatus;
use futures::{Stream, stream};
use sqlx::{Pool, QueryBuilder, Row, Sqlite, prelude::FromRow, sqlite::SqliteRow};

use crate::{
    change_notifier::ChangeNotifier,
    clock::Clock,
    database_error::DatabaseError,
    models::{DeletionItem, DeletionRequest},
};

/// Terminal rows older than this are removed by [`DeletionQueueRepository::purge_default`].
pub const DEFAULT_RETENTION_MS: i64 = 7 * 24 * 60 * 60 * 1_000;

const DELETION_ITEM_COLUMNS: &str = "media_id, content_uri, display_name, size_bytes, date_taken, reason, status, is_uploading, created_at, last_error";

impl FromRow<'_, SqliteRow> for DeletionItem {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = DeletionStatus::from_db_str(&status).map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: Box::new(e),
        })?;
        Ok(Self {
            media_id: row.try_get("media_id")?,
            content_uri: row.try_get("content_uri")?,
            display_name: row.try_get("display_name")?,
            size_bytes: row.try_get("size_bytes")?,
            date_taken: row.try_get("date_taken")?,
            reason: row.try_get("reason")?,
            status,
            is_uploading: row.try_get("is_uploading")?,
            created_at: row.try_get("created_at")?,
            last_error: row.try_get("last_error")?,
        })
    }
}

#[derive(Debug)]
pub struct DeletionQueueRepository {
    pool: Arc<Pool<Sqlite>>,
    clock: Arc<dyn Clock>,
    changes: Arc<ChangeNotifier>,
}

impl DeletionQueueRepository {
    pub fn new(pool: Arc<Pool<Sqlite>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            changes: Arc::new(ChangeNotifier::new()),
        }
    }

    /// Upserts the requests as pending items.
    ///
    /// `created_at` is the current time plus the index of the request, so items enqueued in
    /// one call keep their order even within the same millisecond.
    ///
    /// Returns how many rows became pending: new rows plus terminal rows that were revived.
    /// Rows that were already pending are refreshed but not counted.
    #[tracing::instrument(skip_all, fields(requested = requests.len()), err)]
    pub async fn enqueue(&self, requests: &[DeletionRequest]) -> Result<usize, DatabaseError> {
        if requests.is_empty() {
            return Ok(0);
        }
        let now = self.clock.now_millis();
        let mut transaction = self.pool.begin().await?;
        let mut inserted = 0;

        for (index, request) in requests.iter().enumerate() {
            let created_at = now + index as i64;
            let existing_status: Option<String> =
                sqlx::query_scalar("SELECT status FROM deletion_item WHERE media_id = ?")
                    .bind(request.media_id)
                    .fetch_optional(&mut *transaction)
                    .await?;

            sqlx::query(
                "INSERT INTO deletion_item
                    (media_id, content_uri, display_name, size_bytes, date_taken, reason, status, is_uploading, created_at, last_error)
                 VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, NULL)
                 ON CONFLICT(media_id) DO UPDATE SET
                    content_uri = excluded.content_uri,
                    display_name = excluded.display_name,
                    size_bytes = excluded.size_bytes,
                    date_taken = excluded.date_taken,
                    reason = excluded.reason,
                    status = excluded.status,
                    is_uploading = 0,
                    created_at = excluded.created_at,
                    last_error = NULL",
            )
            .bind(request.media_id)
            .bind(&request.content_uri)
            .bind(&request.display_name)
            .bind(request.size_bytes)
            .bind(request.date_taken)
            .bind(&request.reason)
            .bind(DeletionStatus::Pending.as_db_str())
            .bind(created_at)
            .execute(&mut *transaction)
            .await?;

            if existing_status.as_deref() != Some(DeletionStatus::Pending.as_db_str()) {
                inserted += 1;
            }
        }

        transaction.commit().await?;
        self.changes.notify();
        tracing::info!(inserted, "Deletion requests enqueued");
        Ok(inserted)
    }

    /// Pending items that are not currently being uploaded, oldest first.
    pub async fn get_pending(&self) -> Result<Vec<DeletionItem>, DatabaseError> {
        fetch_pending(&self.pool).await
    }

    pub async fn count_pending(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM deletion_item WHERE status = ? AND is_uploading = 0",
        )
        .bind(DeletionStatus::Pending.as_db_str())
        .fetch_one(&*self.pool)
        .await?;
        Ok(count)
    }

    pub async fn get_item(&self, media_id: i64) -> Result<Option<DeletionItem>, DatabaseError> {
        let item = sqlx::query_as::<_, DeletionItem>(&format!(
            "SELECT {} FROM deletion_item WHERE media_id = ?",
            DELETION_ITEM_COLUMNS
        ))
        .bind(media_id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(item)
    }

    /// Stream of the pending list.
    ///
    /// Emits the current list right away and a fresh list after every write to the deletion
    /// queue. A list equal to the previously emitted one is not emitted again. The stream
    /// ends when the repository is dropped.
    pub fn observe_pending(
        &self,
    ) -> impl Stream<Item = Result<Vec<DeletionItem>, DatabaseError>> + Send + 'static {
        let state = ObserveState {
            pool: Arc::clone(&self.pool),
            changes: self.changes.subscribe(),
            last: None,
            started: false,
        };
        stream::unfold(state, |mut state| async move {
            loop {
                if state.started {
                    state.changes.recv_async().await.ok()?;
                }
                state.started = true;

                match fetch_pending(&state.pool).await {
                    Ok(items) => {
                        if state.last.as_ref() == Some(&items) {
                            continue;
                        }
                        state.last = Some(items.clone());
                        return Some((Ok(items), state));
                    }
                    Err(e) => return Some((Err(e), state)),
                }
            }
        })
    }

    pub async fn mark_confirmed(&self, media_ids: &[i64]) -> Result<u64, DatabaseError> {
        self.update_status(media_ids, DeletionStatus::Confirmed, None)
            .await
    }

    pub async fn mark_failed(&self, media_ids: &[i64], cause: &str) -> Result<u64, DatabaseError> {
        self.update_status(media_ids, DeletionStatus::Failed, Some(cause))
            .await
    }

    pub async fn mark_skipped(&self, media_ids: &[i64]) -> Result<u64, DatabaseError> {
        self.update_status(media_ids, DeletionStatus::Skipped, None)
            .await
    }

    /// Sets the uploading flag. Only pending rows are affected.
    pub async fn mark_uploading(
        &self,
        media_ids: &[i64],
        uploading: bool,
    ) -> Result<u64, DatabaseError> {
        if media_ids.is_empty() {
            return Ok(0);
        }
        let mut query_builder =
            QueryBuilder::<Sqlite>::new("UPDATE deletion_item SET is_uploading = ");
        query_builder.push_bind(uploading);
        query_builder.push(" WHERE status = ");
        query_builder.push_bind(DeletionStatus::Pending.as_db_str());
        query_builder.push(" AND media_id IN (");
        let mut separated = query_builder.separated(", ");
        for media_id in media_ids {
            separated.push_bind(*media_id);
        }
        separated.push_unseparated(")");

        let result = query_builder.build().execute(&*self.pool).await?;
        if result.rows_affected() > 0 {
            self.changes.notify();
        }
        Ok(result.rows_affected())
    }

    /// Removes confirmed and skipped rows created strictly before `older_than`.
    /// Failed rows are never purged.
    #[tracing::instrument(skip(self), err)]
    pub async fn purge(&self, older_than: i64) -> Result<u64, DatabaseError> {
        let mut query_builder =
            QueryBuilder::<Sqlite>::new("DELETE FROM deletion_item WHERE status IN (");
        let mut separated = query_builder.separated(", ");
        for status in DeletionStatus::purgeable() {
            separated.push_bind(status.as_db_str());
        }
        separated.push_unseparated(") AND created_at < ");
        query_builder.push_bind(older_than);

        let result = query_builder.build().execute(&*self.pool).await?;
        let purged = result.rows_affected();
        if purged > 0 {
            self.changes.notify();
        }
        tracing::info!(purged, "Purged terminal deletion items");
        Ok(purged)
    }

    pub async fn purge_default(&self) -> Result<u64, DatabaseError> {
        self.purge(self.clock.now_millis() - DEFAULT_RETENTION_MS)
            .await
    }

    async fn update_status(
        &self,
        media_ids: &[i64],
        status: DeletionStatus,
        last_error: Option<&str>,
    ) -> Result<u64, DatabaseError> {
        if media_ids.is_empty() {
            return Ok(0);
        }
        let mut query_builder = QueryBuilder::<Sqlite>::new("UPDATE deletion_item SET status = ");
        query_builder.push_bind(status.as_db_str());
        query_builder.push(", is_uploading = 0, last_error = ");
        query_builder.push_bind(last_error.map(str::to_string));
        query_builder.push(" WHERE media_id IN (");
        let mut separated = query_builder.separated(", ");
        for media_id in media_ids {
            separated.push_bind(*media_id);
        }
        separated.push_unseparated(")");

        let result = query_builder.build().execute(&*self.pool).await?;
        let updated = result.rows_affected();
        if updated > 0 {
            self.changes.notify();
        }
        tracing::debug!(
            status = status.as_db_str(),
            requested = media_ids.len(),
            updated,
            "Deletion status updated"
        );
        Ok(updated)
    }
}

struct ObserveState {
    pool: Arc<Pool<Sqlite>>,
    changes: flume::Receiver<()>,
    last: Option<Vec<DeletionItem>>,
    started: bool,
}

async fn fetch_pending(pool: &Pool<Sqlite>) -> Result<Vec<DeletionItem>, DatabaseError> {
    let items = sqlx::query_as::<_, DeletionItem>(&format!(
        "SELECT {} FROM deletion_item
         WHERE status = ? AND is_uploading = 0
         ORDER BY created_at ASC, media_id ASC",
        DELETION_ITEM_COLUMNS
    ))
    .bind(DeletionStatus::Pending.as_db_str())
    .fetch_all(pool)
    .await?;
    Ok(items)
}

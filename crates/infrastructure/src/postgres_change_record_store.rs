use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use tracklog_application::{ChangeRecordQuery, ChangeRecordStore};
use tracklog_core::{AppError, AppResult};
use tracklog_domain::{
    ActorId, ChangeAction, ChangeRecord, ChangeRecordIndexEntry, ChangeRecordInput,
};
use uuid::Uuid;


/// PostgreSQL-backed change record store.
#[derive(Clone)]
pub struct PostgresChangeRecordStore {
    pool: PgPool,
}

impl PostgresChangeRecordStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ChangeRecordRow {
    id: Uuid,
    action: String,
    object_type: String,
    object_id: String,
    raw_object: String,
    raw_diff: String,
    raw_meta: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ChangeRecordRow> for ChangeRecord {
    type Error = AppError;

    fn try_from(row: ChangeRecordRow) -> Result<Self, Self::Error> {
        ChangeRecord::new(ChangeRecordInput {
            id: row.id,
            action: ChangeAction::from_str(row.action.as_str())?,
            object_type: row.object_type,
            object_id: row.object_id,
            raw_object: row.raw_object,
            raw_diff: row.raw_diff,
            raw_meta: row.raw_meta,
            created_at: row.created_at,
        })
    }
}

fn to_i64(value: usize, label: &str) -> AppResult<i64> {
    i64::try_from(value)
        .map_err(|_| AppError::Validation(format!("{label} {value} is out of range")))
}

fn actor_to_i64(actor_id: ActorId) -> AppResult<i64> {
    i64::try_from(actor_id.as_u64()).map_err(|_| {
        AppError::Validation(format!("actor id {actor_id} does not fit a BIGINT column"))
    })
}

#[async_trait]
impl ChangeRecordStore for PostgresChangeRecordStore {
    async fn create_record_and_index(
        &self,
        record: ChangeRecord,
        index_entry: ChangeRecordIndexEntry,
    ) -> AppResult<()> {
        if index_entry.change_record_id() != record.id() {
            return Err(AppError::Validation(format!(
                "index entry references change record '{}' but record is '{}'",
                index_entry.change_record_id(),
                record.id()
            )));
        }
        let user_id = actor_to_i64(index_entry.actor_id())?;

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Persistence(format!(
                "failed to start change record transaction: {error}"
            ))
        })?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO change_records (
                id,
                action,
                object_type,
                object_id,
                raw_object,
                raw_diff,
                raw_meta,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id())
        .bind(record.action().as_str())
        .bind(record.object_type().as_str())
        .bind(record.object_id().as_str())
        .bind(record.raw_object())
        .bind(record.raw_diff())
        .bind(record.raw_meta())
        .bind(record.created_at())
        .execute(&mut *transaction)
        .await;

        if let Err(error) = inserted {
            if let sqlx::Error::Database(database_error) = &error
                && database_error.code().as_deref() == Some("23505")
            {
                return Err(AppError::Conflict(format!(
                    "change record '{}' already exists",
                    record.id()
                )));
            }

            return Err(AppError::Persistence(format!(
                "failed to insert change record: {error}"
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO change_record_index (change_record_id, user_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(index_entry.change_record_id())
        .bind(user_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to insert change record index: {error}"))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Persistence(format!(
                "failed to commit change record transaction: {error}"
            ))
        })?;

        debug!(
            change_record_id = %record.id(),
            action = %record.action(),
            object_type = %record.object_type(),
            object_id = %record.object_id(),
            user_id,
            "stored change record"
        );

        Ok(())
    }

    async fn latest_record(
        &self,
        object_type: &str,
        object_id: &str,
    ) -> AppResult<Option<ChangeRecord>> {
        let row = sqlx::query_as::<_, ChangeRecordRow>(
            r#"
            SELECT
                id,
                action,
                object_type,
                object_id,
                raw_object,
                raw_diff,
                raw_meta,
                created_at
            FROM change_records
            WHERE object_type = $1 AND object_id = $2
            ORDER BY created_at DESC, seq DESC
            LIMIT 1
            "#,
        )
        .bind(object_type)
        .bind(object_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!(
                "failed to find latest change record for {object_type} '{object_id}': {error}"
            ))
        })?;

        row.map(ChangeRecord::try_from).transpose()
    }

    async fn list_records(&self, query: ChangeRecordQuery) -> AppResult<Vec<ChangeRecord>> {
        let limit = to_i64(query.capped_limit(), "limit")?;
        let offset = to_i64(query.offset, "offset")?;
        let actor_id = query.actor_id.map(actor_to_i64).transpose()?;

        let rows = sqlx::query_as::<_, ChangeRecordRow>(
            r#"
            SELECT
                records.id,
                records.action,
                records.object_type,
                records.object_id,
                records.raw_object,
                records.raw_diff,
                records.raw_meta,
                records.created_at
            FROM change_records records
            LEFT JOIN change_record_index record_index
                ON record_index.change_record_id = records.id
            WHERE ($1::TEXT IS NULL OR records.object_type = $1)
                AND ($2::TEXT IS NULL OR records.object_id = $2)
                AND ($3::BIGINT IS NULL OR COALESCE(record_index.user_id, 0) = $3)
                AND ($4::TEXT IS NULL OR records.action = $4)
            ORDER BY records.created_at ASC, records.seq ASC
            LIMIT $5
            OFFSET $6
            "#,
        )
        .bind(query.object_type.as_deref())
        .bind(query.object_id.as_deref())
        .bind(actor_id)
        .bind(query.action.map(|action| action.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Persistence(format!("failed to list change records: {error}")))?;

        rows.into_iter().map(ChangeRecord::try_from).collect()
    }
}

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder, Transaction};
use tokio::sync::Mutex;

use super::{Assignment, ChannelVideoCount, StoreError, StoreResult, Table, VideoStore};

/// Pool-backed store; every call autocommits.
#[derive(Clone)]
pub struct PgVideoStore {
    pool: PgPool,
}

impl PgVideoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a transaction whose writes become visible only on [`PgTransactionStore::commit`].
    pub async fn begin(&self) -> StoreResult<PgTransactionStore> {
        let tx = self.pool.begin().await?;
        Ok(PgTransactionStore {
            tx: Mutex::new(Some(tx)),
        })
    }
}

#[async_trait]
impl VideoStore for PgVideoStore {
    async fn delete_many(&self, table: Table) -> StoreResult<u64> {
        Ok(delete_all(&self.pool, table).await?)
    }

    async fn update_many(&self, table: Table, assignments: &[Assignment]) -> StoreResult<u64> {
        Ok(update_all(&self.pool, table, assignments).await?)
    }

    async fn count(&self, table: Table) -> StoreResult<i64> {
        Ok(count_rows(&self.pool, table).await?)
    }

    async fn channel_video_counts(&self) -> StoreResult<Vec<ChannelVideoCount>> {
        Ok(fetch_channel_video_counts(&self.pool).await?)
    }
}

/// Store bound to a single open transaction.
///
/// Dropping it without calling [`commit`](Self::commit) rolls the
/// transaction back.
pub struct PgTransactionStore {
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

impl PgTransactionStore {
    pub async fn commit(self) -> StoreResult<()> {
        let tx = self.tx.into_inner().ok_or(StoreError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> StoreResult<()> {
        let tx = self.tx.into_inner().ok_or(StoreError::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl VideoStore for PgTransactionStore {
    async fn delete_many(&self, table: Table) -> StoreResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::TransactionClosed)?;
        Ok(delete_all(&mut **tx, table).await?)
    }

    async fn update_many(&self, table: Table, assignments: &[Assignment]) -> StoreResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::TransactionClosed)?;
        Ok(update_all(&mut **tx, table, assignments).await?)
    }

    async fn count(&self, table: Table) -> StoreResult<i64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::TransactionClosed)?;
        Ok(count_rows(&mut **tx, table).await?)
    }

    async fn channel_video_counts(&self) -> StoreResult<Vec<ChannelVideoCount>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::TransactionClosed)?;
        Ok(fetch_channel_video_counts(&mut **tx).await?)
    }
}

// Table and column names below come from `Table::table_name` and
// `Assignment::column`, both `&'static str`, never from user input.

async fn delete_all<'e, E>(executor: E, table: Table) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("DELETE FROM {}", table.table_name());
    let result = sqlx::query(&sql).execute(executor).await?;
    Ok(result.rows_affected())
}

async fn update_all<'e, E>(
    executor: E,
    table: Table,
    assignments: &[Assignment],
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    if assignments.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", table.table_name()));
    let mut columns = builder.separated(", ");
    for assignment in assignments {
        columns.push(format!("{} = ", assignment.column));
        columns.push_bind_unseparated(assignment.value);
    }

    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}

async fn count_rows<'e, E>(executor: E, table: Table) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("SELECT COUNT(*) FROM {}", table.table_name());
    sqlx::query_scalar(&sql).fetch_one(executor).await
}

async fn fetch_channel_video_counts<'e, E>(executor: E) -> Result<Vec<ChannelVideoCount>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, ChannelVideoCount>(
        r#"
        SELECT
            c.id AS channel_id,
            c.name,
            COUNT(v.id) AS videos
        FROM channels c
        LEFT JOIN videos v ON v.channel_id = c.id
        GROUP BY c.id, c.name
        ORDER BY c.name
        "#,
    )
    .fetch_all(executor)
    .await
}

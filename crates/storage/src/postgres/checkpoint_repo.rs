//! Checkpoint repository implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use trawler_core::error::StorageResult;
use trawler_core::models::IndexCheckpoint;
use trawler_core::ports::CheckpointRepository;

use super::database::Database;
use super::helpers::{i64_to_u64, query_error, u64_to_i64};

/// PostgreSQL implementation of CheckpointRepository.
///
/// State lives in a single row (`id = 1`).
pub struct PgCheckpointRepository {
    pool: PgPool,
}

impl PgCheckpointRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl CheckpointRepository for PgCheckpointRepository {
    async fn get(&self) -> StorageResult<Option<IndexCheckpoint>> {
        let row = sqlx::query_as::<_, CheckpointRow>(
            r#"
            SELECT last_indexed_block, updated_at
            FROM index_checkpoint
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        row.map(CheckpointRow::into_checkpoint).transpose()
    }

    async fn set(&self, block_number: u64) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO index_checkpoint (id, last_indexed_block, updated_at)
            VALUES (1, $1, NOW())
            ON CONFLICT (id) DO UPDATE SET
                last_indexed_block = GREATEST(
                    index_checkpoint.last_indexed_block,
                    EXCLUDED.last_indexed_block
                ),
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(u64_to_i64(block_number, "index_checkpoint.last_indexed_block")?)
        .execute(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CheckpointRow {
    last_indexed_block: i64,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl CheckpointRow {
    fn into_checkpoint(self) -> StorageResult<IndexCheckpoint> {
        Ok(IndexCheckpoint {
            last_indexed_block: i64_to_u64(
                self.last_indexed_block,
                "index_checkpoint.last_indexed_block",
            )?,
            updated_at: self.updated_at,
        })
    }
}

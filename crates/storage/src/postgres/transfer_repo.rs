//! Transfer repository implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use trawler_core::error::{StorageError, StorageResult};
use trawler_core::models::{Address, TransferRecord, TxHash};
use trawler_core::ports::TransferRepository;

use super::database::Database;
use super::helpers::{bytes_to_array, i64_to_u64, query_error, text_to_u256, u64_to_i64};

const INSERT_TRANSFER: &str = r#"
    INSERT INTO transfers (tx_hash, block_number, block_timestamp, from_addr, to_addr, value)
    VALUES ($1, $2, $3, $4, $5, $6::NUMERIC)
    ON CONFLICT ON CONSTRAINT transfers_dedup DO NOTHING
"#;

/// PostgreSQL implementation of TransferRepository.
pub struct PgTransferRepository {
    pool: PgPool,
}

impl PgTransferRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

/// Bind one record onto [`INSERT_TRANSFER`].
fn bind_insert<'q>(
    record: &'q TransferRecord,
) -> StorageResult<sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>> {
    Ok(sqlx::query(INSERT_TRANSFER)
        .bind(&record.tx_hash.0[..])
        .bind(u64_to_i64(record.block_number, "transfers.block_number")?)
        .bind(u64_to_i64(record.timestamp, "transfers.block_timestamp")?)
        .bind(&record.from.0[..])
        .bind(&record.to.0[..])
        .bind(record.value.to_string()))
}

#[async_trait]
impl TransferRepository for PgTransferRepository {
    async fn insert(&self, record: &TransferRecord) -> StorageResult<bool> {
        let result = bind_insert(record)?
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_batch(&self, records: &[TransferRecord]) -> StorageResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        let mut inserted = 0;
        for record in records {
            let result = bind_insert(record)?
                .execute(&mut *tx)
                .await
                .map_err(query_error)?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        Ok(inserted)
    }

    async fn query(&self, address: &Address, limit: u32) -> StorageResult<Vec<TransferRecord>> {
        let rows = sqlx::query_as::<_, TransferRow>(
            r#"
            SELECT tx_hash, block_number, block_timestamp, from_addr, to_addr, value::TEXT AS value
            FROM transfers
            WHERE from_addr = $1 OR to_addr = $1
            ORDER BY block_number DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(&address.0[..])
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        rows.into_iter().map(TransferRow::into_record).collect()
    }
}

#[derive(sqlx::FromRow)]
struct TransferRow {
    tx_hash: Vec<u8>,
    block_number: i64,
    block_timestamp: i64,
    from_addr: Vec<u8>,
    to_addr: Vec<u8>,
    value: String,
}

impl TransferRow {
    fn into_record(self) -> StorageResult<TransferRecord> {
        Ok(TransferRecord {
            tx_hash: TxHash(bytes_to_array(self.tx_hash, "transfers.tx_hash")?),
            block_number: i64_to_u64(self.block_number, "transfers.block_number")?,
            timestamp: i64_to_u64(self.block_timestamp, "transfers.block_timestamp")?,
            from: Address(bytes_to_array(self.from_addr, "transfers.from_addr")?),
            to: Address(bytes_to_array(self.to_addr, "transfers.to_addr")?),
            value: text_to_u256(&self.value, "transfers.value")?,
        })
    }
}

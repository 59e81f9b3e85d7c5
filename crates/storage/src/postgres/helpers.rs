//! Shared helper functions for PostgreSQL row conversion.

use alloy_primitives::U256;
use trawler_core::error::{StorageError, StorageResult};

/// Map a sqlx error onto the storage taxonomy.
///
/// Pool and I/O failures become transient connection errors; constraint
/// violations are reported as such; everything else is a query error.
pub fn query_error(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StorageError::ConnectionError(e.to_string())
        }
        sqlx::Error::Database(db)
            if db.is_unique_violation()
                || db.is_check_violation()
                || db.is_foreign_key_violation() =>
        {
            StorageError::ConstraintViolation(e.to_string())
        }
        _ => StorageError::QueryError(e.to_string()),
    }
}

/// Convert a `Vec<u8>` to a fixed-size byte array.
///
/// Returns an error if the length doesn't match.
pub fn bytes_to_array<const N: usize>(
    bytes: Vec<u8>,
    field_name: &str,
) -> StorageResult<[u8; N]> {
    bytes.try_into().map_err(|v: Vec<u8>| {
        StorageError::SerializationError(format!(
            "{} has invalid length: expected {}, got {}",
            field_name,
            N,
            v.len()
        ))
    })
}

/// Parse a NUMERIC rendered as text into a `U256`.
pub fn text_to_u256(text: &str, field_name: &str) -> StorageResult<U256> {
    U256::from_str_radix(text.trim(), 10).map_err(|e| {
        StorageError::SerializationError(format!(
            "{} is not a uint256 ({}): {}",
            field_name, text, e
        ))
    })
}

/// Convert a block number or timestamp to the BIGINT column type.
pub fn u64_to_i64(value: u64, field_name: &str) -> StorageResult<i64> {
    i64::try_from(value).map_err(|_| {
        StorageError::SerializationError(format!("{} out of BIGINT range: {}", field_name, value))
    })
}

/// Convert a BIGINT column back to `u64`, rejecting negatives as corrupt.
pub fn i64_to_u64(value: i64, field_name: &str) -> StorageResult<u64> {
    u64::try_from(value).map_err(|_| {
        StorageError::SerializationError(format!("{} is negative: {}", field_name, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_includes_field_name() {
        let err = bytes_to_array::<20>(vec![1u8; 16], "transfers.from_addr")
            .unwrap_err()
            .to_string();
        assert!(err.contains("transfers.from_addr"));
        assert!(err.contains("expected 20"));
    }

    #[test]
    fn numeric_text_keeps_full_precision() {
        let value = text_to_u256("123456789012345678901234567890", "transfers.value").unwrap();
        assert_eq!(value.to_string(), "123456789012345678901234567890");
        assert_eq!(
            text_to_u256(&U256::MAX.to_string(), "transfers.value").unwrap(),
            U256::MAX
        );
    }

    #[test]
    fn numeric_text_rejects_fractions() {
        assert!(text_to_u256("1.5", "transfers.value").is_err());
        assert!(text_to_u256("-1", "transfers.value").is_err());
    }

    #[test]
    fn bigint_bounds_are_checked() {
        assert_eq!(u64_to_i64(42, "block_number").unwrap(), 42);
        assert!(u64_to_i64(u64::MAX, "block_number").is_err());
        assert!(i64_to_u64(-1, "block_number").is_err());
    }

    #[test]
    fn pool_errors_are_transient() {
        assert!(query_error(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!query_error(sqlx::Error::RowNotFound).is_transient());
    }
}

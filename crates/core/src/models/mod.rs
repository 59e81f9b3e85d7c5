//! Domain models representing indexed transfer data.
//!
//! These models are storage-agnostic and represent the canonical
//! form of indexed data within the domain layer.

mod units;

pub use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use units::{MAX_DECIMALS, format_units};

// =============================================================================
// Fixed-size Byte Types
// =============================================================================

/// Macro to generate fixed-size byte newtypes with common functionality.
///
/// Generates:
/// - `from_hex()` - Parse from hex string (with or without 0x prefix, any case)
/// - `to_hex()` - Convert to 0x-prefixed lowercase hex string
/// - `Display` trait implementation
/// - `From<[u8; N]>` implementation
macro_rules! fixed_bytes_newtype {
    ($(#[$meta:meta])* $name:ident, $len:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Parse from hex string (with or without 0x prefix).
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let s = s
                    .strip_prefix("0x")
                    .or_else(|| s.strip_prefix("0X"))
                    .unwrap_or(s);
                let bytes = hex::decode(s)?;
                let arr: [u8; $len] = bytes
                    .try_into()
                    .map_err(|_| hex::FromHexError::InvalidStringLength)?;
                Ok(Self(arr))
            }

            /// Convert to 0x-prefixed hex string.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }

            /// Get the inner bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

fixed_bytes_newtype!(
    /// 32-byte transaction hash (Keccak-256).
    TxHash, 32
);

fixed_bytes_newtype!(
    /// 20-byte account or contract address.
    ///
    /// Comparison is on raw bytes, so `0xABC...` and `0xabc...` parse to the
    /// same value. Rendered lowercase.
    Address, 20
);

fixed_bytes_newtype!(
    /// 32-byte event signature hash (topic 0 of a log).
    EventSignature, 32
);

/// `keccak256("Transfer(address,address,uint256)")`.
pub const TRANSFER_EVENT_SIGNATURE: EventSignature = EventSignature(
    alloy_primitives::b256!("0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef").0,
);

// =============================================================================
// Block Ranges
// =============================================================================

/// Inclusive block range `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    /// Create a range. Returns `None` when `from > to`.
    pub fn new(from: u64, to: u64) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }

    /// Number of blocks covered.
    pub fn len(&self) -> u64 {
        self.to - self.from + 1
    }

    /// Always false; a range holds at least one block.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Split off the leading chunk of at most `width` blocks.
    ///
    /// Returns the chunk and whatever is left of the range after it.
    pub fn split_first(&self, width: u64) -> (BlockRange, Option<BlockRange>) {
        let width = width.max(1);
        let end = self.from.saturating_add(width - 1).min(self.to);
        let head = BlockRange {
            from: self.from,
            to: end,
        };
        let rest = if end < self.to {
            Some(BlockRange {
                from: end + 1,
                to: self.to,
            })
        } else {
            None
        };
        (head, rest)
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.from, self.to)
    }
}

// =============================================================================
// Transfers
// =============================================================================

/// One ERC20 `Transfer` event, as stored.
///
/// The tuple (`tx_hash`, `from`, `to`, `value`) is the uniqueness key.
/// A transaction may emit several transfers as long as the tuples differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// Transaction that emitted the event.
    pub tx_hash: TxHash,
    /// Block containing the transaction.
    pub block_number: u64,
    /// Block timestamp, seconds since the Unix epoch.
    pub timestamp: u64,
    /// Sender.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Raw token amount (smallest unit).
    pub value: U256,
}

/// Uniqueness key of a [`TransferRecord`].
pub type TransferKey = (TxHash, Address, Address, U256);

impl TransferRecord {
    /// The deduplication key.
    pub fn key(&self) -> TransferKey {
        (self.tx_hash, self.from, self.to, self.value)
    }

    /// Whether `address` is the sender or the recipient.
    pub fn involves(&self, address: &Address) -> bool {
        self.from == *address || self.to == *address
    }
}

// =============================================================================
// Indexer State
// =============================================================================

/// Ingestion progress.
///
/// Every log in blocks `..=last_indexed_block` of the observed contract is
/// durably stored. The block number never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCheckpoint {
    /// Last fully indexed block number.
    pub last_indexed_block: u64,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_hash_hex_roundtrip() {
        let hex = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
        let hash = TxHash::from_hex(hex).unwrap();
        assert_eq!(hash.to_hex(), hex);
    }

    #[test]
    fn tx_hash_without_prefix() {
        let hex = "1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
        let hash = TxHash::from_hex(hex).unwrap();
        assert_eq!(hash.to_hex(), format!("0x{}", hex));
    }

    #[test]
    fn address_parsing_is_case_insensitive() {
        let checksummed = Address::from_hex("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        let lower = Address::from_hex("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(checksummed, lower);
        assert_eq!(
            checksummed.to_string(),
            "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
        );
    }

    #[test]
    fn address_rejects_wrong_length() {
        assert!(Address::from_hex("0x1234").is_err());
        // 32 bytes is a hash, not an address
        assert!(
            Address::from_hex("0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef")
                .is_err()
        );
        assert!(Address::from_hex("0xzz").is_err());
    }

    #[test]
    fn transfer_signature_matches_keccak() {
        let expected = alloy_primitives::keccak256("Transfer(address,address,uint256)");
        assert_eq!(TRANSFER_EVENT_SIGNATURE.as_bytes(), &expected.0);
    }

    #[test]
    fn block_range_split() {
        let range = BlockRange::new(10, 25).unwrap();
        assert_eq!(range.len(), 16);

        let (first, rest) = range.split_first(10);
        assert_eq!(first, BlockRange { from: 10, to: 19 });
        assert_eq!(rest, Some(BlockRange { from: 20, to: 25 }));

        let (second, rest) = rest.unwrap().split_first(10);
        assert_eq!(second, BlockRange { from: 20, to: 25 });
        assert_eq!(rest, None);
    }

    #[test]
    fn block_range_split_zero_width_takes_one_block() {
        let range = BlockRange::new(5, 6).unwrap();
        let (first, rest) = range.split_first(0);
        assert_eq!(first.len(), 1);
        assert_eq!(rest, Some(BlockRange { from: 6, to: 6 }));
    }

    #[test]
    fn block_range_rejects_inverted_bounds() {
        assert!(BlockRange::new(11, 10).is_none());
        assert!(BlockRange::new(10, 10).is_some());
    }

    #[test]
    fn block_range_split_near_u64_max() {
        let range = BlockRange::new(u64::MAX - 1, u64::MAX).unwrap();
        let (first, rest) = range.split_first(2000);
        assert_eq!(first.to, u64::MAX);
        assert!(rest.is_none());
    }

    #[test]
    fn transfer_involves_either_side() {
        let a = Address([1; 20]);
        let b = Address([2; 20]);
        let record = TransferRecord {
            tx_hash: TxHash([9; 32]),
            block_number: 1,
            timestamp: 0,
            from: a,
            to: b,
            value: U256::from(5),
        };
        assert!(record.involves(&a));
        assert!(record.involves(&b));
        assert!(!record.involves(&Address([3; 20])));
    }
}

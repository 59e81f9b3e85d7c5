//! Table definitions, applied idempotently at startup.

/// Statements run by [`super::Database::init_schema`].
///
/// Addresses and hashes are raw bytes, so address matching is
/// case-insensitive by construction. `value` is a 78-digit NUMERIC, wide
/// enough for any uint256.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS transfers (
    id              BIGSERIAL PRIMARY KEY,
    tx_hash         BYTEA NOT NULL CHECK (octet_length(tx_hash) = 32),
    block_number    BIGINT NOT NULL CHECK (block_number >= 0),
    block_timestamp BIGINT NOT NULL,
    from_addr       BYTEA NOT NULL CHECK (octet_length(from_addr) = 20),
    to_addr         BYTEA NOT NULL CHECK (octet_length(to_addr) = 20),
    value           NUMERIC(78, 0) NOT NULL CHECK (value >= 0),
    indexed_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT transfers_dedup UNIQUE (tx_hash, from_addr, to_addr, value)
);

CREATE INDEX IF NOT EXISTS idx_transfers_from ON transfers (from_addr, block_number DESC);
CREATE INDEX IF NOT EXISTS idx_transfers_to ON transfers (to_addr, block_number DESC);

CREATE TABLE IF NOT EXISTS index_checkpoint (
    id                 SMALLINT PRIMARY KEY CHECK (id = 1),
    last_indexed_block BIGINT NOT NULL CHECK (last_indexed_block >= 0),
    updated_at         TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

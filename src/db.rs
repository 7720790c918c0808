use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::Result;

// Amounts and balances are INTEGER minor units (cents).
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bank_cards (
    id INTEGER PRIMARY KEY,
    bank_name TEXT NOT NULL,
    card_number TEXT NOT NULL UNIQUE,
    balance_cents INTEGER NOT NULL DEFAULT 0 CHECK (balance_cents >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    color TEXT NOT NULL DEFAULT '#007bff',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS deposits (
    id INTEGER PRIMARY KEY,
    amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
    bank_card_id INTEGER NOT NULL,
    purpose TEXT NOT NULL,
    depositor TEXT NOT NULL,
    deposit_date TEXT NOT NULL,
    tag_id INTEGER,
    created_at TEXT NOT NULL,
    FOREIGN KEY (bank_card_id) REFERENCES bank_cards(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS withdrawals (
    id INTEGER PRIMARY KEY,
    amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
    bank_card_id INTEGER NOT NULL,
    purpose TEXT NOT NULL,
    withdrawal_date TEXT NOT NULL,
    tag_id INTEGER,
    created_at TEXT NOT NULL,
    FOREIGN KEY (bank_card_id) REFERENCES bank_cards(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_deposits_card ON deposits(bank_card_id);
CREATE INDEX IF NOT EXISTS idx_deposits_date ON deposits(deposit_date);
CREATE INDEX IF NOT EXISTS idx_deposits_tag ON deposits(tag_id);
CREATE INDEX IF NOT EXISTS idx_withdrawals_card ON withdrawals(bank_card_id);
CREATE INDEX IF NOT EXISTS idx_withdrawals_date ON withdrawals(withdrawal_date);
CREATE INDEX IF NOT EXISTS idx_withdrawals_tag ON withdrawals(tag_id);
";

pub const DB_FILE: &str = "cardbook.db";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}

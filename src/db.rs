use anyhow::{Context, Result};
use rusqlite::{Connection, Row};
use std::path::Path;
use std::time::Duration;

use crate::models::Account;

/// Column list matching `account_from_row`
pub(crate) const ACCOUNT_COLUMNS: &str =
    "id, account_number, balance, client_id, holder_name, security_code, expiry";

pub(crate) fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        account_number: row.get(1)?,
        balance: row.get(2)?,
        client_id: row.get(3)?,
        holder_name: row.get(4)?,
        security_code: row.get(5)?,
        expiry: row.get(6)?,
    })
}

/// Open the store with the pragmas the ledger engine relies on
///
/// The busy timeout makes a second writer wait for the first one's
/// `BEGIN IMMEDIATE` transaction instead of failing with SQLITE_BUSY.
pub fn open_store(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;

    conn.busy_timeout(busy_timeout)?;
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    tracing::info!(path = %path.display(), "store opened");
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // ==========================================================================
    // Clients
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS clients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            login TEXT NOT NULL UNIQUE,
            secret TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Accounts (one row per card)
    // balance CHECK is the backstop; the debit statement itself is conditional
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_number INTEGER NOT NULL UNIQUE,
            balance INTEGER NOT NULL CHECK (balance >= 0),
            client_id INTEGER NOT NULL REFERENCES clients(id),
            holder_name TEXT NOT NULL,
            security_code INTEGER NOT NULL,
            expiry INTEGER NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Billers
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS billers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0)
        )",
        [],
    )?;

    // ==========================================================================
    // ATMs
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS atms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            city TEXT NOT NULL,
            district TEXT NOT NULL,
            street TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_client ON accounts(client_id)",
        [],
    )?;

    tracing::info!("schema ready");
    Ok(())
}

/// Seed the demo bank: four clients, five cards, two billers, one ATM
///
/// Safe to call repeatedly; existing rows are left untouched.
pub fn seed_demo_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "INSERT OR IGNORE INTO clients (id, login, secret) VALUES
            (1, 'jack', 'password'),
            (2, 'max', 'password'),
            (3, 'nilson', 'password'),
            (4, 'paterson', 'password');

         INSERT OR IGNORE INTO accounts
            (id, account_number, balance, client_id, holder_name, security_code, expiry) VALUES
            (1, 1111, 1000000, 1, 'JACK', 111, 1226),
            (2, 2222, 2000000, 1, 'JACK', 222, 1127),
            (3, 3333, 3000000, 3, 'NILSON', 333, 0328),
            (4, 4444, 352, 4, 'PATERSON', 444, 0929),
            (5, 5555, 5000000, 2, 'MAX', 555, 1030);

         INSERT OR IGNORE INTO billers (id, name, balance) VALUES
            (1, 'phone', 5000),
            (2, 'internet', 0);

         INSERT OR IGNORE INTO atms (id, city, district, street) VALUES
            (1, 'Dushanbe', 'Somoni', 'Foteh51');",
    )
    .context("Failed to seed demo data")?;

    tracing::info!("demo data seeded");
    Ok(())
}

#[cfg(test)]
pub(crate) fn demo_store() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    setup_database(&conn).unwrap();
    seed_demo_data(&conn).unwrap();
    conn
}

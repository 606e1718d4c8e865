// Biller Registry - service name resolution

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{LedgerError, LedgerResult};
use crate::models::Biller;

/// Resolve a user-entered service name to the stored name
///
/// Surrounding whitespace is ignored; matching is otherwise exact.
pub fn resolve_biller_name(conn: &Connection, name: &str) -> LedgerResult<String> {
    let wanted = name.trim();

    conn.query_row(
        "SELECT name FROM billers WHERE name = ?1",
        params![wanted],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("biller", wanted))
}

pub fn find_biller(conn: &Connection, name: &str) -> LedgerResult<Biller> {
    let wanted = name.trim();

    conn.query_row(
        "SELECT id, name, balance FROM billers WHERE name = ?1",
        params![wanted],
        |row| {
            Ok(Biller {
                id: row.get(0)?,
                name: row.get(1)?,
                balance: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("biller", wanted))
}

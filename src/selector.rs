// Card Selector - picks the source card for a transfer
//
// Ownership is decided only by accounts.client_id. Balance, recency or
// any other signal never breaks a tie.

use rusqlite::{params, Connection};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountNumber, ClientId};

fn owned_account_numbers(conn: &Connection, client_id: ClientId) -> LedgerResult<Vec<AccountNumber>> {
    let mut stmt =
        conn.prepare("SELECT account_number FROM accounts WHERE client_id = ?1 ORDER BY id")?;

    let numbers = stmt
        .query_map(params![client_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(numbers)
}

/// Confirm `candidate` belongs to the client and return it
///
/// A client with exactly one card gets that card regardless of `candidate`.
pub fn select_account(
    conn: &Connection,
    client_id: ClientId,
    candidate: AccountNumber,
) -> LedgerResult<AccountNumber> {
    let owned = owned_account_numbers(conn, client_id)?;

    match owned.as_slice() {
        [] => Err(LedgerError::not_found("client account", client_id)),
        [only] => Ok(*only),
        many => many
            .iter()
            .copied()
            .find(|number| *number == candidate)
            .ok_or(LedgerError::AccountNotOwned {
                client_id,
                account_number: candidate,
            }),
    }
}

/// The client's only card; fails when the client has none or several
pub fn sole_account(conn: &Connection, client_id: ClientId) -> LedgerResult<AccountNumber> {
    let owned = owned_account_numbers(conn, client_id)?;

    match owned.as_slice() {
        [] => Err(LedgerError::not_found("client account", client_id)),
        [only] => Ok(*only),
        many => Err(LedgerError::AmbiguousSource {
            client_id,
            owned: many.len() as i64,
        }),
    }
}

/// Decide between the single-source and multi-source paths
///
/// `None` means the client holds one card and the single-source
/// operations apply; otherwise the candidate is checked for ownership.
pub fn choose_source(
    conn: &Connection,
    client_id: ClientId,
    candidate: Option<AccountNumber>,
) -> LedgerResult<Option<AccountNumber>> {
    let owned = owned_account_numbers(conn, client_id)?;

    match (owned.len(), candidate) {
        (0, _) => Err(LedgerError::not_found("client account", client_id)),
        (1, _) => Ok(None),
        (count, None) => Err(LedgerError::AmbiguousSource {
            client_id,
            owned: count as i64,
        }),
        (_, Some(number)) if owned.contains(&number) => Ok(Some(number)),
        (_, Some(number)) => Err(LedgerError::AccountNotOwned {
            client_id,
            account_number: number,
        }),
    }
}

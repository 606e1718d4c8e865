// Account Directory - read-only account and balance lookups
//
// Every function is a single point query at the store's default
// isolation. Balances are point-in-time: a concurrent transfer may
// commit right after the read.

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{account_from_row, ACCOUNT_COLUMNS};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountId, AccountNumber, ClientId};

/// How a caller names an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSelector {
    Id(AccountId),
    Number(AccountNumber),
}

impl std::fmt::Display for AccountSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountSelector::Id(id) => write!(f, "id {}", id),
            AccountSelector::Number(number) => write!(f, "number {}", number),
        }
    }
}

pub fn get_balance(conn: &Connection, selector: AccountSelector) -> LedgerResult<i64> {
    match selector {
        AccountSelector::Id(id) => balance_by_id(conn, id),
        AccountSelector::Number(number) => balance_by_account_number(conn, number),
    }
}

pub fn balance_by_id(conn: &Connection, id: AccountId) -> LedgerResult<i64> {
    conn.query_row(
        "SELECT balance FROM accounts WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("account", AccountSelector::Id(id)))
}

pub fn balance_by_account_number(conn: &Connection, number: AccountNumber) -> LedgerResult<i64> {
    conn.query_row(
        "SELECT balance FROM accounts WHERE account_number = ?1",
        params![number],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("account", AccountSelector::Number(number)))
}

/// Verify a transfer target exists and return its stored account number
pub fn resolve_account_number(
    conn: &Connection,
    candidate: AccountNumber,
) -> LedgerResult<AccountNumber> {
    conn.query_row(
        "SELECT account_number FROM accounts WHERE account_number = ?1",
        params![candidate],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("account", AccountSelector::Number(candidate)))
}

pub fn find_account(conn: &Connection, number: AccountNumber) -> LedgerResult<Account> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE account_number = ?1",
        ACCOUNT_COLUMNS
    );

    conn.query_row(&sql, params![number], account_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("account", AccountSelector::Number(number)))
}

/// Balance of a card, readable only by the client holding it
pub fn owned_balance(
    conn: &Connection,
    client_id: ClientId,
    number: AccountNumber,
) -> LedgerResult<i64> {
    let account = find_account(conn, number)?;

    if account.client_id != client_id {
        return Err(LedgerError::AccountNotOwned {
            client_id,
            account_number: number,
        });
    }
    Ok(account.balance)
}

/// Number of cards held by a client (0 for an unknown client)
pub fn count_accounts_owned(conn: &Connection, client_id: ClientId) -> LedgerResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM accounts WHERE client_id = ?1",
        params![client_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::demo_store;

    #[test]
    fn test_balance_by_id_and_number_agree() {
        let conn = demo_store();

        assert_eq!(balance_by_id(&conn, 4).unwrap(), 352);
        assert_eq!(balance_by_account_number(&conn, 4444).unwrap(), 352);
        assert_eq!(
            get_balance(&conn, AccountSelector::Number(2222)).unwrap(),
            get_balance(&conn, AccountSelector::Id(2)).unwrap(),
        );
    }

    #[test]
    fn test_missing_account_is_not_found() {
        let conn = demo_store();

        let by_id = balance_by_id(&conn, 166).unwrap_err();
        let by_number = balance_by_account_number(&conn, 9999).unwrap_err();

        assert!(by_id.is_not_found());
        assert!(by_number.is_not_found());
        assert_eq!(by_number.to_string(), "account not found: number 9999");
    }

    #[test]
    fn test_resolve_account_number() {
        let conn = demo_store();

        assert_eq!(resolve_account_number(&conn, 3333).unwrap(), 3333);
        assert!(resolve_account_number(&conn, 222).unwrap_err().is_not_found());
    }

    #[test]
    fn test_find_account_returns_full_record() {
        let conn = demo_store();

        let account = find_account(&conn, 1111).unwrap();

        assert_eq!(account.id, 1);
        assert_eq!(account.client_id, 1);
        assert_eq!(account.holder_name, "JACK");
        assert_eq!(account.balance, 1_000_000);
    }

    #[test]
    fn test_owned_balance_checks_holder() {
        let conn = demo_store();

        assert_eq!(owned_balance(&conn, 1, 2222).unwrap(), 2_000_000);
        assert!(matches!(
            owned_balance(&conn, 4, 1111),
            Err(LedgerError::AccountNotOwned {
                client_id: 4,
                account_number: 1111
            })
        ));
        assert!(owned_balance(&conn, 1, 9999).unwrap_err().is_not_found());
    }

    #[test]
    fn test_count_accounts_owned() {
        let conn = demo_store();

        assert_eq!(count_accounts_owned(&conn, 1).unwrap(), 2);
        assert_eq!(count_accounts_owned(&conn, 4).unwrap(), 1);
        assert_eq!(count_accounts_owned(&conn, 42).unwrap(), 0);
    }

    #[test]
    fn test_missing_table_is_storage_fault() {
        let conn = Connection::open_in_memory().unwrap();

        let err = balance_by_account_number(&conn, 1111).unwrap_err();
        assert!(err.is_storage_fault());
    }
}

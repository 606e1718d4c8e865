// Ledger Errors - one variant per failure the core can report
//
// "Not found" and "storage fault" are never the same thing here:
// callers branch on the variant, not on a message string.

use thiserror::Error;

use crate::models::{AccountNumber, ClientId};

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A lookup (account, client, biller) matched no row
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Login exists but the secret does not match
    #[error("password is not valid")]
    InvalidCredential,

    #[error("account {account_number} does not belong to client {client_id}")]
    AccountNotOwned {
        client_id: ClientId,
        account_number: AccountNumber,
    },

    /// Single-source operation on a client holding several cards
    #[error("client {client_id} owns {owned} accounts, a source account must be selected")]
    AmbiguousSource { client_id: ClientId, owned: i64 },

    #[error("insufficient funds on account {account_number}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_number: AccountNumber,
        balance: i64,
        requested: i64,
    },

    /// Credit would push a balance past i64::MAX
    #[error("crediting {amount} to {target} would overflow its balance {balance}")]
    BalanceOverflow {
        target: String,
        balance: i64,
        amount: i64,
    },

    #[error("amount must be a positive integer, got {0}")]
    InvalidAmount(i64),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] rusqlite::Error),

    /// Commit failed after both legs ran; the transaction was rolled back
    #[error("transaction aborted: {0}")]
    TransactionAborted(#[source] rusqlite::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }

    /// True for failures caused by the store rather than by the request
    pub fn is_storage_fault(&self) -> bool {
        matches!(
            self,
            LedgerError::StorageUnavailable(_) | LedgerError::TransactionAborted(_)
        )
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::StorageUnavailable(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_not_a_storage_fault() {
        let err = LedgerError::not_found("account", 9999);

        assert!(err.is_not_found());
        assert!(!err.is_storage_fault());
        assert_eq!(err.to_string(), "account not found: 9999");
    }

    #[test]
    fn test_sqlite_errors_become_storage_faults() {
        let err: LedgerError = rusqlite::Error::InvalidQuery.into();

        assert!(err.is_storage_fault());
        assert!(!err.is_not_found());
    }
}

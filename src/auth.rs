// Authentication Gate - login/secret check against stored credentials
//
// Three outcomes, kept apart:
//   unknown login  -> Ok(SignIn::UnknownLogin)      (a negative answer, not an error)
//   wrong secret   -> Err(LedgerError::InvalidCredential)
//   match          -> Ok(SignIn::Authenticated { client_id })

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Client, ClientId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignIn {
    Authenticated { client_id: ClientId },
    UnknownLogin,
}

impl SignIn {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SignIn::Authenticated { .. })
    }

    /// Resolved client, or None for an unknown login
    pub fn client_id(&self) -> Option<ClientId> {
        match self {
            SignIn::Authenticated { client_id } => Some(*client_id),
            SignIn::UnknownLogin => None,
        }
    }
}

pub fn find_client(conn: &Connection, login: &str) -> LedgerResult<Option<Client>> {
    let client = conn
        .query_row(
            "SELECT id, login, secret FROM clients WHERE login = ?1",
            params![login],
            |row| {
                Ok(Client {
                    id: row.get(0)?,
                    login: row.get(1)?,
                    secret: row.get(2)?,
                })
            },
        )
        .optional()?;

    Ok(client)
}

/// Read-only; storage faults surface as `StorageUnavailable`
pub fn authenticate(conn: &Connection, login: &str, secret: &str) -> LedgerResult<SignIn> {
    let client = match find_client(conn, login)? {
        Some(client) => client,
        None => return Ok(SignIn::UnknownLogin),
    };

    if client.secret != secret {
        return Err(LedgerError::InvalidCredential);
    }

    Ok(SignIn::Authenticated {
        client_id: client.id,
    })
}

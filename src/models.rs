// Ledger records - rows of the relational store as Rust values
//
// Accounts map 1:1 to payment cards. Balances are integers in the
// smallest currency unit and are only ever changed by the ledger engine.

use serde::{Deserialize, Serialize};

pub type ClientId = i64;
pub type AccountId = i64;

/// Public card number (PAN-equivalent), unique across all accounts
pub type AccountNumber = i64;

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub login: String,
    #[serde(skip_serializing)]
    pub secret: String,
}

// ============================================================================
// ACCOUNT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Internal identifier, immutable once created
    pub id: AccountId,
    pub account_number: AccountNumber,
    pub balance: i64,
    pub client_id: ClientId,

    // Descriptive metadata, irrelevant to transfer correctness
    pub holder_name: String,
    #[serde(skip_serializing)]
    pub security_code: i64,
    pub expiry: i64,
}

// ============================================================================
// BILLER
// ============================================================================

/// Service biller: credited by bill payments, never debited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biller {
    pub id: i64,
    pub name: String,
    pub balance: i64,
}

/// Biller as shown in the service catalog (no balance)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub id: i64,
    pub name: String,
}

// ============================================================================
// ATM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atm {
    pub id: i64,
    pub city: String,
    pub district: String,
    pub street: String,
}

impl Atm {
    pub fn address(&self) -> String {
        format!("{}, {}, {}", self.city, self.district, self.street)
    }
}

// Card Ledger - Core Library
// Authentication, balance inquiry and atomic funds movement over SQLite.
// Used by the CLI, the API server and the integration tests.

pub mod error;
pub mod models;
pub mod db;
pub mod auth;       // Authentication Gate
pub mod directory;  // Account Directory
pub mod selector;   // Card Selector
pub mod billers;    // Biller Registry
pub mod ledger;     // Ledger Transfer Engine
pub mod catalog;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{LedgerError, LedgerResult};
pub use models::{Account, AccountId, AccountNumber, Atm, Biller, Client, ClientId, ServiceEntry};
pub use db::{open_store, seed_demo_data, setup_database};
pub use auth::{authenticate, SignIn};
pub use directory::{
    balance_by_account_number, balance_by_id, count_accounts_owned, find_account, get_balance,
    owned_balance, resolve_account_number, AccountSelector,
};
pub use selector::{choose_source, select_account, sole_account};
pub use billers::{find_biller, resolve_biller_name};
pub use ledger::{
    pay_bill_multi_source, pay_bill_single_source, transfer_multi_source,
    transfer_single_source, TransferKind, TransferReceipt, TransferState, TransferTarget,
};
pub use catalog::{list_atms, list_cards, list_services};
pub use config::BankConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Ledger Transfer Engine - debit and credit as one atomic unit
//
// Every operation:
//   1. opens a BEGIN IMMEDIATE transaction (write lock taken up front)
//   2. debits the payer with a conditional UPDATE (never below zero)
//   3. credits the receiver card or the biller
//   4. commits
//
// Any early return drops the rusqlite Transaction, which rolls it back.
// Nothing is retried here; the caller decides whether to try again.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billers::{find_biller, resolve_biller_name};
use crate::directory::{balance_by_account_number, AccountSelector};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountNumber, ClientId};
use crate::selector::sole_account;

// ============================================================================
// TRANSFER STATE
// ============================================================================

/// Started -> Debited -> Credited -> Committed, or RolledBack from any
/// non-terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    Started,
    Debited,
    Credited,
    Committed,
    RolledBack,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Committed | TransferState::RolledBack)
    }

    pub fn can_advance_to(&self, next: TransferState) -> bool {
        use TransferState::*;

        match (self, next) {
            (Started, Debited) | (Debited, Credited) | (Credited, Committed) => true,
            (current, RolledBack) => !current.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    CardToCard,
    BillPayment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferTarget {
    Account(AccountNumber),
    Biller(String),
}

/// Proof of a committed transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub id: Uuid,
    pub kind: TransferKind,
    pub source: AccountNumber,
    pub target: TransferTarget,
    pub amount: i64,
    pub state: TransferState,
    pub committed_at: DateTime<Utc>,
}

/// Where the money comes from
#[derive(Debug, Clone, Copy)]
enum Source {
    /// The client's only card
    SoleCardOf(ClientId),
    Card(AccountNumber),
}

/// Tracks one attempt through its state machine
struct TransferAttempt {
    id: Uuid,
    state: TransferState,
}

impl TransferAttempt {
    fn start() -> Self {
        let attempt = TransferAttempt {
            id: Uuid::new_v4(),
            state: TransferState::Started,
        };
        tracing::debug!(transfer_id = %attempt.id, state = ?attempt.state, "transfer state");
        attempt
    }

    fn advance(&mut self, next: TransferState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transfer transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
        tracing::debug!(transfer_id = %self.id, state = ?next, "transfer state");
    }
}

// ============================================================================
// PUBLIC OPERATIONS
// ============================================================================

/// Transfer from the client's only card to `receiver`
pub fn transfer_single_source(
    conn: &mut Connection,
    client_id: ClientId,
    receiver: AccountNumber,
    amount: i64,
) -> LedgerResult<TransferReceipt> {
    execute(
        conn,
        Source::SoleCardOf(client_id),
        TransferTarget::Account(receiver),
        amount,
    )
}

/// Transfer from a selected card (see `selector::select_account`) to `receiver`
pub fn transfer_multi_source(
    conn: &mut Connection,
    payer: AccountNumber,
    receiver: AccountNumber,
    amount: i64,
) -> LedgerResult<TransferReceipt> {
    execute(
        conn,
        Source::Card(payer),
        TransferTarget::Account(receiver),
        amount,
    )
}

pub fn pay_bill_single_source(
    conn: &mut Connection,
    biller_name: &str,
    client_id: ClientId,
    amount: i64,
) -> LedgerResult<TransferReceipt> {
    execute(
        conn,
        Source::SoleCardOf(client_id),
        TransferTarget::Biller(biller_name.to_string()),
        amount,
    )
}

pub fn pay_bill_multi_source(
    conn: &mut Connection,
    biller_name: &str,
    payer: AccountNumber,
    amount: i64,
) -> LedgerResult<TransferReceipt> {
    execute(
        conn,
        Source::Card(payer),
        TransferTarget::Biller(biller_name.to_string()),
        amount,
    )
}

// ============================================================================
// ENGINE
// ============================================================================

fn execute(
    conn: &mut Connection,
    source: Source,
    target: TransferTarget,
    amount: i64,
) -> LedgerResult<TransferReceipt> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }

    let kind = match target {
        TransferTarget::Account(_) => TransferKind::CardToCard,
        TransferTarget::Biller(_) => TransferKind::BillPayment,
    };

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut attempt = TransferAttempt::start();

    let (payer, target) = match apply_legs(&tx, source, target, amount, &mut attempt) {
        Ok(legs) => legs,
        Err(err) => {
            // Dropping the transaction rolls back whatever leg already ran
            drop(tx);
            attempt.advance(TransferState::RolledBack);
            return Err(err);
        }
    };

    // A failed COMMIT drops the transaction, which rolls it back
    if let Err(err) = tx.commit() {
        attempt.advance(TransferState::RolledBack);
        return Err(LedgerError::TransactionAborted(err));
    }
    attempt.advance(TransferState::Committed);

    Ok(TransferReceipt {
        id: attempt.id,
        kind,
        source: payer,
        target,
        amount,
        state: attempt.state,
        committed_at: Utc::now(),
    })
}

/// Run both legs inside `tx`; returns the payer card and the canonical target
fn apply_legs(
    tx: &Connection,
    source: Source,
    target: TransferTarget,
    amount: i64,
    attempt: &mut TransferAttempt,
) -> LedgerResult<(AccountNumber, TransferTarget)> {
    let payer = match source {
        Source::SoleCardOf(client_id) => sole_account(tx, client_id)?,
        Source::Card(number) => number,
    };

    // Billers are validated before any money moves
    let target = match target {
        TransferTarget::Biller(name) => TransferTarget::Biller(resolve_biller_name(tx, &name)?),
        account => account,
    };

    debit_account(tx, payer, amount)?;
    attempt.advance(TransferState::Debited);

    match &target {
        TransferTarget::Account(receiver) => credit_account(tx, *receiver, amount)?,
        TransferTarget::Biller(name) => credit_biller(tx, name, amount)?,
    }
    attempt.advance(TransferState::Credited);

    Ok((payer, target))
}

/// Conditional debit: zero rows changed means missing card or short balance
fn debit_account(tx: &Connection, payer: AccountNumber, amount: i64) -> LedgerResult<()> {
    let changed = tx.execute(
        "UPDATE accounts SET balance = balance - ?1
         WHERE account_number = ?2 AND balance >= ?1",
        params![amount, payer],
    )?;

    if changed == 1 {
        return Ok(());
    }

    // NotFound propagates from here when the card does not exist
    let balance = balance_by_account_number(tx, payer)?;
    Err(LedgerError::InsufficientFunds {
        account_number: payer,
        balance,
        requested: amount,
    })
}

/// Conditional credit: the sum must stay within i64, or SQLite stores a REAL
fn credit_account(tx: &Connection, receiver: AccountNumber, amount: i64) -> LedgerResult<()> {
    let changed = tx.execute(
        "UPDATE accounts SET balance = balance + ?1
         WHERE account_number = ?2 AND balance <= ?3 - ?1",
        params![amount, receiver, i64::MAX],
    )?;

    if changed == 1 {
        return Ok(());
    }

    let balance = balance_by_account_number(tx, receiver)?;
    Err(LedgerError::BalanceOverflow {
        target: AccountSelector::Number(receiver).to_string(),
        balance,
        amount,
    })
}

fn credit_biller(tx: &Connection, name: &str, amount: i64) -> LedgerResult<()> {
    let changed = tx.execute(
        "UPDATE billers SET balance = balance + ?1
         WHERE name = ?2 AND balance <= ?3 - ?1",
        params![amount, name, i64::MAX],
    )?;

    if changed == 1 {
        return Ok(());
    }

    let balance = find_biller(tx, name)?.balance;
    Err(LedgerError::BalanceOverflow {
        target: format!("biller {}", name),
        balance,
        amount,
    })
}

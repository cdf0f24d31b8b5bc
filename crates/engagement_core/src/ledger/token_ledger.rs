//! Non-negative token ledger with atomic debit-if-sufficient.
//!
//! # Invariants
//! - The balance is a `u64` and can never go negative.
//! - `debit` checks and subtracts in one `&mut self` call; there is no
//!   observable state where the check passed but the subtraction is pending.
//! - A new balance is persisted before it becomes visible in memory, so a
//!   failed write leaves both copies at the last committed value.
//! - Insufficient balance is reported as `Ok(false)`, never as an error.

use crate::kv::{KeyValueStore, KvError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Key holding the decimal-encoded balance.
pub const TOKEN_BALANCE_KEY: &str = "token_balance";

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger error. Only storage failures are errors.
#[derive(Debug)]
pub enum LedgerError {
    Storage(KvError),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "failed to persist token balance: {err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<KvError> for LedgerError {
    fn from(value: KvError) -> Self {
        Self::Storage(value)
    }
}

/// Normalizes a caller amount to `max(0, floor(amount))`.
///
/// Non-finite input normalizes to 0; values beyond `u64::MAX` saturate.
pub fn normalize_amount(amount: f64) -> u64 {
    if !amount.is_finite() {
        return 0;
    }
    let floored = amount.floor();
    if floored <= 0.0 {
        0
    } else {
        // `as` saturates for floats above u64::MAX.
        floored as u64
    }
}

/// Single source of truth for a learner's spendable tokens.
pub struct TokenLedger<S: KeyValueStore> {
    store: S,
    balance: u64,
}

impl<S: KeyValueStore> TokenLedger<S> {
    /// Loads the persisted balance; missing or malformed values start at 0.
    pub fn load(store: S) -> Self {
        let balance = match store.get(TOKEN_BALANCE_KEY) {
            Ok(Some(raw)) => match raw.trim().parse::<u64>() {
                Ok(value) => value,
                Err(_) => {
                    warn!(
                        "event=ledger_load module=ledger status=malformed key={} fallback=0",
                        TOKEN_BALANCE_KEY
                    );
                    0
                }
            },
            Ok(None) => 0,
            Err(err) => {
                warn!(
                    "event=ledger_load module=ledger status=error key={} fallback=0 error={}",
                    TOKEN_BALANCE_KEY, err
                );
                0
            }
        };
        info!("event=ledger_load module=ledger status=ok balance={balance}");
        Self { store, balance }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Whether `debit(amount)` would succeed right now.
    pub fn can_afford(&self, amount: f64) -> bool {
        self.balance >= normalize_amount(amount)
    }

    /// Adds `max(0, floor(amount))` tokens and returns the new balance.
    pub fn credit(&mut self, amount: f64) -> LedgerResult<u64> {
        let amount = normalize_amount(amount);
        if amount == 0 {
            return Ok(self.balance);
        }
        let next = self.balance.saturating_add(amount);
        self.commit(next)?;
        info!(
            "event=ledger_credit module=ledger status=ok amount={} balance={}",
            amount, self.balance
        );
        Ok(self.balance)
    }

    /// Subtracts `max(0, floor(amount))` tokens only if the balance covers it.
    ///
    /// Returns `Ok(true)` when applied, `Ok(false)` when the balance is
    /// insufficient (balance untouched).
    pub fn debit(&mut self, amount: f64) -> LedgerResult<bool> {
        let amount = normalize_amount(amount);
        let Some(next) = self.balance.checked_sub(amount) else {
            info!(
                "event=ledger_debit module=ledger status=insufficient amount={} balance={}",
                amount, self.balance
            );
            return Ok(false);
        };
        if amount > 0 {
            self.commit(next)?;
        }
        info!(
            "event=ledger_debit module=ledger status=ok amount={} balance={}",
            amount, self.balance
        );
        Ok(true)
    }

    /// Sets the balance to 0 unconditionally.
    pub fn reset(&mut self) -> LedgerResult<()> {
        self.commit(0)?;
        info!("event=ledger_reset module=ledger status=ok");
        Ok(())
    }

    /// Consumes the ledger and returns its store.
    pub fn into_store(self) -> S {
        self.store
    }

    fn commit(&mut self, next: u64) -> LedgerResult<()> {
        if let Err(err) = self.store.set(TOKEN_BALANCE_KEY, &next.to_string()) {
            warn!(
                "event=ledger_persist module=ledger status=error key={} error={}",
                TOKEN_BALANCE_KEY, err
            );
            return Err(err.into());
        }
        self.balance = next;
        Ok(())
    }
}

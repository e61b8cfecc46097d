use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bazaar_core::{Address, Amount};

/// A single movement of value between two accounts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

impl Transfer {
    pub fn new(from: Address, to: Address, amount: Amount) -> Self {
        Self { from, to, amount }
    }

    /// The transfer that undoes this one.
    pub fn reversed(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
            amount: self.amount,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient funds: {account} holds {available}, needs {required}")]
    InsufficientFunds {
        account: Address,
        available: Amount,
        required: Amount,
    },

    #[error("balance overflow crediting {0}")]
    Overflow(Address),

    #[error("transfer rejected by {recipient}: {reason}")]
    Rejected { recipient: Address, reason: String },

    #[error("value transfer lock poisoned")]
    Poisoned,
}

/// Code attached to a receiving account, run whenever value is sent to it.
///
/// Models contract accounts: the hook may refuse the transfer, and it may call
/// back into the ledger before the transfer completes.
pub trait ReceiveHook: Send + Sync {
    fn on_receive(&self, transfer: &Transfer) -> Result<(), String>;
}

/// Atomic value transfer with success/failure signaling.
///
/// ## Ordering contract
///
/// `transfer()` is an external interaction: it may run recipient code that
/// re-enters the ledger. The ledger therefore records every state transition
/// in its store *before* invoking `transfer()`, and implementations must not
/// hold internal locks while recipient code runs.
///
/// `revert()` undoes a transfer made earlier in the same operation. It moves
/// value back without running any recipient code, and fails only if the
/// recipient no longer holds the amount.
pub trait ValueTransfer: Send + Sync {
    fn balance_of(&self, account: &Address) -> Result<Amount, TransferError>;

    fn transfer(&self, transfer: Transfer) -> Result<(), TransferError>;

    fn revert(&self, transfer: Transfer) -> Result<(), TransferError>;
}

impl<V> ValueTransfer for Arc<V>
where
    V: ValueTransfer + ?Sized,
{
    fn balance_of(&self, account: &Address) -> Result<Amount, TransferError> {
        (**self).balance_of(account)
    }

    fn transfer(&self, transfer: Transfer) -> Result<(), TransferError> {
        (**self).transfer(transfer)
    }

    fn revert(&self, transfer: Transfer) -> Result<(), TransferError> {
        (**self).revert(transfer)
    }
}

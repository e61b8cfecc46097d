//! Per-operation transfer journal.
//!
//! A purchase moves value in several steps. The journal remembers each
//! completed step so a failure later in the operation can put every balance
//! back where it was.

use tracing::{error, warn};

use crate::value_transfer::{Transfer, TransferError, ValueTransfer};

#[derive(Debug)]
pub struct Settlement<'a, V: ?Sized> {
    bank: &'a V,
    executed: Vec<Transfer>,
}

impl<'a, V> Settlement<'a, V>
where
    V: ValueTransfer + ?Sized,
{
    pub fn new(bank: &'a V) -> Self {
        Self {
            bank,
            executed: Vec::new(),
        }
    }

    /// Run one transfer and journal it. Zero-amount transfers are skipped.
    pub fn execute(&mut self, transfer: Transfer) -> Result<(), TransferError> {
        if transfer.amount.is_zero() {
            return Ok(());
        }
        self.bank.transfer(transfer)?;
        self.executed.push(transfer);
        Ok(())
    }

    pub fn executed(&self) -> &[Transfer] {
        &self.executed
    }

    /// Revert every journaled transfer, newest first.
    ///
    /// Every step is attempted even if an earlier one fails; the first failure
    /// is returned.
    pub fn unwind(self) -> Result<(), TransferError> {
        if !self.executed.is_empty() {
            warn!(steps = self.executed.len(), "unwinding settlement");
        }

        let mut first_failure = None;
        for transfer in self.executed.iter().rev() {
            if let Err(e) = self.bank.revert(*transfer) {
                error!(
                    from = %transfer.from,
                    to = %transfer.to,
                    amount = %transfer.amount,
                    error = %e,
                    "settlement unwind step failed"
                );
                first_failure.get_or_insert(e);
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

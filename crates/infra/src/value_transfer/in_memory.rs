use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use bazaar_core::{Address, Amount};

use super::r#trait::{ReceiveHook, Transfer, TransferError, ValueTransfer};

/// In-memory balance book.
///
/// Accounts are created implicitly with a zero balance. Recipient hooks run
/// before the recipient is credited and without any lock held, so they can
/// call back into whatever is driving this bank.
#[derive(Default)]
pub struct InMemoryBank {
    balances: Mutex<HashMap<Address, Amount>>,
    hooks: RwLock<HashMap<Address, Arc<dyn ReceiveHook>>>,
}

impl core::fmt::Debug for InMemoryBank {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let hooked = self.hooks.read().map(|h| h.len()).unwrap_or(0);
        f.debug_struct("InMemoryBank")
            .field("balances", &self.balances)
            .field("hooked_accounts", &hooked)
            .finish()
    }
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `account` with newly created value.
    pub fn mint(&self, account: Address, amount: Amount) -> Result<(), TransferError> {
        let mut balances = self.balances.lock().map_err(|_| TransferError::Poisoned)?;
        let balance = balances.entry(account).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(TransferError::Overflow(account))?;
        Ok(())
    }

    /// Attach `hook` to `account`, replacing any previous hook.
    pub fn register_hook(&self, account: Address, hook: Arc<dyn ReceiveHook>) {
        if let Ok(mut hooks) = self.hooks.write() {
            hooks.insert(account, hook);
        }
    }

    pub fn remove_hook(&self, account: &Address) {
        if let Ok(mut hooks) = self.hooks.write() {
            hooks.remove(account);
        }
    }

    /// Sum of every balance. Constant across transfers.
    pub fn total_supply(&self) -> Result<Amount, TransferError> {
        let balances = self.balances.lock().map_err(|_| TransferError::Poisoned)?;
        balances
            .values()
            .try_fold(Amount::ZERO, |acc, b| acc.checked_add(*b))
            .ok_or(TransferError::Overflow(Address::nil()))
    }

    fn hook_for(&self, account: &Address) -> Option<Arc<dyn ReceiveHook>> {
        self.hooks.read().ok()?.get(account).cloned()
    }

    fn ensure_funds(
        balances: &HashMap<Address, Amount>,
        transfer: &Transfer,
    ) -> Result<Amount, TransferError> {
        let available = balances.get(&transfer.from).copied().unwrap_or_default();
        available
            .checked_sub(transfer.amount)
            .ok_or(TransferError::InsufficientFunds {
                account: transfer.from,
                available,
                required: transfer.amount,
            })
    }

    /// Debit and credit under a single lock; all-or-nothing.
    fn move_value(
        balances: &mut HashMap<Address, Amount>,
        transfer: &Transfer,
    ) -> Result<(), TransferError> {
        let remaining = Self::ensure_funds(balances, transfer)?;
        if transfer.from == transfer.to {
            return Ok(());
        }

        let to_balance = balances.get(&transfer.to).copied().unwrap_or_default();
        let credited = to_balance
            .checked_add(transfer.amount)
            .ok_or(TransferError::Overflow(transfer.to))?;

        balances.insert(transfer.from, remaining);
        balances.insert(transfer.to, credited);
        Ok(())
    }
}

impl ValueTransfer for InMemoryBank {
    fn balance_of(&self, account: &Address) -> Result<Amount, TransferError> {
        let balances = self.balances.lock().map_err(|_| TransferError::Poisoned)?;
        Ok(balances.get(account).copied().unwrap_or_default())
    }

    fn transfer(&self, transfer: Transfer) -> Result<(), TransferError> {
        // Fail fast before running recipient code.
        {
            let balances = self.balances.lock().map_err(|_| TransferError::Poisoned)?;
            Self::ensure_funds(&balances, &transfer)?;
        }

        if let Some(hook) = self.hook_for(&transfer.to) {
            hook.on_receive(&transfer)
                .map_err(|reason| TransferError::Rejected {
                    recipient: transfer.to,
                    reason,
                })?;
        }

        // The hook may have moved value; re-check under the lock.
        let mut balances = self.balances.lock().map_err(|_| TransferError::Poisoned)?;
        Self::move_value(&mut balances, &transfer)
    }

    fn revert(&self, transfer: Transfer) -> Result<(), TransferError> {
        let mut balances = self.balances.lock().map_err(|_| TransferError::Poisoned)?;
        Self::move_value(&mut balances, &transfer.reversed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Refuse;

    impl ReceiveHook for Refuse {
        fn on_receive(&self, _transfer: &Transfer) -> Result<(), String> {
            Err("not accepting payments".to_string())
        }
    }

    #[derive(Default)]
    struct Count(AtomicUsize);

    impl ReceiveHook for Count {
        fn on_receive(&self, _transfer: &Transfer) -> Result<(), String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn transfer_moves_exact_amount() {
        let bank = InMemoryBank::new();
        let (a, b) = (Address::new(), Address::new());
        bank.mint(a, Amount::new(100)).unwrap();

        bank.transfer(Transfer::new(a, b, Amount::new(40))).unwrap();

        assert_eq!(bank.balance_of(&a).unwrap(), Amount::new(60));
        assert_eq!(bank.balance_of(&b).unwrap(), Amount::new(40));
        assert_eq!(bank.total_supply().unwrap(), Amount::new(100));
    }

    #[test]
    fn insufficient_funds_moves_nothing() {
        let bank = InMemoryBank::new();
        let (a, b) = (Address::new(), Address::new());
        bank.mint(a, Amount::new(10)).unwrap();

        let err = bank.transfer(Transfer::new(a, b, Amount::new(11))).unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientFunds {
                account: a,
                available: Amount::new(10),
                required: Amount::new(11),
            }
        );
        assert_eq!(bank.balance_of(&a).unwrap(), Amount::new(10));
        assert_eq!(bank.balance_of(&b).unwrap(), Amount::ZERO);
    }

    #[test]
    fn refusing_hook_rejects_transfer() {
        let bank = InMemoryBank::new();
        let (a, b) = (Address::new(), Address::new());
        bank.mint(a, Amount::new(10)).unwrap();
        bank.register_hook(b, Arc::new(Refuse));

        let err = bank.transfer(Transfer::new(a, b, Amount::new(5))).unwrap_err();
        assert!(matches!(err, TransferError::Rejected { recipient, .. } if recipient == b));
        assert_eq!(bank.balance_of(&a).unwrap(), Amount::new(10));

        bank.remove_hook(&b);
        bank.transfer(Transfer::new(a, b, Amount::new(5))).unwrap();
        assert_eq!(bank.balance_of(&b).unwrap(), Amount::new(5));
    }

    #[test]
    fn revert_skips_hooks() {
        let bank = InMemoryBank::new();
        let (a, b) = (Address::new(), Address::new());
        let counter = Arc::new(Count::default());
        bank.mint(a, Amount::new(10)).unwrap();
        bank.register_hook(a, counter.clone());

        let t = Transfer::new(a, b, Amount::new(7));
        bank.transfer(t).unwrap();
        bank.revert(t).unwrap();

        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
        assert_eq!(bank.balance_of(&a).unwrap(), Amount::new(10));
        assert_eq!(bank.balance_of(&b).unwrap(), Amount::ZERO);
    }

    #[test]
    fn mint_overflow_is_reported() {
        let bank = InMemoryBank::new();
        let a = Address::new();
        bank.mint(a, Amount::new(u64::MAX)).unwrap();
        assert_eq!(bank.mint(a, Amount::new(1)), Err(TransferError::Overflow(a)));
    }
}

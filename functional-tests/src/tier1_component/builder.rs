//! Builder for TestLedger
//!
//! Fluent API for configuring genesis state.

use std::collections::BTreeMap;

use super::address::AccountAddress;
use super::ledger::{AccountResource, LedgerState, Role, TestLedger};

/// Builder for [`TestLedger`] instances
///
/// # Example
///
/// ```rust,ignore
/// use functional_tests::tier1_component::TestLedgerBuilder;
///
/// let ledger = TestLedgerBuilder::new()
///     .with_account(alice, 1_000_000)
///     .with_validator(vivian, 0)
///     .with_genesis_timestamp(0)
///     .build();
/// ```
pub struct TestLedgerBuilder {
    accounts: BTreeMap<AccountAddress, AccountResource>,
    genesis_timestamp_usecs: u64,
}

impl TestLedgerBuilder {
    /// Empty genesis at time zero
    pub fn new() -> Self {
        Self {
            accounts: BTreeMap::new(),
            genesis_timestamp_usecs: 0,
        }
    }

    /// Add a normal account with a balance
    pub fn with_account(self, address: AccountAddress, balance: u64) -> Self {
        self.with_resource(address, AccountResource::new(balance))
    }

    /// Add a validator account with a balance
    pub fn with_validator(self, address: AccountAddress, balance: u64) -> Self {
        self.with_resource(
            address,
            AccountResource {
                balance,
                sequence_number: 0,
                role: Role::Validator,
            },
        )
    }

    /// Add an account with a full resource, replacing any earlier entry
    pub fn with_resource(mut self, address: AccountAddress, resource: AccountResource) -> Self {
        self.accounts.insert(address, resource);
        self
    }

    /// Set the ledger clock at genesis
    pub fn with_genesis_timestamp(mut self, timestamp_usecs: u64) -> Self {
        self.genesis_timestamp_usecs = timestamp_usecs;
        self
    }

    /// Build the ledger
    pub fn build(self) -> TestLedger {
        TestLedger::new(LedgerState::new(
            self.accounts,
            self.genesis_timestamp_usecs,
        ))
    }
}

impl Default for TestLedgerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let ledger = TestLedgerBuilder::new().build();
        assert_eq!(ledger.timestamp_usecs(), 0);
        assert_eq!(ledger.block_info().height, 0);
        assert!(ledger.validator_set().is_empty());
    }

    #[test]
    fn test_builder_with_accounts() {
        let alice = AccountAddress::from_name("alice");
        let vivian = AccountAddress::from_name("vivian");

        let ledger = TestLedgerBuilder::new()
            .with_account(alice, 500)
            .with_validator(vivian, 7)
            .with_genesis_timestamp(42)
            .build();

        assert_eq!(ledger.balance(&alice), Some(500));
        assert_eq!(ledger.sequence_number(&alice), Some(0));
        assert_eq!(ledger.balance(&vivian), Some(7));
        assert_eq!(ledger.validator_set(), vec![vivian]);
        assert_eq!(ledger.timestamp_usecs(), 42);
    }

    #[test]
    fn test_later_entry_replaces_earlier() {
        let alice = AccountAddress::from_name("alice");
        let ledger = TestLedgerBuilder::new()
            .with_account(alice, 1)
            .with_account(alice, 2)
            .build();
        assert_eq!(ledger.balance(&alice), Some(2));
    }
}

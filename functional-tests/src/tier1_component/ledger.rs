//! TestLedger - In-process ledger state for functional tests
//!
//! Holds account resources and the ledger clock. Transactions never mutate
//! the ledger directly: they run against a [`WriteSetView`] overlay and the
//! executor applies the resulting [`WriteSet`] only when the transaction is
//! kept.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;
use sha3::{Digest, Sha3_256};

use super::address::{AccountAddress, HashValue};

/// Abort code: privileged call from a non-association sender
pub const ENOT_ASSOCIATION: u64 = 33;

/// Abort code: block timestamp does not advance the clock
pub const EINVALID_TIMESTAMP: u64 = 5001;

/// Abort code: block proposer is not in the validator set
pub const EINVALID_PROPOSER: u64 = 5002;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Ordinary account
    #[default]
    Normal,
    /// Member of the validator set; may propose blocks
    Validator,
}

/// On-ledger account data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountResource {
    /// Spendable balance
    pub balance: u64,
    /// Next expected transaction sequence number
    pub sequence_number: u64,
    /// Account role
    pub role: Role,
}

impl AccountResource {
    /// Fresh account with a balance.
    pub fn new(balance: u64) -> Self {
        Self {
            balance,
            sequence_number: 0,
            role: Role::Normal,
        }
    }
}

/// Metadata of the latest block, including the ledger clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    /// Ledger clock in microseconds
    pub timestamp_usecs: u64,
    /// Number of blocks applied since genesis
    pub height: u64,
    /// Id of the latest block
    pub id: HashValue,
    /// Proposer of the latest block
    pub proposer: AccountAddress,
}

impl BlockInfo {
    /// Genesis block info at the given clock.
    pub fn genesis(timestamp_usecs: u64) -> Self {
        Self {
            timestamp_usecs,
            height: 0,
            id: HashValue::ZERO,
            proposer: AccountAddress::ZERO,
        }
    }
}

/// Input of a block prologue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMetadata {
    /// New ledger clock in microseconds
    pub timestamp_usecs: u64,
    /// Block id
    pub id: HashValue,
    /// Aggregated signatures of the previous block
    pub previous_block_votes: Vec<u8>,
    /// Block proposer
    pub proposer: AccountAddress,
}

/// Complete ledger state.
#[derive(Debug, Clone)]
pub struct LedgerState {
    accounts: BTreeMap<AccountAddress, AccountResource>,
    block: BlockInfo,
}

impl LedgerState {
    /// Genesis state.
    pub fn new(
        accounts: BTreeMap<AccountAddress, AccountResource>,
        genesis_timestamp_usecs: u64,
    ) -> Self {
        Self {
            accounts,
            block: BlockInfo::genesis(genesis_timestamp_usecs),
        }
    }

    /// Account resource, if the account exists.
    pub fn account(&self, address: &AccountAddress) -> Option<&AccountResource> {
        self.accounts.get(address)
    }

    /// Latest block info.
    pub fn block_info(&self) -> &BlockInfo {
        &self.block
    }

    /// Iterate accounts in address order.
    pub fn accounts(&self) -> impl Iterator<Item = (&AccountAddress, &AccountResource)> {
        self.accounts.iter()
    }

    /// Apply a write-set produced by a kept transaction.
    pub fn apply(&mut self, write_set: WriteSet) {
        for (address, resource) in write_set.accounts {
            self.accounts.insert(address, resource);
        }
        if let Some(block) = write_set.block {
            self.block = block;
        }
    }
}

/// Pending mutations of a single transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    accounts: BTreeMap<AccountAddress, AccountResource>,
    block: Option<BlockInfo>,
}

impl WriteSet {
    /// Number of written accounts.
    pub fn len(&self) -> usize {
        self.accounts.len() + usize::from(self.block.is_some())
    }

    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Copy-on-write view over a [`LedgerState`].
pub struct WriteSetView<'a> {
    base: &'a LedgerState,
    write_set: WriteSet,
}

impl<'a> WriteSetView<'a> {
    /// Empty overlay on top of `base`.
    pub fn new(base: &'a LedgerState) -> Self {
        Self {
            base,
            write_set: WriteSet::default(),
        }
    }

    /// Account as seen through the overlay.
    pub fn account(&self, address: &AccountAddress) -> Option<&AccountResource> {
        self.write_set
            .accounts
            .get(address)
            .or_else(|| self.base.account(address))
    }

    /// Mutable account, copied into the write-set on first access.
    pub fn account_mut(&mut self, address: &AccountAddress) -> Option<&mut AccountResource> {
        if !self.write_set.accounts.contains_key(address) {
            let resource = self.base.account(address)?.clone();
            self.write_set.accounts.insert(*address, resource);
        }
        self.write_set.accounts.get_mut(address)
    }

    /// Create an account if missing, returning it.
    pub fn get_or_create_account(&mut self, address: &AccountAddress) -> &mut AccountResource {
        let base = self.base;
        self.write_set.accounts.entry(*address).or_insert_with(|| {
            base.account(address)
                .cloned()
                .unwrap_or_else(|| AccountResource::new(0))
        })
    }

    /// Latest block info as seen through the overlay.
    pub fn block_info(&self) -> &BlockInfo {
        self.write_set
            .block
            .as_ref()
            .unwrap_or_else(|| self.base.block_info())
    }

    /// Whether `address` is in the validator set.
    pub fn is_validator(&self, address: &AccountAddress) -> bool {
        self.account(address)
            .map(|account| account.role == Role::Validator)
            .unwrap_or(false)
    }

    /// Run the block prologue rules, recording the new block info.
    ///
    /// The zero proposer marks a block with no proposer (a nil block); it may
    /// repeat the current timestamp. Any other proposer must be a validator and
    /// must strictly advance the clock.
    pub fn apply_block_prologue(&mut self, metadata: &BlockMetadata) -> Result<(), u64> {
        let current = self.block_info().clone();

        if metadata.proposer == AccountAddress::ZERO {
            if metadata.timestamp_usecs < current.timestamp_usecs {
                return Err(EINVALID_TIMESTAMP);
            }
        } else {
            if !self.is_validator(&metadata.proposer) {
                return Err(EINVALID_PROPOSER);
            }
            if metadata.timestamp_usecs <= current.timestamp_usecs {
                return Err(EINVALID_TIMESTAMP);
            }
        }

        self.write_set.block = Some(BlockInfo {
            timestamp_usecs: metadata.timestamp_usecs,
            height: current.height.saturating_add(1),
            id: metadata.id,
            proposer: metadata.proposer,
        });
        Ok(())
    }

    /// Consume the view, returning its write-set.
    pub fn into_write_set(self) -> WriteSet {
        self.write_set
    }
}

/// Shared handle to the ledger state.
///
/// Cloning the handle shares the same state, so the executor and query paths
/// always agree.
#[derive(Clone)]
pub struct TestLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl TestLedger {
    /// Wrap a genesis state. Use `TestLedgerBuilder` for configuration.
    pub(crate) fn new(state: LedgerState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Read access to the whole state.
    pub fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read()
    }

    /// Write access, held by the executor for the duration of a transaction.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write()
    }

    /// Snapshot of an account.
    pub fn account(&self, address: &AccountAddress) -> Option<AccountResource> {
        self.state.read().account(address).cloned()
    }

    /// Account balance.
    pub fn balance(&self, address: &AccountAddress) -> Option<u64> {
        self.account(address).map(|account| account.balance)
    }

    /// Account sequence number.
    pub fn sequence_number(&self, address: &AccountAddress) -> Option<u64> {
        self.account(address).map(|account| account.sequence_number)
    }

    /// Ledger clock in microseconds.
    pub fn timestamp_usecs(&self) -> u64 {
        self.state.read().block_info().timestamp_usecs
    }

    /// Latest block info.
    pub fn block_info(&self) -> BlockInfo {
        self.state.read().block_info().clone()
    }

    /// Addresses with the validator role, in address order.
    pub fn validator_set(&self) -> Vec<AccountAddress> {
        self.state
            .read()
            .accounts()
            .filter(|(_, account)| account.role == Role::Validator)
            .map(|(address, _)| *address)
            .collect()
    }

    /// Deterministic digest of all accounts and the block info.
    pub fn state_root(&self) -> HashValue {
        let state = self.state.read();
        let mut hasher = Sha3_256::new();

        for (address, account) in state.accounts() {
            hasher.update(address.as_bytes());
            hasher.update(account.balance.to_le_bytes());
            hasher.update(account.sequence_number.to_le_bytes());
        }
        let block = state.block_info();
        hasher.update(block.timestamp_usecs.to_le_bytes());
        hasher.update(block.height.to_le_bytes());
        hasher.update(block.id.as_bytes());

        HashValue::from_digest(hasher)
    }
}

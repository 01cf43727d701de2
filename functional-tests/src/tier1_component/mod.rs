//! Tier 1: In-process ledger and transaction executor
//!
//! Everything a functional test needs to run transactions without a node:
//! account addresses, the shared ledger state, a fluent builder for genesis
//! and the executor that applies prologue, script and epilogue.

mod address;
mod builder;
mod executor;
mod ledger;

pub use address::{
    AccountAddress, AddressParseError, HashValue, ADDRESS_LENGTH, ASSOCIATION_ADDRESS_HEX,
};
pub use builder::TestLedgerBuilder;
pub use executor::{
    is_expired, SignedTransaction, TransactionExecutor, TransactionOutput, MAX_EXPIRATION_SECS,
    MICROS_PER_SECOND,
};
pub use ledger::{
    AccountResource, BlockInfo, BlockMetadata, LedgerState, Role, TestLedger, WriteSet,
    WriteSetView, EINVALID_PROPOSER, EINVALID_TIMESTAMP, ENOT_ASSOCIATION,
};

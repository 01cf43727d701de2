//! Backend trait for functional test execution.
//!
//! The runner parses and compiles entries itself and hands ready
//! transactions to a backend. Each backend decides where they run.

use anyhow::Result;
use async_trait::async_trait;

use crate::tier1_component::{AccountAddress, BlockMetadata, SignedTransaction, TransactionOutput};

use super::genesis::GlobalConfig;

/// Execution backend for test files.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create the genesis ledger for a test file.
    ///
    /// Called once before any entry runs.
    async fn setup(&mut self, global: &GlobalConfig) -> Result<()>;

    /// Execute a transaction and return its output.
    async fn execute_transaction(&mut self, txn: SignedTransaction) -> Result<TransactionOutput>;

    /// Run a harness-internal block prologue.
    async fn execute_block_prologue(&mut self, metadata: BlockMetadata)
        -> Result<TransactionOutput>;

    /// Current sequence number of an account, zero if it does not exist.
    async fn sequence_number(&self, address: &AccountAddress) -> Result<u64>;

    /// Ledger clock in microseconds.
    async fn timestamp_usecs(&self) -> Result<u64>;

    /// Backend identifier used in logs and reports.
    fn tier_name(&self) -> &str;
}

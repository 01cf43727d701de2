//! Local backend: in-process [`TransactionExecutor`].
//!
//! Fast, in-memory execution with no network overhead.

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::config::HarnessConfig;
use crate::fixtures::backend::Backend;
use crate::fixtures::genesis::GlobalConfig;
use crate::tier1_component::{
    AccountAddress, BlockMetadata, SignedTransaction, TransactionExecutor, TransactionOutput,
};

/// Backend running transactions on an in-memory ledger.
pub struct LocalExecutorBackend {
    config: HarnessConfig,
    executor: Option<TransactionExecutor>,
}

impl LocalExecutorBackend {
    /// Create a backend (use `setup()` to create the ledger).
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            executor: None,
        }
    }

    /// Executor of the current test file.
    pub fn executor(&self) -> Result<&TransactionExecutor> {
        self.executor
            .as_ref()
            .ok_or_else(|| anyhow!("Backend not set up"))
    }
}

impl Default for LocalExecutorBackend {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

#[async_trait]
impl Backend for LocalExecutorBackend {
    async fn setup(&mut self, global: &GlobalConfig) -> Result<()> {
        let ledger = global.build_ledger(&self.config);
        self.executor = Some(
            TransactionExecutor::new(ledger)
                .with_max_gas_units_bound(self.config.max_gas_units_bound),
        );
        Ok(())
    }

    async fn execute_transaction(&mut self, txn: SignedTransaction) -> Result<TransactionOutput> {
        Ok(self.executor()?.execute_transaction(&txn))
    }

    async fn execute_block_prologue(
        &mut self,
        metadata: BlockMetadata,
    ) -> Result<TransactionOutput> {
        Ok(self.executor()?.execute_block_prologue(&metadata))
    }

    async fn sequence_number(&self, address: &AccountAddress) -> Result<u64> {
        Ok(self
            .executor()?
            .ledger()
            .sequence_number(address)
            .unwrap_or(0))
    }

    async fn timestamp_usecs(&self) -> Result<u64> {
        Ok(self.executor()?.ledger().timestamp_usecs())
    }

    fn tier_name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::parser::parse_account_directive;
    use crate::script::compile;
    use crate::status::StatusCode;
    use crate::tier1_component::{HashValue, MAX_EXPIRATION_SECS};

    fn global() -> GlobalConfig {
        let vivian = parse_account_directive("vivian, 1000000, 0, validator").unwrap();
        GlobalConfig::build(&[vivian], &HarnessConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_requires_setup() {
        let backend = LocalExecutorBackend::default();
        assert!(backend.timestamp_usecs().await.is_err());
    }

    #[tokio::test]
    async fn test_block_prologue_and_transaction() {
        let global = global();
        let mut backend = LocalExecutorBackend::default();
        backend.setup(&global).await.unwrap();
        assert_eq!(backend.tier_name(), "local");

        let output = backend
            .execute_block_prologue(BlockMetadata {
                timestamp_usecs: 100_000_000,
                id: HashValue::ZERO,
                previous_block_votes: vec![],
                proposer: global.address("vivian").unwrap(),
            })
            .await
            .unwrap();
        assert!(output.status.is_executed());
        assert_eq!(backend.timestamp_usecs().await.unwrap(), 100_000_000);

        let sender = global.address("default").unwrap();
        let txn = SignedTransaction {
            sender,
            sequence_number: backend.sequence_number(&sender).await.unwrap(),
            max_gas_amount: 1_000,
            gas_unit_price: 0,
            expiration_time_secs: 100,
            script: compile("main() { return; }", &global.addresses()).unwrap(),
            args: vec![],
        };
        let output = backend.execute_transaction(txn.clone()).await.unwrap();
        assert_eq!(output.status.code(), StatusCode::TransactionExpired);

        let txn = SignedTransaction {
            expiration_time_secs: MAX_EXPIRATION_SECS,
            ..txn
        };
        let output = backend.execute_transaction(txn).await.unwrap();
        assert!(output.status.is_executed());
        assert_eq!(backend.sequence_number(&sender).await.unwrap(), 1);
    }
}

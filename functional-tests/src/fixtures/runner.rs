//! Test file execution engine.
//!
//! Runs a test file in three phases:
//!
//! 1. **Parse**: split the file into accounts, entries and checks.
//! 2. **Evaluate**: build genesis on the backend, then compile and run each
//!    entry in order, recording an evaluation log. A compile or resolution
//!    error is logged and stops evaluation.
//! 3. **Check**: match `// check:` and `// not:` directives against the log.

use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use thiserror::Error;

use crate::config::HarnessConfig;
use crate::script::{compile, ScriptError};
use crate::tier1_component::{AccountAddress, BlockMetadata, HashValue, TransactionOutput};

use super::backend::Backend;
use super::backends::LocalExecutorBackend;
use super::genesis::{ConfigError, GlobalConfig};
use super::parser::{parse_test_file, split_input};
use super::types::{
    BlockPrologueBlock, Entry, EvaluationLog, OutputEntry, TestFile, TransactionBlock,
};
use super::verification::run_checks;

/// Failure of one entry; logged as an error entry.
#[derive(Error, Debug)]
enum EntryError {
    #[error("line {line}: {source}")]
    Compile {
        line: usize,
        #[source]
        source: ScriptError,
    },
    #[error("line {line}: {source}")]
    Config {
        line: usize,
        #[source]
        source: ConfigError,
    },
}

/// Result of evaluating a test file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationOutput {
    /// Evaluation log
    pub log: EvaluationLog,
    /// Entries that were executed
    pub executed: usize,
    /// `no-run` transactions that were compiled but not executed
    pub skipped: usize,
}

/// Evaluate a parsed test file on `backend` without running checks.
pub async fn evaluate(
    file: &TestFile,
    config: &HarnessConfig,
    backend: &mut dyn Backend,
) -> Result<EvaluationOutput> {
    let global = GlobalConfig::build(&file.global, config).context("Invalid account setup")?;
    backend
        .setup(&global)
        .await
        .with_context(|| format!("Backend '{}' setup failed", backend.tier_name()))?;

    let mut output = EvaluationOutput::default();

    for (index, entry) in file.entries.iter().enumerate() {
        let result = match entry {
            Entry::Transaction(block) => {
                if block.config.no_run {
                    if let Err(source) = compile(&block.body, &global.addresses()) {
                        let error = EntryError::Compile {
                            line: block.line,
                            source,
                        };
                        output.log.push(OutputEntry::Error(error.to_string()));
                        break;
                    }
                    debug!("Skipping no-run transaction {}", index);
                    output.skipped += 1;
                    continue;
                }
                output.log.push(OutputEntry::Transaction(index));
                run_transaction(block, &global, config, backend).await?
            }
            Entry::BlockPrologue(block) => {
                output.log.push(OutputEntry::BlockPrologue(index));
                run_block_prologue(block, &global, backend).await?
            }
        };

        match result {
            Ok(txn_output) => {
                debug!("Entry {} -> {}", index, txn_output.status);
                output.executed += 1;
                output
                    .log
                    .push(OutputEntry::Output(txn_output.status.to_string()));
            }
            Err(error) => {
                debug!("Entry {} failed: {}", index, error);
                output.log.push(OutputEntry::Error(error.to_string()));
                break;
            }
        }
    }

    Ok(output)
}

async fn run_transaction(
    block: &TransactionBlock,
    global: &GlobalConfig,
    config: &HarnessConfig,
    backend: &mut dyn Backend,
) -> Result<Result<TransactionOutput, EntryError>> {
    let line = block.line;

    let script = match compile(&block.body, &global.addresses()) {
        Ok(script) => script,
        Err(source) => return Ok(Err(EntryError::Compile { line, source })),
    };
    let sender = match global.address(block.config.sender_name()) {
        Ok(sender) => sender,
        Err(source) => return Ok(Err(EntryError::Config { line, source })),
    };

    let current = backend.sequence_number(&sender).await?;
    let txn = match block.config.resolve(global, config, script, current) {
        Ok(txn) => txn,
        Err(source) => return Ok(Err(EntryError::Config { line, source })),
    };

    Ok(Ok(backend.execute_transaction(txn).await?))
}

async fn run_block_prologue(
    block: &BlockPrologueBlock,
    global: &GlobalConfig,
    backend: &mut dyn Backend,
) -> Result<Result<TransactionOutput, EntryError>> {
    let proposer = match &block.proposer {
        Some(name) => match global.address(name) {
            Ok(address) => address,
            Err(source) => {
                return Ok(Err(EntryError::Config {
                    line: block.line,
                    source,
                }))
            }
        },
        None => AccountAddress::ZERO,
    };

    let metadata = BlockMetadata {
        timestamp_usecs: block.block_time,
        id: HashValue::sha3_256_of(&block.block_time.to_le_bytes()),
        previous_block_votes: Vec::new(),
        proposer,
    };
    Ok(Ok(backend.execute_block_prologue(metadata).await?))
}

/// Parse, evaluate and check a test file on `backend`.
pub async fn run_test_on_backend(
    text: &str,
    config: &HarnessConfig,
    backend: &mut dyn Backend,
) -> Result<EvaluationOutput> {
    let file = split_input(text)?;
    let output = evaluate(&file, config, backend).await?;
    run_checks(&file.checks, &output.log.to_text()).context("Check failed")?;
    Ok(output)
}

/// Parse, evaluate and check test text on the local executor.
pub async fn run_test(text: &str, config: &HarnessConfig) -> Result<EvaluationOutput> {
    let mut backend = LocalExecutorBackend::new(config.clone());
    run_test_on_backend(text, config, &mut backend).await
}

/// Run a test file on the local executor.
pub async fn run_test_file(path: &Path, config: &HarnessConfig) -> Result<EvaluationOutput> {
    info!("Running {}", path.display());
    let file = parse_test_file(path)?;
    let mut backend = LocalExecutorBackend::new(config.clone());
    let output = evaluate(&file, config, &mut backend)
        .await
        .with_context(|| format!("Failed to evaluate {}", path.display()))?;
    run_checks(&file.checks, &output.log.to_text())
        .with_context(|| format!("Check failed in {}", path.display()))?;
    Ok(output)
}

//! Transaction executor
//!
//! Runs a transaction in three phases against the shared [`TestLedger`]:
//!
//! 1. **Prologue**: admission checks. Any failure discards the transaction.
//! 2. **Execution**: the script runs on a [`WriteSetView`] overlay with gas
//!    metering.
//! 3. **Epilogue**: the fee `gas_used * gas_unit_price` is charged and the
//!    sender's sequence number is bumped. The script's writes are committed
//!    only when it executed successfully.

use log::{debug, trace};

use crate::config::MAX_GAS_UNITS_BOUND;
use crate::script::{execute_script, GasMeter, Script, TransactionContext, Value};
use crate::status::{StatusCode, TransactionStatus, VMStatus};

use super::address::AccountAddress;
use super::ledger::{BlockMetadata, LedgerState, TestLedger, WriteSet, WriteSetView};

/// Ledger microseconds per expiration second
pub const MICROS_PER_SECOND: u64 = 1_000_000;

/// Largest expiration whose microsecond value fits the signed 64-bit clock
pub const MAX_EXPIRATION_SECS: u64 = i64::MAX as u64 / MICROS_PER_SECOND;

/// Whether a transaction expiring at `expiration_secs` is stale at `now_usecs`.
///
/// Expirations beyond [`MAX_EXPIRATION_SECS`] cannot be represented on the
/// ledger clock and are always expired.
pub fn is_expired(expiration_secs: u64, now_usecs: u64) -> bool {
    match expiration_secs.checked_mul(MICROS_PER_SECOND) {
        Some(expiration_usecs) if expiration_usecs <= i64::MAX as u64 => {
            expiration_usecs <= now_usecs
        }
        _ => true,
    }
}

/// A transaction ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Sender address
    pub sender: AccountAddress,
    /// Sequence number, must equal the sender's current one
    pub sequence_number: u64,
    /// Gas budget
    pub max_gas_amount: u64,
    /// Price per gas unit
    pub gas_unit_price: u64,
    /// Expiration in seconds
    pub expiration_time_secs: u64,
    /// Compiled script
    pub script: Script,
    /// Arguments bound to the script's parameters
    pub args: Vec<Value>,
}

/// Result of executing one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutput {
    /// Keep or discard, with the VM status
    pub status: TransactionStatus,
    /// Gas consumed
    pub gas_used: u64,
    /// Writes applied to the ledger if kept
    pub write_set: WriteSet,
}

impl TransactionOutput {
    fn discard(status: impl Into<VMStatus>) -> Self {
        Self {
            status: TransactionStatus::Discard(status.into()),
            gas_used: 0,
            write_set: WriteSet::default(),
        }
    }

    fn keep(status: VMStatus, gas_used: u64, write_set: WriteSet) -> Self {
        Self {
            status: TransactionStatus::Keep(status),
            gas_used,
            write_set,
        }
    }
}

/// Executes transactions against a [`TestLedger`].
#[derive(Clone)]
pub struct TransactionExecutor {
    ledger: TestLedger,
    max_gas_units_bound: u64,
}

impl TransactionExecutor {
    /// Executor over `ledger`
    pub fn new(ledger: TestLedger) -> Self {
        Self {
            ledger,
            max_gas_units_bound: MAX_GAS_UNITS_BOUND,
        }
    }

    /// Override the per-transaction gas bound
    pub fn with_max_gas_units_bound(mut self, bound: u64) -> Self {
        self.max_gas_units_bound = bound;
        self
    }

    /// The ledger this executor writes to
    pub fn ledger(&self) -> &TestLedger {
        &self.ledger
    }

    /// Execute a transaction, applying its write-set if it is kept.
    pub fn execute_transaction(&self, txn: &SignedTransaction) -> TransactionOutput {
        let mut state = self.ledger.write();
        let output = self.run(&state, txn);

        debug!(
            "txn {}#{} -> {} (gas used {})",
            txn.sender.short_str(),
            txn.sequence_number,
            output.status,
            output.gas_used
        );
        if let TransactionStatus::Keep(_) = output.status {
            state.apply(output.write_set.clone());
        }
        output
    }

    /// Run the block prologue on behalf of the association.
    ///
    /// A rejected prologue is discarded with the abort code of the failed
    /// rule and leaves the clock untouched.
    pub fn execute_block_prologue(&self, metadata: &BlockMetadata) -> TransactionOutput {
        let mut state = self.ledger.write();
        let mut view = WriteSetView::new(&state);

        let output = match view.apply_block_prologue(metadata) {
            Ok(()) => TransactionOutput::keep(VMStatus::executed(), 0, view.into_write_set()),
            Err(code) => TransactionOutput::discard(VMStatus::aborted(code)),
        };

        debug!(
            "block prologue at {} by {} -> {}",
            metadata.timestamp_usecs,
            metadata.proposer.short_str(),
            output.status
        );
        if let TransactionStatus::Keep(_) = output.status {
            state.apply(output.write_set.clone());
        }
        output
    }

    fn run(&self, state: &LedgerState, txn: &SignedTransaction) -> TransactionOutput {
        if let Err(code) = self.prologue(state, txn) {
            return TransactionOutput::discard(code);
        }
        if let Err(reason) = check_arguments(&txn.script, &txn.args) {
            trace!("argument check failed: {}", reason);
            return TransactionOutput::discard(StatusCode::TypeMismatch);
        }

        let ctx = TransactionContext {
            sender: txn.sender,
            sequence_number: txn.sequence_number,
            max_gas_units: txn.max_gas_amount,
            gas_unit_price: txn.gas_unit_price,
        };
        let mut gas = GasMeter::new(txn.max_gas_amount);
        let mut view = WriteSetView::new(state);

        match execute_script(&txn.script, txn.args.clone(), &ctx, &mut view, &mut gas) {
            Ok(()) => self.epilogue(state, view, txn, gas.used(), VMStatus::executed()),
            Err(err) => {
                trace!("script failed: {}", err);
                // Writes of a failed script are dropped; only the fee sticks
                let view = WriteSetView::new(state);
                self.epilogue(state, view, txn, gas.used(), err.vm_status())
            }
        }
    }

    fn prologue(&self, state: &LedgerState, txn: &SignedTransaction) -> Result<(), StatusCode> {
        let account = state
            .account(&txn.sender)
            .ok_or(StatusCode::SendingAccountDoesNotExist)?;

        if txn.sequence_number < account.sequence_number {
            return Err(StatusCode::SequenceNumberTooOld);
        }
        if is_expired(txn.expiration_time_secs, state.block_info().timestamp_usecs) {
            return Err(StatusCode::TransactionExpired);
        }
        if txn.sequence_number > account.sequence_number {
            return Err(StatusCode::SequenceNumberTooNew);
        }
        if txn.max_gas_amount > self.max_gas_units_bound {
            return Err(StatusCode::MaxGasUnitsExceedsMaxGasUnitsBound);
        }

        let max_fee = txn
            .max_gas_amount
            .checked_mul(txn.gas_unit_price)
            .ok_or(StatusCode::InsufficientBalanceForTransactionFee)?;
        if account.balance < max_fee {
            return Err(StatusCode::InsufficientBalanceForTransactionFee);
        }
        Ok(())
    }

    fn epilogue(
        &self,
        state: &LedgerState,
        view: WriteSetView<'_>,
        txn: &SignedTransaction,
        gas_used: u64,
        status: VMStatus,
    ) -> TransactionOutput {
        let fee = gas_used.saturating_mul(txn.gas_unit_price);

        if let Some(write_set) = charge_fee(view, &txn.sender, fee) {
            return TransactionOutput::keep(status, gas_used, write_set);
        }

        // The script spent the funds reserved for the fee: drop its writes
        // and charge against the state the prologue checked.
        match charge_fee(WriteSetView::new(state), &txn.sender, fee) {
            Some(write_set) => TransactionOutput::keep(
                StatusCode::InsufficientBalanceForTransactionFee.into(),
                gas_used,
                write_set,
            ),
            None => TransactionOutput::discard(StatusCode::InsufficientBalanceForTransactionFee),
        }
    }
}

fn charge_fee(mut view: WriteSetView<'_>, sender: &AccountAddress, fee: u64) -> Option<WriteSet> {
    let account = view.account_mut(sender)?;
    account.balance = account.balance.checked_sub(fee)?;
    account.sequence_number = account.sequence_number.checked_add(1)?;
    Some(view.into_write_set())
}

fn check_arguments(script: &Script, args: &[Value]) -> Result<(), String> {
    if script.params.len() != args.len() {
        return Err(format!(
            "main expects {} arguments, got {}",
            script.params.len(),
            args.len()
        ));
    }
    for ((name, ty), arg) in script.params.iter().zip(args) {
        if arg.ty() != *ty {
            return Err(format!("'{}' expects {}, got {}", name, ty, arg.ty()));
        }
    }
    Ok(())
}

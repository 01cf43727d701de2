//! Core types for functional test files.
//!
//! A test file is a sequence of entries (transactions and harness-internal
//! block prologues) preceded by account declarations and interleaved with
//! `// check:` / `// not:` directives.

use std::fmt;

use serde::Serialize;

use crate::script::Value;
use crate::tier1_component::{AccountAddress, Role};

/// `//! account: name[, balance[, sequence-number[, role]]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDefinition {
    /// Account name, usable as `{{name}}` and in `//! sender:`
    pub name: String,
    /// Initial balance; `None` takes the configured default
    pub balance: Option<u64>,
    /// Initial sequence number
    pub sequence_number: u64,
    /// Normal account or validator
    pub role: Role,
}

/// Literal forms accepted by `//! args:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// `10`
    U64(u64),
    /// `0x1`
    Address(AccountAddress),
    /// `{{name}}`, resolved to the account's address
    Placeholder(String),
    /// `true` / `false`
    Bool(bool),
    /// `h"00ff"`
    ByteArray(Vec<u8>),
}

impl Argument {
    /// Convert to a runtime value, looking up placeholders with `lookup`.
    pub fn to_value<E>(
        &self,
        lookup: impl Fn(&str) -> Result<AccountAddress, E>,
    ) -> Result<Value, E> {
        Ok(match self {
            Argument::U64(value) => Value::U64(*value),
            Argument::Address(address) => Value::Address(*address),
            Argument::Placeholder(name) => Value::Address(lookup(name)?),
            Argument::Bool(value) => Value::Bool(*value),
            Argument::ByteArray(bytes) => Value::ByteArray(bytes.clone()),
        })
    }
}

/// A `//!` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `//! account: ...`
    Account(AccountDefinition),
    /// `//! new-transaction`
    NewTransaction,
    /// `//! sender: name`
    Sender(String),
    /// `//! args: a, b, ...`
    Args(Vec<Argument>),
    /// `//! no-run`
    NoRun,
    /// `//! max-gas: n`
    MaxGas(u64),
    /// `//! gas-price: n`
    GasPrice(u64),
    /// `//! sequence-number: n`
    SequenceNumber(u64),
    /// `//! expiration-time: secs`
    ExpirationTime(u64),
    /// `//! block-prologue`
    BlockPrologue,
    /// `//! proposer: name`
    Proposer(String),
    /// `//! block-time: usecs`
    BlockTime(u64),
}

impl Directive {
    /// Directive keyword as written after `//!`.
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Account(_) => "account",
            Directive::NewTransaction => "new-transaction",
            Directive::Sender(_) => "sender",
            Directive::Args(_) => "args",
            Directive::NoRun => "no-run",
            Directive::MaxGas(_) => "max-gas",
            Directive::GasPrice(_) => "gas-price",
            Directive::SequenceNumber(_) => "sequence-number",
            Directive::ExpirationTime(_) => "expiration-time",
            Directive::BlockPrologue => "block-prologue",
            Directive::Proposer(_) => "proposer",
            Directive::BlockTime(_) => "block-time",
        }
    }
}

/// Expected-output directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckDirective {
    /// `// check: pattern`
    Check(String),
    /// `// not: pattern`
    Not(String),
}

impl CheckDirective {
    /// Pattern text.
    pub fn pattern(&self) -> &str {
        match self {
            CheckDirective::Check(pattern) | CheckDirective::Not(pattern) => pattern,
        }
    }
}

/// A check directive with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckLine {
    /// Source line
    pub line: usize,
    /// Directive
    pub directive: CheckDirective,
}

/// Transaction-scoped directives. Unset fields take defaults at resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Sender account name
    pub sender: Option<String>,
    /// Script arguments
    pub args: Vec<Argument>,
    /// Parse but do not execute
    pub no_run: bool,
    /// Gas budget
    pub max_gas: Option<u64>,
    /// Gas unit price
    pub gas_price: Option<u64>,
    /// Explicit sequence number
    pub sequence_number: Option<u64>,
    /// Expiration in seconds
    pub expiration_time: Option<u64>,
}

/// One transaction: its directives and script body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBlock {
    /// Directives
    pub config: TransactionConfig,
    /// Script source
    pub body: String,
    /// Line where the block starts
    pub line: usize,
}

/// A harness-internal block prologue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPrologueBlock {
    /// Proposer account name; the zero address when absent
    pub proposer: Option<String>,
    /// New ledger clock in microseconds
    pub block_time: u64,
    /// Line of the `//! block-prologue` directive
    pub line: usize,
}

/// Executable unit of a test file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Script transaction
    Transaction(TransactionBlock),
    /// Block prologue run by the harness
    BlockPrologue(BlockPrologueBlock),
}

/// A parsed test file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestFile {
    /// Account declarations
    pub global: Vec<AccountDefinition>,
    /// Entries in file order
    pub entries: Vec<Entry>,
    /// Check directives in file order
    pub checks: Vec<CheckLine>,
}

/// One line of the evaluation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OutputEntry {
    /// Start of transaction entry `n`
    Transaction(usize),
    /// Start of block prologue entry `n`
    BlockPrologue(usize),
    /// Outcome of the preceding entry
    Output(String),
    /// Compile or resolution failure; evaluation stops after it
    Error(String),
}

impl fmt::Display for OutputEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputEntry::Transaction(index) => write!(f, "Transaction({})", index),
            OutputEntry::BlockPrologue(index) => write!(f, "BlockPrologue({})", index),
            OutputEntry::Output(status) => write!(f, "Output({})", status),
            OutputEntry::Error(message) => write!(f, "Error({})", message),
        }
    }
}

/// Ordered evaluation log of one test file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationLog {
    /// Entries in execution order
    pub entries: Vec<OutputEntry>,
}

impl EvaluationLog {
    /// Append an entry.
    pub fn push(&mut self, entry: OutputEntry) {
        self.entries.push(entry);
    }

    /// Render one entry per line; `// check:` patterns match against this.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for entry in &self.entries {
            text.push_str(&entry.to_string());
            text.push('\n');
        }
        text
    }

    /// Whether any entry is an error.
    pub fn has_error(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry, OutputEntry::Error(_)))
    }
}

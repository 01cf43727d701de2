//! Functional test harness for ledger transaction execution
//!
//! Test files are plain text: `//!` directives declare accounts and
//! per-transaction settings, the script body follows, and `// check:` lines
//! describe the expected evaluation log. The harness builds a genesis ledger,
//! runs each transaction or block prologue in order, and matches the log.
//!
//! ## Modules
//!
//! - [`tier1_component`]: in-process ledger and transaction executor
//! - [`script`]: script language compiler and interpreter
//! - [`fixtures`]: test file parsing, evaluation and checking
//! - [`suite`]: discovery and concurrent runs over a directory of tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use functional_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_suite() {
//!     let suite = TestSuite::discover("tests/testsuite".as_ref(), HarnessConfig::default()).unwrap();
//!     assert!(suite.run().await.all_passed());
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod fixtures;
pub mod script;
pub mod status;
pub mod suite;
pub mod tier1_component;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::HarnessConfig;
    pub use crate::fixtures::{run_test, run_test_file, Backend, LocalExecutorBackend};
    pub use crate::status::{StatusCode, TransactionStatus, VMStatus};
    pub use crate::suite::{SuiteReport, TestSuite};
    pub use crate::tier1_component::{
        is_expired, AccountAddress, TestLedgerBuilder, TransactionExecutor, MAX_EXPIRATION_SECS,
    };
}

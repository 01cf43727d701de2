//! Functional Test Files
//!
//! Directive-driven tests where authors specify:
//! 1. Accounts (`//! account:`)
//! 2. A sequence of transactions and block prologues
//! 3. Expected output (`// check:` / `// not:`)
//!
//! The framework handles genesis, execution and checking automatically.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Functional Test Files                    │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                            │
//! │   .mvir text  ──▶  split_input  ──▶  evaluate  ──▶  checks │
//! │                                        │                   │
//! │                                        ▼                   │
//! │                              ┌──────────────────┐          │
//! │                              │  Backend         │          │
//! │                              │  (local executor)│          │
//! │                              └──────────────────┘          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use functional_tests::config::HarnessConfig;
//! use functional_tests::fixtures::run_test;
//!
//! #[tokio::test]
//! async fn test_expired() {
//!     let text = r#"
//! //! expiration-time: 0
//! main() { return; }
//! // check: TRANSACTION_EXPIRED
//! "#;
//!     run_test(text, &HarnessConfig::default()).await.unwrap();
//! }
//! ```

pub mod backend;
pub mod backends;
pub mod genesis;
pub mod parser;
pub mod runner;
pub mod types;
pub mod verification;

// Re-export commonly used types
pub use backend::Backend;
pub use backends::LocalExecutorBackend;
pub use genesis::{AccountData, ConfigError, GlobalConfig};
pub use parser::{parse_account_directive, parse_test_file, split_input, DirectiveError, ParseError};
pub use runner::{evaluate, run_test, run_test_file, run_test_on_backend, EvaluationOutput};
pub use types::{
    AccountDefinition, Argument, BlockPrologueBlock, CheckDirective, CheckLine, Directive, Entry,
    EvaluationLog, OutputEntry, TestFile, TransactionBlock, TransactionConfig,
};
pub use verification::{run_checks, CheckError};

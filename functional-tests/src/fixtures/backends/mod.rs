//! Backend implementations.
//!
//! Each backend adapts an execution engine to the [`Backend`](super::backend::Backend)
//! trait.

pub mod local;

pub use local::LocalExecutorBackend;

//! Transaction outcome taxonomy.
//!
//! Every executed (or rejected) transaction produces a [`TransactionStatus`].
//! The rendered form of the status is what `// check:` directives match
//! against, so the token spelling here is part of the script format.

use std::fmt;

use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};

/// Major status codes reported by the executor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// Transaction body ran to completion
    Executed,
    /// Expiration time is at or before the ledger clock, or unrepresentable
    TransactionExpired,
    /// Sender has no account on the ledger
    SendingAccountDoesNotExist,
    /// Sequence number lower than the account's current one
    SequenceNumberTooOld,
    /// Sequence number higher than the account's current one
    SequenceNumberTooNew,
    /// Sender cannot cover `max_gas * gas_price`
    InsufficientBalanceForTransactionFee,
    /// `max_gas` above the configured bound
    MaxGasUnitsExceedsMaxGasUnitsBound,
    /// Script aborted (explicit `abort`, failed `assert`, or native failure)
    Aborted,
    /// Gas budget exhausted during execution
    OutOfGas,
    /// Overflow, underflow or division by zero
    ArithmeticError,
    /// Read of missing data (unset local, unknown account)
    MissingData,
    /// Operand or argument of the wrong type
    TypeMismatch,
}

impl StatusCode {
    /// Whether this code describes a failure detected before execution.
    pub fn is_prologue_failure(&self) -> bool {
        matches!(
            self,
            StatusCode::TransactionExpired
                | StatusCode::SendingAccountDoesNotExist
                | StatusCode::SequenceNumberTooOld
                | StatusCode::SequenceNumberTooNew
                | StatusCode::InsufficientBalanceForTransactionFee
                | StatusCode::MaxGasUnitsExceedsMaxGasUnitsBound
        )
    }
}

/// A major status plus an optional abort code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VMStatus {
    /// Major status
    pub major_status: StatusCode,
    /// Abort code, set only for [`StatusCode::Aborted`]
    pub sub_status: Option<u64>,
}

impl VMStatus {
    /// Status without an abort code.
    pub fn new(major_status: StatusCode) -> Self {
        Self {
            major_status,
            sub_status: None,
        }
    }

    /// `ABORTED` with the given code.
    pub fn aborted(code: u64) -> Self {
        Self {
            major_status: StatusCode::Aborted,
            sub_status: Some(code),
        }
    }

    /// Shorthand for `EXECUTED`.
    pub fn executed() -> Self {
        Self::new(StatusCode::Executed)
    }
}

impl fmt::Display for VMStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_status {
            Some(code) => write!(f, "{} {{ code: {} }}", self.major_status, code),
            None => write!(f, "{}", self.major_status),
        }
    }
}

impl From<StatusCode> for VMStatus {
    fn from(code: StatusCode) -> Self {
        Self::new(code)
    }
}

/// Whether a transaction's effects are kept on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionStatus {
    /// Fee charged and sequence number bumped. Write-set committed only on `EXECUTED`.
    Keep(VMStatus),
    /// Rejected before execution; the ledger is untouched.
    Discard(VMStatus),
}

impl TransactionStatus {
    /// Inner VM status.
    pub fn vm_status(&self) -> &VMStatus {
        match self {
            TransactionStatus::Keep(status) | TransactionStatus::Discard(status) => status,
        }
    }

    /// Major status code.
    pub fn code(&self) -> StatusCode {
        self.vm_status().major_status
    }

    /// `Keep(EXECUTED)`
    pub fn is_executed(&self) -> bool {
        matches!(self, TransactionStatus::Keep(status) if status.major_status == StatusCode::Executed)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Keep(status) => write!(f, "Keep({})", status),
            TransactionStatus::Discard(status) => write!(f, "Discard({})", status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_code_tokens() {
        assert_eq!(StatusCode::Executed.to_string(), "EXECUTED");
        assert_eq!(
            StatusCode::TransactionExpired.to_string(),
            "TRANSACTION_EXPIRED"
        );
        assert_eq!(
            StatusCode::InsufficientBalanceForTransactionFee.to_string(),
            "INSUFFICIENT_BALANCE_FOR_TRANSACTION_FEE"
        );
        assert_eq!(
            StatusCode::from_str("SEQUENCE_NUMBER_TOO_OLD").unwrap(),
            StatusCode::SequenceNumberTooOld
        );
    }

    #[test]
    fn test_transaction_status_display() {
        assert_eq!(
            TransactionStatus::Keep(VMStatus::executed()).to_string(),
            "Keep(EXECUTED)"
        );
        assert_eq!(
            TransactionStatus::Discard(StatusCode::TransactionExpired.into()).to_string(),
            "Discard(TRANSACTION_EXPIRED)"
        );
        assert_eq!(
            TransactionStatus::Keep(VMStatus::aborted(7)).to_string(),
            "Keep(ABORTED { code: 7 })"
        );
    }

    #[test]
    fn test_expired_token_does_not_contain_executed() {
        // `// check: EXECUTED` must never match an expired transaction
        let rendered = TransactionStatus::Discard(StatusCode::TransactionExpired.into()).to_string();
        assert!(!rendered.contains("EXECUTED"));
    }

    #[test]
    fn test_prologue_failures() {
        assert!(StatusCode::TransactionExpired.is_prologue_failure());
        assert!(!StatusCode::Aborted.is_prologue_failure());
        assert!(TransactionStatus::Keep(VMStatus::executed()).is_executed());
        assert!(!TransactionStatus::Keep(VMStatus::aborted(1)).is_executed());
    }
}

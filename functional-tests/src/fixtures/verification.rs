//! Expected-output verification.
//!
//! `// check:` patterns must appear in the rendered evaluation log in file
//! order, each one after the end of the previous match. A `// not:` pattern
//! must not appear between the previous match and the next one (or the end
//! of the log).

use thiserror::Error;

use super::types::{CheckDirective, CheckLine};

/// A failed check directive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// `// check:` pattern not found
    #[error("line {line}: 'check: {pattern}' not found in log from offset {offset}:\n{region}")]
    CheckFailed {
        /// Directive line
        line: usize,
        /// Pattern
        pattern: String,
        /// Log offset where the search started
        offset: usize,
        /// Log text searched
        region: String,
    },
    /// `// not:` pattern present
    #[error("line {line}: 'not: {pattern}' found in log:\n{region}")]
    NotFailed {
        /// Directive line
        line: usize,
        /// Pattern
        pattern: String,
        /// Log text searched
        region: String,
    },
}

/// Match `checks` against `log`, the rendered evaluation log.
pub fn run_checks(checks: &[CheckLine], log: &str) -> Result<(), CheckError> {
    let mut cursor = 0;
    let mut pending_nots: Vec<&CheckLine> = Vec::new();

    for check in checks {
        match &check.directive {
            CheckDirective::Not(_) => pending_nots.push(check),
            CheckDirective::Check(pattern) => {
                let region = &log[cursor..];
                let found = region.find(pattern.as_str()).ok_or_else(|| {
                    CheckError::CheckFailed {
                        line: check.line,
                        pattern: pattern.clone(),
                        offset: cursor,
                        region: region.to_string(),
                    }
                })?;

                let start = cursor + found;
                verify_nots(&pending_nots, &log[cursor..start])?;
                pending_nots.clear();
                cursor = start + pattern.len();
            }
        }
    }

    verify_nots(&pending_nots, &log[cursor..])
}

fn verify_nots(nots: &[&CheckLine], region: &str) -> Result<(), CheckError> {
    for not in nots {
        let pattern = not.directive.pattern();
        if region.contains(pattern) {
            return Err(CheckError::NotFailed {
                line: not.line,
                pattern: pattern.to_string(),
                region: region.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(line: usize, pattern: &str) -> CheckLine {
        CheckLine {
            line,
            directive: CheckDirective::Check(pattern.to_string()),
        }
    }

    fn not(line: usize, pattern: &str) -> CheckLine {
        CheckLine {
            line,
            directive: CheckDirective::Not(pattern.to_string()),
        }
    }

    const LOG: &str = "Transaction(0)\nOutput(Keep(EXECUTED))\nTransaction(1)\nOutput(Discard(TRANSACTION_EXPIRED))\nTransaction(2)\nOutput(Keep(EXECUTED))\n";

    #[test]
    fn test_checks_in_order() {
        let checks = vec![
            check(1, "EXECUTED"),
            check(2, "TRANSACTION_EXPIRED"),
            check(3, "EXECUTED"),
        ];
        assert_eq!(run_checks(&checks, LOG), Ok(()));
    }

    #[test]
    fn test_checks_do_not_rewind() {
        let checks = vec![check(1, "TRANSACTION_EXPIRED"), check(2, "Transaction(1)")];
        assert!(matches!(
            run_checks(&checks, LOG),
            Err(CheckError::CheckFailed { line: 2, .. })
        ));
    }

    #[test]
    fn test_match_consumes_pattern() {
        // the second check cannot reuse the first match
        let log = "Output(Keep(EXECUTED))\n";
        let checks = vec![check(1, "EXECUTED"), check(2, "EXECUTED")];
        assert!(run_checks(&checks, log).is_err());
    }

    #[test]
    fn test_not_between_checks() {
        let checks = vec![
            check(1, "Transaction(0)"),
            not(2, "Discard"),
            check(3, "Transaction(1)"),
        ];
        assert_eq!(run_checks(&checks, LOG), Ok(()));

        let checks = vec![
            check(1, "Transaction(1)"),
            not(2, "Discard"),
            check(3, "Transaction(2)"),
        ];
        assert!(matches!(
            run_checks(&checks, LOG),
            Err(CheckError::NotFailed { line: 2, .. })
        ));
    }

    #[test]
    fn test_trailing_not_covers_rest_of_log() {
        let checks = vec![check(1, "Transaction(2)"), not(2, "ABORTED")];
        assert_eq!(run_checks(&checks, LOG), Ok(()));

        let checks = vec![check(1, "Transaction(0)"), not(2, "TRANSACTION_EXPIRED")];
        assert!(matches!(
            run_checks(&checks, LOG),
            Err(CheckError::NotFailed { line: 2, .. })
        ));
    }

    #[test]
    fn test_no_checks_pass() {
        assert_eq!(run_checks(&[], LOG), Ok(()));
    }

    #[test]
    fn test_failure_reports_region() {
        let checks = vec![check(1, "Transaction(2)"), check(7, "ABORTED")];
        let err = run_checks(&checks, LOG).unwrap_err();
        match err {
            CheckError::CheckFailed {
                line,
                pattern,
                region,
                ..
            } => {
                assert_eq!(line, 7);
                assert_eq!(pattern, "ABORTED");
                assert_eq!(region, "\nOutput(Keep(EXECUTED))\n");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}

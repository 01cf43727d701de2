//! Test file parsing.
//!
//! Classifies each line as a `//!` directive, a `// check:` / `// not:`
//! directive, a comment or script code, and groups them into entries.

use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::tier1_component::{AccountAddress, Role};

use super::types::{
    AccountDefinition, Argument, BlockPrologueBlock, CheckDirective, CheckLine, Directive, Entry,
    TestFile, TransactionBlock, TransactionConfig,
};

/// Problem with a single directive or block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectiveError {
    /// Keyword not recognised
    #[error("unknown directive '{0}'")]
    UnknownDirective(String),
    /// Missing or superfluous value
    #[error("malformed directive '{0}'")]
    Malformed(String),
    /// Not an unsigned integer
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    /// Bad `//! account:` line
    #[error("invalid account definition: {0}")]
    InvalidAccount(String),
    /// Bad `//! args:` element
    #[error("invalid argument '{0}'")]
    InvalidArgument(String),
    /// Directive placed after code in its block
    #[error("'{0}' must appear before any code in its block")]
    AfterCode(String),
    /// Directive repeated in one block
    #[error("'{0}' appears twice in one block")]
    Duplicate(String),
    /// Directive that does not belong to this kind of block
    #[error("'{0}' is not allowed here")]
    Misplaced(String),
    /// Transaction without script code
    #[error("transaction has no body")]
    EmptyTransaction,
    /// Code inside a block prologue entry
    #[error("block prologue entries cannot contain code")]
    PrologueBody,
    /// Block prologue without `//! block-time:`
    #[error("block prologue requires 'block-time'")]
    MissingBlockTime,
}

/// A [`DirectiveError`] located at a 1-based line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {error}")]
pub struct ParseError {
    /// Source line
    pub line: usize,
    /// What went wrong
    pub error: DirectiveError,
}

impl DirectiveError {
    fn at(self, line: usize) -> ParseError {
        ParseError { line, error: self }
    }
}

/// Parse a number, allowing `_` separators.
fn parse_u64(text: &str) -> Result<u64, DirectiveError> {
    let digits: String = text.trim().chars().filter(|c| *c != '_').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DirectiveError::InvalidNumber(text.trim().to_string()));
    }
    digits
        .parse()
        .map_err(|_| DirectiveError::InvalidNumber(text.trim().to_string()))
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse the value of `//! account:`.
pub fn parse_account_directive(text: &str) -> Result<AccountDefinition, DirectiveError> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    if fields.len() > 4 {
        return Err(DirectiveError::InvalidAccount(format!(
            "expected at most 4 fields, got {}",
            fields.len()
        )));
    }

    let name = fields[0];
    if !is_valid_name(name) {
        return Err(DirectiveError::InvalidAccount(format!(
            "invalid account name '{}'",
            name
        )));
    }

    let balance = fields.get(1).map(|value| parse_u64(value)).transpose()?;
    let sequence_number = fields
        .get(2)
        .map(|value| parse_u64(value))
        .transpose()?
        .unwrap_or(0);
    let role = match fields.get(3) {
        None | Some(&"normal") => Role::Normal,
        Some(&"validator") => Role::Validator,
        Some(other) => {
            return Err(DirectiveError::InvalidAccount(format!(
                "unknown role '{}'",
                other
            )))
        }
    };

    Ok(AccountDefinition {
        name: name.to_string(),
        balance,
        sequence_number,
        role,
    })
}

/// Parse one `//! args:` element.
pub fn parse_argument(text: &str) -> Result<Argument, DirectiveError> {
    let text = text.trim();
    let invalid = || DirectiveError::InvalidArgument(text.to_string());

    match text {
        "true" => return Ok(Argument::Bool(true)),
        "false" => return Ok(Argument::Bool(false)),
        _ => {}
    }

    if let Some(name) = text
        .strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
    {
        return if is_valid_name(name) {
            Ok(Argument::Placeholder(name.to_string()))
        } else {
            Err(invalid())
        };
    }
    if let Some(digits) = text
        .strip_prefix("h\"")
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return hex::decode(digits)
            .map(Argument::ByteArray)
            .map_err(|_| invalid());
    }
    if text.starts_with("0x") || text.starts_with("0X") {
        return AccountAddress::from_hex_literal(text)
            .map(Argument::Address)
            .map_err(|_| invalid());
    }
    parse_u64(text).map(Argument::U64).map_err(|_| invalid())
}

fn parse_args(text: &str) -> Result<Vec<Argument>, DirectiveError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split(',').map(parse_argument).collect()
}

/// Parse the text after `//!`.
pub fn parse_directive(text: &str) -> Result<Directive, DirectiveError> {
    let text = text.trim();
    let (keyword, value) = match text.split_once(':') {
        Some((keyword, value)) => (keyword.trim(), Some(value.trim())),
        None => (text, None),
    };

    let required = || {
        value
            .filter(|value| !value.is_empty())
            .ok_or_else(|| DirectiveError::Malformed(text.to_string()))
    };
    let flag = |directive: Directive| match value {
        None => Ok(directive),
        Some(_) => Err(DirectiveError::Malformed(text.to_string())),
    };

    match keyword {
        "account" => parse_account_directive(required()?).map(Directive::Account),
        "new-transaction" => flag(Directive::NewTransaction),
        "block-prologue" => flag(Directive::BlockPrologue),
        "no-run" => flag(Directive::NoRun),
        "sender" => {
            let name = required()?;
            if !is_valid_name(name) {
                return Err(DirectiveError::Malformed(text.to_string()));
            }
            Ok(Directive::Sender(name.to_string()))
        }
        "proposer" => {
            let name = required()?;
            if !is_valid_name(name) {
                return Err(DirectiveError::Malformed(text.to_string()));
            }
            Ok(Directive::Proposer(name.to_string()))
        }
        "args" => {
            let value = value.ok_or_else(|| DirectiveError::Malformed(text.to_string()))?;
            parse_args(value).map(Directive::Args)
        }
        "max-gas" => parse_u64(required()?).map(Directive::MaxGas),
        "gas-price" => parse_u64(required()?).map(Directive::GasPrice),
        "sequence-number" => parse_u64(required()?).map(Directive::SequenceNumber),
        "expiration-time" => parse_u64(required()?).map(Directive::ExpirationTime),
        "block-time" => parse_u64(required()?).map(Directive::BlockTime),
        _ => Err(DirectiveError::UnknownDirective(keyword.to_string())),
    }
}

fn parse_check(text: &str) -> Option<Result<CheckDirective, DirectiveError>> {
    let rest = text.strip_prefix("//")?.trim_start();
    let (pattern, make): (&str, fn(String) -> CheckDirective) =
        if let Some(pattern) = rest.strip_prefix("check:") {
            (pattern, CheckDirective::Check)
        } else if let Some(pattern) = rest.strip_prefix("not:") {
            (pattern, CheckDirective::Not)
        } else {
            return None;
        };

    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Some(Err(DirectiveError::Malformed(text.to_string())));
    }
    Some(Ok(make(pattern.to_string())))
}

enum Block {
    Transaction {
        config: TransactionConfig,
        seen: Vec<&'static str>,
        body: String,
        has_code: bool,
        line: usize,
        implicit: bool,
    },
    Prologue {
        proposer: Option<String>,
        block_time: Option<u64>,
        line: usize,
    },
}

impl Block {
    fn transaction(line: usize, implicit: bool) -> Self {
        Block::Transaction {
            config: TransactionConfig::default(),
            seen: Vec::new(),
            body: String::new(),
            has_code: false,
            line,
            implicit,
        }
    }

    fn finish(self, entries: &mut Vec<Entry>) -> Result<(), ParseError> {
        match self {
            Block::Transaction {
                config,
                seen,
                body,
                has_code,
                line,
                implicit,
            } => {
                if !has_code {
                    // A leading block that holds nothing at all is not an entry
                    if implicit && seen.is_empty() {
                        return Ok(());
                    }
                    return Err(DirectiveError::EmptyTransaction.at(line));
                }
                entries.push(Entry::Transaction(TransactionBlock { config, body, line }));
            }
            Block::Prologue {
                proposer,
                block_time,
                line,
            } => {
                let block_time =
                    block_time.ok_or_else(|| DirectiveError::MissingBlockTime.at(line))?;
                entries.push(Entry::BlockPrologue(BlockPrologueBlock {
                    proposer,
                    block_time,
                    line,
                }));
            }
        }
        Ok(())
    }

    fn apply(&mut self, directive: Directive) -> Result<(), DirectiveError> {
        let name = directive.name();
        match self {
            Block::Transaction {
                config,
                seen,
                has_code,
                ..
            } => {
                if *has_code {
                    return Err(DirectiveError::AfterCode(name.to_string()));
                }
                if seen.contains(&name) {
                    return Err(DirectiveError::Duplicate(name.to_string()));
                }
                match directive {
                    Directive::Sender(sender) => config.sender = Some(sender),
                    Directive::Args(args) => config.args = args,
                    Directive::NoRun => config.no_run = true,
                    Directive::MaxGas(value) => config.max_gas = Some(value),
                    Directive::GasPrice(value) => config.gas_price = Some(value),
                    Directive::SequenceNumber(value) => config.sequence_number = Some(value),
                    Directive::ExpirationTime(value) => config.expiration_time = Some(value),
                    _ => return Err(DirectiveError::Misplaced(name.to_string())),
                }
                seen.push(name);
            }
            Block::Prologue {
                proposer,
                block_time,
                ..
            } => match directive {
                Directive::Proposer(name) => {
                    if proposer.replace(name).is_some() {
                        return Err(DirectiveError::Duplicate("proposer".to_string()));
                    }
                }
                Directive::BlockTime(value) => {
                    if block_time.replace(value).is_some() {
                        return Err(DirectiveError::Duplicate("block-time".to_string()));
                    }
                }
                _ => return Err(DirectiveError::Misplaced(name.to_string())),
            },
        }
        Ok(())
    }
}

/// Split a test file into account declarations, entries and checks.
pub fn split_input(text: &str) -> Result<TestFile, ParseError> {
    let mut file = TestFile::default();
    let mut block = Block::transaction(1, true);
    // Accounts are only accepted until the first code line or separator
    let mut accounts_open = true;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();

        if let Some(rest) = trimmed.strip_prefix("//!") {
            let directive = parse_directive(rest).map_err(|e| e.at(line))?;
            match directive {
                Directive::Account(definition) => {
                    if !accounts_open {
                        return Err(DirectiveError::Misplaced("account".to_string()).at(line));
                    }
                    file.global.push(definition);
                }
                Directive::NewTransaction => {
                    accounts_open = false;
                    std::mem::replace(&mut block, Block::transaction(line, false))
                        .finish(&mut file.entries)?;
                }
                Directive::BlockPrologue => {
                    accounts_open = false;
                    let next = Block::Prologue {
                        proposer: None,
                        block_time: None,
                        line,
                    };
                    std::mem::replace(&mut block, next).finish(&mut file.entries)?;
                }
                other => block.apply(other).map_err(|e| e.at(line))?,
            }
            continue;
        }

        if let Some(check) = parse_check(trimmed) {
            let directive = check.map_err(|e| e.at(line))?;
            file.checks.push(CheckLine { line, directive });
            continue;
        }

        if trimmed.starts_with("//") || trimmed.is_empty() {
            continue;
        }

        accounts_open = false;
        match &mut block {
            Block::Transaction { body, has_code, .. } => {
                *has_code = true;
                body.push_str(raw);
                body.push('\n');
            }
            Block::Prologue { .. } => return Err(DirectiveError::PrologueBody.at(line)),
        }
    }

    block.finish(&mut file.entries)?;
    Ok(file)
}

/// Read and split a test file.
pub fn parse_test_file(path: &Path) -> Result<TestFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read test file: {}", path.display()))?;
    split_input(&content).with_context(|| format!("Failed to parse test file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_account_directive() {
        assert_eq!(
            parse_account_directive("vivian, 1000000, 0, validator").unwrap(),
            AccountDefinition {
                name: "vivian".to_string(),
                balance: Some(1_000_000),
                sequence_number: 0,
                role: Role::Validator,
            }
        );
        let alice = parse_account_directive("alice").unwrap();
        assert_eq!(alice.balance, None);
        assert_eq!(alice.role, Role::Normal);
        assert_eq!(
            parse_account_directive("bob, 1_000, 5").unwrap().balance,
            Some(1_000)
        );
    }

    #[test]
    fn test_parse_account_directive_errors() {
        assert!(matches!(
            parse_account_directive(""),
            Err(DirectiveError::InvalidAccount(_))
        ));
        assert!(matches!(
            parse_account_directive("a, ten"),
            Err(DirectiveError::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_account_directive("a, 1, 0, Validator"),
            Err(DirectiveError::InvalidAccount(_))
        ));
        assert!(matches!(
            parse_account_directive("a, 1, 0, validator, extra"),
            Err(DirectiveError::InvalidAccount(_))
        ));
    }

    #[test]
    fn test_parse_directive() {
        assert_eq!(
            parse_directive(" expiration-time: 86500").unwrap(),
            Directive::ExpirationTime(86_500)
        );
        assert_eq!(
            parse_directive("new-transaction").unwrap(),
            Directive::NewTransaction
        );
        assert_eq!(
            parse_directive("sender: association").unwrap(),
            Directive::Sender("association".to_string())
        );
        assert_eq!(
            parse_directive("args: 1, {{bob}}, true, h\"0a\", 0x1").unwrap(),
            Directive::Args(vec![
                Argument::U64(1),
                Argument::Placeholder("bob".to_string()),
                Argument::Bool(true),
                Argument::ByteArray(vec![0x0a]),
                Argument::Address(AccountAddress::from_hex_literal("0x1").unwrap()),
            ])
        );
        assert_eq!(parse_directive("args:").unwrap(), Directive::Args(vec![]));
        assert!(matches!(
            parse_directive("expiration-time"),
            Err(DirectiveError::Malformed(_))
        ));
        assert!(matches!(
            parse_directive("no-run: yes"),
            Err(DirectiveError::Malformed(_))
        ));
        assert!(matches!(
            parse_directive("gas: 1"),
            Err(DirectiveError::UnknownDirective(_))
        ));
        assert!(matches!(
            parse_directive("args: h\"zz\""),
            Err(DirectiveError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_split_input_expiration_layout() {
        let text = r#"
//! account: vivian, 1000000, 0, validator

//! sender: association
import 0x0.LibraSystem;
main() {
    LibraSystem.block_prologue(100000000, h"aa", h"bb", {{vivian}});
    return;
}
// check: EXECUTED

//! new-transaction
//! expiration-time: 100
main() {
    return;
}
// check: TRANSACTION_EXPIRED
"#;
        let file = split_input(text).unwrap();
        assert_eq!(file.global.len(), 1);
        assert_eq!(file.entries.len(), 2);
        assert_eq!(file.checks.len(), 2);

        let Entry::Transaction(first) = &file.entries[0] else {
            panic!("expected a transaction");
        };
        assert_eq!(first.config.sender.as_deref(), Some("association"));
        assert!(first.body.contains("block_prologue"));

        let Entry::Transaction(second) = &file.entries[1] else {
            panic!("expected a transaction");
        };
        assert_eq!(second.config.expiration_time, Some(100));
        assert_eq!(second.line, 12);
        assert_eq!(
            file.checks[1],
            CheckLine {
                line: 17,
                directive: CheckDirective::Check("TRANSACTION_EXPIRED".to_string()),
            }
        );
    }

    #[test]
    fn test_block_prologue_entry() {
        let text = "//! account: vivian, 0, 0, validator\n//! block-prologue\n//! proposer: vivian\n//! block-time: 5\n//! new-transaction\nmain() { return; }\n";
        let file = split_input(text).unwrap();
        assert_eq!(
            file.entries[0],
            Entry::BlockPrologue(BlockPrologueBlock {
                proposer: Some("vivian".to_string()),
                block_time: 5,
                line: 2,
            })
        );
        assert!(matches!(file.entries[1], Entry::Transaction(_)));
    }

    #[test]
    fn test_block_prologue_errors() {
        let missing_time = "//! block-prologue\n//! proposer: vivian\n";
        assert_eq!(
            split_input(missing_time).unwrap_err(),
            DirectiveError::MissingBlockTime.at(1)
        );

        let with_body = "//! block-prologue\n//! block-time: 1\nmain() { return; }\n";
        assert_eq!(
            split_input(with_body).unwrap_err(),
            DirectiveError::PrologueBody.at(3)
        );

        let wrong_directive = "//! block-prologue\n//! max-gas: 1\n";
        assert_eq!(
            split_input(wrong_directive).unwrap_err().error,
            DirectiveError::Misplaced("max-gas".to_string())
        );
    }

    #[test]
    fn test_directive_placement_errors() {
        let after_code = "main() {\n//! max-gas: 10\nreturn; }\n";
        assert_eq!(
            split_input(after_code).unwrap_err(),
            DirectiveError::AfterCode("max-gas".to_string()).at(2)
        );

        let duplicate = "//! max-gas: 10\n//! max-gas: 20\nmain() { return; }\n";
        assert_eq!(
            split_input(duplicate).unwrap_err().error,
            DirectiveError::Duplicate("max-gas".to_string())
        );

        let late_account = "main() { return; }\n//! new-transaction\n//! account: bob\nmain() { return; }\n";
        assert_eq!(
            split_input(late_account).unwrap_err(),
            DirectiveError::Misplaced("account".to_string()).at(3)
        );

        let empty = "main() { return; }\n//! new-transaction\n//! max-gas: 5\n";
        assert_eq!(
            split_input(empty).unwrap_err(),
            DirectiveError::EmptyTransaction.at(2)
        );
    }

    #[test]
    fn test_empty_leading_block_with_directives_is_error() {
        let text = "//! sender: alice\n//! new-transaction\nmain() { return; }\n";
        assert_eq!(
            split_input(text).unwrap_err(),
            DirectiveError::EmptyTransaction.at(1)
        );
    }

    #[test]
    fn test_empty_check_pattern() {
        assert!(matches!(
            split_input("main() { return; }\n// check:\n").unwrap_err().error,
            DirectiveError::Malformed(_)
        ));
    }

    #[test]
    fn test_comments_are_not_code() {
        let text = "// leading comment\n//! account: bob\nmain() { return; }\n// not: ABORTED\n";
        let file = split_input(text).unwrap();
        assert_eq!(file.global.len(), 1);
        assert_eq!(file.checks[0].directive, CheckDirective::Not("ABORTED".to_string()));
    }
}

//! Global configuration: named accounts and the genesis ledger.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::HarnessConfig;
use crate::script::{Script, Value};
use crate::tier1_component::{
    AccountAddress, AccountResource, Role, SignedTransaction, TestLedger, TestLedgerBuilder,
    MAX_EXPIRATION_SECS,
};

use super::types::{AccountDefinition, TransactionConfig};

/// Implicit sender of transactions without `//! sender:`
pub const DEFAULT_ACCOUNT_NAME: &str = "default";

/// Name of the privileged account
pub const ASSOCIATION_ACCOUNT_NAME: &str = "association";

/// Errors resolving account names.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Account declared twice
    #[error("account '{0}' is declared more than once")]
    DuplicateAccount(String),
    /// Name used but never declared
    #[error("unknown account '{0}'")]
    UnknownAccount(String),
}

/// A named account with its resolved address and genesis state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    /// Name from the test file
    pub name: String,
    /// Ledger address
    pub address: AccountAddress,
    /// Genesis balance
    pub balance: u64,
    /// Genesis sequence number
    pub sequence_number: u64,
    /// Normal or validator
    pub role: Role,
}

impl AccountData {
    fn from_definition(definition: &AccountDefinition, default_balance: u64) -> Self {
        let address = if definition.name == ASSOCIATION_ACCOUNT_NAME {
            AccountAddress::association()
        } else {
            AccountAddress::from_name(&definition.name)
        };
        Self {
            name: definition.name.clone(),
            address,
            balance: definition.balance.unwrap_or(default_balance),
            sequence_number: definition.sequence_number,
            role: definition.role,
        }
    }
}

/// All named accounts of a test file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    accounts: BTreeMap<String, AccountData>,
}

impl GlobalConfig {
    /// Build from `//! account:` declarations, adding `default` and
    /// `association` unless they are declared.
    pub fn build(
        definitions: &[AccountDefinition],
        config: &HarnessConfig,
    ) -> Result<Self, ConfigError> {
        let mut accounts = BTreeMap::new();

        for definition in definitions {
            let data = AccountData::from_definition(definition, config.default_account_balance);
            if accounts.insert(definition.name.clone(), data).is_some() {
                return Err(ConfigError::DuplicateAccount(definition.name.clone()));
            }
        }

        for name in [DEFAULT_ACCOUNT_NAME, ASSOCIATION_ACCOUNT_NAME] {
            accounts.entry(name.to_string()).or_insert_with(|| {
                let definition = AccountDefinition {
                    name: name.to_string(),
                    balance: None,
                    sequence_number: 0,
                    role: Role::Normal,
                };
                AccountData::from_definition(&definition, config.default_account_balance)
            });
        }

        Ok(Self { accounts })
    }

    /// Look up an account by name.
    pub fn account(&self, name: &str) -> Result<&AccountData, ConfigError> {
        self.accounts
            .get(name)
            .ok_or_else(|| ConfigError::UnknownAccount(name.to_string()))
    }

    /// Address of a named account.
    pub fn address(&self, name: &str) -> Result<AccountAddress, ConfigError> {
        self.account(name).map(|account| account.address)
    }

    /// Accounts in name order.
    pub fn accounts(&self) -> impl Iterator<Item = &AccountData> {
        self.accounts.values()
    }

    /// Name to address map for `{{name}}` substitution.
    pub fn addresses(&self) -> BTreeMap<String, AccountAddress> {
        self.accounts
            .iter()
            .map(|(name, account)| (name.clone(), account.address))
            .collect()
    }

    /// Addresses of validator accounts, in address order.
    pub fn validator_set(&self) -> Vec<AccountAddress> {
        let mut validators: Vec<AccountAddress> = self
            .accounts
            .values()
            .filter(|account| account.role == Role::Validator)
            .map(|account| account.address)
            .collect();
        validators.sort();
        validators
    }

    /// Genesis ledger holding every account.
    pub fn build_ledger(&self, config: &HarnessConfig) -> TestLedger {
        self.accounts
            .values()
            .fold(
                TestLedgerBuilder::new().with_genesis_timestamp(config.genesis_timestamp_usecs),
                |builder, account| {
                    builder.with_resource(
                        account.address,
                        AccountResource {
                            balance: account.balance,
                            sequence_number: account.sequence_number,
                            role: account.role,
                        },
                    )
                },
            )
            .build()
    }
}

impl TransactionConfig {
    /// Sender name, `default` when unset.
    pub fn sender_name(&self) -> &str {
        self.sender.as_deref().unwrap_or(DEFAULT_ACCOUNT_NAME)
    }

    /// Fill in defaults and produce a transaction for `script`.
    ///
    /// `current_sequence_number` is the sender's sequence number on the
    /// ledger and is used unless `//! sequence-number:` overrides it.
    pub fn resolve(
        &self,
        global: &GlobalConfig,
        config: &HarnessConfig,
        script: Script,
        current_sequence_number: u64,
    ) -> Result<SignedTransaction, ConfigError> {
        let sender = global.address(self.sender_name())?;
        let sequence_number = self.sequence_number.unwrap_or(current_sequence_number);
        let args = self
            .args
            .iter()
            .map(|arg| arg.to_value(|name| global.address(name)))
            .collect::<Result<Vec<Value>, ConfigError>>()?;

        Ok(SignedTransaction {
            sender,
            sequence_number,
            max_gas_amount: self.max_gas.unwrap_or(config.default_max_gas),
            gas_unit_price: self.gas_price.unwrap_or(config.gas_unit_price),
            expiration_time_secs: self.expiration_time.unwrap_or(MAX_EXPIRATION_SECS),
            script,
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::parser::parse_account_directive;
    use crate::fixtures::types::Argument;
    use crate::script::compile;

    fn definitions(lines: &[&str]) -> Vec<AccountDefinition> {
        lines
            .iter()
            .map(|line| parse_account_directive(line).unwrap())
            .collect()
    }

    #[test]
    fn test_builtin_accounts() {
        let global = GlobalConfig::build(&[], &HarnessConfig::default()).unwrap();
        let names: Vec<&str> = global.accounts().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["association", "default"]);
        assert_eq!(
            global.address("association").unwrap(),
            AccountAddress::association()
        );
        assert_eq!(global.account("default").unwrap().balance, 1_000_000);
    }

    #[test]
    fn test_declared_accounts() {
        let global = GlobalConfig::build(
            &definitions(&["vivian, 10, 2, validator", "alice"]),
            &HarnessConfig::default(),
        )
        .unwrap();
        let vivian = global.account("vivian").unwrap();
        assert_eq!(vivian.address, AccountAddress::from_name("vivian"));
        assert_eq!(vivian.balance, 10);
        assert_eq!(vivian.sequence_number, 2);
        assert_eq!(global.validator_set(), vec![vivian.address]);

        let ledger = global.build_ledger(&HarnessConfig::default());
        assert_eq!(ledger.balance(&vivian.address), Some(10));
        assert_eq!(ledger.validator_set(), vec![vivian.address]);
    }

    #[test]
    fn test_configured_default_balance() {
        let config = HarnessConfig {
            default_account_balance: 77,
            ..HarnessConfig::default()
        };
        let global = GlobalConfig::build(&definitions(&["alice"]), &config).unwrap();
        assert_eq!(global.account("alice").unwrap().balance, 77);
    }

    #[test]
    fn test_redefined_association_keeps_address() {
        let global = GlobalConfig::build(
            &definitions(&["association, 5"]),
            &HarnessConfig::default(),
        )
        .unwrap();
        let association = global.account("association").unwrap();
        assert_eq!(association.address, AccountAddress::association());
        assert_eq!(association.balance, 5);
    }

    #[test]
    fn test_duplicate_account() {
        assert_eq!(
            GlobalConfig::build(&definitions(&["bob", "bob, 3"]), &HarnessConfig::default()),
            Err(ConfigError::DuplicateAccount("bob".to_string()))
        );
    }

    #[test]
    fn test_resolve_defaults() {
        let config = HarnessConfig::default();
        let global = GlobalConfig::build(&definitions(&["alice, 10, 4"]), &config).unwrap();
        let script = compile("main() { return; }", &global.addresses()).unwrap();

        let txn = TransactionConfig::default()
            .resolve(&global, &config, script.clone(), 0)
            .unwrap();
        assert_eq!(txn.sender, global.address("default").unwrap());
        assert_eq!(txn.sequence_number, 0);
        assert_eq!(txn.max_gas_amount, config.default_max_gas);
        assert_eq!(txn.gas_unit_price, 0);
        assert_eq!(txn.expiration_time_secs, MAX_EXPIRATION_SECS);

        let custom = TransactionConfig {
            sender: Some("alice".to_string()),
            args: vec![Argument::Placeholder("alice".to_string())],
            expiration_time: Some(100),
            ..TransactionConfig::default()
        };
        assert_eq!(custom.sender_name(), "alice");
        let txn = custom.resolve(&global, &config, script.clone(), 4).unwrap();
        assert_eq!(txn.sequence_number, 4);
        assert_eq!(txn.expiration_time_secs, 100);
        assert_eq!(
            txn.args,
            vec![Value::Address(AccountAddress::from_name("alice"))]
        );

        let unknown = TransactionConfig {
            sender: Some("mallory".to_string()),
            ..TransactionConfig::default()
        };
        assert_eq!(
            unknown.resolve(&global, &config, script, 0),
            Err(ConfigError::UnknownAccount("mallory".to_string()))
        );
    }
}

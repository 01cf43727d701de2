//! Native modules callable from scripts.
//!
//! | Module           | Function          | Signature                                   |
//! |------------------|-------------------|---------------------------------------------|
//! | `LibraSystem`    | `block_prologue`  | `(u64, bytearray, bytearray, address)`      |
//! | `LibraTimestamp` | `now_microseconds`| `(): u64`                                   |
//! | `LibraAccount`   | `balance`         | `(address): u64`                            |
//! | `LibraAccount`   | `sequence_number` | `(address): u64`                            |
//! | `LibraAccount`   | `exists`          | `(address): bool`                           |
//! | `LibraAccount`   | `pay_from_sender` | `(address, u64)`                            |

use log::debug;

use crate::tier1_component::{
    AccountAddress, BlockMetadata, HashValue, WriteSetView, ENOT_ASSOCIATION,
};

use super::ast::Type;
use super::interpreter::{ExecutionError, TransactionContext, Value};

/// Abort code: payer balance below the payment amount
pub const EINSUFFICIENT_BALANCE: u64 = 10;

/// Gas charged for any native call on top of argument evaluation
pub const NATIVE_CALL_COST: u64 = 10;

/// Modules published at `0x0`
pub const MODULES: &[&str] = &["LibraSystem", "LibraTimestamp", "LibraAccount"];

/// Parameter types of a native, or `None` if it does not exist.
pub fn signature(module: &str, function: &str) -> Option<&'static [Type]> {
    let params: &'static [Type] = match (module, function) {
        ("LibraSystem", "block_prologue") => {
            &[Type::U64, Type::ByteArray, Type::ByteArray, Type::Address]
        }
        ("LibraTimestamp", "now_microseconds") => &[],
        ("LibraAccount", "balance") => &[Type::Address],
        ("LibraAccount", "sequence_number") => &[Type::Address],
        ("LibraAccount", "exists") => &[Type::Address],
        ("LibraAccount", "pay_from_sender") => &[Type::Address, Type::U64],
        _ => return None,
    };
    Some(params)
}

/// Invoke a native. Returns `None` for natives without a return value.
pub fn call_native(
    module: &str,
    function: &str,
    args: Vec<Value>,
    ctx: &TransactionContext,
    view: &mut WriteSetView<'_>,
) -> Result<Option<Value>, ExecutionError> {
    let params = signature(module, function).ok_or_else(|| {
        ExecutionError::MissingData(format!("native {}.{}", module, function))
    })?;
    check_args(module, function, params, &args)?;

    match (module, function) {
        ("LibraSystem", "block_prologue") => {
            block_prologue(args, ctx, view)?;
            Ok(None)
        }
        ("LibraTimestamp", "now_microseconds") => {
            Ok(Some(Value::U64(view.block_info().timestamp_usecs)))
        }
        ("LibraAccount", "balance") => {
            let address = args[0].as_address()?;
            let account = view
                .account(&address)
                .ok_or_else(|| ExecutionError::MissingData(format!("account {}", address)))?;
            Ok(Some(Value::U64(account.balance)))
        }
        ("LibraAccount", "sequence_number") => {
            let address = args[0].as_address()?;
            let account = view
                .account(&address)
                .ok_or_else(|| ExecutionError::MissingData(format!("account {}", address)))?;
            Ok(Some(Value::U64(account.sequence_number)))
        }
        ("LibraAccount", "exists") => {
            let address = args[0].as_address()?;
            Ok(Some(Value::Bool(view.account(&address).is_some())))
        }
        ("LibraAccount", "pay_from_sender") => {
            let payee = args[0].as_address()?;
            let amount = args[1].as_u64()?;
            pay_from_sender(ctx.sender, payee, amount, view)?;
            Ok(None)
        }
        _ => Err(ExecutionError::MissingData(format!(
            "native {}.{}",
            module, function
        ))),
    }
}

fn check_args(
    module: &str,
    function: &str,
    params: &[Type],
    args: &[Value],
) -> Result<(), ExecutionError> {
    if params.len() != args.len() {
        return Err(ExecutionError::TypeMismatch(format!(
            "{}.{} expects {} arguments, got {}",
            module,
            function,
            params.len(),
            args.len()
        )));
    }
    for (index, (param, arg)) in params.iter().zip(args).enumerate() {
        if arg.ty() != *param {
            return Err(ExecutionError::TypeMismatch(format!(
                "{}.{} argument {} expects {}, got {}",
                module,
                function,
                index,
                param,
                arg.ty()
            )));
        }
    }
    Ok(())
}

fn block_prologue(
    args: Vec<Value>,
    ctx: &TransactionContext,
    view: &mut WriteSetView<'_>,
) -> Result<(), ExecutionError> {
    if ctx.sender != AccountAddress::association() {
        return Err(ExecutionError::Aborted(ENOT_ASSOCIATION));
    }

    let mut args = args.into_iter();
    let (Some(timestamp), Some(id), Some(votes), Some(proposer)) =
        (args.next(), args.next(), args.next(), args.next())
    else {
        return Err(ExecutionError::TypeMismatch(
            "block_prologue expects 4 arguments".to_string(),
        ));
    };

    let metadata = BlockMetadata {
        timestamp_usecs: timestamp.as_u64()?,
        id: HashValue::sha3_256_of(&id.into_bytes()?),
        previous_block_votes: votes.into_bytes()?,
        proposer: proposer.as_address()?,
    };

    debug!(
        "block_prologue: timestamp={} proposer={}",
        metadata.timestamp_usecs,
        metadata.proposer.short_str()
    );
    view.apply_block_prologue(&metadata)
        .map_err(ExecutionError::Aborted)
}

fn pay_from_sender(
    sender: AccountAddress,
    payee: AccountAddress,
    amount: u64,
    view: &mut WriteSetView<'_>,
) -> Result<(), ExecutionError> {
    let payer = view
        .account_mut(&sender)
        .ok_or_else(|| ExecutionError::MissingData(format!("account {}", sender)))?;
    if payer.balance < amount {
        return Err(ExecutionError::Aborted(EINSUFFICIENT_BALANCE));
    }
    payer.balance -= amount;

    let payee_account = view.get_or_create_account(&payee);
    payee_account.balance = payee_account
        .balance
        .checked_add(amount)
        .ok_or(ExecutionError::Arithmetic)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier1_component::{AccountResource, LedgerState, Role};
    use std::collections::BTreeMap;

    fn ctx(sender: AccountAddress) -> TransactionContext {
        TransactionContext {
            sender,
            sequence_number: 0,
            max_gas_units: 1_000,
            gas_unit_price: 0,
        }
    }

    fn state() -> LedgerState {
        let mut accounts = BTreeMap::new();
        accounts.insert(AccountAddress::from_name("alice"), AccountResource::new(100));
        accounts.insert(AccountAddress::association(), AccountResource::new(0));
        accounts.insert(
            AccountAddress::from_name("vivian"),
            AccountResource {
                balance: 0,
                sequence_number: 0,
                role: Role::Validator,
            },
        );
        LedgerState::new(accounts, 0)
    }

    #[test]
    fn test_signatures() {
        assert_eq!(signature("LibraAccount", "balance"), Some(&[Type::Address][..]));
        assert!(signature("LibraAccount", "steal").is_none());
    }

    #[test]
    fn test_pay_from_sender_moves_funds() {
        let state = state();
        let alice = AccountAddress::from_name("alice");
        let bob = AccountAddress::from_name("bob");
        let mut view = WriteSetView::new(&state);

        call_native(
            "LibraAccount",
            "pay_from_sender",
            vec![Value::Address(bob), Value::U64(40)],
            &ctx(alice),
            &mut view,
        )
        .unwrap();

        assert_eq!(view.account(&alice).unwrap().balance, 60);
        assert_eq!(view.account(&bob).unwrap().balance, 40);
    }

    #[test]
    fn test_pay_from_sender_insufficient_balance() {
        let state = state();
        let alice = AccountAddress::from_name("alice");
        let mut view = WriteSetView::new(&state);
        let result = call_native(
            "LibraAccount",
            "pay_from_sender",
            vec![Value::Address(AccountAddress::from_name("bob")), Value::U64(101)],
            &ctx(alice),
            &mut view,
        );
        assert_eq!(result, Err(ExecutionError::Aborted(EINSUFFICIENT_BALANCE)));
    }

    #[test]
    fn test_block_prologue_requires_association() {
        let state = state();
        let mut view = WriteSetView::new(&state);
        let args = vec![
            Value::U64(100),
            Value::ByteArray(vec![0xaa]),
            Value::ByteArray(vec![0xbb]),
            Value::Address(AccountAddress::from_name("vivian")),
        ];

        let result = call_native(
            "LibraSystem",
            "block_prologue",
            args.clone(),
            &ctx(AccountAddress::from_name("alice")),
            &mut view,
        );
        assert_eq!(result, Err(ExecutionError::Aborted(ENOT_ASSOCIATION)));

        call_native(
            "LibraSystem",
            "block_prologue",
            args,
            &ctx(AccountAddress::association()),
            &mut view,
        )
        .unwrap();
        assert_eq!(view.block_info().timestamp_usecs, 100);
    }

    #[test]
    fn test_argument_type_checked() {
        let state = state();
        let mut view = WriteSetView::new(&state);
        let result = call_native(
            "LibraAccount",
            "balance",
            vec![Value::U64(1)],
            &ctx(AccountAddress::from_name("alice")),
            &mut view,
        );
        assert!(matches!(result, Err(ExecutionError::TypeMismatch(_))));
    }

    #[test]
    fn test_balance_of_missing_account() {
        let state = state();
        let mut view = WriteSetView::new(&state);
        let result = call_native(
            "LibraAccount",
            "balance",
            vec![Value::Address(AccountAddress::from_name("nobody"))],
            &ctx(AccountAddress::from_name("alice")),
            &mut view,
        );
        assert!(matches!(result, Err(ExecutionError::MissingData(_))));
    }
}

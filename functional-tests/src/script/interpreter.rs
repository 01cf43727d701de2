//! Script interpreter with gas metering.
//!
//! Each statement and each expression node costs one gas unit; native calls
//! cost [`NATIVE_CALL_COST`] more. All ledger access goes through the
//! transaction's [`WriteSetView`], so a failed script leaves no trace.

use std::collections::HashMap;

use thiserror::Error;

use crate::status::{StatusCode, VMStatus};
use crate::tier1_component::{AccountAddress, WriteSetView};

use super::ast::{BinOp, Builtin, Expr, Script, Stmt, Type, UnaryOp};
use super::natives::{call_native, NATIVE_CALL_COST};

/// Gas per executed statement
pub const STATEMENT_COST: u64 = 1;

/// Gas per evaluated expression node
pub const EXPRESSION_COST: u64 = 1;

/// Runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// u64
    U64(u64),
    /// bool
    Bool(bool),
    /// address
    Address(AccountAddress),
    /// bytearray
    ByteArray(Vec<u8>),
}

impl Value {
    /// Type of the value.
    pub fn ty(&self) -> Type {
        match self {
            Value::U64(_) => Type::U64,
            Value::Bool(_) => Type::Bool,
            Value::Address(_) => Type::Address,
            Value::ByteArray(_) => Type::ByteArray,
        }
    }

    /// Integer payload.
    pub fn as_u64(&self) -> Result<u64, ExecutionError> {
        match self {
            Value::U64(value) => Ok(*value),
            other => Err(type_mismatch(Type::U64, other)),
        }
    }

    /// Boolean payload.
    pub fn as_bool(&self) -> Result<bool, ExecutionError> {
        match self {
            Value::Bool(value) => Ok(*value),
            other => Err(type_mismatch(Type::Bool, other)),
        }
    }

    /// Address payload.
    pub fn as_address(&self) -> Result<AccountAddress, ExecutionError> {
        match self {
            Value::Address(value) => Ok(*value),
            other => Err(type_mismatch(Type::Address, other)),
        }
    }

    /// Byte array payload.
    pub fn into_bytes(self) -> Result<Vec<u8>, ExecutionError> {
        match self {
            Value::ByteArray(bytes) => Ok(bytes),
            other => Err(type_mismatch(Type::ByteArray, &other)),
        }
    }
}

fn type_mismatch(expected: Type, found: &Value) -> ExecutionError {
    ExecutionError::TypeMismatch(format!("expected {}, got {}", expected, found.ty()))
}

/// Runtime failure of a script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// `abort`, failed `assert`, or native abort
    #[error("aborted with code {0}")]
    Aborted(u64),
    /// Gas budget exhausted
    #[error("out of gas")]
    OutOfGas,
    /// Overflow, underflow or division by zero
    #[error("arithmetic error")]
    Arithmetic,
    /// Read of missing data
    #[error("missing data: {0}")]
    MissingData(String),
    /// Wrong type
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

impl ExecutionError {
    /// Status reported for this failure.
    pub fn vm_status(&self) -> VMStatus {
        match self {
            ExecutionError::Aborted(code) => VMStatus::aborted(*code),
            ExecutionError::OutOfGas => StatusCode::OutOfGas.into(),
            ExecutionError::Arithmetic => StatusCode::ArithmeticError.into(),
            ExecutionError::MissingData(_) => StatusCode::MissingData.into(),
            ExecutionError::TypeMismatch(_) => StatusCode::TypeMismatch.into(),
        }
    }
}

/// Transaction fields visible to the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionContext {
    /// Sender address
    pub sender: AccountAddress,
    /// Sequence number of the transaction
    pub sequence_number: u64,
    /// Gas budget
    pub max_gas_units: u64,
    /// Price per gas unit
    pub gas_unit_price: u64,
}

/// Tracks gas consumption against a budget.
#[derive(Debug, Clone)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    /// Meter with the given budget.
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Consume gas, failing once the budget is exceeded.
    pub fn charge(&mut self, units: u64) -> Result<(), ExecutionError> {
        let used = self.used.saturating_add(units);
        if used > self.limit {
            self.used = self.limit;
            return Err(ExecutionError::OutOfGas);
        }
        self.used = used;
        Ok(())
    }

    /// Gas consumed so far.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Gas left.
    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }
}

struct Local {
    ty: Type,
    value: Option<Value>,
}

enum Flow {
    Next,
    Return,
}

/// Run `script` with bound arguments.
pub fn execute_script(
    script: &Script,
    args: Vec<Value>,
    ctx: &TransactionContext,
    view: &mut WriteSetView<'_>,
    gas: &mut GasMeter,
) -> Result<(), ExecutionError> {
    if args.len() != script.params.len() {
        return Err(ExecutionError::TypeMismatch(format!(
            "main expects {} arguments, got {}",
            script.params.len(),
            args.len()
        )));
    }

    let mut locals = HashMap::new();
    for ((name, ty), arg) in script.params.iter().zip(args) {
        if arg.ty() != *ty {
            return Err(ExecutionError::TypeMismatch(format!(
                "argument '{}' expects {}, got {}",
                name,
                ty,
                arg.ty()
            )));
        }
        locals.insert(
            name.clone(),
            Local {
                ty: *ty,
                value: Some(arg),
            },
        );
    }

    let mut interpreter = Interpreter {
        ctx,
        view,
        gas,
        locals,
    };
    interpreter.block(&script.body)?;
    Ok(())
}

struct Interpreter<'s, 'v, 'a> {
    ctx: &'s TransactionContext,
    view: &'v mut WriteSetView<'a>,
    gas: &'s mut GasMeter,
    locals: HashMap<String, Local>,
}

impl Interpreter<'_, '_, '_> {
    fn block(&mut self, stmts: &[Stmt]) -> Result<Flow, ExecutionError> {
        for stmt in stmts {
            if let Flow::Return = self.stmt(stmt)? {
                return Ok(Flow::Return);
            }
        }
        Ok(Flow::Next)
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<Flow, ExecutionError> {
        self.gas.charge(STATEMENT_COST)?;

        match stmt {
            Stmt::Let(name, ty) => {
                self.locals.insert(
                    name.clone(),
                    Local {
                        ty: *ty,
                        value: None,
                    },
                );
            }
            Stmt::Assign(name, expr) => {
                let value = self.value(expr)?;
                let local = self
                    .locals
                    .get_mut(name)
                    .ok_or_else(|| ExecutionError::MissingData(format!("local '{}'", name)))?;
                if value.ty() != local.ty {
                    return Err(type_mismatch(local.ty, &value));
                }
                local.value = Some(value);
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::Return => return Ok(Flow::Return),
            Stmt::Abort(code) => {
                let code = self.value(code)?.as_u64()?;
                return Err(ExecutionError::Aborted(code));
            }
            Stmt::Assert(cond, code) => {
                if !self.value(cond)?.as_bool()? {
                    let code = self.value(code)?.as_u64()?;
                    return Err(ExecutionError::Aborted(code));
                }
            }
            Stmt::If(cond, then_block, else_block) => {
                let branch = if self.value(cond)?.as_bool()? {
                    then_block
                } else {
                    else_block
                };
                return self.block(branch);
            }
            Stmt::While(cond, body) => {
                while self.value(cond)?.as_bool()? {
                    if let Flow::Return = self.block(body)? {
                        return Ok(Flow::Return);
                    }
                    self.gas.charge(STATEMENT_COST)?;
                }
            }
        }
        Ok(Flow::Next)
    }

    fn value(&mut self, expr: &Expr) -> Result<Value, ExecutionError> {
        self.eval(expr)?.ok_or_else(|| {
            ExecutionError::TypeMismatch("expression has no value".to_string())
        })
    }

    fn eval(&mut self, expr: &Expr) -> Result<Option<Value>, ExecutionError> {
        self.gas.charge(EXPRESSION_COST)?;

        let value = match expr {
            Expr::U64(value) => Value::U64(*value),
            Expr::Bool(value) => Value::Bool(*value),
            Expr::Address(address) => Value::Address(*address),
            Expr::ByteArray(bytes) => Value::ByteArray(bytes.clone()),
            Expr::Copy(name) => self
                .local(name)?
                .value
                .clone()
                .ok_or_else(|| ExecutionError::MissingData(format!("local '{}' is unset", name)))?,
            Expr::Move(name) => self
                .local(name)?
                .value
                .take()
                .ok_or_else(|| ExecutionError::MissingData(format!("local '{}' is unset", name)))?,
            Expr::Builtin(builtin) => self.builtin(*builtin),
            Expr::Call {
                module,
                function,
                args,
            } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.value(arg)?);
                }
                self.gas.charge(NATIVE_CALL_COST)?;
                return call_native(module, function, values, self.ctx, self.view);
            }
            Expr::Unary(UnaryOp::Not, operand) => Value::Bool(!self.value(operand)?.as_bool()?),
            Expr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs)?,
        };
        Ok(Some(value))
    }

    fn local(&mut self, name: &str) -> Result<&mut Local, ExecutionError> {
        self.locals
            .get_mut(name)
            .ok_or_else(|| ExecutionError::MissingData(format!("local '{}'", name)))
    }

    fn builtin(&self, builtin: Builtin) -> Value {
        match builtin {
            Builtin::TxnSender => Value::Address(self.ctx.sender),
            Builtin::TxnSequenceNumber => Value::U64(self.ctx.sequence_number),
            Builtin::TxnMaxGasUnits => Value::U64(self.ctx.max_gas_units),
            Builtin::TxnGasUnitPrice => Value::U64(self.ctx.gas_unit_price),
            Builtin::GasRemaining => Value::U64(self.gas.remaining()),
        }
    }

    fn binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<Value, ExecutionError> {
        // Short-circuit before evaluating the right operand
        match op {
            BinOp::And => {
                if !self.value(lhs)?.as_bool()? {
                    return Ok(Value::Bool(false));
                }
                return Ok(Value::Bool(self.value(rhs)?.as_bool()?));
            }
            BinOp::Or => {
                if self.value(lhs)?.as_bool()? {
                    return Ok(Value::Bool(true));
                }
                return Ok(Value::Bool(self.value(rhs)?.as_bool()?));
            }
            _ => {}
        }

        let left = self.value(lhs)?;
        let right = self.value(rhs)?;

        match op {
            BinOp::Eq | BinOp::Neq => {
                if left.ty() != right.ty() {
                    return Err(type_mismatch(left.ty(), &right));
                }
                let equal = left == right;
                Ok(Value::Bool(if op == BinOp::Eq { equal } else { !equal }))
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let (a, b) = (left.as_u64()?, right.as_u64()?);
                let result = match op {
                    BinOp::Lt => a < b,
                    BinOp::Le => a <= b,
                    BinOp::Gt => a > b,
                    _ => a >= b,
                };
                Ok(Value::Bool(result))
            }
            _ => {
                let (a, b) = (left.as_u64()?, right.as_u64()?);
                let result = match op {
                    BinOp::Add => a.checked_add(b),
                    BinOp::Sub => a.checked_sub(b),
                    BinOp::Mul => a.checked_mul(b),
                    BinOp::Div => a.checked_div(b),
                    _ => a.checked_rem(b),
                };
                result.map(Value::U64).ok_or(ExecutionError::Arithmetic)
            }
        }
    }
}

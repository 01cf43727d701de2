//! Syntax tree of transaction scripts.

use std::fmt;

use crate::tier1_component::AccountAddress;

/// Value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    /// Unsigned 64-bit integer
    U64,
    /// Boolean
    Bool,
    /// Account address
    Address,
    /// Byte array
    ByteArray,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::U64 => "u64",
            Type::Bool => "bool",
            Type::Address => "address",
            Type::ByteArray => "bytearray",
        };
        f.write_str(name)
    }
}

/// `import <address>.<Module>;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Publishing address of the module
    pub address: AccountAddress,
    /// Module name
    pub module: String,
}

/// A compiled-enough script: imports plus `main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Imported modules
    pub imports: Vec<Import>,
    /// Parameters of `main`, bound from `//! args:`
    pub params: Vec<(String, Type)>,
    /// Body of `main`
    pub body: Vec<Stmt>,
}

/// Statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `let x: T;`
    Let(String, Type),
    /// `x = e;`
    Assign(String, Expr),
    /// `e;`
    Expr(Expr),
    /// `return;`
    Return,
    /// `abort e;`
    Abort(Expr),
    /// `assert(cond, code);`
    Assert(Expr, Expr),
    /// `if (cond) { .. } else { .. }`
    If(Expr, Vec<Stmt>, Vec<Stmt>),
    /// `while (cond) { .. }`
    While(Expr, Vec<Stmt>),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Neq,
    And,
    Or,
}

/// Transaction-context builtins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `get_txn_sender()`
    TxnSender,
    /// `get_txn_sequence_number()`
    TxnSequenceNumber,
    /// `get_txn_max_gas_units()`
    TxnMaxGasUnits,
    /// `get_txn_gas_unit_price()`
    TxnGasUnitPrice,
    /// `get_gas_remaining()`
    GasRemaining,
}

/// Expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Integer literal
    U64(u64),
    /// Boolean literal
    Bool(bool),
    /// Address literal
    Address(AccountAddress),
    /// `h"..."` literal
    ByteArray(Vec<u8>),
    /// `copy(x)` or a bare local
    Copy(String),
    /// `move(x)`
    Move(String),
    /// Transaction builtin
    Builtin(Builtin),
    /// `Module.function(args)`
    Call {
        /// Module name
        module: String,
        /// Function name
        function: String,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Unary operation
    Unary(UnaryOp, Box<Expr>),
    /// Binary operation
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

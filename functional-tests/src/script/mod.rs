//! Transaction script language
//!
//! Scripts import native modules from `0x0` and define a single `main`
//! procedure. [`compile`] substitutes `{{name}}` placeholders with account
//! addresses, parses the source and checks every call against the native
//! table before anything runs.

pub mod ast;
pub mod interpreter;
pub mod lexer;
pub mod natives;
pub mod parser;

use std::collections::{BTreeMap, HashSet};

use lazy_static::lazy_static;
use regex_lite::Regex;
use thiserror::Error;

use crate::tier1_component::{AccountAddress, AddressParseError};

pub use ast::{Script, Type};
pub use interpreter::{execute_script, ExecutionError, GasMeter, TransactionContext, Value};

/// Errors raised while compiling a script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// No token matches at this position
    #[error("invalid token at offset {offset}: '{snippet}'")]
    InvalidToken {
        /// Byte offset
        offset: usize,
        /// Start of the offending text
        snippet: String,
    },

    /// Parser found something else
    #[error("expected {expected} at offset {offset}, found '{found}'")]
    UnexpectedToken {
        /// What the parser wanted
        expected: String,
        /// Text found instead
        found: String,
        /// Byte offset
        offset: usize,
    },

    /// Script ended early
    #[error("unexpected end of script, expected {0}")]
    UnexpectedEof(String),

    /// Integer literal does not fit in u64
    #[error("invalid u64 literal '{0}'")]
    InvalidNumber(String),

    /// Malformed `h"..."` literal
    #[error("invalid bytearray literal {0}")]
    InvalidByteArray(String),

    /// Malformed address literal
    #[error(transparent)]
    InvalidAddress(#[from] AddressParseError),

    /// Module is not imported or does not exist
    #[error("unbound module '{0}'")]
    UnboundModule(String),

    /// Module imported twice
    #[error("duplicate import of '{0}'")]
    DuplicateImport(String),

    /// `{{name}}` without a matching account
    #[error("unbound placeholder '{{{{{0}}}}}'")]
    UnboundPlaceholder(String),

    /// Function not exported by the module
    #[error("unknown function {module}.{function}")]
    UnknownFunction {
        /// Module name
        module: String,
        /// Function name
        function: String,
    },

    /// Wrong number of call arguments
    #[error("{module}.{function} expects {expected} arguments, got {found}")]
    ArityMismatch {
        /// Module name
        module: String,
        /// Function name
        function: String,
        /// Declared parameter count
        expected: usize,
        /// Arguments supplied
        found: usize,
    },

    /// Local or parameter declared twice
    #[error("duplicate local '{0}'")]
    DuplicateLocal(String),

    /// Local used without a declaration
    #[error("unbound local '{0}'")]
    UnboundLocal(String),
}

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("static placeholder pattern");
}

/// Replace each `{{name}}` with the address literal of account `name`.
pub fn substitute_placeholders(
    text: &str,
    addresses: &BTreeMap<String, AccountAddress>,
) -> Result<String, ScriptError> {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let address = addresses
            .get(name.as_str())
            .ok_or_else(|| ScriptError::UnboundPlaceholder(name.as_str().to_string()))?;
        output.push_str(&text[last..whole.start()]);
        output.push_str(&address.to_literal());
        last = whole.end();
    }

    output.push_str(&text[last..]);
    Ok(output)
}

/// Substitute placeholders, parse and verify a script.
pub fn compile(
    text: &str,
    addresses: &BTreeMap<String, AccountAddress>,
) -> Result<Script, ScriptError> {
    let source = substitute_placeholders(text, addresses)?;
    let script = parser::parse_script(&source)?;
    verify(&script)?;
    Ok(script)
}

fn verify(script: &Script) -> Result<(), ScriptError> {
    let mut modules = HashSet::new();
    for import in &script.imports {
        let known = natives::MODULES.contains(&import.module.as_str());
        if import.address != AccountAddress::ZERO || !known {
            return Err(ScriptError::UnboundModule(format!(
                "{}.{}",
                import.address.short_str(),
                import.module
            )));
        }
        if !modules.insert(import.module.as_str()) {
            return Err(ScriptError::DuplicateImport(import.module.clone()));
        }
    }

    let mut locals: HashSet<&str> = script.params.iter().map(|(name, _)| name.as_str()).collect();
    collect_lets(&script.body, &mut locals)?;

    let scope = Scope { modules, locals };
    scope.stmts(&script.body)
}

fn collect_lets<'s>(stmts: &'s [ast::Stmt], locals: &mut HashSet<&'s str>) -> Result<(), ScriptError> {
    for stmt in stmts {
        match stmt {
            ast::Stmt::Let(name, _) => {
                if !locals.insert(name.as_str()) {
                    return Err(ScriptError::DuplicateLocal(name.clone()));
                }
            }
            ast::Stmt::If(_, then_block, else_block) => {
                collect_lets(then_block, locals)?;
                collect_lets(else_block, locals)?;
            }
            ast::Stmt::While(_, body) => collect_lets(body, locals)?,
            _ => {}
        }
    }
    Ok(())
}

struct Scope<'s> {
    modules: HashSet<&'s str>,
    locals: HashSet<&'s str>,
}

impl Scope<'_> {
    fn stmts(&self, stmts: &[ast::Stmt]) -> Result<(), ScriptError> {
        stmts.iter().try_for_each(|stmt| self.stmt(stmt))
    }

    fn stmt(&self, stmt: &ast::Stmt) -> Result<(), ScriptError> {
        use ast::Stmt;

        match stmt {
            Stmt::Let(..) | Stmt::Return => Ok(()),
            Stmt::Assign(name, expr) => {
                self.local(name)?;
                self.expr(expr)
            }
            Stmt::Expr(expr) | Stmt::Abort(expr) => self.expr(expr),
            Stmt::Assert(cond, code) => {
                self.expr(cond)?;
                self.expr(code)
            }
            Stmt::If(cond, then_block, else_block) => {
                self.expr(cond)?;
                self.stmts(then_block)?;
                self.stmts(else_block)
            }
            Stmt::While(cond, body) => {
                self.expr(cond)?;
                self.stmts(body)
            }
        }
    }

    fn expr(&self, expr: &ast::Expr) -> Result<(), ScriptError> {
        use ast::Expr;

        match expr {
            Expr::U64(_) | Expr::Bool(_) | Expr::Address(_) | Expr::ByteArray(_) => Ok(()),
            Expr::Builtin(_) => Ok(()),
            Expr::Copy(name) | Expr::Move(name) => self.local(name),
            Expr::Unary(_, operand) => self.expr(operand),
            Expr::Binary(_, lhs, rhs) => {
                self.expr(lhs)?;
                self.expr(rhs)
            }
            Expr::Call {
                module,
                function,
                args,
            } => {
                if !self.modules.contains(module.as_str()) {
                    return Err(ScriptError::UnboundModule(module.clone()));
                }
                let params = natives::signature(module, function).ok_or_else(|| {
                    ScriptError::UnknownFunction {
                        module: module.clone(),
                        function: function.clone(),
                    }
                })?;
                if params.len() != args.len() {
                    return Err(ScriptError::ArityMismatch {
                        module: module.clone(),
                        function: function.clone(),
                        expected: params.len(),
                        found: args.len(),
                    });
                }
                args.iter().try_for_each(|arg| self.expr(arg))
            }
        }
    }

    fn local(&self, name: &str) -> Result<(), ScriptError> {
        if self.locals.contains(name) {
            Ok(())
        } else {
            Err(ScriptError::UnboundLocal(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses() -> BTreeMap<String, AccountAddress> {
        let mut map = BTreeMap::new();
        map.insert("vivian".to_string(), AccountAddress::from_name("vivian"));
        map
    }

    #[test]
    fn test_substitute_placeholders() {
        let text = "LibraAccount.balance({{vivian}});";
        let substituted = substitute_placeholders(text, &addresses()).unwrap();
        assert_eq!(
            substituted,
            format!(
                "LibraAccount.balance({});",
                AccountAddress::from_name("vivian").to_literal()
            )
        );
    }

    #[test]
    fn test_unbound_placeholder() {
        assert_eq!(
            substitute_placeholders("{{nobody}}", &addresses()),
            Err(ScriptError::UnboundPlaceholder("nobody".to_string()))
        );
    }

    #[test]
    fn test_compile_block_prologue_script() {
        let script = compile(
            r#"
            import 0x0.LibraSystem;
            main() {
                LibraSystem.block_prologue(100000000, h"aa", h"bb", {{vivian}});
                return;
            }
            "#,
            &addresses(),
        )
        .unwrap();
        assert_eq!(script.imports.len(), 1);
    }

    #[test]
    fn test_call_without_import() {
        let result = compile(
            "main() { LibraSystem.block_prologue(1, h\"\", h\"\", 0x1); return; }",
            &addresses(),
        );
        assert_eq!(result, Err(ScriptError::UnboundModule("LibraSystem".to_string())));
    }

    #[test]
    fn test_unknown_module_import() {
        assert!(matches!(
            compile("import 0x0.Nope; main() { return; }", &addresses()),
            Err(ScriptError::UnboundModule(_))
        ));
        assert!(matches!(
            compile("import 0x1.LibraAccount; main() { return; }", &addresses()),
            Err(ScriptError::UnboundModule(_))
        ));
    }

    #[test]
    fn test_duplicate_import() {
        assert_eq!(
            compile(
                "import 0x0.LibraAccount; import 0x0.LibraAccount; main() { return; }",
                &addresses()
            ),
            Err(ScriptError::DuplicateImport("LibraAccount".to_string()))
        );
    }

    #[test]
    fn test_unknown_function_and_arity() {
        assert!(matches!(
            compile(
                "import 0x0.LibraAccount; main() { LibraAccount.mint(1); return; }",
                &addresses()
            ),
            Err(ScriptError::UnknownFunction { .. })
        ));
        assert!(matches!(
            compile(
                "import 0x0.LibraAccount; main() { assert(LibraAccount.balance() == 0, 1); return; }",
                &addresses()
            ),
            Err(ScriptError::ArityMismatch {
                expected: 1,
                found: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_unbound_and_duplicate_locals() {
        assert_eq!(
            compile("main() { x = 1; return; }", &addresses()),
            Err(ScriptError::UnboundLocal("x".to_string()))
        );
        assert_eq!(
            compile("main(x: u64) { let x: u64; return; }", &addresses()),
            Err(ScriptError::DuplicateLocal("x".to_string()))
        );
    }

    #[test]
    fn test_invalid_address_literal() {
        let long = format!("0x{}", "1".repeat(65));
        let source = format!("main() {{ assert({} == {}, 1); return; }}", long, long);
        assert!(matches!(
            compile(&source, &addresses()),
            Err(ScriptError::InvalidAddress(_))
        ));
    }
}

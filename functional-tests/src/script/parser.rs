//! Recursive-descent parser for transaction scripts.
//!
//! Grammar:
//!
//! ```text
//! script  := import* "main" "(" params? ")" block
//! import  := "import" ADDRESS "." NAME ";"
//! params  := NAME ":" type ("," NAME ":" type)*
//! block   := "{" stmt* "}"
//! stmt    := "let" NAME ":" type ";"
//!          | NAME "=" expr ";"
//!          | "return" ";" | "abort" expr ";"
//!          | "assert(" expr "," expr ")" ";"
//!          | "if" "(" expr ")" block ("else" block)?
//!          | "while" "(" expr ")" block
//!          | expr ";"
//! expr    := or
//! or      := and ("||" and)*
//! and     := cmp ("&&" cmp)*
//! cmp     := sum (("=="|"!="|"<"|"<="|">"|">=") sum)?
//! sum     := term (("+"|"-") term)*
//! term    := unary (("*"|"/"|"%") unary)*
//! unary   := "!" unary | primary
//! ```

use crate::tier1_component::AccountAddress;

use super::ast::{BinOp, Builtin, Expr, Import, Script, Stmt, Type, UnaryOp};
use super::lexer::{tokenize, Tok, Token};
use super::ScriptError;

/// Parse script source (placeholders already substituted).
pub fn parse_script(text: &str) -> Result<Script, ScriptError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.script()
}

struct Parser<'input> {
    tokens: Vec<Token<'input>>,
    pos: usize,
}

impl<'input> Parser<'input> {
    fn peek(&self) -> Token<'input> {
        // tokenize always ends with Eof, and Eof is never consumed
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token<'input> {
        let token = self.peek();
        if token.tok != Tok::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, tok: Tok) -> bool {
        if self.peek().tok == tok {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Tok, expected: &str) -> Result<Token<'input>, ScriptError> {
        let token = self.peek();
        if token.tok == tok {
            Ok(self.advance())
        } else {
            Err(unexpected(token, expected))
        }
    }

    fn script(&mut self) -> Result<Script, ScriptError> {
        let mut imports = Vec::new();
        while self.peek().tok == Tok::Import {
            imports.push(self.import()?);
        }

        self.expect(Tok::Main, "main")?;
        self.expect(Tok::LParen, "(")?;
        let mut params = Vec::new();
        if self.peek().tok != Tok::RParen {
            loop {
                let name = self.expect(Tok::NameValue, "parameter name")?.text.to_string();
                self.expect(Tok::Colon, ":")?;
                let ty = self.ty()?;
                if params.iter().any(|(existing, _)| *existing == name) {
                    return Err(ScriptError::DuplicateLocal(name));
                }
                params.push((name, ty));
                if !self.eat(Tok::Comma) {
                    break;
                }
            }
        }
        self.expect(Tok::RParen, ")")?;

        let body = self.block()?;
        self.expect(Tok::Eof, "end of script")?;

        Ok(Script {
            imports,
            params,
            body,
        })
    }

    fn import(&mut self) -> Result<Import, ScriptError> {
        self.expect(Tok::Import, "import")?;
        let address = self.expect(Tok::AddressValue, "module address")?;
        let address = AccountAddress::from_hex_literal(address.text)?;
        self.expect(Tok::Period, ".")?;
        let module = self.expect(Tok::NameValue, "module name")?.text.to_string();
        self.expect(Tok::Semicolon, ";")?;
        Ok(Import { address, module })
    }

    fn ty(&mut self) -> Result<Type, ScriptError> {
        let token = self.advance();
        match token.tok {
            Tok::U64 => Ok(Type::U64),
            Tok::Bool => Ok(Type::Bool),
            Tok::Address => Ok(Type::Address),
            Tok::Bytearray => Ok(Type::ByteArray),
            _ => Err(unexpected(token, "type")),
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.expect(Tok::LBrace, "{")?;
        let mut stmts = Vec::new();
        while !self.eat(Tok::RBrace) {
            if self.peek().tok == Tok::Eof {
                return Err(ScriptError::UnexpectedEof("}".to_string()));
            }
            stmts.push(self.stmt()?);
        }
        Ok(stmts)
    }

    fn stmt(&mut self) -> Result<Stmt, ScriptError> {
        let token = self.peek();
        let stmt = match token.tok {
            Tok::Let => {
                self.advance();
                let name = self.expect(Tok::NameValue, "local name")?.text.to_string();
                self.expect(Tok::Colon, ":")?;
                let ty = self.ty()?;
                Stmt::Let(name, ty)
            }
            Tok::Return => {
                self.advance();
                Stmt::Return
            }
            Tok::Abort => {
                self.advance();
                Stmt::Abort(self.expr()?)
            }
            Tok::Assert => {
                self.advance();
                let cond = self.expr()?;
                self.expect(Tok::Comma, ",")?;
                let code = self.expr()?;
                self.expect(Tok::RParen, ")")?;
                Stmt::Assert(cond, code)
            }
            Tok::If => {
                self.advance();
                self.expect(Tok::LParen, "(")?;
                let cond = self.expr()?;
                self.expect(Tok::RParen, ")")?;
                let then_block = self.block()?;
                let else_block = if self.eat(Tok::Else) {
                    self.block()?
                } else {
                    Vec::new()
                };
                return Ok(Stmt::If(cond, then_block, else_block));
            }
            Tok::While => {
                self.advance();
                self.expect(Tok::LParen, "(")?;
                let cond = self.expr()?;
                self.expect(Tok::RParen, ")")?;
                let body = self.block()?;
                return Ok(Stmt::While(cond, body));
            }
            Tok::NameValue if self.tokens.get(self.pos + 1).map(|t| t.tok) == Some(Tok::Equal) => {
                let name = self.advance().text.to_string();
                self.advance();
                Stmt::Assign(name, self.expr()?)
            }
            _ => Stmt::Expr(self.expr()?),
        };
        self.expect(Tok::Semicolon, ";")?;
        Ok(stmt)
    }

    fn expr(&mut self) -> Result<Expr, ScriptError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.and_expr()?;
        while self.eat(Tok::PipePipe) {
            let rhs = self.and_expr()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.cmp_expr()?;
        while self.eat(Tok::AmpAmp) {
            let rhs = self.cmp_expr()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn cmp_expr(&mut self) -> Result<Expr, ScriptError> {
        let lhs = self.sum_expr()?;
        let op = match self.peek().tok {
            Tok::EqualEqual => BinOp::Eq,
            Tok::ExclaimEqual => BinOp::Neq,
            Tok::Less => BinOp::Lt,
            Tok::LessEqual => BinOp::Le,
            Tok::Greater => BinOp::Gt,
            Tok::GreaterEqual => BinOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.sum_expr()?;
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn sum_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.term_expr()?;
        loop {
            let op = match self.peek().tok {
                Tok::Plus => BinOp::Add,
                Tok::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.term_expr()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.unary_expr()?;
        loop {
            let op = match self.peek().tok {
                Tok::Star => BinOp::Mul,
                Tok::Slash => BinOp::Div,
                Tok::Percent => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary_expr()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary_expr(&mut self) -> Result<Expr, ScriptError> {
        if self.eat(Tok::Exclaim) {
            let operand = self.unary_expr()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.primary_expr()
    }

    fn primary_expr(&mut self) -> Result<Expr, ScriptError> {
        let token = self.advance();
        match token.tok {
            Tok::U64Value => token
                .text
                .parse::<u64>()
                .map(Expr::U64)
                .map_err(|_| ScriptError::InvalidNumber(token.text.to_string())),
            Tok::True => Ok(Expr::Bool(true)),
            Tok::False => Ok(Expr::Bool(false)),
            Tok::AddressValue => Ok(Expr::Address(AccountAddress::from_hex_literal(
                token.text,
            )?)),
            Tok::ByteArrayValue => {
                let digits = &token.text[2..token.text.len() - 1];
                hex::decode(digits)
                    .map(Expr::ByteArray)
                    .map_err(|_| ScriptError::InvalidByteArray(token.text.to_string()))
            }
            Tok::Copy => {
                let name = self.expect(Tok::NameValue, "local name")?.text.to_string();
                self.expect(Tok::RParen, ")")?;
                Ok(Expr::Copy(name))
            }
            Tok::Move => {
                let name = self.expect(Tok::NameValue, "local name")?.text.to_string();
                self.expect(Tok::RParen, ")")?;
                Ok(Expr::Move(name))
            }
            Tok::NameValue => Ok(Expr::Copy(token.text.to_string())),
            Tok::GetTxnSender => self.builtin(Builtin::TxnSender),
            Tok::GetTxnSequenceNumber => self.builtin(Builtin::TxnSequenceNumber),
            Tok::GetTxnMaxGasUnits => self.builtin(Builtin::TxnMaxGasUnits),
            Tok::GetTxnGasUnitPrice => self.builtin(Builtin::TxnGasUnitPrice),
            Tok::GetGasRemaining => self.builtin(Builtin::GasRemaining),
            Tok::DotNameValue => {
                let (module, function) = token
                    .text
                    .split_once('.')
                    .ok_or_else(|| unexpected(token, "Module.function"))?;
                self.expect(Tok::LParen, "(")?;
                let mut args = Vec::new();
                if !self.eat(Tok::RParen) {
                    loop {
                        args.push(self.expr()?);
                        if !self.eat(Tok::Comma) {
                            break;
                        }
                    }
                    self.expect(Tok::RParen, ")")?;
                }
                Ok(Expr::Call {
                    module: module.to_string(),
                    function: function.to_string(),
                    args,
                })
            }
            Tok::LParen => {
                let inner = self.expr()?;
                self.expect(Tok::RParen, ")")?;
                Ok(inner)
            }
            _ => Err(unexpected(token, "expression")),
        }
    }

    fn builtin(&mut self, builtin: Builtin) -> Result<Expr, ScriptError> {
        self.expect(Tok::LParen, "(")?;
        self.expect(Tok::RParen, ")")?;
        Ok(Expr::Builtin(builtin))
    }
}

fn unexpected(token: Token<'_>, expected: &str) -> ScriptError {
    if token.tok == Tok::Eof {
        ScriptError::UnexpectedEof(expected.to_string())
    } else {
        ScriptError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.text.to_string(),
            offset: token.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_script() {
        let script = parse_script("main() { return; }").unwrap();
        assert!(script.imports.is_empty());
        assert!(script.params.is_empty());
        assert_eq!(script.body, vec![Stmt::Return]);
    }

    #[test]
    fn test_block_prologue_script() {
        let script = parse_script(
            r#"
            import 0x0.LibraSystem;
            main() {
                LibraSystem.block_prologue(100000000, h"aa", h"bb", 0x1);
                return;
            }
            "#,
        )
        .unwrap();
        assert_eq!(script.imports.len(), 1);
        assert_eq!(script.imports[0].module, "LibraSystem");
        match &script.body[0] {
            Stmt::Expr(Expr::Call {
                module,
                function,
                args,
            }) => {
                assert_eq!(module, "LibraSystem");
                assert_eq!(function, "block_prologue");
                assert_eq!(args.len(), 4);
                assert_eq!(args[0], Expr::U64(100_000_000));
                assert_eq!(args[1], Expr::ByteArray(vec![0xaa]));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_params_and_locals() {
        let script = parse_script(
            "main(amount: u64, payee: address) { let x: u64; x = copy(amount) + 1; return; }",
        )
        .unwrap();
        assert_eq!(
            script.params,
            vec![
                ("amount".to_string(), Type::U64),
                ("payee".to_string(), Type::Address)
            ]
        );
        assert_eq!(script.body[0], Stmt::Let("x".to_string(), Type::U64));
        assert!(matches!(script.body[1], Stmt::Assign(ref name, _) if name == "x"));
    }

    #[test]
    fn test_operator_precedence() {
        let script = parse_script("main() { assert(1 + 2 * 3 == 7 && true, 42); }").unwrap();
        let Stmt::Assert(cond, code) = &script.body[0] else {
            panic!("expected assert");
        };
        assert_eq!(*code, Expr::U64(42));
        let Expr::Binary(BinOp::And, lhs, _) = cond else {
            panic!("expected && at the root");
        };
        let Expr::Binary(BinOp::Eq, sum, _) = lhs.as_ref() else {
            panic!("expected == under &&");
        };
        assert!(matches!(sum.as_ref(), Expr::Binary(BinOp::Add, _, rhs)
            if matches!(rhs.as_ref(), Expr::Binary(BinOp::Mul, _, _))));
    }

    #[test]
    fn test_if_else_and_while() {
        let script = parse_script(
            "main() { let i: u64; i = 0; while (copy(i) < 3) { i = copy(i) + 1; } if (copy(i) == 3) { return; } else { abort 1; } }",
        )
        .unwrap();
        assert!(matches!(script.body[2], Stmt::While(_, ref body) if body.len() == 1));
        assert!(matches!(script.body[3], Stmt::If(_, _, ref e) if e.len() == 1));
    }

    #[test]
    fn test_missing_semicolon() {
        assert!(matches!(
            parse_script("main() { return }"),
            Err(ScriptError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_unterminated_block() {
        assert!(matches!(
            parse_script("main() { return;"),
            Err(ScriptError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_duplicate_parameter() {
        assert!(matches!(
            parse_script("main(a: u64, a: u64) { return; }"),
            Err(ScriptError::DuplicateLocal(_))
        ));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(parse_script("main() { return; } return;").is_err());
    }
}

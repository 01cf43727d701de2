//! Script tokenizer.
//!
//! Each token kind has an anchored pattern; the longest match wins and ties
//! go to the pattern listed last, so keywords beat identifiers of the same
//! length while `abortion` still lexes as a name.

use lazy_static::lazy_static;
use regex_lite::Regex;

use super::ScriptError;

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Tok {
    Eof,
    AddressValue,
    U64Value,
    NameValue,
    DotNameValue,
    ByteArrayValue,
    Exclaim,
    ExclaimEqual,
    Percent,
    AmpAmp,
    LParen,
    RParen,
    Star,
    Plus,
    Comma,
    Minus,
    Period,
    Slash,
    Colon,
    Semicolon,
    Less,
    LessEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    PipePipe,
    LBrace,
    RBrace,
    Abort,
    Address,
    Assert,
    Bool,
    Bytearray,
    Copy,
    Else,
    False,
    GetGasRemaining,
    GetTxnGasUnitPrice,
    GetTxnMaxGasUnits,
    GetTxnSender,
    GetTxnSequenceNumber,
    If,
    Import,
    Let,
    Main,
    Move,
    Return,
    True,
    U64,
    While,
}

/// A token with its source text and byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'input> {
    /// Kind
    pub tok: Tok,
    /// Matched text
    pub text: &'input str,
    /// Byte offset in the script
    pub offset: usize,
}

lazy_static! {
    static ref TOKEN_PATTERNS: Vec<(Tok, Regex)> = {
        let table: &[(Tok, &str)] = &[
            (Tok::AddressValue, r"^0[xX][0-9A-Fa-f]+"),
            (Tok::U64Value, r"^[0-9]+"),
            (Tok::NameValue, r"^[$A-Z_a-z][$0-9A-Z_a-z]*"),
            (
                Tok::DotNameValue,
                r"^[$A-Z_a-z][$0-9A-Z_a-z]*\.[$A-Z_a-z][$0-9A-Z_a-z]*",
            ),
            (Tok::ByteArrayValue, r#"^h"[0-9A-Fa-f]*""#),
            (Tok::Exclaim, r"^!"),
            (Tok::ExclaimEqual, r"^!="),
            (Tok::Percent, r"^%"),
            (Tok::AmpAmp, r"^&&"),
            (Tok::LParen, r"^\("),
            (Tok::RParen, r"^\)"),
            (Tok::Star, r"^\*"),
            (Tok::Plus, r"^\+"),
            (Tok::Comma, r"^,"),
            (Tok::Minus, r"^-"),
            (Tok::Period, r"^\."),
            (Tok::Slash, r"^/"),
            (Tok::Colon, r"^:"),
            (Tok::Semicolon, r"^;"),
            (Tok::Less, r"^<"),
            (Tok::LessEqual, r"^<="),
            (Tok::Equal, r"^="),
            (Tok::EqualEqual, r"^=="),
            (Tok::Greater, r"^>"),
            (Tok::GreaterEqual, r"^>="),
            (Tok::PipePipe, r"^\|\|"),
            (Tok::LBrace, r"^\{"),
            (Tok::RBrace, r"^\}"),
            (Tok::Abort, r"^abort"),
            (Tok::Address, r"^address"),
            (Tok::Assert, r"^assert\("),
            (Tok::Bool, r"^bool"),
            (Tok::Bytearray, r"^bytearray"),
            (Tok::Copy, r"^copy\("),
            (Tok::Else, r"^else"),
            (Tok::False, r"^false"),
            (Tok::GetGasRemaining, r"^get_gas_remaining"),
            (Tok::GetTxnGasUnitPrice, r"^get_txn_gas_unit_price"),
            (Tok::GetTxnMaxGasUnits, r"^get_txn_max_gas_units"),
            (Tok::GetTxnSender, r"^get_txn_sender"),
            (Tok::GetTxnSequenceNumber, r"^get_txn_sequence_number"),
            (Tok::If, r"^if"),
            (Tok::Import, r"^import"),
            (Tok::Let, r"^let"),
            (Tok::Main, r"^main"),
            (Tok::Move, r"^move\("),
            (Tok::Return, r"^return"),
            (Tok::True, r"^true"),
            (Tok::U64, r"^u64"),
            (Tok::While, r"^while"),
        ];
        table
            .iter()
            .map(|(tok, pattern)| (*tok, Regex::new(pattern).expect("static token pattern")))
            .collect()
    };
}

/// Split a script into tokens, ending with [`Tok::Eof`].
pub fn tokenize(text: &str) -> Result<Vec<Token<'_>>, ScriptError> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    loop {
        let rest = &text[offset..];
        let trimmed = rest.trim_start();
        offset += rest.len() - trimmed.len();

        if trimmed.is_empty() {
            tokens.push(Token {
                tok: Tok::Eof,
                text: "",
                offset,
            });
            return Ok(tokens);
        }

        if trimmed.starts_with("//") {
            let line_len = trimmed.find('\n').unwrap_or(trimmed.len());
            offset += line_len;
            continue;
        }

        let mut longest = 0;
        let mut kind = None;
        for (tok, pattern) in TOKEN_PATTERNS.iter() {
            if let Some(found) = pattern.find(trimmed) {
                if found.end() >= longest && found.end() > 0 {
                    longest = found.end();
                    kind = Some(*tok);
                }
            }
        }

        let tok = kind.ok_or_else(|| ScriptError::InvalidToken {
            offset,
            snippet: trimmed.chars().take(16).collect(),
        })?;

        tokens.push(Token {
            tok,
            text: &trimmed[..longest],
            offset,
        });
        offset += longest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<Tok> {
        tokenize(text).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn test_import_line() {
        assert_eq!(
            kinds("import 0x0.LibraSystem;"),
            vec![
                Tok::Import,
                Tok::AddressValue,
                Tok::Period,
                Tok::NameValue,
                Tok::Semicolon,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn test_block_prologue_call() {
        let tokens =
            tokenize("LibraSystem.block_prologue(100000000, h\"aa\", h\"bb\", 0x1);").unwrap();
        assert_eq!(tokens[0].tok, Tok::DotNameValue);
        assert_eq!(tokens[0].text, "LibraSystem.block_prologue");
        assert_eq!(tokens[2].tok, Tok::U64Value);
        assert_eq!(tokens[4].tok, Tok::ByteArrayValue);
        assert_eq!(tokens[4].text, "h\"aa\"");
    }

    #[test]
    fn test_keywords_beat_names_of_equal_length() {
        assert_eq!(kinds("return"), vec![Tok::Return, Tok::Eof]);
        assert_eq!(kinds("returned"), vec![Tok::NameValue, Tok::Eof]);
        assert_eq!(kinds("u64"), vec![Tok::U64, Tok::Eof]);
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            kinds("a <= b && c != d || !e == f"),
            vec![
                Tok::NameValue,
                Tok::LessEqual,
                Tok::NameValue,
                Tok::AmpAmp,
                Tok::NameValue,
                Tok::ExclaimEqual,
                Tok::NameValue,
                Tok::PipePipe,
                Tok::Exclaim,
                Tok::NameValue,
                Tok::EqualEqual,
                Tok::NameValue,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("return; // done\nabort 1;"),
            vec![
                Tok::Return,
                Tok::Semicolon,
                Tok::Abort,
                Tok::U64Value,
                Tok::Semicolon,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn test_offsets() {
        let tokens = tokenize("  main()").unwrap();
        assert_eq!(tokens[0].offset, 2);
        assert_eq!(tokens[1].offset, 6);
    }

    #[test]
    fn test_invalid_token() {
        assert!(matches!(
            tokenize("main() { @ }"),
            Err(ScriptError::InvalidToken { offset: 9, .. })
        ));
    }
}

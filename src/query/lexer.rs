//! Logos-based lexer for filter expressions.

use super::ExpressionError;
use logos::Logos;
use std::ops::Range;

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<'a> {
    pub token: Token,
    pub text: &'a str,
    pub span: Range<usize>,
}

/// Tokenize a whole expression, failing on the first unrecognised character.
pub fn tokenize(input: &str) -> Result<Vec<Spanned<'_>>, ExpressionError> {
    let mut lexer = Token::lexer(input);
    let mut out = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => out.push(Spanned {
                token,
                text: lexer.slice(),
                span,
            }),
            Err(()) => {
                return Err(ExpressionError::syntax(
                    span.start,
                    format!("unexpected character {:?}", lexer.slice()),
                ));
            }
        }
    }
    Ok(out)
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // =========================================================================
    // KEYWORDS
    // =========================================================================
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("True")]
    #[token("true")]
    True,
    #[token("False")]
    #[token("false")]
    False,
    #[token("None")]
    #[token("null")]
    None,
    #[token("lambda")]
    Lambda,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    Float,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    String,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Assign,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token("*")]
    #[token("**")]
    #[token("/")]
    #[token("//")]
    #[token("%")]
    #[token("@")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("~")]
    #[token("<<")]
    #[token(">>")]
    Operator,
}

impl Token {
    /// Name of a construct the expression language rejects, for error messages.
    pub fn rejected_construct(self) -> Option<&'static str> {
        match self {
            Token::Plus | Token::Minus | Token::Operator => Some("arithmetic"),
            Token::Is => Some("identity test"),
            Token::If | Token::Else => Some("conditional"),
            Token::Lambda => Some("lambda"),
            Token::For => Some("comprehension"),
            Token::Dot => Some("attribute access"),
            _ => None,
        }
    }
}

/// Decode a quoted string literal, handling backslash escapes.
pub fn unescape(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(c @ ('\\' | '\'' | '"')) => out.push(c),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

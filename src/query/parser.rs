//! Recursive-descent parser for filter expressions.
//!
//! Precedence, loosest first:
//!
//! ```text
//! or_expr     := and_expr ("or" and_expr)*
//! and_expr    := not_expr ("and" not_expr)*
//! not_expr    := "not" not_expr | comparison
//! comparison  := unary (cmp_op unary)*
//! unary       := "-" number | postfix
//! postfix     := atom ("[" subscript "]" | "(" args ")")*
//! atom        := literal | name | list | tuple | set | map
//! ```
//!
//! Arithmetic, attribute access, `is`, lambdas, conditionals and
//! comprehensions are recognised only to be rejected with a precise error.

use super::ExpressionError;
use super::ast::{CmpOp, Expr, Function, Index};
use super::lexer::{Spanned, Token, tokenize, unescape};
use crate::interchange::Value;
use smol_str::SmolStr;

/// Nesting limit for brackets and unary operators.
const MAX_DEPTH: usize = 64;

/// Parse a complete expression.
pub fn parse(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        end: input.len(),
    };
    if parser.tokens.is_empty() {
        return Err(ExpressionError::syntax(0, "empty expression"));
    }
    let expr = parser.parse_or()?;
    if let Some(next) = parser.peek_spanned() {
        if let Some(construct) = next.token.rejected_construct() {
            return Err(ExpressionError::Unsupported(construct.to_string()));
        }
        return Err(ExpressionError::syntax(
            next.span.start,
            format!("unexpected {:?}", next.text),
        ));
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: Vec<Spanned<'a>>,
    pos: usize,
    depth: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    // ------------------------------------------------------------------
    // Token access
    // ------------------------------------------------------------------

    fn peek_spanned(&self) -> Option<&Spanned<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|t| t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<Token> {
        self.tokens.get(self.pos + offset).map(|t| t.token)
    }

    fn at(&self, token: Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: Token) -> bool {
        if self.at(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn bump(&mut self) -> Option<Spanned<'a>> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn position(&self) -> usize {
        self.peek_spanned().map(|t| t.span.start).unwrap_or(self.end)
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), ExpressionError> {
        if self.eat(token) {
            return Ok(());
        }
        if let Some(construct) = self.peek().and_then(Token::rejected_construct) {
            return Err(ExpressionError::Unsupported(construct.to_string()));
        }
        Err(ExpressionError::syntax(self.position(), format!("expected {what}")))
    }

    fn enter(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::syntax(
                self.position(),
                "expression nested too deeply",
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ------------------------------------------------------------------
    // Boolean layers
    // ------------------------------------------------------------------

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let first = self.parse_and()?;
        if !self.at(Token::Or) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.eat(Token::Or) {
            operands.push(self.parse_and()?);
        }
        Ok(Expr::Or(operands))
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let first = self.parse_not()?;
        if !self.at(Token::And) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.eat(Token::And) {
            operands.push(self.parse_not()?);
        }
        Ok(Expr::And(operands))
    }

    fn parse_not(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat(Token::Not) {
            self.enter()?;
            let operand = self.parse_not()?;
            self.leave();
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        let first = self.parse_unary()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => CmpOp::Eq,
                Some(Token::NotEq) => CmpOp::NotEq,
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::LtEq) => CmpOp::LtEq,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::GtEq) => CmpOp::GtEq,
                Some(Token::In) => CmpOp::In,
                Some(Token::Not) if self.peek_at(1) == Some(Token::In) => {
                    self.pos += 1;
                    CmpOp::NotIn
                }
                Some(Token::Is | Token::Plus | Token::Minus | Token::Operator | Token::Dot) => {
                    let construct = self.peek().and_then(Token::rejected_construct).unwrap_or("arithmetic");
                    return Err(ExpressionError::Unsupported(construct.to_string()));
                }
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.parse_unary()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    // ------------------------------------------------------------------
    // Operands
    // ------------------------------------------------------------------

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        match self.peek() {
            Some(Token::Minus) => {
                let negative = match self.peek_at(1) {
                    Some(Token::Integer | Token::Float) => {
                        self.pos += 1;
                        self.parse_number(true)?
                    }
                    _ => return Err(ExpressionError::Unsupported("unary minus".to_string())),
                };
                self.parse_postfix(negative)
            }
            Some(Token::Plus) => Err(ExpressionError::Unsupported("unary plus".to_string())),
            Some(Token::Operator) if self.peek_spanned().is_some_and(|t| t.text == "~") => {
                Err(ExpressionError::Unsupported("bitwise not".to_string()))
            }
            _ => {
                let atom = self.parse_atom()?;
                self.parse_postfix(atom)
            }
        }
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, ExpressionError> {
        loop {
            match self.peek() {
                Some(Token::LBracket) => {
                    self.pos += 1;
                    self.enter()?;
                    let index = self.parse_subscript()?;
                    self.leave();
                    self.expect(Token::RBracket, "']'")?;
                    expr = Expr::Subscript {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Some(Token::LParen) => {
                    let Expr::Name(name) = &expr else {
                        return Err(ExpressionError::InvalidCall);
                    };
                    let function = Function::from_name(name)
                        .ok_or_else(|| ExpressionError::UnsupportedFunction(name.to_string()))?;
                    self.pos += 1;
                    self.enter()?;
                    let args = self.parse_call_args()?;
                    self.leave();
                    let given = args.len();
                    let Ok([argument]) = <[Expr; 1]>::try_from(args) else {
                        return Err(ExpressionError::Arity {
                            function: function.name(),
                            given,
                        });
                    };
                    expr = Expr::Call {
                        function,
                        argument: Box::new(argument),
                    };
                }
                Some(Token::Dot) => return Err(ExpressionError::Unsupported("attribute access".to_string())),
                _ => return Ok(expr),
            }
        }
    }

    fn parse_subscript(&mut self) -> Result<Index, ExpressionError> {
        let start = if self.at(Token::Colon) {
            None
        } else {
            Some(self.parse_or()?)
        };
        if !self.eat(Token::Colon) {
            return match start {
                Some(item) => Ok(Index::Item(item)),
                None => Err(ExpressionError::syntax(self.position(), "empty subscript")),
            };
        }
        let stop = if matches!(self.peek(), Some(Token::Colon | Token::RBracket)) {
            None
        } else {
            Some(self.parse_or()?)
        };
        let step = if self.eat(Token::Colon) && !self.at(Token::RBracket) {
            Some(self.parse_or()?)
        } else {
            None
        };
        Ok(Index::Slice { start, stop, step })
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ExpressionError> {
        let mut args = Vec::new();
        while !self.eat(Token::RParen) {
            if self.at(Token::Ident) && self.peek_at(1) == Some(Token::Assign) {
                return Err(ExpressionError::KeywordArguments);
            }
            if self.peek_spanned().is_some_and(|t| t.token == Token::Operator && t.text.starts_with('*')) {
                return Err(ExpressionError::Unsupported("unpacking".to_string()));
            }
            args.push(self.parse_or()?);
            if !self.eat(Token::Comma) {
                self.expect(Token::RParen, "')'")?;
                break;
            }
        }
        Ok(args)
    }

    fn parse_atom(&mut self) -> Result<Expr, ExpressionError> {
        let position = self.position();
        let Some(token) = self.peek() else {
            return Err(ExpressionError::syntax(position, "unexpected end of expression"));
        };
        match token {
            Token::Integer | Token::Float => self.parse_number(false),
            Token::String => {
                let mut text = String::new();
                while let Some(Token::String) = self.peek() {
                    if let Some(literal) = self.bump() {
                        text.push_str(&unescape(literal.text));
                    }
                }
                Ok(Expr::Literal(Value::String(text)))
            }
            Token::True => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Bool(true)))
            }
            Token::False => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Bool(false)))
            }
            Token::None => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Null))
            }
            Token::Ident => {
                let text = self.bump().map(|t| t.text).unwrap_or_default();
                if text.starts_with("__") {
                    return Err(ExpressionError::InvalidName(text.to_string()));
                }
                Ok(Expr::Name(SmolStr::new(text)))
            }
            Token::LParen => {
                self.pos += 1;
                self.enter()?;
                let expr = self.parse_parenthesized()?;
                self.leave();
                Ok(expr)
            }
            Token::LBracket => {
                self.pos += 1;
                self.enter()?;
                let items = self.parse_items(Token::RBracket, "']'")?;
                self.leave();
                Ok(Expr::List(items))
            }
            Token::LBrace => {
                self.pos += 1;
                self.enter()?;
                let expr = self.parse_braced()?;
                self.leave();
                Ok(expr)
            }
            other => match other.rejected_construct() {
                Some(construct) => Err(ExpressionError::Unsupported(construct.to_string())),
                None => Err(ExpressionError::syntax(
                    position,
                    format!(
                        "unexpected {:?}",
                        self.peek_spanned().map(|t| t.text).unwrap_or_default()
                    ),
                )),
            },
        }
    }

    fn parse_number(&mut self, negative: bool) -> Result<Expr, ExpressionError> {
        let position = self.position();
        let Some(literal) = self.bump() else {
            return Err(ExpressionError::syntax(position, "expected number"));
        };
        let text = if negative {
            format!("-{}", literal.text)
        } else {
            literal.text.to_string()
        };
        let value = match literal.token {
            Token::Integer => match text.parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => text
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|e| ExpressionError::syntax(position, e.to_string()))?,
            },
            _ => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| ExpressionError::syntax(position, e.to_string()))?,
        };
        Ok(Expr::Literal(value))
    }

    /// After `(`: empty tuple, grouping, or tuple.
    fn parse_parenthesized(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat(Token::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.parse_or()?;
        if self.eat(Token::RParen) {
            return Ok(first);
        }
        self.expect(Token::Comma, "',' or ')'")?;
        let mut items = vec![first];
        items.extend(self.parse_items(Token::RParen, "')'")?);
        Ok(Expr::Tuple(items))
    }

    /// Comma-separated items up to `close`, trailing comma allowed.
    fn parse_items(&mut self, close: Token, what: &str) -> Result<Vec<Expr>, ExpressionError> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.parse_or()?);
            if !self.eat(Token::Comma) {
                self.expect(close, what)?;
                break;
            }
        }
        Ok(items)
    }

    /// After `{`: a set or a mapping (`{}` is an empty mapping).
    fn parse_braced(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat(Token::RBrace) {
            return Ok(Expr::Map(Vec::new()));
        }
        let first = self.parse_or()?;
        if !self.eat(Token::Colon) {
            let mut items = vec![first];
            if self.eat(Token::Comma) {
                items.extend(self.parse_items(Token::RBrace, "'}'")?);
            } else {
                self.expect(Token::RBrace, "'}'")?;
            }
            return Ok(Expr::Set(items));
        }
        let mut entries = vec![(first, self.parse_or()?)];
        loop {
            if self.eat(Token::RBrace) {
                break;
            }
            self.expect(Token::Comma, "',' or '}'")?;
            if self.eat(Token::RBrace) {
                break;
            }
            let key = self.parse_or()?;
            self.expect(Token::Colon, "':'")?;
            entries.push((key, self.parse_or()?));
        }
        Ok(Expr::Map(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn name(n: &str) -> Expr {
        Expr::Name(SmolStr::new(n))
    }

    #[test]
    fn test_precedence() {
        let expr = parse("not a == 1 or b").unwrap();
        assert_eq!(
            expr,
            Expr::Or(vec![
                Expr::Not(Box::new(Expr::Compare {
                    first: Box::new(name("a")),
                    rest: vec![(CmpOp::Eq, Expr::Literal(Value::Int(1)))],
                })),
                name("b"),
            ])
        );
    }

    #[test]
    fn test_chained_comparison_and_not_in() {
        let expr = parse("0 < x <= 5 and y not in ('a',)").unwrap();
        let Expr::And(parts) = expr else {
            panic!("expected and");
        };
        assert!(matches!(&parts[0], Expr::Compare { rest, .. } if rest.len() == 2));
        assert!(matches!(
            &parts[1],
            Expr::Compare { rest, .. } if rest[0].0 == CmpOp::NotIn
                && rest[0].1 == Expr::Tuple(vec![Expr::Literal(Value::from("a"))])
        ));
    }

    #[test]
    fn test_collections_and_subscripts() {
        assert!(matches!(parse("{}").unwrap(), Expr::Map(e) if e.is_empty()));
        assert!(matches!(parse("{1, 2}").unwrap(), Expr::Set(s) if s.len() == 2));
        assert!(matches!(parse("{'k': 1,}").unwrap(), Expr::Map(e) if e.len() == 1));
        assert!(matches!(parse("(1)").unwrap(), Expr::Literal(Value::Int(1))));
        assert!(matches!(
            parse("attrs['name'][::-1]").unwrap(),
            Expr::Subscript { index, .. } if matches!(*index, Index::Slice { start: None, stop: None, step: Some(_) })
        ));
        assert_eq!(parse("-2.5").unwrap(), Expr::Literal(Value::Float(-2.5)));
        assert_eq!(parse("'a' \"b\"").unwrap(), Expr::Literal(Value::from("ab")));
    }

    #[rstest]
    #[case("__import__('os')")]
    #[case("foo(1, 2)")]
    #[case("is_class(name='Foo')")]
    #[case("is_class('A', 'B')")]
    #[case("is_kind_of()")]
    #[case("name.upper")]
    #[case("x + 1")]
    #[case("x is None")]
    #[case("lambda: 1")]
    #[case("a if b else c")]
    #[case("[x for x in y]")]
    #[case("-x")]
    #[case("eclass[0](1)")]
    #[case("a ==")]
    #[case("(a")]
    #[case("")]
    #[case("a b")]
    fn test_rejected(#[case] input: &str) {
        assert!(parse(input).is_err(), "{input} should be rejected");
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(parse("__class__"), Err(ExpressionError::InvalidName(_))));
        assert!(matches!(parse("open('x')"), Err(ExpressionError::UnsupportedFunction(f)) if f == "open"));
        assert!(matches!(parse("is_class(name='x')"), Err(ExpressionError::KeywordArguments)));
        assert!(matches!(parse("is_class()"), Err(ExpressionError::Arity { given: 0, .. })));
        assert!(matches!(parse("a.b"), Err(ExpressionError::Unsupported(c)) if c == "attribute access"));
        assert!(matches!(parse("a * 2"), Err(ExpressionError::Unsupported(c)) if c == "arithmetic"));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let input = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert!(matches!(parse(&input), Err(ExpressionError::Syntax { .. })));
    }
}

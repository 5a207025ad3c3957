//! Filter expression language.
//!
//! A small boolean language over one object's attributes and identity:
//!
//! ```text
//! eclass == 'MessageDefinition' and name in ['pacs.008', 'pacs.009']
//! is_kind_of('RepositoryConcept') and not nsuri
//! attrs['xmlTag'][:3] == 'Doc'
//! ```
//!
//! Expressions are compiled once with [`build_predicate`], which rejects
//! anything outside the grammar (arithmetic, attribute access, calls other
//! than `is_class`/`is_kind_of`, `__` names, keyword arguments), and then
//! evaluated per node through a [`PredicateContext`].

mod ast;
mod context;
mod eval;
mod lexer;
mod parser;

pub use ast::{CmpOp, Expr, Function, Index};
pub use context::PredicateContext;

use crate::interchange::{ModelAccess, Value};
use thiserror::Error;

/// Errors raised while compiling an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("Syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Unsupported expression element: {0}")]
    Unsupported(String),

    #[error("Invalid name in expression: {0}")]
    InvalidName(String),

    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),

    #[error("Invalid function call in expression")]
    InvalidCall,

    #[error("Keyword arguments are not supported")]
    KeywordArguments,

    #[error("{function}() takes exactly one argument ({given} given)")]
    Arity { function: &'static str, given: usize },
}

impl ExpressionError {
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }
}

/// A compiled, validated expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    source: String,
    expr: Expr,
}

impl Predicate {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate to a value.
    pub fn evaluate<M: ModelAccess + ?Sized>(&self, ctx: &PredicateContext<'_, M>) -> Value {
        eval::evaluate(&self.expr, ctx)
    }

    /// Evaluate and apply truthiness.
    pub fn matches<M: ModelAccess + ?Sized>(&self, ctx: &PredicateContext<'_, M>) -> bool {
        self.evaluate(ctx).is_truthy()
    }
}

/// Compile an expression into a [`Predicate`].
pub fn build_predicate(source: &str) -> Result<Predicate, ExpressionError> {
    let expr = parser::parse(source)?;
    Ok(Predicate {
        source: source.to_string(),
        expr,
    })
}

/// Compile an optional expression, treating blank text as absent.
pub fn build_optional(source: Option<&str>) -> Result<Option<Predicate>, ExpressionError> {
    source
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(build_predicate)
        .transpose()
}

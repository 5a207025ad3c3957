//! Expression syntax tree.
//!
//! Only the constructs the filter language accepts have nodes here, so an
//! [`Expr`] that exists is already validated.

use crate::interchange::Value;
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(SmolStr),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Set(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Not(Box<Expr>),
    /// Short-circuit conjunction; yields the deciding operand.
    And(Vec<Expr>),
    Or(Vec<Expr>),
    /// `first op1 e1 op2 e2 ...`, evaluated pairwise: `a < b < c` is `a < b and b < c`.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
    Subscript {
        target: Box<Expr>,
        index: Box<Index>,
    },
    Call {
        function: Function,
        argument: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Index {
    Item(Expr),
    Slice {
        start: Option<Expr>,
        stop: Option<Expr>,
        step: Option<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
}

/// The callable tests available to expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Exact class name match.
    IsClass,
    /// Class name or any transitive supertype name.
    IsKindOf,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "is_class" => Some(Self::IsClass),
            "is_kind_of" => Some(Self::IsKindOf),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::IsClass => "is_class",
            Self::IsKindOf => "is_kind_of",
        }
    }
}

//! Compiled storage predicates and the compiler seam.
//!
//! Turning a query-engine filter expression into a `Predicate` is the job of
//! an external compiler; the read path only calls `PredicateCompiler::compile`
//! and forwards the result to the storage engine untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("unsupported predicate expression: {0}")]
    Unsupported(String),

    #[error("invalid predicate expression: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Lt,
    Lte,
    Gt,
    Gte,
    StartsWith,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Logical {
        op: LogicalOp,
        children: Vec<Node>,
    },
    Comparison {
        op: ComparisonOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    TagRef(String),
    FieldRef(String),
    StringLiteral(String),
    IntegerLiteral(i64),
    FloatLiteral(f64),
    BooleanLiteral(bool),
}

impl Node {
    pub fn compare(op: ComparisonOp, left: Node, right: Node) -> Self {
        Node::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `tag == value`
    pub fn tag_eq(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(
            ComparisonOp::Equal,
            Node::TagRef(tag.into()),
            Node::StringLiteral(value.into()),
        )
    }

    pub fn and(children: Vec<Node>) -> Self {
        Node::Logical {
            op: LogicalOp::And,
            children,
        }
    }

    pub fn or(children: Vec<Node>) -> Self {
        Node::Logical {
            op: LogicalOp::Or,
            children,
        }
    }
}

/// Opaque (to the read path) filter evaluated by the storage engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub root: Node,
}

impl Predicate {
    pub fn new(root: Node) -> Self {
        Self { root }
    }
}

/// Translates a query-engine filter expression into a storage predicate.
pub trait PredicateCompiler: Send + Sync {
    type Expr: Send + Sync;

    fn compile(&self, expr: &Self::Expr) -> Result<Predicate, PredicateError>;
}

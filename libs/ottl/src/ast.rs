//! Abstract Syntax Tree (AST) representation
//!
//! The AST mirrors the statement grammar directly, without name resolution.
//! Paths, enum symbols and function names are bound to a context kind later,
//! when the engine compiles the tree.
//!
//! ```text
//! statement   ::= invocation [ "where" bool_expr ]
//! invocation  ::= IDENT "(" [ value ( "," value )* ] ")"
//! value       ::= literal | path | ENUM | invocation | "[" [ value ("," value)* ] "]"
//! bool_expr   ::= bool_term ( "or" bool_term )*
//! bool_term   ::= bool_factor ( "and" bool_factor )*
//! bool_factor ::= "not" bool_factor | "(" bool_expr ")" | value [ cmp value ]
//! ```

use crate::path::Path;
use crate::value::Value;
use std::fmt;

/// A parsed statement: an invocation guarded by an optional condition
#[derive(Debug, Clone, PartialEq)]
pub struct StatementAst {
    pub invocation: InvocationAst,
    pub condition: Option<BoolExpr>,
}

/// A function call as written
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationAst {
    pub name: String,
    pub args: Vec<ValueExpr>,
    pub line: usize,
    pub column: usize,
}

/// Argument or operand expression
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    Literal(Value),
    Path(Path),
    /// Unresolved enum symbol, e.g. `SPAN_KIND_SERVER`
    Enum(String),
    Invocation(InvocationAst),
    List(Vec<ValueExpr>),
}

impl ValueExpr {
    /// Short description used in argument errors.
    pub fn describe(&self) -> String {
        match self {
            ValueExpr::Literal(value) => format!("{} literal", value.type_name()),
            ValueExpr::Path(path) => format!("path `{}`", path),
            ValueExpr::Enum(symbol) => format!("enum `{}`", symbol),
            ValueExpr::Invocation(invocation) => format!("call to `{}`", invocation.name),
            ValueExpr::List(_) => "list".to_string(),
        }
    }
}

/// Boolean condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum BoolExpr {
    /// `true`, `false` or a converter returning a bool
    Term(ValueExpr),
    Comparison {
        left: ValueExpr,
        op: CompareOp,
        right: ValueExpr,
    },
    Not(Box<BoolExpr>),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::LessThan => "<",
            CompareOp::LessThanOrEqual => "<=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanOrEqual => ">=",
        };
        f.write_str(op)
    }
}

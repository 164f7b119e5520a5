//! Compiled statements, conditions and error modes

use crate::accessor::Getter;
use crate::ast::CompareOp;
use crate::contexts::ContextKind;
use crate::error::{Error, Result};
use crate::functions::Invocation;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A compiled boolean condition
pub enum Condition<K: ContextKind> {
    Value(Getter<K>),
    Comparison {
        left: Getter<K>,
        op: CompareOp,
        right: Getter<K>,
    },
    Not(Box<Condition<K>>),
    And(Box<Condition<K>>, Box<Condition<K>>),
    Or(Box<Condition<K>>, Box<Condition<K>>),
}

impl<K: ContextKind> Condition<K> {
    /// Evaluate with short-circuiting `and`/`or`.
    pub fn evaluate(&self, ctx: &mut K::Context<'_>) -> Result<bool> {
        match self {
            Condition::Value(getter) => match getter.get(ctx)? {
                Value::Bool(b) => Ok(b),
                other => Err(Error::TypeError(format!(
                    "condition must evaluate to bool, got {}",
                    other.type_name()
                ))),
            },
            Condition::Comparison { left, op, right } => {
                let left = left.get(ctx)?;
                let right = right.get(ctx)?;
                Ok(compare(&left, *op, &right))
            }
            Condition::Not(inner) => Ok(!inner.evaluate(ctx)?),
            Condition::And(left, right) => Ok(left.evaluate(ctx)? && right.evaluate(ctx)?),
            Condition::Or(left, right) => Ok(left.evaluate(ctx)? || right.evaluate(ctx)?),
        }
    }
}

impl<K: ContextKind> fmt::Debug for Condition<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Value(getter) => f.debug_tuple("Value").field(getter).finish(),
            Condition::Comparison { left, op, right } => f
                .debug_struct("Comparison")
                .field("left", left)
                .field("op", op)
                .field("right", right)
                .finish(),
            Condition::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Condition::And(left, right) => f.debug_tuple("And").field(left).field(right).finish(),
            Condition::Or(left, right) => f.debug_tuple("Or").field(left).field(right).finish(),
        }
    }
}

/// Compare two values.
///
/// Int and Double compare numerically. Strings and bytes order lexicographically. Every
/// other pair supports only equality, and values of different kinds are never equal.
pub fn compare(left: &Value, op: CompareOp, right: &Value) -> bool {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
        (Value::Double(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
        _ => None,
    };

    match op {
        CompareOp::Equal => ordering.map_or_else(|| left == right, Ordering::is_eq),
        CompareOp::NotEqual => ordering.map_or_else(|| left != right, Ordering::is_ne),
        CompareOp::LessThan => ordering.is_some_and(Ordering::is_lt),
        CompareOp::LessThanOrEqual => ordering.is_some_and(Ordering::is_le),
        CompareOp::GreaterThan => ordering.is_some_and(Ordering::is_gt),
        CompareOp::GreaterThanOrEqual => ordering.is_some_and(Ordering::is_ge),
    }
}

/// An editor invocation with an optional guard
pub struct Statement<K: ContextKind> {
    source: String,
    invocation: Invocation<K>,
    condition: Option<Condition<K>>,
}

impl<K: ContextKind> Statement<K> {
    pub fn new(
        source: impl Into<String>,
        invocation: Invocation<K>,
        condition: Option<Condition<K>>,
    ) -> Self {
        Self {
            source: source.into(),
            invocation,
            condition,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn invocation(&self) -> &Invocation<K> {
        &self.invocation
    }

    pub fn condition(&self) -> Option<&Condition<K>> {
        self.condition.as_ref()
    }

    /// Evaluate the guard, then the invocation. Returns whether the invocation ran.
    pub fn execute(&self, ctx: &mut K::Context<'_>) -> Result<bool> {
        if let Some(condition) = &self.condition {
            if !condition.evaluate(ctx)? {
                return Ok(false);
            }
        }
        self.invocation.execute(ctx)?;
        Ok(true)
    }
}

impl<K: ContextKind> fmt::Debug for Statement<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("source", &self.source)
            .field("invocation", &self.invocation)
            .field("condition", &self.condition)
            .finish()
    }
}

/// What happens when a statement fails at evaluation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Log the failure and continue with the next statement.
    Ignore,
    /// Stop evaluating the record and return the failure.
    #[default]
    Propagate,
}

impl fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMode::Ignore => write!(f, "ignore"),
            ErrorMode::Propagate => write!(f, "propagate"),
        }
    }
}

/// Outcome of running a sequence against one context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionSummary {
    /// Statements whose invocation ran.
    pub executed: usize,
    /// Statements skipped by their guard or by the sequence conditions.
    pub skipped: usize,
    /// Failures recorded in ignore mode, each an [`Error::Statement`].
    pub errors: Vec<Error>,
}

impl ExecutionSummary {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Ordered statements sharing one error mode
pub struct StatementSequence<K: ContextKind> {
    statements: Vec<Arc<Statement<K>>>,
    conditions: Vec<Condition<K>>,
    error_mode: ErrorMode,
}

impl<K: ContextKind> StatementSequence<K> {
    pub fn new(statements: Vec<Arc<Statement<K>>>, error_mode: ErrorMode) -> Self {
        Self {
            statements,
            conditions: Vec::new(),
            error_mode,
        }
    }

    /// Gate the whole sequence: statements run only when any condition holds.
    pub fn with_conditions(mut self, conditions: Vec<Condition<K>>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn statements(&self) -> &[Arc<Statement<K>>] {
        &self.statements
    }

    pub fn error_mode(&self) -> ErrorMode {
        self.error_mode
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    fn gate_open(&self, ctx: &mut K::Context<'_>) -> Result<bool> {
        if self.conditions.is_empty() {
            return Ok(true);
        }
        for condition in &self.conditions {
            if condition.evaluate(ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Run every statement in declaration order against one context.
    pub fn execute(&self, ctx: &mut K::Context<'_>) -> Result<ExecutionSummary> {
        let mut summary = ExecutionSummary::default();

        let open = match self.gate_open(ctx) {
            Ok(open) => open,
            Err(err) if self.error_mode == ErrorMode::Ignore => {
                tracing::warn!(context = K::NAME, error = %err, "sequence condition failed");
                summary.errors.push(err);
                false
            }
            Err(err) => return Err(err),
        };
        if !open {
            summary.skipped = self.statements.len();
            return Ok(summary);
        }

        for (index, statement) in self.statements.iter().enumerate() {
            match statement.execute(ctx) {
                Ok(true) => summary.executed += 1,
                Ok(false) => summary.skipped += 1,
                Err(source) => {
                    let err = Error::Statement {
                        index,
                        statement: statement.source().to_string(),
                        source: Box::new(source),
                    };
                    match self.error_mode {
                        ErrorMode::Propagate => return Err(err),
                        ErrorMode::Ignore => {
                            tracing::warn!(
                                context = K::NAME,
                                statement = statement.source(),
                                error = %err,
                                "failed to execute statement"
                            );
                            summary.errors.push(err);
                        }
                    }
                }
            }
        }

        Ok(summary)
    }
}

impl<K: ContextKind> fmt::Debug for StatementSequence<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementSequence")
            .field("statements", &self.statements)
            .field("conditions", &self.conditions)
            .field("error_mode", &self.error_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_comparison_across_kinds() {
        assert!(compare(&Value::Int(1), CompareOp::Equal, &Value::Double(1.0)));
        assert!(compare(&Value::Double(0.5), CompareOp::LessThan, &Value::Int(1)));
        assert!(compare(&Value::Int(3), CompareOp::GreaterThanOrEqual, &Value::Int(3)));
    }

    #[test]
    fn test_mixed_kinds_are_unequal_and_unordered() {
        let s = Value::string("1");
        let i = Value::Int(1);
        assert!(!compare(&s, CompareOp::Equal, &i));
        assert!(compare(&s, CompareOp::NotEqual, &i));
        assert!(!compare(&s, CompareOp::LessThan, &i));
        assert!(!compare(&s, CompareOp::GreaterThanOrEqual, &i));
    }

    #[test]
    fn test_nil_and_bool_equality_only() {
        assert!(compare(&Value::Nil, CompareOp::Equal, &Value::Nil));
        assert!(compare(&Value::Nil, CompareOp::NotEqual, &Value::string("")));
        assert!(compare(&Value::Bool(true), CompareOp::Equal, &Value::Bool(true)));
        assert!(!compare(&Value::Bool(true), CompareOp::GreaterThan, &Value::Bool(false)));
    }

    #[test]
    fn test_string_ordering() {
        assert!(compare(&Value::string("abc"), CompareOp::LessThan, &Value::string("abd")));
        assert!(compare(&Value::Bytes(vec![1]), CompareOp::LessThan, &Value::Bytes(vec![1, 0])));
    }

    #[test]
    fn test_nan_is_unequal() {
        let nan = Value::Double(f64::NAN);
        assert!(!compare(&nan, CompareOp::Equal, &nan));
        assert!(compare(&nan, CompareOp::NotEqual, &nan));
    }

    #[test]
    fn test_error_mode_serde() {
        let mode: ErrorMode = serde_json::from_str("\"ignore\"").unwrap();
        assert_eq!(mode, ErrorMode::Ignore);
        assert_eq!(ErrorMode::default(), ErrorMode::Propagate);
    }
}

//! AST to executable statement compilation
//!
//! Performs every name resolution up front: paths become accessors, enum symbols become
//! integers and function names become bound invocations. Nothing is looked up by name
//! once a statement is compiled.

use crate::accessor::{Accessor, Getter};
use crate::ast::{BoolExpr, InvocationAst, StatementAst, ValueExpr};
use crate::contexts::ContextKind;
use crate::enums::SymbolTable;
use crate::error::{Error, Result};
use crate::functions::{FunctionKind, FunctionRegistry, Invocation};
use crate::statement::{Condition, Statement};

pub struct Compiler<'a, K: ContextKind> {
    functions: &'a FunctionRegistry<K>,
    symbols: &'a SymbolTable,
}

impl<'a, K: ContextKind> Compiler<'a, K> {
    pub fn new(functions: &'a FunctionRegistry<K>, symbols: &'a SymbolTable) -> Self {
        Self { functions, symbols }
    }

    pub fn compile_statement(&self, source: &str, ast: StatementAst) -> Result<Statement<K>> {
        let invocation = self.compile_invocation(ast.invocation, FunctionKind::Editor)?;
        let condition = ast
            .condition
            .map(|condition| self.compile_condition(condition))
            .transpose()?;
        Ok(Statement::new(source, invocation, condition))
    }

    pub fn compile_condition(&self, expr: BoolExpr) -> Result<Condition<K>> {
        Ok(match expr {
            BoolExpr::Term(value) => Condition::Value(self.compile_value(value)?),
            BoolExpr::Comparison { left, op, right } => Condition::Comparison {
                left: self.compile_value(left)?,
                op,
                right: self.compile_value(right)?,
            },
            BoolExpr::Not(inner) => Condition::Not(Box::new(self.compile_condition(*inner)?)),
            BoolExpr::And(left, right) => Condition::And(
                Box::new(self.compile_condition(*left)?),
                Box::new(self.compile_condition(*right)?),
            ),
            BoolExpr::Or(left, right) => Condition::Or(
                Box::new(self.compile_condition(*left)?),
                Box::new(self.compile_condition(*right)?),
            ),
        })
    }

    fn compile_invocation(&self, ast: InvocationAst, expected: FunctionKind) -> Result<Invocation<K>> {
        let metadata = self
            .functions
            .get(&ast.name)
            .ok_or_else(|| Error::FunctionNotFound(ast.name.clone()))?;

        if metadata.kind != expected {
            return Err(Error::invalid_arguments(
                metadata.name,
                format!(
                    "{} `{}` used where {} is required (line {}, column {})",
                    metadata.kind,
                    metadata.name,
                    match expected {
                        FunctionKind::Editor => "an editor",
                        FunctionKind::Converter => "a converter",
                    },
                    ast.line,
                    ast.column
                ),
            ));
        }
        self.functions.validate_args(&ast.name, ast.args.len())?;

        let args = ast
            .args
            .into_iter()
            .map(|arg| self.compile_value(arg))
            .collect::<Result<Vec<_>>>()?;
        self.functions.create(&ast.name, args)
    }

    fn compile_value(&self, expr: ValueExpr) -> Result<Getter<K>> {
        Ok(match expr {
            ValueExpr::Literal(value) => Getter::Literal(value),
            ValueExpr::Path(path) => Getter::Path(Accessor::resolve(path)?),
            ValueExpr::Enum(symbol) => Getter::Enum(self.symbols.resolve(&symbol)?),
            ValueExpr::Invocation(invocation) => {
                Getter::Converter(self.compile_invocation(invocation, FunctionKind::Converter)?)
            }
            ValueExpr::List(items) => Getter::List(
                items
                    .into_iter()
                    .map(|item| self.compile_value(item))
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }
}

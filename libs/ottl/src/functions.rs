//! Function registry and bound invocations
//!
//! A registry maps function names to metadata (kind, arity) and a factory. Factories receive
//! compiled arguments, never raw text, and validate argument shapes before returning an
//! executable [`ExprFunction`]. Arity is checked by the registry before the factory runs.

use crate::accessor::{Accessor, Getter};
use crate::contexts::ContextKind;
use crate::enums::Enum;
use crate::error::{Error, Result};
use crate::value::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Editors mutate the context and may only appear at the top of a statement. Converters
/// compute a value and may only appear as arguments or in conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Editor,
    Converter,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionKind::Editor => write!(f, "editor"),
            FunctionKind::Converter => write!(f, "converter"),
        }
    }
}

/// Function metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionMetadata {
    pub name: &'static str,
    pub kind: FunctionKind,
    pub min_args: usize,
    pub max_args: Option<usize>, // None = unbounded
}

/// Executable body of a bound function.
pub trait ExprFunction<K: ContextKind>: Send + Sync {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value>;
}

/// Builds a function body from compiled arguments.
pub type FunctionFactory<K> = fn(Arguments<K>) -> Result<Box<dyn ExprFunction<K>>>;

/// A bound function call, executable against any context of kind `K`.
pub struct Invocation<K: ContextKind> {
    metadata: FunctionMetadata,
    function: Box<dyn ExprFunction<K>>,
}

impl<K: ContextKind> Invocation<K> {
    pub fn execute(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        self.function.call(ctx)
    }

    pub fn name(&self) -> &'static str {
        self.metadata.name
    }

    pub fn kind(&self) -> FunctionKind {
        self.metadata.kind
    }

    pub fn metadata(&self) -> &FunctionMetadata {
        &self.metadata
    }
}

impl<K: ContextKind> fmt::Debug for Invocation<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("name", &self.metadata.name)
            .field("kind", &self.metadata.kind)
            .finish_non_exhaustive()
    }
}

/// Compiled arguments handed to a factory, consumed front to back.
pub struct Arguments<K: ContextKind> {
    function: &'static str,
    args: VecDeque<Getter<K>>,
    position: usize,
}

impl<K: ContextKind> Arguments<K> {
    pub fn new(function: &'static str, args: Vec<Getter<K>>) -> Self {
        Self {
            function,
            args: args.into(),
            position: 0,
        }
    }

    pub fn function(&self) -> &'static str {
        self.function
    }

    pub fn remaining(&self) -> usize {
        self.args.len()
    }

    pub fn has_next(&self) -> bool {
        !self.args.is_empty()
    }

    fn error(&self, message: impl fmt::Display) -> Error {
        Error::invalid_arguments(
            self.function,
            format!("argument {}: {}", self.position, message),
        )
    }

    fn take(&mut self) -> Result<Getter<K>> {
        self.position += 1;
        self.args
            .pop_front()
            .ok_or_else(|| self.error("missing argument"))
    }

    /// Any value-producing argument.
    pub fn next_getter(&mut self) -> Result<Getter<K>> {
        self.take()
    }

    pub fn optional_getter(&mut self) -> Option<Getter<K>> {
        if self.has_next() {
            self.take().ok()
        } else {
            None
        }
    }

    /// A path argument that the function will write to.
    pub fn next_setter(&mut self) -> Result<Accessor<K>> {
        match self.take()? {
            Getter::Path(accessor) => Ok(accessor),
            other => Err(self.error(format_args!("expected a path, got {:?}", other))),
        }
    }

    pub fn next_string(&mut self) -> Result<String> {
        match self.take()? {
            Getter::Literal(Value::String(s)) => Ok(s),
            other => Err(self.error(format_args!("expected a string literal, got {:?}", other))),
        }
    }

    pub fn next_int(&mut self) -> Result<i64> {
        match self.take()? {
            Getter::Literal(Value::Int(i)) => Ok(i),
            other => Err(self.error(format_args!("expected an int literal, got {:?}", other))),
        }
    }

    pub fn next_bool(&mut self) -> Result<bool> {
        match self.take()? {
            Getter::Literal(Value::Bool(b)) => Ok(b),
            other => Err(self.error(format_args!("expected a bool literal, got {:?}", other))),
        }
    }

    pub fn optional_bool(&mut self, default: bool) -> Result<bool> {
        if self.has_next() {
            self.next_bool()
        } else {
            Ok(default)
        }
    }

    /// A list of string literals.
    pub fn next_string_list(&mut self) -> Result<Vec<String>> {
        let items = match self.take()? {
            Getter::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Getter::Literal(Value::String(s)) => Some(s),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>(),
            Getter::Literal(Value::List(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>(),
            _ => None,
        };
        items.ok_or_else(|| self.error("expected a list of string literals"))
    }

    /// An enum symbol, or an int literal standing in for one.
    pub fn next_enum(&mut self) -> Result<Enum> {
        match self.take()? {
            Getter::Enum(value) | Getter::Literal(Value::Int(value)) => Ok(value),
            other => Err(self.error(format_args!("expected an enum, got {:?}", other))),
        }
    }
}

struct RegisteredFunction<K: ContextKind> {
    metadata: FunctionMetadata,
    factory: FunctionFactory<K>,
}

impl<K: ContextKind> Clone for RegisteredFunction<K> {
    fn clone(&self) -> Self {
        Self {
            metadata: self.metadata,
            factory: self.factory,
        }
    }
}

/// Function registry for one context kind
pub struct FunctionRegistry<K: ContextKind> {
    functions: HashMap<&'static str, RegisteredFunction<K>>,
}

impl<K: ContextKind> FunctionRegistry<K> {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Register a function, replacing any previous entry of the same name.
    pub fn register(&mut self, metadata: FunctionMetadata, factory: FunctionFactory<K>) {
        self.functions
            .insert(metadata.name, RegisteredFunction { metadata, factory });
    }

    pub fn extend(&mut self, other: FunctionRegistry<K>) {
        self.functions.extend(other.functions);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionMetadata> {
        self.functions.get(name).map(|f| &f.metadata)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Get all registered function names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Validate function call arguments
    pub fn validate_args(&self, name: &str, arg_count: usize) -> Result<()> {
        let metadata = self
            .get(name)
            .ok_or_else(|| Error::FunctionNotFound(name.to_string()))?;

        if arg_count < metadata.min_args {
            return Err(Error::invalid_arguments(
                metadata.name,
                format!(
                    "Function {} requires at least {} arguments, got {}",
                    metadata.name, metadata.min_args, arg_count
                ),
            ));
        }

        if let Some(max) = metadata.max_args {
            if arg_count > max {
                return Err(Error::invalid_arguments(
                    metadata.name,
                    format!(
                        "Function {} takes at most {} arguments, got {}",
                        metadata.name, max, arg_count
                    ),
                ));
            }
        }

        Ok(())
    }

    /// Check arity, then run the factory on the compiled arguments.
    pub fn create(&self, name: &str, args: Vec<Getter<K>>) -> Result<Invocation<K>> {
        let registered = self
            .functions
            .get(name)
            .ok_or_else(|| Error::FunctionNotFound(name.to_string()))?;
        self.validate_args(name, args.len())?;

        let metadata = registered.metadata;
        let function = (registered.factory)(Arguments::new(metadata.name, args))?;
        Ok(Invocation { metadata, function })
    }
}

impl<K: ContextKind> Default for FunctionRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ContextKind> Clone for FunctionRegistry<K> {
    fn clone(&self) -> Self {
        Self {
            functions: self.functions.clone(),
        }
    }
}

impl<K: ContextKind> fmt::Debug for FunctionRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("kind", &K::NAME)
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::LogKind;

    struct Constant(Value);

    impl<K: ContextKind> ExprFunction<K> for Constant {
        fn call(&self, _ctx: &mut K::Context<'_>) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    fn answer(mut args: Arguments<LogKind>) -> Result<Box<dyn ExprFunction<LogKind>>> {
        let value = args.next_int().unwrap_or(42);
        Ok(Box::new(Constant(Value::Int(value))))
    }

    fn registry() -> FunctionRegistry<LogKind> {
        let mut registry = FunctionRegistry::new();
        registry.register(
            FunctionMetadata {
                name: "Answer",
                kind: FunctionKind::Converter,
                min_args: 0,
                max_args: Some(1),
            },
            answer,
        );
        registry
    }

    #[test]
    fn test_function_argument_validation() {
        let registry = registry();
        assert!(registry.validate_args("Answer", 0).is_ok());
        assert!(registry.validate_args("Answer", 1).is_ok());

        let err = registry.validate_args("Answer", 2).unwrap_err();
        assert!(err.to_string().contains("takes at most 1 arguments, got 2"));

        assert!(matches!(
            registry.validate_args("Missing", 0),
            Err(Error::FunctionNotFound(_))
        ));
    }

    #[test]
    fn test_create_checks_arity_before_factory() {
        let registry = registry();
        let args = vec![Getter::Literal(Value::Int(1)), Getter::Literal(Value::Int(2))];
        assert!(matches!(
            registry.create("Answer", args),
            Err(Error::InvalidArguments { .. })
        ));

        let invocation = registry.create("Answer", Vec::new()).unwrap();
        assert_eq!(invocation.name(), "Answer");
        assert_eq!(invocation.kind(), FunctionKind::Converter);
    }

    #[test]
    fn test_arguments_shapes() {
        let mut args = Arguments::<LogKind>::new(
            "f",
            vec![
                Getter::Literal(Value::string("x")),
                Getter::List(vec![Getter::Literal(Value::string("a"))]),
                Getter::Enum(3),
                Getter::Literal(Value::Bool(true)),
            ],
        );
        assert_eq!(args.next_string().unwrap(), "x");
        assert_eq!(args.next_string_list().unwrap(), vec!["a".to_string()]);
        assert_eq!(args.next_enum().unwrap(), 3);
        assert!(args.next_string().is_err());
        assert!(!args.has_next());
        assert!(!args.optional_bool(false).unwrap());
    }
}

//! Lumen OTTL - a transformation language over OTLP telemetry records
//!
//! Statements such as `set(attributes["env"], "prod") where name == "GET /"` are compiled
//! once per pipeline stage and then run against every record of one shape.
//!
//! # Architecture Overview
//!
//! ```text
//! Statement String
//!      |
//!   Parser -> AST
//!      |
//! Compiler -> Statement (paths bound to accessors, enums to integers,
//!      |                  function names to invocations)
//!      |
//! Context (one per record) -> StatementSequence::execute
//! ```
//!
//! Each record shape is a [`ContextKind`]: resource, metric, data point, log or span. A kind
//! decides which paths and enum symbols exist; an [`Engine`] compiles statements for one kind.

pub mod accessor;
pub mod ast;
pub mod compiler;
pub mod contexts;
pub mod engine;
pub mod enums;
pub mod error;
pub mod funcs;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod path;
pub mod statement;
pub mod token;
pub mod value;

// Re-export main types
pub use accessor::{Accessor, Getter};
pub use contexts::{
    ContextKind, DataPointContext, DataPointKind, LogContext, LogKind, MetricContext, MetricKind,
    ResourceContext, ResourceKind, ScopedContext, SpanContext, SpanKind, TransformContext,
};
pub use engine::Engine;
pub use enums::{Enum, SymbolTable};
pub use error::{Error, Result};
pub use functions::{
    Arguments, ExprFunction, FunctionFactory, FunctionKind, FunctionMetadata, FunctionRegistry,
    Invocation,
};
pub use path::{Field, Path};
pub use statement::{Condition, ErrorMode, ExecutionSummary, Statement, StatementSequence};
pub use value::{Map, Value};

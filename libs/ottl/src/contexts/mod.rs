//! Context kinds
//!
//! A context kind is the statement dialect for one record shape. It decides which paths
//! exist, how they resolve, which enum symbols are in scope and how a resolved path reads
//! and writes a live record. Kinds are zero-sized markers; the per-record state lives in
//! the kind's [`ContextKind::Context`] type, which borrows the record and its ancestry for
//! one evaluation pass and owns a fresh cache.

mod common;
pub mod datapoint;
pub mod log;
pub mod metric;
pub mod resource;
pub mod span;

use crate::enums::SymbolTable;
use crate::error::Result;
use crate::functions::FunctionRegistry;
use crate::path::Path;
use crate::value::{Map, Value};
use opentelemetry_proto::tonic::common::v1::InstrumentationScope;
use opentelemetry_proto::tonic::resource::v1::Resource;
use std::fmt;

pub use common::{CommonPath, IdForm, ResourcePath, ScopePath};
pub use datapoint::{
    BucketsPath, DataPointContext, DataPointKind, DataPointMut, DataPointPath, DataPointRef,
    PointField,
};
pub use log::{LogContext, LogField, LogKind, LogPath};
pub use metric::{metric_type, MetricContext, MetricKind, MetricKindPath, MetricPath};
pub use resource::{ResourceContext, ResourceKind, ResourceKindPath};
pub use span::{SpanContext, SpanField, SpanKind, SpanPath, StatusPath};

/// Facets shared by every per-record context.
///
/// The resource is optional in OTLP; a missing resource reads as absent and is created on
/// first write.
pub trait TransformContext {
    fn resource(&self) -> Option<&Resource>;
    fn resource_mut(&mut self) -> &mut Resource;
    fn cache(&self) -> &Map;
    fn cache_mut(&mut self) -> &mut Map;
}

/// Contexts whose subject lives inside an instrumentation scope.
pub trait ScopedContext: TransformContext {
    fn instrumentation_scope(&self) -> Option<&InstrumentationScope>;
    fn instrumentation_scope_mut(&mut self) -> &mut InstrumentationScope;
}

/// A statement dialect bound to one record shape.
pub trait ContextKind: fmt::Debug + Sized + Send + Sync + 'static {
    /// Name used in configuration and diagnostics.
    const NAME: &'static str;

    /// Per-record evaluation state.
    type Context<'a>: TransformContext;

    /// Resolved target of a path. Owns no record data.
    type Path: fmt::Debug + Clone + PartialEq + Send + Sync;

    /// Resolve a path once, at compile time.
    fn parse_path(path: &Path) -> Result<Self::Path>;

    /// Default enum symbols for this kind.
    fn symbols() -> &'static SymbolTable;

    /// Built-in functions available to this kind.
    fn default_functions() -> FunctionRegistry<Self> {
        crate::funcs::standard_functions()
    }

    fn get(ctx: &Self::Context<'_>, path: &Self::Path) -> Result<Value>;

    fn set(ctx: &mut Self::Context<'_>, path: &Self::Path, value: Value) -> Result<()>;
}

//! Log record context.

use super::common::{
    get_attributes, get_common, get_id, parse_common_path, parse_id_form, set_attributes,
    set_common, set_id, to_i32, to_u32, to_u64, u64_value, CommonPath, IdForm, SPAN_ID_LEN,
    TRACE_ID_LEN,
};
use super::{ContextKind, ScopedContext, TransformContext};
use crate::enums::{SymbolTable, LOG_SYMBOLS};
use crate::error::Result;
use crate::path::{Field, Path, Segments};
use crate::value::{from_optional_any, Map, Value};
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope};
use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::resource::v1::Resource;
use phf::phf_map;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogPath {
    Common(CommonPath),
    Log(LogField),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogField {
    TimeUnixNano,
    ObservedTimeUnixNano,
    SeverityNumber,
    SeverityText,
    Body,
    Attributes(Option<String>),
    DroppedAttributesCount,
    Flags,
    TraceId(IdForm),
    SpanId(IdForm),
}

static LOG_FIELDS: phf::Map<&'static str, LogField> = phf_map! {
    "time_unix_nano" => LogField::TimeUnixNano,
    "observed_time_unix_nano" => LogField::ObservedTimeUnixNano,
    "severity_number" => LogField::SeverityNumber,
    "severity_text" => LogField::SeverityText,
    "body" => LogField::Body,
    "dropped_attributes_count" => LogField::DroppedAttributesCount,
    "flags" => LogField::Flags,
};

fn parse_log_field(field: &Field, segments: &mut Segments<'_>) -> Result<LogField> {
    match field.name.as_str() {
        "attributes" => {
            segments.finish()?;
            Ok(LogField::Attributes(field.key.clone()))
        }
        "trace_id" => parse_id_form(field, segments).map(LogField::TraceId),
        "span_id" => parse_id_form(field, segments).map(LogField::SpanId),
        name => match LOG_FIELDS.get(name) {
            Some(leaf) => segments.leaf(field, leaf.clone()),
            None => Err(segments.unresolved(field)),
        },
    }
}

fn get_log_field(log: &LogRecord, field: &LogField) -> Value {
    match field {
        LogField::TimeUnixNano => u64_value(log.time_unix_nano),
        LogField::ObservedTimeUnixNano => u64_value(log.observed_time_unix_nano),
        LogField::SeverityNumber => Value::Int(log.severity_number.into()),
        LogField::SeverityText => Value::string(log.severity_text.as_str()),
        LogField::Body => from_optional_any(log.body.as_ref()),
        LogField::Attributes(key) => get_attributes(&log.attributes, key.as_deref()),
        LogField::DroppedAttributesCount => Value::Int(log.dropped_attributes_count.into()),
        LogField::Flags => Value::Int(log.flags.into()),
        LogField::TraceId(form) => get_id(&log.trace_id, *form),
        LogField::SpanId(form) => get_id(&log.span_id, *form),
    }
}

fn set_log_field(log: &mut LogRecord, field: &LogField, value: Value) -> Result<()> {
    match field {
        LogField::TimeUnixNano => {
            if let Some(n) = to_u64(&value) {
                log.time_unix_nano = n;
            }
        }
        LogField::ObservedTimeUnixNano => {
            if let Some(n) = to_u64(&value) {
                log.observed_time_unix_nano = n;
            }
        }
        LogField::SeverityNumber => {
            if let Some(n) = to_i32(&value) {
                log.severity_number = n;
            }
        }
        LogField::SeverityText => {
            if let Value::String(s) = value {
                log.severity_text = s;
            }
        }
        LogField::Body => {
            if !value.is_nil() {
                log.body = Some(AnyValue::from(value));
            }
        }
        LogField::Attributes(key) => set_attributes(&mut log.attributes, key.as_deref(), value),
        LogField::DroppedAttributesCount => {
            if let Some(n) = to_u32(&value) {
                log.dropped_attributes_count = n;
            }
        }
        LogField::Flags => {
            if let Some(n) = to_u32(&value) {
                log.flags = n;
            }
        }
        LogField::TraceId(form) => set_id(&mut log.trace_id, TRACE_ID_LEN, *form, value)?,
        LogField::SpanId(form) => set_id(&mut log.span_id, SPAN_ID_LEN, *form, value)?,
    }
    Ok(())
}

/// Evaluation state for one log record.
pub struct LogContext<'a> {
    log: &'a mut LogRecord,
    scope: &'a mut Option<InstrumentationScope>,
    resource: &'a mut Option<Resource>,
    cache: Map,
}

impl<'a> LogContext<'a> {
    pub fn new(
        log: &'a mut LogRecord,
        scope: &'a mut Option<InstrumentationScope>,
        resource: &'a mut Option<Resource>,
    ) -> Self {
        Self {
            log,
            scope,
            resource,
            cache: Map::new(),
        }
    }

    pub fn log_record(&self) -> &LogRecord {
        &*self.log
    }

    pub fn log_record_mut(&mut self) -> &mut LogRecord {
        &mut *self.log
    }
}

impl TransformContext for LogContext<'_> {
    fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    fn resource_mut(&mut self) -> &mut Resource {
        self.resource.get_or_insert_with(Resource::default)
    }

    fn cache(&self) -> &Map {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut Map {
        &mut self.cache
    }
}

impl ScopedContext for LogContext<'_> {
    fn instrumentation_scope(&self) -> Option<&InstrumentationScope> {
        self.scope.as_ref()
    }

    fn instrumentation_scope_mut(&mut self) -> &mut InstrumentationScope {
        self.scope.get_or_insert_with(InstrumentationScope::default)
    }
}

/// Statements evaluated once per log record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogKind;

impl ContextKind for LogKind {
    const NAME: &'static str = "log";

    type Context<'a> = LogContext<'a>;
    type Path = LogPath;

    fn parse_path(path: &Path) -> Result<LogPath> {
        let mut segments = Segments::new(path);
        let field = segments.expect_next()?;
        if let Some(common) = parse_common_path(field, &mut segments)? {
            return Ok(LogPath::Common(common));
        }
        parse_log_field(field, &mut segments).map(LogPath::Log)
    }

    fn symbols() -> &'static SymbolTable {
        static SYMBOLS: OnceLock<SymbolTable> = OnceLock::new();
        SYMBOLS.get_or_init(|| SymbolTable::from(&LOG_SYMBOLS))
    }

    fn get(ctx: &LogContext<'_>, path: &LogPath) -> Result<Value> {
        Ok(match path {
            LogPath::Common(path) => get_common(ctx, path),
            LogPath::Log(field) => get_log_field(&*ctx.log, field),
        })
    }

    fn set(ctx: &mut LogContext<'_>, path: &LogPath, value: Value) -> Result<()> {
        match path {
            LogPath::Common(path) => {
                set_common(ctx, path, value);
                Ok(())
            }
            LogPath::Log(field) => set_log_field(&mut *ctx.log, field, value),
        }
    }
}

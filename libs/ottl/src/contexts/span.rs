//! Span context.

use super::common::{
    get_attributes, get_common, get_id, list_of, map_field, parse_common_path, parse_id_form, set_attributes,
    set_common, set_id, to_bytes, to_i32, to_string, to_u32, to_u64, u64_value, CommonPath, IdForm,
    SPAN_ID_LEN, TRACE_ID_LEN,
};
use super::{ContextKind, ScopedContext, TransformContext};
use crate::enums::{SymbolTable, SPAN_SYMBOLS};
use crate::error::Result;
use crate::path::{Field, Path, Segments};
use crate::value::{attributes_to_map, map_to_attributes, Map, Value};
use opentelemetry_proto::tonic::common::v1::InstrumentationScope;
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{
    span::{Event, Link},
    Span, Status,
};
use phf::phf_map;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanPath {
    Common(CommonPath),
    Span(SpanField),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanField {
    TraceId(IdForm),
    SpanId(IdForm),
    ParentSpanId(IdForm),
    TraceState(Option<String>),
    Name,
    Kind,
    StartTimeUnixNano,
    EndTimeUnixNano,
    Attributes(Option<String>),
    DroppedAttributesCount,
    Events,
    DroppedEventsCount,
    Links,
    DroppedLinksCount,
    Status(StatusPath),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPath {
    Status,
    Code,
    Message,
}

static SPAN_FIELDS: phf::Map<&'static str, SpanField> = phf_map! {
    "name" => SpanField::Name,
    "kind" => SpanField::Kind,
    "start_time_unix_nano" => SpanField::StartTimeUnixNano,
    "end_time_unix_nano" => SpanField::EndTimeUnixNano,
    "dropped_attributes_count" => SpanField::DroppedAttributesCount,
    "events" => SpanField::Events,
    "dropped_events_count" => SpanField::DroppedEventsCount,
    "links" => SpanField::Links,
    "dropped_links_count" => SpanField::DroppedLinksCount,
};

fn parse_span_field(field: &Field, segments: &mut Segments<'_>) -> Result<SpanField> {
    match field.name.as_str() {
        "attributes" => {
            segments.finish()?;
            Ok(SpanField::Attributes(field.key.clone()))
        }
        "trace_state" => {
            segments.finish()?;
            Ok(SpanField::TraceState(field.key.clone()))
        }
        "trace_id" => parse_id_form(field, segments).map(SpanField::TraceId),
        "span_id" => parse_id_form(field, segments).map(SpanField::SpanId),
        "parent_span_id" => parse_id_form(field, segments).map(SpanField::ParentSpanId),
        "status" => {
            segments.unkeyed(field)?;
            let status = match segments.next() {
                None => StatusPath::Status,
                Some(member) if member.name == "code" => segments.leaf(member, StatusPath::Code)?,
                Some(member) if member.name == "message" => {
                    segments.leaf(member, StatusPath::Message)?
                }
                Some(member) => return Err(segments.unresolved(member)),
            };
            Ok(SpanField::Status(status))
        }
        name => match SPAN_FIELDS.get(name) {
            Some(leaf) => segments.leaf(field, leaf.clone()),
            None => Err(segments.unresolved(field)),
        },
    }
}

// ============================================================================
// W3C trace state
// ============================================================================

fn trace_state_entries(state: &str) -> impl Iterator<Item = (&str, &str)> {
    state
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| entry.split_once('='))
}

fn get_trace_state(state: &str, key: Option<&str>) -> Value {
    match key {
        None => Value::string(state),
        Some(key) => trace_state_entries(state)
            .find(|(k, _)| *k == key)
            .map(|(_, v)| Value::string(v))
            .unwrap_or_default(),
    }
}

/// Replace the value of one `key=value` member, leaving every other byte of the state as it
/// was. A new key is prepended.
fn set_trace_state_entry(state: &str, key: &str, value: &str) -> String {
    let mut start = 0;
    for member in state.split(',') {
        let trimmed = member.trim();
        let offset = start + (member.len() - member.trim_start().len());
        if let Some((k, v)) = trimmed.split_once('=') {
            if k == key {
                let value_start = offset + k.len() + 1;
                let value_end = value_start + v.len();
                return format!("{}{}{}", &state[..value_start], value, &state[value_end..]);
            }
        }
        start += member.len() + 1;
    }

    if state.trim().is_empty() {
        format!("{}={}", key, value)
    } else {
        format!("{}={},{}", key, value, state)
    }
}

// ============================================================================
// Structured members
// ============================================================================

fn event_to_value(event: &Event) -> Value {
    let mut map = Map::new();
    map.insert("time_unix_nano".into(), u64_value(event.time_unix_nano));
    map.insert("name".into(), Value::string(event.name.as_str()));
    map.insert("attributes".into(), Value::Map(attributes_to_map(&event.attributes)));
    map.insert(
        "dropped_attributes_count".into(),
        Value::Int(event.dropped_attributes_count.into()),
    );
    Value::Map(map)
}

fn event_from_value(value: &Value) -> Option<Event> {
    let map = value.as_map()?;
    Some(Event {
        time_unix_nano: map_field(map, "time_unix_nano", to_u64)?,
        name: map_field(map, "name", to_string)?,
        attributes: map_to_attributes(map_field(map, "attributes", |v| v.as_map().cloned())?),
        dropped_attributes_count: map_field(map, "dropped_attributes_count", to_u32)?,
    })
}

fn link_to_value(link: &Link) -> Value {
    let mut map = Map::new();
    map.insert("trace_id".into(), Value::Bytes(link.trace_id.clone()));
    map.insert("span_id".into(), Value::Bytes(link.span_id.clone()));
    map.insert("trace_state".into(), Value::string(link.trace_state.as_str()));
    map.insert("attributes".into(), Value::Map(attributes_to_map(&link.attributes)));
    map.insert(
        "dropped_attributes_count".into(),
        Value::Int(link.dropped_attributes_count.into()),
    );
    map.insert("flags".into(), Value::Int(link.flags.into()));
    Value::Map(map)
}

fn link_from_value(value: &Value) -> Option<Link> {
    let map = value.as_map()?;
    Some(Link {
        trace_id: map_field(map, "trace_id", to_bytes)?,
        span_id: map_field(map, "span_id", to_bytes)?,
        trace_state: map_field(map, "trace_state", to_string)?,
        attributes: map_to_attributes(map_field(map, "attributes", |v| v.as_map().cloned())?),
        dropped_attributes_count: map_field(map, "dropped_attributes_count", to_u32)?,
        flags: map_field(map, "flags", to_u32)?,
    })
}

fn get_status(status: Option<&Status>, path: StatusPath) -> Value {
    let Some(status) = status else {
        return Value::Nil;
    };
    match path {
        StatusPath::Status => {
            let mut map = Map::new();
            map.insert("code".into(), Value::Int(status.code.into()));
            map.insert("message".into(), Value::string(status.message.as_str()));
            Value::Map(map)
        }
        StatusPath::Code => Value::Int(status.code.into()),
        StatusPath::Message => Value::string(status.message.as_str()),
    }
}

fn set_status(status: &mut Option<Status>, path: StatusPath, value: Value) {
    match (path, value) {
        (StatusPath::Status, Value::Map(map)) => {
            let (Some(code), Some(message)) = (
                map_field(&map, "code", to_i32),
                map_field(&map, "message", to_string),
            ) else {
                return;
            };
            *status = Some(Status { code, message });
        }
        (StatusPath::Code, value) => {
            if let Some(code) = to_i32(&value) {
                status.get_or_insert_with(Status::default).code = code;
            }
        }
        (StatusPath::Message, Value::String(message)) => {
            status.get_or_insert_with(Status::default).message = message;
        }
        _ => {}
    }
}

fn get_span_field(span: &Span, field: &SpanField) -> Value {
    match field {
        SpanField::TraceId(form) => get_id(&span.trace_id, *form),
        SpanField::SpanId(form) => get_id(&span.span_id, *form),
        SpanField::ParentSpanId(form) => get_id(&span.parent_span_id, *form),
        SpanField::TraceState(key) => get_trace_state(&span.trace_state, key.as_deref()),
        SpanField::Name => Value::string(span.name.as_str()),
        SpanField::Kind => Value::Int(span.kind.into()),
        SpanField::StartTimeUnixNano => u64_value(span.start_time_unix_nano),
        SpanField::EndTimeUnixNano => u64_value(span.end_time_unix_nano),
        SpanField::Attributes(key) => get_attributes(&span.attributes, key.as_deref()),
        SpanField::DroppedAttributesCount => Value::Int(span.dropped_attributes_count.into()),
        SpanField::Events => Value::List(span.events.iter().map(event_to_value).collect()),
        SpanField::DroppedEventsCount => Value::Int(span.dropped_events_count.into()),
        SpanField::Links => Value::List(span.links.iter().map(link_to_value).collect()),
        SpanField::DroppedLinksCount => Value::Int(span.dropped_links_count.into()),
        SpanField::Status(path) => get_status(span.status.as_ref(), *path),
    }
}

fn set_span_field(span: &mut Span, field: &SpanField, value: Value) -> Result<()> {
    match field {
        SpanField::TraceId(form) => set_id(&mut span.trace_id, TRACE_ID_LEN, *form, value)?,
        SpanField::SpanId(form) => set_id(&mut span.span_id, SPAN_ID_LEN, *form, value)?,
        SpanField::ParentSpanId(form) => {
            set_id(&mut span.parent_span_id, SPAN_ID_LEN, *form, value)?
        }
        SpanField::TraceState(key) => {
            if let Value::String(s) = value {
                span.trace_state = match key {
                    Some(key) => set_trace_state_entry(&span.trace_state, key, &s),
                    None => s,
                };
            }
        }
        SpanField::Name => {
            if let Value::String(s) = value {
                span.name = s;
            }
        }
        SpanField::Kind => {
            if let Some(kind) = to_i32(&value) {
                span.kind = kind;
            }
        }
        SpanField::StartTimeUnixNano => {
            if let Some(n) = to_u64(&value) {
                span.start_time_unix_nano = n;
            }
        }
        SpanField::EndTimeUnixNano => {
            if let Some(n) = to_u64(&value) {
                span.end_time_unix_nano = n;
            }
        }
        SpanField::Attributes(key) => set_attributes(&mut span.attributes, key.as_deref(), value),
        SpanField::DroppedAttributesCount => {
            if let Some(n) = to_u32(&value) {
                span.dropped_attributes_count = n;
            }
        }
        SpanField::Events => {
            if let Some(events) = list_of(&value, event_from_value) {
                span.events = events;
            }
        }
        SpanField::DroppedEventsCount => {
            if let Some(n) = to_u32(&value) {
                span.dropped_events_count = n;
            }
        }
        SpanField::Links => {
            if let Some(links) = list_of(&value, link_from_value) {
                span.links = links;
            }
        }
        SpanField::DroppedLinksCount => {
            if let Some(n) = to_u32(&value) {
                span.dropped_links_count = n;
            }
        }
        SpanField::Status(path) => set_status(&mut span.status, *path, value),
    }
    Ok(())
}

/// Evaluation state for one span.
pub struct SpanContext<'a> {
    span: &'a mut Span,
    scope: &'a mut Option<InstrumentationScope>,
    resource: &'a mut Option<Resource>,
    cache: Map,
}

impl<'a> SpanContext<'a> {
    pub fn new(
        span: &'a mut Span,
        scope: &'a mut Option<InstrumentationScope>,
        resource: &'a mut Option<Resource>,
    ) -> Self {
        Self {
            span,
            scope,
            resource,
            cache: Map::new(),
        }
    }

    pub fn span(&self) -> &Span {
        &*self.span
    }

    pub fn span_mut(&mut self) -> &mut Span {
        &mut *self.span
    }
}

impl TransformContext for SpanContext<'_> {
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

impl ScopedContext for SpanContext<'_> {
    fn instrumentation_scope(&self) -> Option<&InstrumentationScope> {
        self.scope.as_ref()
    }

    fn instrumentation_scope_mut(&mut self) -> &mut InstrumentationScope {
        self.scope.get_or_insert_with(InstrumentationScope::default)
    }
}

/// Statements evaluated once per span.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanKind;

impl ContextKind for SpanKind {
    const NAME: &'static str = "span";

    type Context<'a> = SpanContext<'a>;
    type Path = SpanPath;

    fn parse_path(path: &Path) -> Result<SpanPath> {
        let mut segments = Segments::new(path);
        let field = segments.expect_next()?;
        if let Some(common) = parse_common_path(field, &mut segments)? {
            return Ok(SpanPath::Common(common));
        }
        parse_span_field(field, &mut segments).map(SpanPath::Span)
    }

    fn symbols() -> &'static SymbolTable {
        static SYMBOLS: OnceLock<SymbolTable> = OnceLock::new();
        SYMBOLS.get_or_init(|| SymbolTable::from(&SPAN_SYMBOLS))
    }

    fn get(ctx: &SpanContext<'_>, path: &SpanPath) -> Result<Value> {
        Ok(match path {
            SpanPath::Common(path) => get_common(ctx, path),
            SpanPath::Span(field) => get_span_field(&*ctx.span, field),
        })
    }

    fn set(ctx: &mut SpanContext<'_>, path: &SpanPath, value: Value) -> Result<()> {
        match path {
            SpanPath::Common(path) => {
                set_common(ctx, path, value);
                Ok(())
            }
            SpanPath::Span(field) => set_span_field(&mut *ctx.span, field, value),
        }
    }
}

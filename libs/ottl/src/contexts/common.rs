//! Paths shared by every context kind: cache, resource and instrumentation scope, plus
//! the attribute, id and numeric conversions the kind-specific accessors build on.

use super::ScopedContext;
use crate::error::{Error, Result};
use crate::path::{Field, Segments};
use crate::value::{attributes_to_map, get_attribute, map_to_attributes, set_attribute, Map, Value};
use opentelemetry_proto::tonic::common::v1::{InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::resource::v1::Resource;

/// Paths every scoped kind resolves the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonPath {
    Cache(Option<String>),
    Resource(ResourcePath),
    Scope(ScopePath),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourcePath {
    Resource,
    Attributes(Option<String>),
    DroppedAttributesCount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopePath {
    Scope,
    Name,
    Version,
    Attributes(Option<String>),
    DroppedAttributesCount,
}

/// Raw bytes or the lowercase hex `.string` form of a trace or span id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdForm {
    Bytes,
    Hex,
}

pub(crate) const TRACE_ID_LEN: usize = 16;
pub(crate) const SPAN_ID_LEN: usize = 8;

/// Resolve `cache`, `resource.*` and `instrumentation_scope.*`. Returns `None` for any
/// other first segment so the caller can try its own table.
pub(crate) fn parse_common_path(
    field: &Field,
    segments: &mut Segments<'_>,
) -> Result<Option<CommonPath>> {
    let path = match field.name.as_str() {
        "cache" => {
            segments.finish()?;
            CommonPath::Cache(field.key.clone())
        }
        "resource" => {
            segments.unkeyed(field)?;
            CommonPath::Resource(match segments.next() {
                None => ResourcePath::Resource,
                Some(member) => parse_resource_member(member, segments)?,
            })
        }
        "instrumentation_scope" => {
            segments.unkeyed(field)?;
            CommonPath::Scope(match segments.next() {
                None => ScopePath::Scope,
                Some(member) => parse_scope_member(member, segments)?,
            })
        }
        _ => return Ok(None),
    };
    Ok(Some(path))
}

pub(crate) fn parse_resource_member(
    field: &Field,
    segments: &mut Segments<'_>,
) -> Result<ResourcePath> {
    match field.name.as_str() {
        "attributes" => {
            segments.finish()?;
            Ok(ResourcePath::Attributes(field.key.clone()))
        }
        "dropped_attributes_count" => segments.leaf(field, ResourcePath::DroppedAttributesCount),
        _ => Err(segments.unresolved(field)),
    }
}

fn parse_scope_member(field: &Field, segments: &mut Segments<'_>) -> Result<ScopePath> {
    match field.name.as_str() {
        "name" => segments.leaf(field, ScopePath::Name),
        "version" => segments.leaf(field, ScopePath::Version),
        "attributes" => {
            segments.finish()?;
            Ok(ScopePath::Attributes(field.key.clone()))
        }
        "dropped_attributes_count" => segments.leaf(field, ScopePath::DroppedAttributesCount),
        _ => Err(segments.unresolved(field)),
    }
}

pub(crate) fn get_common<C: ScopedContext>(ctx: &C, path: &CommonPath) -> Value {
    match path {
        CommonPath::Cache(key) => get_cache(ctx.cache(), key.as_deref()),
        CommonPath::Resource(path) => get_resource(ctx.resource(), path),
        CommonPath::Scope(path) => get_scope(ctx.instrumentation_scope(), path),
    }
}

pub(crate) fn set_common<C: ScopedContext>(ctx: &mut C, path: &CommonPath, value: Value) {
    match path {
        CommonPath::Cache(key) => set_cache(ctx.cache_mut(), key.as_deref(), value),
        // Nil never writes, so a missing resource or scope is not created by a no-op.
        CommonPath::Resource(_) | CommonPath::Scope(_) if value.is_nil() => {}
        CommonPath::Resource(path) => set_resource(ctx.resource_mut(), path, value),
        CommonPath::Scope(path) => set_scope(ctx.instrumentation_scope_mut(), path, value),
    }
}

// ============================================================================
// Cache and attributes
// ============================================================================

pub(crate) fn get_cache(cache: &Map, key: Option<&str>) -> Value {
    match key {
        Some(key) => cache.get(key).cloned().unwrap_or_default(),
        None => Value::Map(cache.clone()),
    }
}

pub(crate) fn set_cache(cache: &mut Map, key: Option<&str>, value: Value) {
    match (key, value) {
        (Some(key), value) => {
            cache.insert(key.to_string(), value);
        }
        (None, Value::Map(map)) => *cache = map,
        (None, _) => {}
    }
}

pub(crate) fn get_attributes(attributes: &[KeyValue], key: Option<&str>) -> Value {
    match key {
        Some(key) => get_attribute(attributes, key),
        None => Value::Map(attributes_to_map(attributes)),
    }
}

pub(crate) fn set_attributes(attributes: &mut Vec<KeyValue>, key: Option<&str>, value: Value) {
    match (key, value) {
        (_, Value::Nil) => {}
        (Some(key), value) => set_attribute(attributes, key, value),
        (None, Value::Map(map)) => *attributes = map_to_attributes(map),
        (None, _) => {}
    }
}

// ============================================================================
// Resource and instrumentation scope
// ============================================================================

pub(crate) fn resource_to_value(resource: &Resource) -> Value {
    let mut map = Map::new();
    map.insert(
        "attributes".into(),
        Value::Map(attributes_to_map(&resource.attributes)),
    );
    map.insert(
        "dropped_attributes_count".into(),
        Value::Int(resource.dropped_attributes_count.into()),
    );
    Value::Map(map)
}

pub(crate) fn get_resource(resource: Option<&Resource>, path: &ResourcePath) -> Value {
    let Some(resource) = resource else {
        return Value::Nil;
    };
    match path {
        ResourcePath::Resource => resource_to_value(resource),
        ResourcePath::Attributes(key) => get_attributes(&resource.attributes, key.as_deref()),
        ResourcePath::DroppedAttributesCount => Value::Int(resource.dropped_attributes_count.into()),
    }
}

pub(crate) fn set_resource(resource: &mut Resource, path: &ResourcePath, value: Value) {
    match path {
        ResourcePath::Resource => {
            let Value::Map(map) = value else { return };
            let (Some(attributes), Some(dropped)) = (
                map_field(&map, "attributes", |v| v.as_map().cloned()),
                map_field(&map, "dropped_attributes_count", to_u32),
            ) else {
                return;
            };
            resource.attributes = map_to_attributes(attributes);
            resource.dropped_attributes_count = dropped;
        }
        ResourcePath::Attributes(key) => {
            set_attributes(&mut resource.attributes, key.as_deref(), value)
        }
        ResourcePath::DroppedAttributesCount => {
            if let Some(n) = to_u32(&value) {
                resource.dropped_attributes_count = n;
            }
        }
    }
}

pub(crate) fn scope_to_value(scope: &InstrumentationScope) -> Value {
    let mut map = Map::new();
    map.insert("name".into(), Value::string(scope.name.as_str()));
    map.insert("version".into(), Value::string(scope.version.as_str()));
    map.insert(
        "attributes".into(),
        Value::Map(attributes_to_map(&scope.attributes)),
    );
    map.insert(
        "dropped_attributes_count".into(),
        Value::Int(scope.dropped_attributes_count.into()),
    );
    Value::Map(map)
}

pub(crate) fn get_scope(scope: Option<&InstrumentationScope>, path: &ScopePath) -> Value {
    let Some(scope) = scope else {
        return Value::Nil;
    };
    match path {
        ScopePath::Scope => scope_to_value(scope),
        ScopePath::Name => Value::string(scope.name.as_str()),
        ScopePath::Version => Value::string(scope.version.as_str()),
        ScopePath::Attributes(key) => get_attributes(&scope.attributes, key.as_deref()),
        ScopePath::DroppedAttributesCount => Value::Int(scope.dropped_attributes_count.into()),
    }
}

pub(crate) fn set_scope(scope: &mut InstrumentationScope, path: &ScopePath, value: Value) {
    match (path, value) {
        (ScopePath::Scope, Value::Map(map)) => {
            let (Some(name), Some(version), Some(attributes), Some(dropped)) = (
                map_field(&map, "name", to_string),
                map_field(&map, "version", to_string),
                map_field(&map, "attributes", |v| v.as_map().cloned()),
                map_field(&map, "dropped_attributes_count", to_u32),
            ) else {
                return;
            };
            scope.name = name;
            scope.version = version;
            scope.attributes = map_to_attributes(attributes);
            scope.dropped_attributes_count = dropped;
        }
        (ScopePath::Name, Value::String(s)) => scope.name = s,
        (ScopePath::Version, Value::String(s)) => scope.version = s,
        (ScopePath::Attributes(key), value) => {
            set_attributes(&mut scope.attributes, key.as_deref(), value)
        }
        (ScopePath::DroppedAttributesCount, value) => {
            if let Some(n) = to_u32(&value) {
                scope.dropped_attributes_count = n;
            }
        }
        _ => {}
    }
}

// ============================================================================
// Trace and span ids
// ============================================================================

/// Resolve an id member and its optional `.string` suffix.
pub(crate) fn parse_id_form(field: &Field, segments: &mut Segments<'_>) -> Result<IdForm> {
    segments.unkeyed(field)?;
    match segments.next() {
        None => Ok(IdForm::Bytes),
        Some(next) if next.name == "string" => segments.leaf(next, IdForm::Hex),
        Some(next) => Err(segments.unresolved(next)),
    }
}

pub(crate) fn get_id(id: &[u8], form: IdForm) -> Value {
    match form {
        IdForm::Bytes => Value::Bytes(id.to_vec()),
        IdForm::Hex => Value::String(hex::encode(id)),
    }
}

/// Write an id of `width` bytes. An empty id is always accepted and clears the field.
pub(crate) fn set_id(id: &mut Vec<u8>, width: usize, form: IdForm, value: Value) -> Result<()> {
    match (form, value) {
        (IdForm::Bytes, Value::Bytes(bytes)) if bytes.is_empty() || bytes.len() == width => {
            *id = bytes;
        }
        (IdForm::Hex, Value::String(s)) => {
            let bytes = hex::decode(&s)
                .map_err(|e| Error::EvaluationError(format!("invalid hex id {:?}: {}", s, e)))?;
            if !bytes.is_empty() && bytes.len() != width {
                return Err(Error::EvaluationError(format!(
                    "id {:?} must be {} bytes, got {}",
                    s,
                    width,
                    bytes.len()
                )));
            }
            *id = bytes;
        }
        _ => {}
    }
    Ok(())
}

// ============================================================================
// Checked numeric and structure conversions
// ============================================================================

/// Unsigned counters and timestamps read as `Int` with their bits preserved, so values
/// above `i64::MAX` read negative and write back unchanged.
pub(crate) fn u64_value(n: u64) -> Value {
    Value::Int(n as i64)
}

pub(crate) fn u64_list(items: &[u64]) -> Value {
    Value::List(items.iter().copied().map(u64_value).collect())
}

pub(crate) fn f64_list(items: &[f64]) -> Value {
    Value::List(items.iter().copied().map(Value::Double).collect())
}

pub(crate) fn to_u64(value: &Value) -> Option<u64> {
    value.as_int().map(|i| i as u64)
}

pub(crate) fn to_u32(value: &Value) -> Option<u32> {
    value.as_int().and_then(|i| u32::try_from(i).ok())
}

pub(crate) fn to_i32(value: &Value) -> Option<i32> {
    value.as_int().and_then(|i| i32::try_from(i).ok())
}

pub(crate) fn to_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

pub(crate) fn to_bytes(value: &Value) -> Option<Vec<u8>> {
    value.as_bytes().map(<[u8]>::to_vec)
}

/// Convert every item or nothing.
pub(crate) fn list_of<T>(value: &Value, convert: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    value.as_list()?.iter().map(convert).collect()
}

/// Read one member of a structured map. A missing or nil member yields the default; a
/// member of the wrong shape rejects the whole map.
pub(crate) fn map_field<T: Default>(
    map: &Map,
    key: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    match map.get(key) {
        None | Some(Value::Nil) => Some(T::default()),
        Some(value) => convert(value),
    }
}

/// Like [`map_field`], but a missing or nil member yields `Some(None)` so the caller can
/// leave the target untouched.
pub(crate) fn map_member<T>(
    map: &Map,
    key: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<Option<T>> {
    match map.get(key) {
        None | Some(Value::Nil) => Some(None),
        Some(value) => convert(value).map(Some),
    }
}

//! Converters: functions that compute a value without touching the context.

use super::editors::compile_regex;
use crate::accessor::Getter;
use crate::contexts::ContextKind;
use crate::error::{Error, Result};
use crate::functions::{Arguments, ExprFunction};
use crate::value::Value;
use heck::{ToSnakeCase, ToUpperCamelCase};
use regex::Regex;

type Factory<K> = Result<Box<dyn ExprFunction<K>>>;

/// A converter over one evaluated argument.
struct Unary<K: ContextKind> {
    target: Getter<K>,
    apply: fn(Value) -> Result<Value>,
}

impl<K: ContextKind> ExprFunction<K> for Unary<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        (self.apply)(self.target.get(ctx)?)
    }
}

fn unary<K: ContextKind>(mut args: Arguments<K>, apply: fn(Value) -> Result<Value>) -> Factory<K> {
    let target = args.next_getter()?;
    Ok(Box::new(Unary { target, apply }))
}

// ============================================================================
// Numeric conversion
// ============================================================================

fn to_double(value: Value) -> Result<Value> {
    Ok(match value {
        Value::Double(d) => Value::Double(d),
        Value::Int(i) => Value::Double(i as f64),
        Value::Bool(b) => Value::Double(if b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().map_or(Value::Nil, Value::Double),
        _ => Value::Nil,
    })
}

fn to_int(value: Value) -> Result<Value> {
    Ok(match value {
        Value::Int(i) => Value::Int(i),
        Value::Double(d) if d.is_finite() => Value::Int(d.trunc() as i64),
        Value::Bool(b) => Value::Int(i64::from(b)),
        Value::String(s) => s.trim().parse::<i64>().map_or(Value::Nil, Value::Int),
        _ => Value::Nil,
    })
}

pub(crate) fn double<K: ContextKind>(args: Arguments<K>) -> Factory<K> {
    unary(args, to_double)
}

pub(crate) fn int<K: ContextKind>(args: Arguments<K>) -> Factory<K> {
    unary(args, to_int)
}

// ============================================================================
// Ids
// ============================================================================

fn id_of(function: &str, value: Value, width: usize) -> Result<Value> {
    match value {
        Value::Bytes(bytes) if bytes.len() == width => Ok(Value::Bytes(bytes)),
        other => Err(Error::EvaluationError(format!(
            "{} requires {} bytes, got {}",
            function,
            width,
            describe_len(&other)
        ))),
    }
}

fn describe_len(value: &Value) -> String {
    match value {
        Value::Bytes(bytes) => format!("{} bytes", bytes.len()),
        other => other.type_name().to_string(),
    }
}

pub(crate) fn span_id<K: ContextKind>(args: Arguments<K>) -> Factory<K> {
    unary(args, |value| id_of("SpanID", value, 8))
}

pub(crate) fn trace_id<K: ContextKind>(args: Arguments<K>) -> Factory<K> {
    unary(args, |value| id_of("TraceID", value, 16))
}

// ============================================================================
// Parsing
// ============================================================================

fn parse_json_value(value: Value) -> Result<Value> {
    match value {
        Value::String(s) => serde_json::from_str::<serde_json::Value>(&s)
            .map(Value::from_json)
            .map_err(|e| Error::EvaluationError(format!("ParseJSON: {}", e))),
        Value::Nil => Ok(Value::Nil),
        other => Err(Error::TypeError(format!(
            "ParseJSON expects a string, got {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn parse_json<K: ContextKind>(args: Arguments<K>) -> Factory<K> {
    unary(args, parse_json_value)
}

// ============================================================================
// Strings
// ============================================================================

struct Concat<K: ContextKind> {
    values: Getter<K>,
    delimiter: String,
}

impl<K: ContextKind> ExprFunction<K> for Concat<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        let parts = match self.values.get(ctx)? {
            Value::List(items) => items,
            other => vec![other],
        };
        let joined = parts
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(&self.delimiter);
        Ok(Value::String(joined))
    }
}

pub(crate) fn concat<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let values = args.next_getter()?;
    let delimiter = args.next_string()?;
    Ok(Box::new(Concat { values, delimiter }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    Lower,
    Upper,
    Snake,
    Camel,
}

impl Case {
    fn apply(self, s: &str) -> String {
        match self {
            Case::Lower => s.to_lowercase(),
            Case::Upper => s.to_uppercase(),
            Case::Snake => s.to_snake_case(),
            Case::Camel => s.to_upper_camel_case(),
        }
    }
}

struct ConvertCase<K: ContextKind> {
    target: Getter<K>,
    case: Case,
}

impl<K: ContextKind> ExprFunction<K> for ConvertCase<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        match self.target.get(ctx)? {
            Value::String(s) => Ok(Value::String(self.case.apply(&s))),
            Value::Nil => Ok(Value::Nil),
            other => Err(Error::TypeError(format!(
                "ConvertCase expects a string, got {}",
                other.type_name()
            ))),
        }
    }
}

pub(crate) fn convert_case<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let function = args.function();
    let target = args.next_getter()?;
    let case = match args.next_string()?.as_str() {
        "lower" => Case::Lower,
        "upper" => Case::Upper,
        "snake" => Case::Snake,
        "camel" => Case::Camel,
        other => {
            return Err(Error::invalid_arguments(
                function,
                format!("unknown case {:?}, expected lower, upper, snake or camel", other),
            ))
        }
    };
    Ok(Box::new(ConvertCase { target, case }))
}

struct IsMatch<K: ContextKind> {
    target: Getter<K>,
    pattern: Regex,
}

impl<K: ContextKind> ExprFunction<K> for IsMatch<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        let matched = match self.target.get(ctx)? {
            Value::Nil => false,
            Value::String(s) => self.pattern.is_match(&s),
            value @ (Value::Bool(_) | Value::Int(_) | Value::Double(_) | Value::Bytes(_)) => {
                self.pattern.is_match(&value.to_string())
            }
            other => {
                return Err(Error::TypeError(format!(
                    "IsMatch cannot match against {}",
                    other.type_name()
                )))
            }
        };
        Ok(Value::Bool(matched))
    }
}

pub(crate) fn is_match<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let target = args.next_getter()?;
    let pattern = compile_regex(args.function(), &args.next_string()?)?;
    Ok(Box::new(IsMatch { target, pattern }))
}

struct Split<K: ContextKind> {
    target: Getter<K>,
    delimiter: String,
}

impl<K: ContextKind> ExprFunction<K> for Split<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        match self.target.get(ctx)? {
            Value::String(s) => Ok(Value::List(
                s.split(self.delimiter.as_str()).map(Value::string).collect(),
            )),
            Value::Nil => Ok(Value::Nil),
            other => Err(Error::TypeError(format!(
                "Split expects a string, got {}",
                other.type_name()
            ))),
        }
    }
}

pub(crate) fn split<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let function = args.function();
    let target = args.next_getter()?;
    let delimiter = args.next_string()?;
    if delimiter.is_empty() {
        return Err(Error::invalid_arguments(function, "delimiter cannot be empty"));
    }
    Ok(Box::new(Split { target, delimiter }))
}

struct Substring<K: ContextKind> {
    target: Getter<K>,
    start: usize,
    length: usize,
}

impl<K: ContextKind> ExprFunction<K> for Substring<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        let s = match self.target.get(ctx)? {
            Value::String(s) => s,
            Value::Nil => return Ok(Value::Nil),
            other => {
                return Err(Error::TypeError(format!(
                    "Substring expects a string, got {}",
                    other.type_name()
                )))
            }
        };

        let chars: Vec<char> = s.chars().collect();
        let end = self.start + self.length;
        if end > chars.len() {
            return Err(Error::EvaluationError(format!(
                "Substring range {}..{} out of bounds for length {}",
                self.start,
                end,
                chars.len()
            )));
        }
        Ok(Value::String(chars[self.start..end].iter().collect()))
    }
}

pub(crate) fn substring<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let function = args.function();
    let target = args.next_getter()?;
    let start = args.next_int()?;
    let length = args.next_int()?;
    let start = usize::try_from(start).map_err(|_| {
        Error::invalid_arguments(function, format!("start must be non-negative, got {}", start))
    })?;
    let length = match usize::try_from(length) {
        Ok(length) if length > 0 => length,
        _ => {
            return Err(Error::invalid_arguments(
                function,
                format!("length must be positive, got {}", length),
            ))
        }
    };
    Ok(Box::new(Substring {
        target,
        start,
        length,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_int() {
        assert_eq!(to_int(Value::Double(2.9)).unwrap(), Value::Int(2));
        assert_eq!(to_int(Value::string(" 42 ")).unwrap(), Value::Int(42));
        assert_eq!(to_int(Value::string("4.2")).unwrap(), Value::Nil);
        assert_eq!(to_int(Value::Bool(true)).unwrap(), Value::Int(1));
        assert_eq!(to_int(Value::Double(f64::NAN)).unwrap(), Value::Nil);
    }

    #[test]
    fn test_to_double() {
        assert_eq!(to_double(Value::Int(3)).unwrap(), Value::Double(3.0));
        assert_eq!(to_double(Value::string("1.5")).unwrap(), Value::Double(1.5));
        assert_eq!(to_double(Value::string("x")).unwrap(), Value::Nil);
        assert_eq!(to_double(Value::List(vec![])).unwrap(), Value::Nil);
    }

    #[test]
    fn test_id_width() {
        assert!(id_of("SpanID", Value::Bytes(vec![0; 8]), 8).is_ok());
        let err = id_of("TraceID", Value::Bytes(vec![0; 8]), 16).unwrap_err();
        assert!(err.to_string().contains("got 8 bytes"));
    }

    #[test]
    fn test_case_conversion() {
        assert_eq!(Case::Snake.apply("HttpServerDuration"), "http_server_duration");
        assert_eq!(Case::Camel.apply("http_server_duration"), "HttpServerDuration");
        assert_eq!(Case::Upper.apply("get"), "GET");
    }

    #[test]
    fn test_parse_json_object() {
        let value = parse_json_value(Value::string(r#"{"a": {"b": [1, "x"]}}"#)).unwrap();
        let inner = value.as_map().and_then(|m| m.get("a")).and_then(Value::as_map);
        assert_eq!(
            inner.and_then(|m| m.get("b")),
            Some(&Value::List(vec![Value::Int(1), Value::string("x")]))
        );
        assert!(parse_json_value(Value::string("{")).is_err());
    }
}

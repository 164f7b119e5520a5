//! Property-based tests using QuickCheck

use lumen_ottl::ast::CompareOp;
use lumen_ottl::statement::compare;
use lumen_ottl::{Accessor, ErrorMode, Field, LogKind, Path, Value};
use opentelemetry_proto::tonic::common::v1::KeyValue;
use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::metrics::v1::{
    exemplar, exponential_histogram_data_point::Buckets, metric::Data, number_data_point,
    summary_data_point::ValueAtQuantile, Exemplar, ExponentialHistogram,
    ExponentialHistogramDataPoint, Gauge, Histogram, HistogramDataPoint, Metric,
    NumberDataPoint, Sum, Summary, SummaryDataPoint,
};
use opentelemetry_proto::tonic::trace::v1::{span, Span, Status};
use quickcheck::{QuickCheck, TestResult};
use std::collections::BTreeMap;

mod test_support;
use test_support::*;

/// Every readable and writable log path.
const LOG_PATHS: &[&str] = &[
    "time_unix_nano",
    "observed_time_unix_nano",
    "severity_number",
    "severity_text",
    "body",
    "attributes",
    r#"attributes["k0"]"#,
    "dropped_attributes_count",
    "flags",
    "trace_id",
    "trace_id.string",
    "span_id",
    "span_id.string",
    "cache",
    "resource",
    "resource.attributes",
    r#"resource.attributes["service.name"]"#,
    "instrumentation_scope",
    "instrumentation_scope.name",
    "instrumentation_scope.version",
];

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn arbitrary_record(
    times: (u64, u64),
    severity: (i32, String),
    body: Option<String>,
    attributes: BTreeMap<String, i64>,
    with_ids: bool,
) -> LogRecord {
    let mut record = LogRecord {
        time_unix_nano: times.0,
        observed_time_unix_nano: times.1,
        severity_number: severity.0,
        severity_text: severity.1,
        body: body.map(|b| Value::string(b).into()),
        attributes: int_attributes(attributes),
        ..Default::default()
    };
    if with_ids {
        record.trace_id = trace_id();
        record.span_id = span_id();
    }
    record
}

/// Property: `set(p, p)` leaves the record unchanged for every path
#[test]
fn prop_self_assignment_is_identity() {
    fn prop(
        times: (u64, u64),
        severity: (i32, String),
        body: Option<String>,
        attributes: BTreeMap<String, i64>,
        with_ids: bool,
    ) -> TestResult {
        let original = arbitrary_record(times, severity, body, attributes, with_ids);

        for path in LOG_PATHS {
            let mut record = original.clone();
            let mut ancestry = Ancestry::default();
            let statement = format!("set({path}, {path})");
            if run_log(&[statement.as_str()], ErrorMode::Propagate, &mut record, &mut ancestry).is_err() {
                return TestResult::error(format!("{} failed", statement));
            }
            if record != original {
                return TestResult::error(format!("{} changed the record", statement));
            }
            let untouched = Ancestry::default();
            if ancestry.resource != untouched.resource || ancestry.scope != untouched.scope {
                return TestResult::error(format!("{} changed the ancestry", statement));
            }
        }
        TestResult::passed()
    }

    QuickCheck::new()
        .tests(50)
        .quickcheck(prop as fn((u64, u64), (i32, String), Option<String>, BTreeMap<String, i64>, bool) -> TestResult);
}

/// Every readable and writable span path.
const SPAN_PATHS: &[&str] = &[
    "trace_id",
    "trace_id.string",
    "span_id",
    "span_id.string",
    "parent_span_id",
    "parent_span_id.string",
    "trace_state",
    r#"trace_state["k1"]"#,
    r#"trace_state["k7"]"#,
    r#"trace_state["junk"]"#,
    "name",
    "kind",
    "start_time_unix_nano",
    "end_time_unix_nano",
    "attributes",
    r#"attributes["k0"]"#,
    "dropped_attributes_count",
    "events",
    "dropped_events_count",
    "links",
    "dropped_links_count",
    "status",
    "status.code",
    "status.message",
    "cache",
    "resource",
    "instrumentation_scope",
];

/// Every readable and writable data point path, across all four point shapes.
const DATA_POINT_PATHS: &[&str] = &[
    "attributes",
    r#"attributes["k0"]"#,
    "start_time_unix_nano",
    "time_unix_nano",
    "value_double",
    "value_int",
    "exemplars",
    "flags",
    "count",
    "sum",
    "bucket_counts",
    "explicit_bounds",
    "scale",
    "zero_count",
    "positive",
    "positive.offset",
    "positive.bucket_counts",
    "negative",
    "negative.offset",
    "negative.bucket_counts",
    "quantile_values",
    "metric",
    "metric.name",
    "metric.description",
    "metric.unit",
    "metric.type",
    "metric.aggregation_temporality",
    "metric.is_monotonic",
    "metric.data_points",
    "cache",
    "resource.attributes",
    "instrumentation_scope",
];

fn int_attributes(attributes: BTreeMap<String, i64>) -> Vec<KeyValue> {
    attributes
        .into_iter()
        .map(|(k, v)| kv(&k, Value::Int(v)))
        .collect()
}

/// Trace state built from numbered members; `spaced` puts whitespace around the commas and
/// appends a member with no `=`.
fn trace_state(entries: &BTreeMap<u8, u32>, spaced: bool) -> String {
    let members: Vec<String> = entries.iter().map(|(k, v)| format!("k{}={}", k, v)).collect();
    if spaced {
        format!("{} ,junk", members.join(" , "))
    } else {
        members.join(",")
    }
}

fn arbitrary_span(
    times: (u64, u64),
    name: String,
    kind: i32,
    attributes: BTreeMap<String, i64>,
    state: (BTreeMap<u8, u32>, bool, bool),
    events: Vec<(u64, String)>,
    links_and_status: (Vec<(u32, bool)>, Option<(i32, String)>),
) -> Span {
    let (entries, spaced, with_parent) = state;
    let (links, status) = links_and_status;
    Span {
        trace_id: trace_id(),
        span_id: span_id(),
        parent_span_id: if with_parent { span_id() } else { Vec::new() },
        trace_state: trace_state(&entries, spaced),
        name,
        kind,
        start_time_unix_nano: times.0,
        end_time_unix_nano: times.1,
        attributes: int_attributes(attributes),
        dropped_attributes_count: kind.unsigned_abs(),
        events: events
            .into_iter()
            .map(|(time, name)| span::Event {
                time_unix_nano: time,
                attributes: vec![str_kv("event", &name)],
                name,
                dropped_attributes_count: 1,
            })
            .collect(),
        dropped_events_count: times.0 as u32,
        links: links
            .into_iter()
            .map(|(flags, sampled)| span::Link {
                trace_id: if sampled { trace_id() } else { Vec::new() },
                span_id: span_id(),
                trace_state: trace_state(&entries, !spaced),
                flags,
                ..Default::default()
            })
            .collect(),
        dropped_links_count: times.1 as u32,
        status: status.map(|(code, message)| Status { code, message }),
        ..Default::default()
    }
}

/// Property: `set(p, p)` leaves a span unchanged for every path
#[test]
fn prop_span_self_assignment_is_identity() {
    fn prop(
        times: (u64, u64),
        name: String,
        kind: i32,
        attributes: BTreeMap<String, i64>,
        state: (BTreeMap<u8, u32>, bool, bool),
        events: Vec<(u64, String)>,
        links_and_status: (Vec<(u32, bool)>, Option<(i32, String)>),
    ) -> TestResult {
        let original = arbitrary_span(times, name, kind, attributes, state, events, links_and_status);

        for path in SPAN_PATHS {
            let mut record = original.clone();
            let mut ancestry = Ancestry::default();
            let statement = format!("set({path}, {path})");
            if let Err(e) = run_span(&[statement.as_str()], &mut record, &mut ancestry) {
                return TestResult::error(format!("{} failed: {}", statement, e));
            }
            if record != original {
                return TestResult::error(format!(
                    "{} changed the span: {:?} became {:?}",
                    statement, original, record
                ));
            }
            let untouched = Ancestry::default();
            if ancestry.resource != untouched.resource || ancestry.scope != untouched.scope {
                return TestResult::error(format!("{} changed the ancestry", statement));
            }
        }
        TestResult::passed()
    }

    QuickCheck::new().tests(50).quickcheck(
        prop as fn(
            (u64, u64),
            String,
            i32,
            BTreeMap<String, i64>,
            (BTreeMap<u8, u32>, bool, bool),
            Vec<(u64, String)>,
            (Vec<(u32, bool)>, Option<(i32, String)>),
        ) -> TestResult,
    );
}

/// A one-point metric of shape `shape % 5`: gauge, sum, histogram, exponential histogram or
/// summary. Counters and timestamps cover the full `u64` range.
fn arbitrary_metric(
    shape: u8,
    times: (u64, u64),
    counts: (u64, u64),
    numbers: (i64, i32, i32),
    bucket_counts: Vec<u64>,
    attributes: BTreeMap<String, i64>,
    flags: u32,
) -> Metric {
    let (value, scale, offset) = numbers;
    let attributes = int_attributes(attributes);
    let exemplars = vec![Exemplar {
        filtered_attributes: vec![str_kv("sampled", "yes")],
        time_unix_nano: times.1,
        span_id: span_id(),
        trace_id: trace_id(),
        value: Some(exemplar::Value::AsInt(value)),
    }];
    let number = |value| NumberDataPoint {
        attributes: attributes.clone(),
        start_time_unix_nano: times.0,
        time_unix_nano: times.1,
        exemplars: exemplars.clone(),
        flags,
        value: Some(value),
    };
    let sum = (scale % 2 == 0).then_some(value as f64);

    let data = match shape % 5 {
        0 => Data::Gauge(Gauge {
            data_points: vec![number(number_data_point::Value::AsDouble(value as f64))],
        }),
        1 => Data::Sum(Sum {
            data_points: vec![number(number_data_point::Value::AsInt(value))],
            aggregation_temporality: scale.rem_euclid(3),
            is_monotonic: flags % 2 == 0,
        }),
        2 => Data::Histogram(Histogram {
            data_points: vec![HistogramDataPoint {
                attributes,
                start_time_unix_nano: times.0,
                time_unix_nano: times.1,
                count: counts.0,
                sum,
                explicit_bounds: bucket_counts.iter().skip(1).map(|c| (c % 1000) as f64).collect(),
                bucket_counts,
                exemplars,
                flags,
                min: None,
                max: None,
            }],
            aggregation_temporality: offset.rem_euclid(3),
        }),
        3 => Data::ExponentialHistogram(ExponentialHistogram {
            data_points: vec![ExponentialHistogramDataPoint {
                attributes,
                start_time_unix_nano: times.0,
                time_unix_nano: times.1,
                count: counts.0,
                sum,
                scale,
                zero_count: counts.1,
                positive: Some(Buckets {
                    offset,
                    bucket_counts,
                }),
                exemplars,
                flags,
                ..Default::default()
            }],
            aggregation_temporality: 2,
        }),
        _ => Data::Summary(Summary {
            data_points: vec![SummaryDataPoint {
                attributes,
                start_time_unix_nano: times.0,
                time_unix_nano: times.1,
                count: counts.0,
                sum: value as f64,
                quantile_values: bucket_counts
                    .iter()
                    .enumerate()
                    .map(|(i, c)| ValueAtQuantile {
                        quantile: i as f64 / 100.0,
                        value: *c as f64,
                    })
                    .collect(),
                flags,
            }],
        }),
    };

    Metric {
        name: "m".to_string(),
        description: "d".to_string(),
        unit: "1".to_string(),
        data: Some(data),
        ..Default::default()
    }
}

/// Property: `set(p, p)` leaves every data point shape unchanged for every path
#[test]
fn prop_data_point_self_assignment_is_identity() {
    fn prop(
        shape: u8,
        times: (u64, u64),
        counts: (u64, u64),
        numbers: (i64, i32, i32),
        bucket_counts: Vec<u64>,
        attributes: BTreeMap<String, i64>,
        flags: u32,
    ) -> TestResult {
        let original = vec![arbitrary_metric(
            shape,
            times,
            counts,
            numbers,
            bucket_counts,
            attributes,
            flags,
        )];

        for path in DATA_POINT_PATHS {
            let mut metrics = original.clone();
            let mut ancestry = Ancestry::default();
            let statement = format!("set({path}, {path})");
            if let Err(e) = run_data_points(&[statement.as_str()], &mut metrics, 0, &mut ancestry) {
                return TestResult::error(format!("{} failed: {}", statement, e));
            }
            if metrics != original {
                return TestResult::error(format!(
                    "{} changed the metric: {:?} became {:?}",
                    statement, original, metrics
                ));
            }
            let untouched = Ancestry::default();
            if ancestry.resource != untouched.resource || ancestry.scope != untouched.scope {
                return TestResult::error(format!("{} changed the ancestry", statement));
            }
        }
        TestResult::passed()
    }

    QuickCheck::new().tests(100).quickcheck(
        prop as fn(
            u8,
            (u64, u64),
            (u64, u64),
            (i64, i32, i32),
            Vec<u64>,
            BTreeMap<String, i64>,
            u32,
        ) -> TestResult,
    );
}

/// Property: counters above `i64::MAX` survive self-assignment on every shape that has one
#[test]
fn prop_large_counters_round_trip() {
    fn prop(shape: u8, high: u32) -> TestResult {
        let count = i64::MAX as u64 + 1 + u64::from(high);
        let original = vec![arbitrary_metric(
            shape,
            (count, u64::MAX),
            (count, count),
            (1, 0, 0),
            vec![count, u64::MAX],
            BTreeMap::new(),
            0,
        )];
        let mut metrics = original.clone();
        let mut ancestry = Ancestry::default();
        let statements = [
            "set(count, count)",
            "set(zero_count, zero_count)",
            "set(time_unix_nano, time_unix_nano)",
            "set(bucket_counts, bucket_counts)",
            "set(positive, positive)",
            "set(exemplars, exemplars)",
        ];
        match run_data_points(&statements, &mut metrics, 0, &mut ancestry) {
            Ok(_) => TestResult::from_bool(metrics == original),
            Err(_) => TestResult::failed(),
        }
    }

    QuickCheck::new()
        .tests(50)
        .quickcheck(prop as fn(u8, u32) -> TestResult);
}

/// Property: string literals survive the lexer and land unchanged in an attribute
#[test]
fn prop_string_literal_round_trip() {
    fn prop(s: String) -> TestResult {
        let mut record = log_record();
        let mut ancestry = Ancestry::default();
        let statement = format!(r#"set(attributes["s"], "{}")"#, escape(&s));
        match run_log(&[statement.as_str()], ErrorMode::Propagate, &mut record, &mut ancestry) {
            Ok(_) => TestResult::from_bool(attribute(&record.attributes, "s") == Value::String(s)),
            Err(_) => TestResult::failed(),
        }
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(String) -> TestResult);
}

/// Property: int literals round trip, including negative values
#[test]
fn prop_int_literal_round_trip() {
    fn prop(n: i64) -> TestResult {
        let mut record = log_record();
        let mut ancestry = Ancestry::default();
        let statement = format!(r#"set(attributes["n"], {})"#, n);
        match run_log(&[statement.as_str()], ErrorMode::Propagate, &mut record, &mut ancestry) {
            Ok(_) => TestResult::from_bool(attribute(&record.attributes, "n") == Value::Int(n)),
            Err(_) => TestResult::failed(),
        }
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(i64) -> TestResult);
}

/// Property: resolving the same path twice yields the same target
#[test]
fn prop_resolution_is_deterministic() {
    fn prop(key: String) -> TestResult {
        let path = || Path::new([Field::new("resource"), Field::keyed("attributes", key.clone())]);
        let (Ok(first), Ok(second)) = (path(), path()) else {
            return TestResult::failed();
        };
        match (
            Accessor::<LogKind>::resolve(first),
            Accessor::<LogKind>::resolve(second),
        ) {
            (Ok(a), Ok(b)) => TestResult::from_bool(a.target() == b.target()),
            _ => TestResult::failed(),
        }
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(String) -> TestResult);
}

/// Property: `!=` is the negation of `==` for every pair of values
#[test]
fn prop_not_equal_negates_equal() {
    fn prop(a: i64, b: f64, s: String) -> TestResult {
        let values = [
            Value::Int(a),
            Value::Double(b),
            Value::String(s),
            Value::Bool(a % 2 == 0),
            Value::Nil,
        ];
        for left in &values {
            for right in &values {
                if compare(left, CompareOp::Equal, right) == compare(left, CompareOp::NotEqual, right) {
                    return TestResult::failed();
                }
            }
        }
        TestResult::passed()
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(i64, f64, String) -> TestResult);
}

/// Property: ordering between ints is antisymmetric and consistent with equality
#[test]
fn prop_int_ordering_is_consistent() {
    fn prop(a: i64, b: i64) -> TestResult {
        let (a, b) = (Value::Int(a), Value::Int(b));
        let lt = compare(&a, CompareOp::LessThan, &b);
        let gt = compare(&a, CompareOp::GreaterThan, &b);
        let eq = compare(&a, CompareOp::Equal, &b);
        let le = compare(&a, CompareOp::LessThanOrEqual, &b);
        TestResult::from_bool(
            [lt, gt, eq].iter().filter(|x| **x).count() == 1
                && le == (lt || eq)
                && compare(&b, CompareOp::GreaterThan, &a) == lt,
        )
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(i64, i64) -> TestResult);
}

/// Property: values of different kinds are never ordered
#[test]
fn prop_mixed_kinds_are_unordered() {
    fn prop(n: i64, s: String) -> TestResult {
        let (n, s) = (Value::Int(n), Value::String(s));
        TestResult::from_bool(
            [
                CompareOp::LessThan,
                CompareOp::LessThanOrEqual,
                CompareOp::GreaterThan,
                CompareOp::GreaterThanOrEqual,
                CompareOp::Equal,
            ]
            .into_iter()
            .all(|op| !compare(&n, op, &s) && !compare(&s, op, &n)),
        )
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(i64, String) -> TestResult);
}

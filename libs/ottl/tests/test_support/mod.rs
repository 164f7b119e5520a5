#![allow(dead_code)]

use lumen_ottl::{
    DataPointContext, DataPointKind, Engine, ErrorMode, ExecutionSummary, LogContext, LogKind,
    MetricContext, MetricKind, ResourceContext, ResourceKind, SpanContext, SpanKind, Value,
};
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::metrics::v1::{
    exponential_histogram_data_point::Buckets, metric::Data, number_data_point,
    summary_data_point::ValueAtQuantile, ExponentialHistogram, ExponentialHistogramDataPoint,
    Gauge, Histogram, HistogramDataPoint, Metric, NumberDataPoint, Sum, Summary,
    SummaryDataPoint,
};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{span, status, Span, Status};
use std::sync::OnceLock;

// ============================================================================
// Shared engines
// ============================================================================

static LOG_ENGINE: OnceLock<Engine<LogKind>> = OnceLock::new();
static SPAN_ENGINE: OnceLock<Engine<SpanKind>> = OnceLock::new();
static METRIC_ENGINE: OnceLock<Engine<MetricKind>> = OnceLock::new();
static DATA_POINT_ENGINE: OnceLock<Engine<DataPointKind>> = OnceLock::new();
static RESOURCE_ENGINE: OnceLock<Engine<ResourceKind>> = OnceLock::new();

pub fn log_engine() -> &'static Engine<LogKind> {
    LOG_ENGINE.get_or_init(Engine::default)
}

pub fn span_engine() -> &'static Engine<SpanKind> {
    SPAN_ENGINE.get_or_init(Engine::default)
}

pub fn metric_engine() -> &'static Engine<MetricKind> {
    METRIC_ENGINE.get_or_init(Engine::default)
}

pub fn data_point_engine() -> &'static Engine<DataPointKind> {
    DATA_POINT_ENGINE.get_or_init(Engine::default)
}

pub fn resource_engine() -> &'static Engine<ResourceKind> {
    RESOURCE_ENGINE.get_or_init(Engine::default)
}

// ============================================================================
// Record builders
// ============================================================================

pub fn kv(key: &str, value: Value) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue::from(value)),
    }
}

pub fn str_kv(key: &str, value: &str) -> KeyValue {
    kv(key, Value::string(value))
}

pub fn resource() -> Resource {
    Resource {
        attributes: vec![str_kv("service.name", "checkout"), str_kv("host.name", "web-1")],
        ..Default::default()
    }
}

pub fn scope() -> InstrumentationScope {
    InstrumentationScope {
        name: "lumen.test".to_string(),
        version: "1.0.0".to_string(),
        ..Default::default()
    }
}

pub fn trace_id() -> Vec<u8> {
    (1..=16).collect()
}

pub fn span_id() -> Vec<u8> {
    (1..=8).collect()
}

pub fn log_record() -> LogRecord {
    LogRecord {
        time_unix_nano: 1_700_000_000_000_000_000,
        observed_time_unix_nano: 1_700_000_000_000_000_500,
        severity_number: 9,
        severity_text: "INFO".to_string(),
        body: Some(AnyValue::from(Value::string("request handled"))),
        attributes: vec![
            str_kv("http.method", "GET"),
            str_kv("http.route", "/api/users"),
            kv("http.status_code", Value::Int(200)),
        ],
        trace_id: trace_id(),
        span_id: span_id(),
        ..Default::default()
    }
}

pub fn span() -> Span {
    Span {
        trace_id: trace_id(),
        span_id: span_id(),
        trace_state: "vendor=abc,other=1".to_string(),
        name: "GET /api/users".to_string(),
        kind: span::SpanKind::Server as i32,
        start_time_unix_nano: 1_000,
        end_time_unix_nano: 2_000,
        attributes: vec![str_kv("http.method", "GET")],
        events: vec![span::Event {
            time_unix_nano: 1_500,
            name: "cache.miss".to_string(),
            attributes: vec![str_kv("key", "user:1")],
            dropped_attributes_count: 0,
        }],
        status: Some(Status {
            message: String::new(),
            code: status::StatusCode::Ok as i32,
        }),
        ..Default::default()
    }
}

pub fn number_point(value: number_data_point::Value) -> NumberDataPoint {
    NumberDataPoint {
        attributes: vec![str_kv("host", "a")],
        start_time_unix_nano: 100,
        time_unix_nano: 200,
        value: Some(value),
        ..Default::default()
    }
}

pub fn gauge_metric(name: &str) -> Metric {
    Metric {
        name: name.to_string(),
        unit: "1".to_string(),
        data: Some(Data::Gauge(Gauge {
            data_points: vec![
                number_point(number_data_point::Value::AsDouble(1.5)),
                number_point(number_data_point::Value::AsInt(7)),
            ],
        })),
        ..Default::default()
    }
}

pub fn sum_metric(name: &str) -> Metric {
    Metric {
        name: name.to_string(),
        data: Some(Data::Sum(Sum {
            data_points: vec![number_point(number_data_point::Value::AsInt(3))],
            aggregation_temporality: 2,
            is_monotonic: true,
        })),
        ..Default::default()
    }
}

/// Histogram with count 10, sum 5.0, bucket counts [1, 2, 3] and bounds [0, 1].
pub fn histogram_metric(name: &str) -> Metric {
    Metric {
        name: name.to_string(),
        unit: "ms".to_string(),
        data: Some(Data::Histogram(Histogram {
            data_points: vec![HistogramDataPoint {
                attributes: vec![str_kv("route", "/")],
                start_time_unix_nano: 100,
                time_unix_nano: 200,
                count: 10,
                sum: Some(5.0),
                bucket_counts: vec![1, 2, 3],
                explicit_bounds: vec![0.0, 1.0],
                ..Default::default()
            }],
            aggregation_temporality: 2,
        })),
        ..Default::default()
    }
}

pub fn exponential_histogram_metric(name: &str) -> Metric {
    Metric {
        name: name.to_string(),
        data: Some(Data::ExponentialHistogram(ExponentialHistogram {
            data_points: vec![ExponentialHistogramDataPoint {
                count: 4,
                sum: Some(8.0),
                scale: 2,
                zero_count: 1,
                positive: Some(Buckets {
                    offset: 3,
                    bucket_counts: vec![1, 2],
                }),
                ..Default::default()
            }],
            aggregation_temporality: 1,
        })),
        ..Default::default()
    }
}

pub fn summary_metric(name: &str) -> Metric {
    Metric {
        name: name.to_string(),
        description: "request latency".to_string(),
        unit: "s".to_string(),
        data: Some(Data::Summary(Summary {
            data_points: vec![SummaryDataPoint {
                attributes: vec![str_kv("route", "/")],
                start_time_unix_nano: 100,
                time_unix_nano: 200,
                count: 12,
                sum: 3.5,
                quantile_values: vec![ValueAtQuantile {
                    quantile: 0.5,
                    value: 0.25,
                }],
                ..Default::default()
            }],
        })),
        ..Default::default()
    }
}

// ============================================================================
// Runners
// ============================================================================

/// Record plus ancestry, owned by a test.
pub struct Ancestry {
    pub scope: Option<InstrumentationScope>,
    pub resource: Option<Resource>,
}

impl Default for Ancestry {
    fn default() -> Self {
        Self {
            scope: Some(scope()),
            resource: Some(resource()),
        }
    }
}

pub fn run_log(
    statements: &[&str],
    mode: ErrorMode,
    record: &mut LogRecord,
    ancestry: &mut Ancestry,
) -> lumen_ottl::Result<ExecutionSummary> {
    let sequence = log_engine().sequence(statements.iter().copied(), mode)?;
    let mut ctx = LogContext::new(record, &mut ancestry.scope, &mut ancestry.resource);
    sequence.execute(&mut ctx)
}

pub fn run_span(
    statements: &[&str],
    record: &mut Span,
    ancestry: &mut Ancestry,
) -> lumen_ottl::Result<ExecutionSummary> {
    let sequence = span_engine().sequence(statements.iter().copied(), ErrorMode::Propagate)?;
    let mut ctx = SpanContext::new(record, &mut ancestry.scope, &mut ancestry.resource);
    sequence.execute(&mut ctx)
}

pub fn run_metric(
    statements: &[&str],
    metrics: &mut Vec<Metric>,
    index: usize,
    ancestry: &mut Ancestry,
) -> lumen_ottl::Result<ExecutionSummary> {
    let sequence = metric_engine().sequence(statements.iter().copied(), ErrorMode::Propagate)?;
    let mut ctx = MetricContext::new(metrics, index, &mut ancestry.scope, &mut ancestry.resource);
    sequence.execute(&mut ctx)
}

/// Run the statements over every data point of `metrics[index]`, one fresh context each.
pub fn run_data_points(
    statements: &[&str],
    metrics: &mut Vec<Metric>,
    index: usize,
    ancestry: &mut Ancestry,
) -> lumen_ottl::Result<Vec<ExecutionSummary>> {
    let sequence =
        data_point_engine().sequence(statements.iter().copied(), ErrorMode::Propagate)?;
    let points = point_count(&metrics[index]);
    let mut summaries = Vec::new();
    for point in 0..points {
        let mut ctx = DataPointContext::new(
            metrics,
            index,
            point,
            &mut ancestry.scope,
            &mut ancestry.resource,
        );
        summaries.push(sequence.execute(&mut ctx)?);
    }
    Ok(summaries)
}

pub fn run_resource(
    statements: &[&str],
    resource: &mut Option<Resource>,
) -> lumen_ottl::Result<ExecutionSummary> {
    let sequence = resource_engine().sequence(statements.iter().copied(), ErrorMode::Propagate)?;
    let mut ctx = ResourceContext::new(resource);
    sequence.execute(&mut ctx)
}

pub fn point_count(metric: &Metric) -> usize {
    match &metric.data {
        None => 0,
        Some(Data::Gauge(g)) => g.data_points.len(),
        Some(Data::Sum(s)) => s.data_points.len(),
        Some(Data::Histogram(h)) => h.data_points.len(),
        Some(Data::ExponentialHistogram(h)) => h.data_points.len(),
        Some(Data::Summary(s)) => s.data_points.len(),
    }
}

pub fn attribute(attributes: &[KeyValue], key: &str) -> Value {
    lumen_ottl::value::get_attribute(attributes, key)
}

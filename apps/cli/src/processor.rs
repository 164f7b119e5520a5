//! Applies compiled statement groups to OTLP export requests
//!
//! Every group is compiled once when the processor is built. At run time each group is one
//! stage: stages run in configuration order, and each stage walks the whole request building
//! a fresh context (and cache) per record.

use crate::config::{ContextName, ContextStatements, Signal, TransformConfig};
use anyhow::Context as _;
use lumen_ottl::{
    ContextKind, DataPointContext, DataPointKind, Engine, ErrorMode, ExecutionSummary,
    LogContext, LogKind, MetricContext, MetricKind, ResourceContext, ResourceKind, SpanContext,
    SpanKind, StatementSequence,
};
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::metrics::v1::{metric::Data, Metric};

/// Engines for every context kind, shared by all groups
#[derive(Default)]
struct Engines {
    resource: Engine<ResourceKind>,
    metric: Engine<MetricKind>,
    data_point: Engine<DataPointKind>,
    log: Engine<LogKind>,
    span: Engine<SpanKind>,
}

enum MetricStage {
    Resource(StatementSequence<ResourceKind>),
    Metric(StatementSequence<MetricKind>),
    DataPoint(StatementSequence<DataPointKind>),
}

enum LogStage {
    Resource(StatementSequence<ResourceKind>),
    Log(StatementSequence<LogKind>),
}

enum TraceStage {
    Resource(StatementSequence<ResourceKind>),
    Span(StatementSequence<SpanKind>),
}

/// Counters accumulated over one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformStats {
    /// Contexts built, one per record per stage.
    pub contexts: usize,
    pub executed: usize,
    pub skipped: usize,
    /// Failures recorded in ignore mode.
    pub errors: usize,
}

impl TransformStats {
    fn record(&mut self, summary: ExecutionSummary) {
        self.contexts += 1;
        self.executed += summary.executed;
        self.skipped += summary.skipped;
        self.errors += summary.errors.len();
    }
}

/// Compiled transform for all three signals
pub struct Processor {
    error_mode: ErrorMode,
    metrics: Vec<MetricStage>,
    logs: Vec<LogStage>,
    traces: Vec<TraceStage>,
}

impl Processor {
    /// Validate the configuration and compile every group.
    ///
    /// All failures are collected and reported together.
    pub fn new(config: &TransformConfig) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

        let engines = Engines::default();
        let mode = config.error_mode;
        let mut failures = Vec::new();
        let mut processor = Self {
            error_mode: mode,
            metrics: Vec::new(),
            logs: Vec::new(),
            traces: Vec::new(),
        };

        for signal in [Signal::Metrics, Signal::Logs, Signal::Traces] {
            for (index, group) in config.groups(signal).iter().enumerate() {
                let location = format!("{}[{}] ({})", signal.config_key(), index, group.context);
                let compiled = match (signal, group.context) {
                    (Signal::Metrics, ContextName::Resource) => compile(&engines.resource, group, mode)
                        .map(|s| processor.metrics.push(MetricStage::Resource(s))),
                    (Signal::Metrics, ContextName::Metric) => compile(&engines.metric, group, mode)
                        .map(|s| processor.metrics.push(MetricStage::Metric(s))),
                    (Signal::Metrics, ContextName::Datapoint) => {
                        compile(&engines.data_point, group, mode)
                            .map(|s| processor.metrics.push(MetricStage::DataPoint(s)))
                    }
                    (Signal::Logs, ContextName::Resource) => compile(&engines.resource, group, mode)
                        .map(|s| processor.logs.push(LogStage::Resource(s))),
                    (Signal::Logs, ContextName::Log) => compile(&engines.log, group, mode)
                        .map(|s| processor.logs.push(LogStage::Log(s))),
                    (Signal::Traces, ContextName::Resource) => {
                        compile(&engines.resource, group, mode)
                            .map(|s| processor.traces.push(TraceStage::Resource(s)))
                    }
                    (Signal::Traces, ContextName::Span) => compile(&engines.span, group, mode)
                        .map(|s| processor.traces.push(TraceStage::Span(s))),
                    // Rejected by validate()
                    _ => Ok(()),
                };

                match compiled {
                    Ok(()) => tracing::debug!(
                        group = %location,
                        statements = group.statements.len(),
                        "Compiled statement group"
                    ),
                    Err(err) => {
                        for cause in err.causes() {
                            failures.push(format!("{}: {}", location, cause));
                        }
                    }
                }
            }
        }

        if !failures.is_empty() {
            anyhow::bail!(
                "Failed to compile {} statement(s):\n  {}",
                failures.len(),
                failures.join("\n  ")
            );
        }
        Ok(processor)
    }

    pub fn error_mode(&self) -> ErrorMode {
        self.error_mode
    }

    /// Number of compiled stages for a signal.
    pub fn stages(&self, signal: Signal) -> usize {
        match signal {
            Signal::Metrics => self.metrics.len(),
            Signal::Logs => self.logs.len(),
            Signal::Traces => self.traces.len(),
        }
    }

    pub fn process_logs(
        &self,
        request: &mut ExportLogsServiceRequest,
    ) -> anyhow::Result<TransformStats> {
        let mut stats = TransformStats::default();
        for (stage_index, stage) in self.logs.iter().enumerate() {
            for resource_logs in &mut request.resource_logs {
                match stage {
                    LogStage::Resource(sequence) => {
                        let mut ctx = ResourceContext::new(&mut resource_logs.resource);
                        stats.record(run(sequence, &mut ctx, stage_index)?);
                    }
                    LogStage::Log(sequence) => {
                        for scope_logs in &mut resource_logs.scope_logs {
                            for record in &mut scope_logs.log_records {
                                let mut ctx = LogContext::new(
                                    record,
                                    &mut scope_logs.scope,
                                    &mut resource_logs.resource,
                                );
                                stats.record(run(sequence, &mut ctx, stage_index)?);
                            }
                        }
                    }
                }
            }
        }
        Ok(stats)
    }

    pub fn process_traces(
        &self,
        request: &mut ExportTraceServiceRequest,
    ) -> anyhow::Result<TransformStats> {
        let mut stats = TransformStats::default();
        for (stage_index, stage) in self.traces.iter().enumerate() {
            for resource_spans in &mut request.resource_spans {
                match stage {
                    TraceStage::Resource(sequence) => {
                        let mut ctx = ResourceContext::new(&mut resource_spans.resource);
                        stats.record(run(sequence, &mut ctx, stage_index)?);
                    }
                    TraceStage::Span(sequence) => {
                        for scope_spans in &mut resource_spans.scope_spans {
                            for span in &mut scope_spans.spans {
                                let mut ctx = SpanContext::new(
                                    span,
                                    &mut scope_spans.scope,
                                    &mut resource_spans.resource,
                                );
                                stats.record(run(sequence, &mut ctx, stage_index)?);
                            }
                        }
                    }
                }
            }
        }
        Ok(stats)
    }

    /// Metrics appended during a stage (by the summary conversions) are not visited by that
    /// stage; later stages see them.
    pub fn process_metrics(
        &self,
        request: &mut ExportMetricsServiceRequest,
    ) -> anyhow::Result<TransformStats> {
        let mut stats = TransformStats::default();
        for (stage_index, stage) in self.metrics.iter().enumerate() {
            for resource_metrics in &mut request.resource_metrics {
                if let MetricStage::Resource(sequence) = stage {
                    let mut ctx = ResourceContext::new(&mut resource_metrics.resource);
                    stats.record(run(sequence, &mut ctx, stage_index)?);
                    continue;
                }

                for scope_metrics in &mut resource_metrics.scope_metrics {
                    let metric_count = scope_metrics.metrics.len();
                    for index in 0..metric_count {
                        match stage {
                            MetricStage::Metric(sequence) => {
                                let mut ctx = MetricContext::new(
                                    &mut scope_metrics.metrics,
                                    index,
                                    &mut scope_metrics.scope,
                                    &mut resource_metrics.resource,
                                );
                                stats.record(run(sequence, &mut ctx, stage_index)?);
                            }
                            MetricStage::DataPoint(sequence) => {
                                let points = scope_metrics.metrics.get(index).map_or(0, point_count);
                                for point in 0..points {
                                    let mut ctx = DataPointContext::new(
                                        &mut scope_metrics.metrics,
                                        index,
                                        point,
                                        &mut scope_metrics.scope,
                                        &mut resource_metrics.resource,
                                    );
                                    stats.record(run(sequence, &mut ctx, stage_index)?);
                                }
                            }
                            MetricStage::Resource(_) => {}
                        }
                    }
                }
            }
        }
        Ok(stats)
    }
}

fn compile<K: ContextKind>(
    engine: &Engine<K>,
    group: &ContextStatements,
    mode: ErrorMode,
) -> lumen_ottl::Result<StatementSequence<K>> {
    let conditions = engine.parse_conditions(&group.conditions)?;
    let sequence = engine.sequence(&group.statements, mode)?;
    Ok(sequence.with_conditions(conditions))
}

/// Run one sequence against one context; propagated failures abort the request.
fn run<K: ContextKind>(
    sequence: &StatementSequence<K>,
    ctx: &mut K::Context<'_>,
    stage_index: usize,
) -> anyhow::Result<ExecutionSummary> {
    sequence
        .execute(ctx)
        .with_context(|| format!("Stage {} ({} context) failed", stage_index, K::NAME))
}

fn point_count(metric: &Metric) -> usize {
    match &metric.data {
        None => 0,
        Some(Data::Gauge(gauge)) => gauge.data_points.len(),
        Some(Data::Sum(sum)) => sum.data_points.len(),
        Some(Data::Histogram(histogram)) => histogram.data_points.len(),
        Some(Data::ExponentialHistogram(histogram)) => histogram.data_points.len(),
        Some(Data::Summary(summary)) => summary.data_points.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_ottl::Value;
    use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue};
    use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
    use opentelemetry_proto::tonic::metrics::v1::{
        number_data_point, Gauge, NumberDataPoint, ResourceMetrics, ScopeMetrics, Summary,
        SummaryDataPoint,
    };
    use opentelemetry_proto::tonic::resource::v1::Resource;
    use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span};

    fn processor(json: &str) -> Processor {
        Processor::new(&TransformConfig::from_json(json).unwrap()).unwrap()
    }

    fn kv(key: &str, value: &str) -> KeyValue {
        KeyValue {
            key: key.into(),
            value: Some(AnyValue::from(Value::string(value))),
        }
    }

    fn attribute(attributes: &[KeyValue], key: &str) -> Value {
        lumen_ottl::value::get_attribute(attributes, key)
    }

    fn logs_request() -> ExportLogsServiceRequest {
        ExportLogsServiceRequest {
            resource_logs: vec![ResourceLogs {
                resource: Some(Resource {
                    attributes: vec![kv("service.name", "checkout")],
                    ..Default::default()
                }),
                scope_logs: vec![ScopeLogs {
                    scope: Some(InstrumentationScope {
                        name: "app".into(),
                        ..Default::default()
                    }),
                    log_records: vec![
                        LogRecord {
                            severity_text: "INFO".into(),
                            attributes: vec![kv("http.method", "GET")],
                            ..Default::default()
                        },
                        LogRecord {
                            severity_text: "DEBUG".into(),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_compile_errors_are_aggregated() {
        let config = TransformConfig::from_json(
            r#"{
                "log_statements": [
                    {"context": "log", "statements": ["set(nope, 1)", "set(body, \"x\")", "bogus("]}
                ],
                "trace_statements": [
                    {"context": "span", "conditions": ["kind == SPAN_KIND_NOPE"], "statements": ["set(name, \"x\")"]}
                ]
            }"#,
        )
        .unwrap();

        let err = Processor::new(&config).err().unwrap().to_string();
        assert!(err.starts_with("Failed to compile 3 statement(s)"), "{}", err);
        assert!(err.contains("log_statements[0] (log)"));
        assert!(err.contains("trace_statements[0] (span)"));
        assert!(err.contains("SPAN_KIND_NOPE"));
    }

    #[test]
    fn test_invalid_context_combination_fails() {
        let config = TransformConfig::from_json(
            r#"{"log_statements": [{"context": "metric", "statements": ["set(name, \"x\")"]}]}"#,
        )
        .unwrap();
        let err = Processor::new(&config).err().unwrap().to_string();
        assert!(err.starts_with("Invalid configuration"), "{}", err);
    }

    #[test]
    fn test_log_stages_run_in_order() {
        let processor = processor(
            r#"{
                "log_statements": [
                    {"context": "resource", "statements": ["set(attributes[\"env\"], \"prod\")"]},
                    {"context": "log", "statements": [
                        "set(attributes[\"env\"], resource.attributes[\"env\"])",
                        "set(attributes[\"scope\"], instrumentation_scope.name)"
                    ]}
                ]
            }"#,
        );
        assert_eq!(processor.stages(Signal::Logs), 2);

        let mut request = logs_request();
        let stats = processor.process_logs(&mut request).unwrap();
        assert_eq!(stats.contexts, 3);
        assert_eq!(stats.executed, 5);

        for record in &request.resource_logs[0].scope_logs[0].log_records {
            assert_eq!(attribute(&record.attributes, "env"), Value::string("prod"));
            assert_eq!(attribute(&record.attributes, "scope"), Value::string("app"));
        }
    }

    #[test]
    fn test_cache_is_fresh_per_record() {
        let processor = processor(
            r#"{
                "log_statements": [{"context": "log", "statements": [
                    "set(attributes[\"seen\"], cache[\"method\"])",
                    "set(cache[\"method\"], attributes[\"http.method\"])"
                ]}]
            }"#,
        );
        let mut request = logs_request();
        processor.process_logs(&mut request).unwrap();
        for record in &request.resource_logs[0].scope_logs[0].log_records {
            assert_eq!(attribute(&record.attributes, "seen"), Value::Nil);
        }
    }

    #[test]
    fn test_sequence_conditions() {
        let processor = processor(
            r#"{
                "log_statements": [{
                    "context": "log",
                    "conditions": ["severity_text == \"DEBUG\""],
                    "statements": ["set(severity_text, \"TRACE\")"]
                }]
            }"#,
        );
        let mut request = logs_request();
        let stats = processor.process_logs(&mut request).unwrap();
        let records = &request.resource_logs[0].scope_logs[0].log_records;
        assert_eq!(records[0].severity_text, "INFO");
        assert_eq!(records[1].severity_text, "TRACE");
        assert_eq!(stats.executed, 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_error_modes() {
        let statements = r#"[
            "set(attributes[\"before\"], true)",
            "set(span_id.string, \"zz\")",
            "set(attributes[\"after\"], true)"
        ]"#;

        let ignore = processor(&format!(
            r#"{{"error_mode": "ignore", "log_statements": [{{"context": "log", "statements": {}}}]}}"#,
            statements
        ));
        assert_eq!(ignore.error_mode(), ErrorMode::Ignore);
        let mut request = logs_request();
        let stats = ignore.process_logs(&mut request).unwrap();
        assert_eq!(stats.errors, 2);
        let record = &request.resource_logs[0].scope_logs[0].log_records[0];
        assert_eq!(attribute(&record.attributes, "after"), Value::Bool(true));

        let propagate = processor(&format!(
            r#"{{"log_statements": [{{"context": "log", "statements": {}}}]}}"#,
            statements
        ));
        let mut request = logs_request();
        let err = propagate.process_logs(&mut request).unwrap_err();
        assert!(err.to_string().contains("Stage 0 (log context) failed"));
        let record = &request.resource_logs[0].scope_logs[0].log_records[0];
        assert_eq!(attribute(&record.attributes, "before"), Value::Bool(true));
        assert_eq!(attribute(&record.attributes, "after"), Value::Nil);
    }

    #[test]
    fn test_traces() {
        let processor = processor(
            r#"{
                "trace_statements": [
                    {"context": "span", "statements": ["set(name, \"renamed\") where kind == SPAN_KIND_SERVER"]}
                ]
            }"#,
        );
        let mut request = ExportTraceServiceRequest {
            resource_spans: vec![ResourceSpans {
                scope_spans: vec![ScopeSpans {
                    spans: vec![
                        Span {
                            name: "a".into(),
                            kind: 2,
                            ..Default::default()
                        },
                        Span {
                            name: "b".into(),
                            kind: 3,
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };
        let stats = processor.process_traces(&mut request).unwrap();
        let spans = &request.resource_spans[0].scope_spans[0].spans;
        assert_eq!(spans[0].name, "renamed");
        assert_eq!(spans[1].name, "b");
        assert_eq!(stats.contexts, 2);
    }

    fn metrics_request() -> ExportMetricsServiceRequest {
        ExportMetricsServiceRequest {
            resource_metrics: vec![ResourceMetrics {
                scope_metrics: vec![ScopeMetrics {
                    metrics: vec![
                        Metric {
                            name: "temperature".into(),
                            data: Some(Data::Gauge(Gauge {
                                data_points: vec![
                                    NumberDataPoint {
                                        value: Some(number_data_point::Value::AsDouble(1.0)),
                                        ..Default::default()
                                    },
                                    NumberDataPoint {
                                        value: Some(number_data_point::Value::AsDouble(30.0)),
                                        ..Default::default()
                                    },
                                ],
                            })),
                            ..Default::default()
                        },
                        Metric {
                            name: "latency".into(),
                            data: Some(Data::Summary(Summary {
                                data_points: vec![SummaryDataPoint {
                                    count: 4,
                                    sum: 2.0,
                                    ..Default::default()
                                }],
                            })),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_metric_and_data_point_stages() {
        let processor = processor(
            r#"{
                "metric_statements": [
                    {"context": "metric", "statements": ["set(unit, \"Cel\") where name == \"temperature\""]},
                    {"context": "datapoint", "statements": [
                        "set(attributes[\"hot\"], true) where value_double > 20.0",
                        "convert_summary_count_val_to_sum(\"cumulative\", true)"
                    ]}
                ]
            }"#,
        );
        let mut request = metrics_request();
        let stats = processor.process_metrics(&mut request).unwrap();

        let metrics = &request.resource_metrics[0].scope_metrics[0].metrics;
        assert_eq!(metrics[0].unit, "Cel");
        let Some(Data::Gauge(gauge)) = &metrics[0].data else {
            panic!("expected gauge");
        };
        assert_eq!(attribute(&gauge.data_points[0].attributes, "hot"), Value::Nil);
        assert_eq!(
            attribute(&gauge.data_points[1].attributes, "hot"),
            Value::Bool(true)
        );

        // The appended count metric is not revisited by the stage that created it
        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics[2].name, "latency_count");
        // 2 metric contexts + 3 data point contexts
        assert_eq!(stats.contexts, 5);
    }

    #[test]
    fn test_missing_resource_created_only_on_write() {
        let processor = processor(
            r#"{
                "metric_statements": [
                    {"context": "resource", "statements": ["set(attributes[\"a\"], attributes[\"missing\"])"]}
                ]
            }"#,
        );
        let mut request = metrics_request();
        processor.process_metrics(&mut request).unwrap();
        assert!(request.resource_metrics[0].resource.is_none());
    }
}

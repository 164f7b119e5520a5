//! Metric context: one metric of a scope, addressed by index into its sibling list.

use super::common::{
    get_common, map_member, parse_common_path, set_common, to_i32, to_string, CommonPath,
};
use super::datapoint::data_points_value;
use super::{ContextKind, ScopedContext, TransformContext};
use crate::enums::{SymbolTable, METRIC_SYMBOLS};
use crate::error::Result;
use crate::path::{Field, Path, Segments};
use crate::value::{Map, Value};
use opentelemetry_proto::tonic::common::v1::InstrumentationScope;
use opentelemetry_proto::tonic::metrics::v1::{metric::Data, Metric};
use opentelemetry_proto::tonic::resource::v1::Resource;
use phf::phf_map;
use std::sync::OnceLock;

/// Members of a metric, shared by the metric kind and the data point kind's `metric.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricPath {
    Metric,
    Name,
    Description,
    Unit,
    /// Read-only; writes are ignored.
    Type,
    AggregationTemporality,
    IsMonotonic,
    /// Read-only; writes are ignored.
    DataPoints,
}

static METRIC_FIELDS: phf::Map<&'static str, MetricPath> = phf_map! {
    "name" => MetricPath::Name,
    "description" => MetricPath::Description,
    "unit" => MetricPath::Unit,
    "type" => MetricPath::Type,
    "aggregation_temporality" => MetricPath::AggregationTemporality,
    "is_monotonic" => MetricPath::IsMonotonic,
    "data_points" => MetricPath::DataPoints,
};

pub(crate) fn parse_metric_member(field: &Field, segments: &mut Segments<'_>) -> Result<MetricPath> {
    match METRIC_FIELDS.get(field.name.as_str()) {
        Some(path) => segments.leaf(field, path.clone()),
        None => Err(segments.unresolved(field)),
    }
}

/// `METRIC_DATA_TYPE_*` value of the metric's current data.
pub fn metric_type(metric: &Metric) -> i64 {
    match &metric.data {
        None => 0,
        Some(Data::Gauge(_)) => 1,
        Some(Data::Sum(_)) => 2,
        Some(Data::Histogram(_)) => 3,
        Some(Data::ExponentialHistogram(_)) => 4,
        Some(Data::Summary(_)) => 5,
    }
}

fn aggregation_temporality(metric: &Metric) -> Option<i32> {
    match &metric.data {
        Some(Data::Sum(sum)) => Some(sum.aggregation_temporality),
        Some(Data::Histogram(histogram)) => Some(histogram.aggregation_temporality),
        Some(Data::ExponentialHistogram(histogram)) => Some(histogram.aggregation_temporality),
        Some(Data::Gauge(_)) | Some(Data::Summary(_)) | None => None,
    }
}

fn set_aggregation_temporality(metric: &mut Metric, temporality: i32) {
    match &mut metric.data {
        Some(Data::Sum(sum)) => sum.aggregation_temporality = temporality,
        Some(Data::Histogram(histogram)) => histogram.aggregation_temporality = temporality,
        Some(Data::ExponentialHistogram(histogram)) => {
            histogram.aggregation_temporality = temporality
        }
        Some(Data::Gauge(_)) | Some(Data::Summary(_)) | None => {}
    }
}

fn is_monotonic(metric: &Metric) -> Option<bool> {
    match &metric.data {
        Some(Data::Sum(sum)) => Some(sum.is_monotonic),
        _ => None,
    }
}

fn set_is_monotonic(metric: &mut Metric, monotonic: bool) {
    if let Some(Data::Sum(sum)) = &mut metric.data {
        sum.is_monotonic = monotonic;
    }
}

fn metric_to_value(metric: &Metric) -> Value {
    let mut map = Map::new();
    map.insert("name".into(), Value::string(metric.name.as_str()));
    map.insert("description".into(), Value::string(metric.description.as_str()));
    map.insert("unit".into(), Value::string(metric.unit.as_str()));
    map.insert("type".into(), Value::Int(metric_type(metric)));
    if let Some(temporality) = aggregation_temporality(metric) {
        map.insert("aggregation_temporality".into(), Value::Int(temporality.into()));
    }
    if let Some(monotonic) = is_monotonic(metric) {
        map.insert("is_monotonic".into(), Value::Bool(monotonic));
    }
    Value::Map(map)
}

pub(crate) fn get_metric(metric: &Metric, path: &MetricPath) -> Value {
    match path {
        MetricPath::Metric => metric_to_value(metric),
        MetricPath::Name => Value::string(metric.name.as_str()),
        MetricPath::Description => Value::string(metric.description.as_str()),
        MetricPath::Unit => Value::string(metric.unit.as_str()),
        MetricPath::Type => Value::Int(metric_type(metric)),
        MetricPath::AggregationTemporality => aggregation_temporality(metric)
            .map(|t| Value::Int(t.into()))
            .unwrap_or_default(),
        MetricPath::IsMonotonic => is_monotonic(metric).map(Value::Bool).unwrap_or_default(),
        MetricPath::DataPoints => data_points_value(metric),
    }
}

pub(crate) fn set_metric(metric: &mut Metric, path: &MetricPath, value: Value) {
    match (path, value) {
        // Omitted members keep their current value.
        (MetricPath::Metric, Value::Map(map)) => {
            let (Some(name), Some(description), Some(unit), Some(temporality), Some(monotonic)) = (
                map_member(&map, "name", to_string),
                map_member(&map, "description", to_string),
                map_member(&map, "unit", to_string),
                map_member(&map, "aggregation_temporality", to_i32),
                map_member(&map, "is_monotonic", Value::as_bool),
            ) else {
                return;
            };
            if let Some(name) = name {
                metric.name = name;
            }
            if let Some(description) = description {
                metric.description = description;
            }
            if let Some(unit) = unit {
                metric.unit = unit;
            }
            if let Some(temporality) = temporality {
                set_aggregation_temporality(metric, temporality);
            }
            if let Some(monotonic) = monotonic {
                set_is_monotonic(metric, monotonic);
            }
        }
        (MetricPath::Name, Value::String(s)) => metric.name = s,
        (MetricPath::Description, Value::String(s)) => metric.description = s,
        (MetricPath::Unit, Value::String(s)) => metric.unit = s,
        (MetricPath::AggregationTemporality, value) => {
            if let Some(temporality) = to_i32(&value) {
                set_aggregation_temporality(metric, temporality);
            }
        }
        (MetricPath::IsMonotonic, Value::Bool(b)) => set_is_monotonic(metric, b),
        _ => {}
    }
}

/// Evaluation state for one metric.
pub struct MetricContext<'a> {
    metrics: &'a mut Vec<Metric>,
    index: usize,
    scope: &'a mut Option<InstrumentationScope>,
    resource: &'a mut Option<Resource>,
    cache: Map,
}

impl<'a> MetricContext<'a> {
    pub fn new(
        metrics: &'a mut Vec<Metric>,
        index: usize,
        scope: &'a mut Option<InstrumentationScope>,
        resource: &'a mut Option<Resource>,
    ) -> Self {
        Self {
            metrics,
            index,
            scope,
            resource,
            cache: Map::new(),
        }
    }

    pub fn metric(&self) -> Option<&Metric> {
        self.metrics.get(self.index)
    }

    pub fn metric_mut(&mut self) -> Option<&mut Metric> {
        self.metrics.get_mut(self.index)
    }

    /// The metric and its siblings.
    pub fn metrics(&self) -> &[Metric] {
        self.metrics.as_slice()
    }

    pub fn metrics_mut(&mut self) -> &mut Vec<Metric> {
        &mut *self.metrics
    }
}

impl TransformContext for MetricContext<'_> {
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

impl ScopedContext for MetricContext<'_> {
    fn instrumentation_scope(&self) -> Option<&InstrumentationScope> {
        self.scope.as_ref()
    }

    fn instrumentation_scope_mut(&mut self) -> &mut InstrumentationScope {
        self.scope.get_or_insert_with(InstrumentationScope::default)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricKindPath {
    Common(CommonPath),
    Metric(MetricPath),
}

/// Statements evaluated once per metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricKind;

impl ContextKind for MetricKind {
    const NAME: &'static str = "metric";

    type Context<'a> = MetricContext<'a>;
    type Path = MetricKindPath;

    fn parse_path(path: &Path) -> Result<MetricKindPath> {
        let mut segments = Segments::new(path);
        let field = segments.expect_next()?;
        if let Some(common) = parse_common_path(field, &mut segments)? {
            return Ok(MetricKindPath::Common(common));
        }
        parse_metric_member(field, &mut segments).map(MetricKindPath::Metric)
    }

    fn symbols() -> &'static SymbolTable {
        static SYMBOLS: OnceLock<SymbolTable> = OnceLock::new();
        SYMBOLS.get_or_init(|| SymbolTable::from(&METRIC_SYMBOLS))
    }

    fn get(ctx: &MetricContext<'_>, path: &MetricKindPath) -> Result<Value> {
        Ok(match path {
            MetricKindPath::Common(path) => get_common(ctx, path),
            MetricKindPath::Metric(path) => ctx
                .metric()
                .map(|metric| get_metric(metric, path))
                .unwrap_or_default(),
        })
    }

    fn set(ctx: &mut MetricContext<'_>, path: &MetricKindPath, value: Value) -> Result<()> {
        match path {
            MetricKindPath::Common(path) => set_common(ctx, path, value),
            MetricKindPath::Metric(path) => {
                if let Some(metric) = ctx.metric_mut() {
                    set_metric(metric, path, value);
                }
            }
        }
        Ok(())
    }
}

//! Data point context
//!
//! A data point is one of four mutually exclusive shapes. Compiled paths name a field, not
//! a shape: every read and write matches on the point currently in the context, and a
//! field the shape does not define reads as `Nil` and ignores writes. One statement list
//! can therefore run over a stream of mixed metric types.

use super::common::{
    f64_list, get_attributes, get_common, list_of, map_field, parse_common_path, set_attributes,
    set_common, to_bytes, to_i32, to_u32, to_u64, u64_list, u64_value, CommonPath,
};
use super::metric::{get_metric, parse_metric_member, set_metric, MetricPath};
use super::{ContextKind, ScopedContext, TransformContext};
use crate::enums::{SymbolTable, DATA_POINT_SYMBOLS, METRIC_SYMBOLS};
use crate::error::Result;
use crate::functions::FunctionRegistry;
use crate::path::{Field, Path, Segments};
use crate::value::{attributes_to_map, map_to_attributes, Map, Value};
use opentelemetry_proto::tonic::common::v1::{InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::metrics::v1::{
    exemplar, exponential_histogram_data_point::Buckets, metric::Data, number_data_point,
    summary_data_point::ValueAtQuantile, Exemplar, ExponentialHistogramDataPoint,
    HistogramDataPoint, Metric, NumberDataPoint, SummaryDataPoint,
};
use opentelemetry_proto::tonic::resource::v1::Resource;
use phf::phf_map;
use std::sync::OnceLock;

/// Borrowed view of the point in a context.
#[derive(Debug, Clone, Copy)]
pub enum DataPointRef<'a> {
    Number(&'a NumberDataPoint),
    Histogram(&'a HistogramDataPoint),
    ExponentialHistogram(&'a ExponentialHistogramDataPoint),
    Summary(&'a SummaryDataPoint),
}

/// Mutable view of the point in a context.
#[derive(Debug)]
pub enum DataPointMut<'a> {
    Number(&'a mut NumberDataPoint),
    Histogram(&'a mut HistogramDataPoint),
    ExponentialHistogram(&'a mut ExponentialHistogramDataPoint),
    Summary(&'a mut SummaryDataPoint),
}

impl<'a> DataPointRef<'a> {
    /// Point `index` of the metric, whatever its type.
    pub fn of(metric: &'a Metric, index: usize) -> Option<Self> {
        match metric.data.as_ref()? {
            Data::Gauge(gauge) => gauge.data_points.get(index).map(DataPointRef::Number),
            Data::Sum(sum) => sum.data_points.get(index).map(DataPointRef::Number),
            Data::Histogram(histogram) => {
                histogram.data_points.get(index).map(DataPointRef::Histogram)
            }
            Data::ExponentialHistogram(histogram) => histogram
                .data_points
                .get(index)
                .map(DataPointRef::ExponentialHistogram),
            Data::Summary(summary) => summary.data_points.get(index).map(DataPointRef::Summary),
        }
    }

    pub fn attributes(self) -> &'a [KeyValue] {
        match self {
            DataPointRef::Number(p) => &p.attributes,
            DataPointRef::Histogram(p) => &p.attributes,
            DataPointRef::ExponentialHistogram(p) => &p.attributes,
            DataPointRef::Summary(p) => &p.attributes,
        }
    }

    pub fn start_time_unix_nano(self) -> u64 {
        match self {
            DataPointRef::Number(p) => p.start_time_unix_nano,
            DataPointRef::Histogram(p) => p.start_time_unix_nano,
            DataPointRef::ExponentialHistogram(p) => p.start_time_unix_nano,
            DataPointRef::Summary(p) => p.start_time_unix_nano,
        }
    }

    pub fn time_unix_nano(self) -> u64 {
        match self {
            DataPointRef::Number(p) => p.time_unix_nano,
            DataPointRef::Histogram(p) => p.time_unix_nano,
            DataPointRef::ExponentialHistogram(p) => p.time_unix_nano,
            DataPointRef::Summary(p) => p.time_unix_nano,
        }
    }

    pub fn flags(self) -> u32 {
        match self {
            DataPointRef::Number(p) => p.flags,
            DataPointRef::Histogram(p) => p.flags,
            DataPointRef::ExponentialHistogram(p) => p.flags,
            DataPointRef::Summary(p) => p.flags,
        }
    }
}

impl<'a> DataPointMut<'a> {
    pub fn of(metric: &'a mut Metric, index: usize) -> Option<Self> {
        match metric.data.as_mut()? {
            Data::Gauge(gauge) => gauge.data_points.get_mut(index).map(DataPointMut::Number),
            Data::Sum(sum) => sum.data_points.get_mut(index).map(DataPointMut::Number),
            Data::Histogram(histogram) => histogram
                .data_points
                .get_mut(index)
                .map(DataPointMut::Histogram),
            Data::ExponentialHistogram(histogram) => histogram
                .data_points
                .get_mut(index)
                .map(DataPointMut::ExponentialHistogram),
            Data::Summary(summary) => summary.data_points.get_mut(index).map(DataPointMut::Summary),
        }
    }

    fn attributes_mut(&mut self) -> &mut Vec<KeyValue> {
        match self {
            DataPointMut::Number(p) => &mut p.attributes,
            DataPointMut::Histogram(p) => &mut p.attributes,
            DataPointMut::ExponentialHistogram(p) => &mut p.attributes,
            DataPointMut::Summary(p) => &mut p.attributes,
        }
    }

    fn start_time_mut(&mut self) -> &mut u64 {
        match self {
            DataPointMut::Number(p) => &mut p.start_time_unix_nano,
            DataPointMut::Histogram(p) => &mut p.start_time_unix_nano,
            DataPointMut::ExponentialHistogram(p) => &mut p.start_time_unix_nano,
            DataPointMut::Summary(p) => &mut p.start_time_unix_nano,
        }
    }

    fn time_mut(&mut self) -> &mut u64 {
        match self {
            DataPointMut::Number(p) => &mut p.time_unix_nano,
            DataPointMut::Histogram(p) => &mut p.time_unix_nano,
            DataPointMut::ExponentialHistogram(p) => &mut p.time_unix_nano,
            DataPointMut::Summary(p) => &mut p.time_unix_nano,
        }
    }

    fn flags_mut(&mut self) -> &mut u32 {
        match self {
            DataPointMut::Number(p) => &mut p.flags,
            DataPointMut::Histogram(p) => &mut p.flags,
            DataPointMut::ExponentialHistogram(p) => &mut p.flags,
            DataPointMut::Summary(p) => &mut p.flags,
        }
    }
}

// ============================================================================
// Paths
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataPointPath {
    Common(CommonPath),
    Metric(MetricPath),
    Point(PointField),
}

/// Fields of the point itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointField {
    Attributes(Option<String>),
    StartTimeUnixNano,
    TimeUnixNano,
    ValueDouble,
    ValueInt,
    Exemplars,
    Flags,
    Count,
    Sum,
    BucketCounts,
    ExplicitBounds,
    Scale,
    ZeroCount,
    Positive(BucketsPath),
    Negative(BucketsPath),
    QuantileValues,
}

/// Members of an exponential histogram bucket range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketsPath {
    Buckets,
    Offset,
    BucketCounts,
}

static POINT_FIELDS: phf::Map<&'static str, PointField> = phf_map! {
    "start_time_unix_nano" => PointField::StartTimeUnixNano,
    "time_unix_nano" => PointField::TimeUnixNano,
    "value_double" => PointField::ValueDouble,
    "value_int" => PointField::ValueInt,
    "exemplars" => PointField::Exemplars,
    "flags" => PointField::Flags,
    "count" => PointField::Count,
    "sum" => PointField::Sum,
    "bucket_counts" => PointField::BucketCounts,
    "explicit_bounds" => PointField::ExplicitBounds,
    "scale" => PointField::Scale,
    "zero_count" => PointField::ZeroCount,
    "positive" => PointField::Positive(BucketsPath::Buckets),
    "negative" => PointField::Negative(BucketsPath::Buckets),
    "quantile_values" => PointField::QuantileValues,
};

/// Member order used when a whole point is rendered as a map.
const POINT_FIELD_ORDER: [&str; 15] = [
    "start_time_unix_nano",
    "time_unix_nano",
    "value_double",
    "value_int",
    "count",
    "sum",
    "bucket_counts",
    "explicit_bounds",
    "scale",
    "zero_count",
    "positive",
    "negative",
    "quantile_values",
    "exemplars",
    "flags",
];

fn parse_buckets(field: &Field, segments: &mut Segments<'_>) -> Result<BucketsPath> {
    segments.unkeyed(field)?;
    let Some(member) = segments.next() else {
        return Ok(BucketsPath::Buckets);
    };
    match member.name.as_str() {
        "offset" => segments.leaf(member, BucketsPath::Offset),
        "bucket_counts" => segments.leaf(member, BucketsPath::BucketCounts),
        _ => Err(segments.unresolved(member)),
    }
}

fn parse_point_field(field: &Field, segments: &mut Segments<'_>) -> Result<PointField> {
    if field.name == "attributes" {
        segments.finish()?;
        return Ok(PointField::Attributes(field.key.clone()));
    }
    match POINT_FIELDS.get(field.name.as_str()) {
        Some(PointField::Positive(_)) => parse_buckets(field, segments).map(PointField::Positive),
        Some(PointField::Negative(_)) => parse_buckets(field, segments).map(PointField::Negative),
        Some(leaf) => segments.leaf(field, leaf.clone()),
        None => Err(segments.unresolved(field)),
    }
}

// ============================================================================
// Structured members
// ============================================================================

fn exemplar_to_value(exemplar: &Exemplar) -> Value {
    let mut map = Map::new();
    map.insert(
        "filtered_attributes".into(),
        Value::Map(attributes_to_map(&exemplar.filtered_attributes)),
    );
    map.insert("time_unix_nano".into(), u64_value(exemplar.time_unix_nano));
    let value = match exemplar.value {
        Some(exemplar::Value::AsDouble(d)) => Value::Double(d),
        Some(exemplar::Value::AsInt(i)) => Value::Int(i),
        None => Value::Nil,
    };
    map.insert("value".into(), value);
    map.insert("span_id".into(), Value::Bytes(exemplar.span_id.clone()));
    map.insert("trace_id".into(), Value::Bytes(exemplar.trace_id.clone()));
    Value::Map(map)
}

fn exemplar_from_value(value: &Value) -> Option<Exemplar> {
    let map = value.as_map()?;
    let measurement = match map.get("value") {
        None | Some(Value::Nil) => None,
        Some(Value::Double(d)) => Some(exemplar::Value::AsDouble(*d)),
        Some(Value::Int(i)) => Some(exemplar::Value::AsInt(*i)),
        Some(_) => return None,
    };
    Some(Exemplar {
        filtered_attributes: map_to_attributes(map_field(map, "filtered_attributes", |v| {
            v.as_map().cloned()
        })?),
        time_unix_nano: map_field(map, "time_unix_nano", to_u64)?,
        span_id: map_field(map, "span_id", to_bytes)?,
        trace_id: map_field(map, "trace_id", to_bytes)?,
        value: measurement,
    })
}

fn exemplars_value(exemplars: &[Exemplar]) -> Value {
    Value::List(exemplars.iter().map(exemplar_to_value).collect())
}

fn buckets_to_value(buckets: &Buckets) -> Value {
    let mut map = Map::new();
    map.insert("offset".into(), Value::Int(buckets.offset.into()));
    map.insert("bucket_counts".into(), u64_list(&buckets.bucket_counts));
    Value::Map(map)
}

fn buckets_from_value(value: &Value) -> Option<Buckets> {
    let map = value.as_map()?;
    Some(Buckets {
        offset: map_field(map, "offset", to_i32)?,
        bucket_counts: map_field(map, "bucket_counts", |v| list_of(v, to_u64))?,
    })
}

fn get_buckets(buckets: Option<&Buckets>, path: BucketsPath) -> Value {
    let Some(buckets) = buckets else {
        return Value::Nil;
    };
    match path {
        BucketsPath::Buckets => buckets_to_value(buckets),
        BucketsPath::Offset => Value::Int(buckets.offset.into()),
        BucketsPath::BucketCounts => u64_list(&buckets.bucket_counts),
    }
}

fn set_buckets(buckets: &mut Option<Buckets>, path: BucketsPath, value: Value) {
    match path {
        BucketsPath::Buckets => {
            if let Some(replacement) = buckets_from_value(&value) {
                *buckets = Some(replacement);
            }
        }
        BucketsPath::Offset => {
            if let Some(offset) = to_i32(&value) {
                buckets.get_or_insert_with(Buckets::default).offset = offset;
            }
        }
        BucketsPath::BucketCounts => {
            if let Some(counts) = list_of(&value, to_u64) {
                buckets.get_or_insert_with(Buckets::default).bucket_counts = counts;
            }
        }
    }
}

fn quantile_to_value(quantile: &ValueAtQuantile) -> Value {
    let mut map = Map::new();
    map.insert("quantile".into(), Value::Double(quantile.quantile));
    map.insert("value".into(), Value::Double(quantile.value));
    Value::Map(map)
}

fn quantile_from_value(value: &Value) -> Option<ValueAtQuantile> {
    let map = value.as_map()?;
    Some(ValueAtQuantile {
        quantile: map_field(map, "quantile", Value::as_double)?,
        value: map_field(map, "value", Value::as_double)?,
    })
}

// ============================================================================
// Field access
// ============================================================================

pub(crate) fn get_point_field(point: DataPointRef<'_>, field: &PointField) -> Value {
    use DataPointRef as P;

    match field {
        PointField::Attributes(key) => get_attributes(point.attributes(), key.as_deref()),
        PointField::StartTimeUnixNano => u64_value(point.start_time_unix_nano()),
        PointField::TimeUnixNano => u64_value(point.time_unix_nano()),
        PointField::Flags => Value::Int(point.flags().into()),
        PointField::ValueDouble => match point {
            P::Number(p) => match p.value {
                Some(number_data_point::Value::AsDouble(d)) => Value::Double(d),
                _ => Value::Nil,
            },
            P::Histogram(_) | P::ExponentialHistogram(_) | P::Summary(_) => Value::Nil,
        },
        PointField::ValueInt => match point {
            P::Number(p) => match p.value {
                Some(number_data_point::Value::AsInt(i)) => Value::Int(i),
                _ => Value::Nil,
            },
            P::Histogram(_) | P::ExponentialHistogram(_) | P::Summary(_) => Value::Nil,
        },
        PointField::Exemplars => match point {
            P::Number(p) => exemplars_value(&p.exemplars),
            P::Histogram(p) => exemplars_value(&p.exemplars),
            P::ExponentialHistogram(p) => exemplars_value(&p.exemplars),
            P::Summary(_) => Value::Nil,
        },
        PointField::Count => match point {
            P::Histogram(p) => u64_value(p.count),
            P::ExponentialHistogram(p) => u64_value(p.count),
            P::Summary(p) => u64_value(p.count),
            P::Number(_) => Value::Nil,
        },
        PointField::Sum => match point {
            P::Histogram(p) => p.sum.map(Value::Double).unwrap_or_default(),
            P::ExponentialHistogram(p) => p.sum.map(Value::Double).unwrap_or_default(),
            P::Summary(p) => Value::Double(p.sum),
            P::Number(_) => Value::Nil,
        },
        PointField::BucketCounts => match point {
            P::Histogram(p) => u64_list(&p.bucket_counts),
            P::Number(_) | P::ExponentialHistogram(_) | P::Summary(_) => Value::Nil,
        },
        PointField::ExplicitBounds => match point {
            P::Histogram(p) => f64_list(&p.explicit_bounds),
            P::Number(_) | P::ExponentialHistogram(_) | P::Summary(_) => Value::Nil,
        },
        PointField::Scale => match point {
            P::ExponentialHistogram(p) => Value::Int(p.scale.into()),
            P::Number(_) | P::Histogram(_) | P::Summary(_) => Value::Nil,
        },
        PointField::ZeroCount => match point {
            P::ExponentialHistogram(p) => u64_value(p.zero_count),
            P::Number(_) | P::Histogram(_) | P::Summary(_) => Value::Nil,
        },
        PointField::Positive(path) => match point {
            P::ExponentialHistogram(p) => get_buckets(p.positive.as_ref(), *path),
            P::Number(_) | P::Histogram(_) | P::Summary(_) => Value::Nil,
        },
        PointField::Negative(path) => match point {
            P::ExponentialHistogram(p) => get_buckets(p.negative.as_ref(), *path),
            P::Number(_) | P::Histogram(_) | P::Summary(_) => Value::Nil,
        },
        PointField::QuantileValues => match point {
            P::Summary(p) => Value::List(p.quantile_values.iter().map(quantile_to_value).collect()),
            P::Number(_) | P::Histogram(_) | P::ExponentialHistogram(_) => Value::Nil,
        },
    }
}

pub(crate) fn set_point_field(mut point: DataPointMut<'_>, field: &PointField, value: Value) {
    use DataPointMut as P;

    match field {
        PointField::Attributes(key) => {
            set_attributes(point.attributes_mut(), key.as_deref(), value)
        }
        PointField::StartTimeUnixNano => {
            if let Some(n) = to_u64(&value) {
                *point.start_time_mut() = n;
            }
        }
        PointField::TimeUnixNano => {
            if let Some(n) = to_u64(&value) {
                *point.time_mut() = n;
            }
        }
        PointField::Flags => {
            if let Some(n) = to_u32(&value) {
                *point.flags_mut() = n;
            }
        }
        PointField::ValueDouble => match (point, value) {
            (P::Number(p), Value::Double(d)) => {
                p.value = Some(number_data_point::Value::AsDouble(d))
            }
            (P::Number(_) | P::Histogram(_) | P::ExponentialHistogram(_) | P::Summary(_), _) => {}
        },
        PointField::ValueInt => match (point, value) {
            (P::Number(p), Value::Int(i)) => p.value = Some(number_data_point::Value::AsInt(i)),
            (P::Number(_) | P::Histogram(_) | P::ExponentialHistogram(_) | P::Summary(_), _) => {}
        },
        PointField::Exemplars => {
            let Some(exemplars) = list_of(&value, exemplar_from_value) else {
                return;
            };
            match point {
                P::Number(p) => p.exemplars = exemplars,
                P::Histogram(p) => p.exemplars = exemplars,
                P::ExponentialHistogram(p) => p.exemplars = exemplars,
                P::Summary(_) => {}
            }
        }
        PointField::Count => {
            let Some(count) = to_u64(&value) else { return };
            match point {
                P::Histogram(p) => p.count = count,
                P::ExponentialHistogram(p) => p.count = count,
                P::Summary(p) => p.count = count,
                P::Number(_) => {}
            }
        }
        PointField::Sum => {
            let Some(sum) = value.as_double() else { return };
            match point {
                P::Histogram(p) => p.sum = Some(sum),
                P::ExponentialHistogram(p) => p.sum = Some(sum),
                P::Summary(p) => p.sum = sum,
                P::Number(_) => {}
            }
        }
        PointField::BucketCounts => match point {
            P::Histogram(p) => {
                if let Some(counts) = list_of(&value, to_u64) {
                    p.bucket_counts = counts;
                }
            }
            P::Number(_) | P::ExponentialHistogram(_) | P::Summary(_) => {}
        },
        PointField::ExplicitBounds => match point {
            P::Histogram(p) => {
                if let Some(bounds) = list_of(&value, Value::as_double) {
                    p.explicit_bounds = bounds;
                }
            }
            P::Number(_) | P::ExponentialHistogram(_) | P::Summary(_) => {}
        },
        PointField::Scale => match point {
            P::ExponentialHistogram(p) => {
                if let Some(scale) = to_i32(&value) {
                    p.scale = scale;
                }
            }
            P::Number(_) | P::Histogram(_) | P::Summary(_) => {}
        },
        PointField::ZeroCount => match point {
            P::ExponentialHistogram(p) => {
                if let Some(count) = to_u64(&value) {
                    p.zero_count = count;
                }
            }
            P::Number(_) | P::Histogram(_) | P::Summary(_) => {}
        },
        PointField::Positive(path) => match point {
            P::ExponentialHistogram(p) => set_buckets(&mut p.positive, *path, value),
            P::Number(_) | P::Histogram(_) | P::Summary(_) => {}
        },
        PointField::Negative(path) => match point {
            P::ExponentialHistogram(p) => set_buckets(&mut p.negative, *path, value),
            P::Number(_) | P::Histogram(_) | P::Summary(_) => {}
        },
        PointField::QuantileValues => match point {
            P::Summary(p) => {
                if let Some(quantiles) = list_of(&value, quantile_from_value) {
                    p.quantile_values = quantiles;
                }
            }
            P::Number(_) | P::Histogram(_) | P::ExponentialHistogram(_) => {}
        },
    }
}

fn point_to_value(point: DataPointRef<'_>) -> Value {
    let mut map = Map::new();
    map.insert(
        "attributes".into(),
        get_point_field(point, &PointField::Attributes(None)),
    );
    for name in POINT_FIELD_ORDER {
        if let Some(field) = POINT_FIELDS.get(name) {
            let value = get_point_field(point, field);
            if !value.is_nil() {
                map.insert(name.to_string(), value);
            }
        }
    }
    Value::Map(map)
}

/// All points of a metric as a list of maps, used by `metric.data_points`.
pub(crate) fn data_points_value(metric: &Metric) -> Value {
    let points = (0..)
        .map_while(|index| DataPointRef::of(metric, index))
        .map(point_to_value)
        .collect();
    Value::List(points)
}

// ============================================================================
// Context
// ============================================================================

/// Evaluation state for one data point.
///
/// The point is addressed by metric and point index so that functions can inspect and
/// rewrite the owning metric or append sibling metrics.
pub struct DataPointContext<'a> {
    metrics: &'a mut Vec<Metric>,
    metric_index: usize,
    point_index: usize,
    scope: &'a mut Option<InstrumentationScope>,
    resource: &'a mut Option<Resource>,
    cache: Map,
}

impl<'a> DataPointContext<'a> {
    pub fn new(
        metrics: &'a mut Vec<Metric>,
        metric_index: usize,
        point_index: usize,
        scope: &'a mut Option<InstrumentationScope>,
        resource: &'a mut Option<Resource>,
    ) -> Self {
        Self {
            metrics,
            metric_index,
            point_index,
            scope,
            resource,
            cache: Map::new(),
        }
    }

    pub fn metric(&self) -> Option<&Metric> {
        self.metrics.get(self.metric_index)
    }

    pub fn metric_mut(&mut self) -> Option<&mut Metric> {
        self.metrics.get_mut(self.metric_index)
    }

    /// The owning metric and its siblings.
    pub fn metrics(&self) -> &[Metric] {
        self.metrics.as_slice()
    }

    pub fn metrics_mut(&mut self) -> &mut Vec<Metric> {
        &mut *self.metrics
    }

    pub fn metric_index(&self) -> usize {
        self.metric_index
    }

    pub fn point_index(&self) -> usize {
        self.point_index
    }

    pub fn data_point(&self) -> Option<DataPointRef<'_>> {
        DataPointRef::of(self.metric()?, self.point_index)
    }

    pub fn data_point_mut(&mut self) -> Option<DataPointMut<'_>> {
        let index = self.point_index;
        DataPointMut::of(self.metric_mut()?, index)
    }
}

impl TransformContext for DataPointContext<'_> {
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

impl ScopedContext for DataPointContext<'_> {
    fn instrumentation_scope(&self) -> Option<&InstrumentationScope> {
        self.scope.as_ref()
    }

    fn instrumentation_scope_mut(&mut self) -> &mut InstrumentationScope {
        self.scope.get_or_insert_with(InstrumentationScope::default)
    }
}

/// Statements evaluated once per data point.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataPointKind;

impl ContextKind for DataPointKind {
    const NAME: &'static str = "datapoint";

    type Context<'a> = DataPointContext<'a>;
    type Path = DataPointPath;

    fn parse_path(path: &Path) -> Result<DataPointPath> {
        let mut segments = Segments::new(path);
        let field = segments.expect_next()?;
        if let Some(common) = parse_common_path(field, &mut segments)? {
            return Ok(DataPointPath::Common(common));
        }
        if field.name == "metric" {
            segments.unkeyed(field)?;
            return Ok(DataPointPath::Metric(match segments.next() {
                None => MetricPath::Metric,
                Some(member) => parse_metric_member(member, &mut segments)?,
            }));
        }
        parse_point_field(field, &mut segments).map(DataPointPath::Point)
    }

    fn symbols() -> &'static SymbolTable {
        static SYMBOLS: OnceLock<SymbolTable> = OnceLock::new();
        SYMBOLS.get_or_init(|| SymbolTable::from_static(&METRIC_SYMBOLS, &DATA_POINT_SYMBOLS))
    }

    fn default_functions() -> FunctionRegistry<Self> {
        let mut functions = crate::funcs::standard_functions();
        functions.extend(crate::funcs::data_point_functions());
        functions
    }

    fn get(ctx: &DataPointContext<'_>, path: &DataPointPath) -> Result<Value> {
        Ok(match path {
            DataPointPath::Common(path) => get_common(ctx, path),
            DataPointPath::Metric(path) => ctx
                .metric()
                .map(|metric| get_metric(metric, path))
                .unwrap_or_default(),
            DataPointPath::Point(field) => ctx
                .data_point()
                .map(|point| get_point_field(point, field))
                .unwrap_or_default(),
        })
    }

    fn set(ctx: &mut DataPointContext<'_>, path: &DataPointPath, value: Value) -> Result<()> {
        match path {
            DataPointPath::Common(path) => set_common(ctx, path, value),
            DataPointPath::Metric(path) => {
                if let Some(metric) = ctx.metric_mut() {
                    set_metric(metric, path, value);
                }
            }
            DataPointPath::Point(field) => {
                if let Some(point) = ctx.data_point_mut() {
                    set_point_field(point, field, value);
                }
            }
        }
        Ok(())
    }
}

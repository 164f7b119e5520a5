//! Data point editors that reshape the owning metric.
//!
//! These run per data point but act on the metric: the conversions are idempotent, so the
//! remaining points of an already converted metric see a no-op.

use crate::contexts::{DataPointContext, DataPointKind};
use crate::error::{Error, Result};
use crate::functions::{Arguments, ExprFunction};
use crate::value::Value;
use opentelemetry_proto::tonic::metrics::v1::{
    metric::Data, number_data_point, AggregationTemporality, Gauge, Metric, NumberDataPoint,
    Sum, SummaryDataPoint,
};

type Factory = Result<Box<dyn ExprFunction<DataPointKind>>>;

fn parse_temporality(function: &str, name: &str) -> Result<i32> {
    match name {
        "cumulative" => Ok(AggregationTemporality::Cumulative as i32),
        "delta" => Ok(AggregationTemporality::Delta as i32),
        other => Err(Error::invalid_arguments(
            function,
            format!("unknown aggregation temporality {:?}, expected cumulative or delta", other),
        )),
    }
}

struct ConvertSumToGauge;

impl ExprFunction<DataPointKind> for ConvertSumToGauge {
    fn call(&self, ctx: &mut DataPointContext<'_>) -> Result<Value> {
        if let Some(metric) = ctx.metric_mut() {
            if let Some(Data::Sum(sum)) = &mut metric.data {
                let data_points = std::mem::take(&mut sum.data_points);
                metric.data = Some(Data::Gauge(Gauge { data_points }));
            }
        }
        Ok(Value::Nil)
    }
}

pub(crate) fn convert_sum_to_gauge(_args: Arguments<DataPointKind>) -> Factory {
    Ok(Box::new(ConvertSumToGauge))
}

struct ConvertGaugeToSum {
    aggregation_temporality: i32,
    is_monotonic: bool,
}

impl ExprFunction<DataPointKind> for ConvertGaugeToSum {
    fn call(&self, ctx: &mut DataPointContext<'_>) -> Result<Value> {
        if let Some(metric) = ctx.metric_mut() {
            if let Some(Data::Gauge(gauge)) = &mut metric.data {
                let data_points = std::mem::take(&mut gauge.data_points);
                metric.data = Some(Data::Sum(Sum {
                    data_points,
                    aggregation_temporality: self.aggregation_temporality,
                    is_monotonic: self.is_monotonic,
                }));
            }
        }
        Ok(Value::Nil)
    }
}

pub(crate) fn convert_gauge_to_sum(mut args: Arguments<DataPointKind>) -> Factory {
    let function = args.function();
    let aggregation_temporality = parse_temporality(function, &args.next_string()?)?;
    let is_monotonic = args.next_bool()?;
    Ok(Box::new(ConvertGaugeToSum {
        aggregation_temporality,
        is_monotonic,
    }))
}

/// Which summary value becomes the sum point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummaryValue {
    Count,
    Sum,
}

impl SummaryValue {
    fn suffix(self) -> &'static str {
        match self {
            SummaryValue::Count => "_count",
            SummaryValue::Sum => "_sum",
        }
    }

    fn point_value(self, point: &SummaryDataPoint) -> number_data_point::Value {
        match self {
            SummaryValue::Count => number_data_point::Value::AsInt(
                i64::try_from(point.count).unwrap_or(i64::MAX),
            ),
            SummaryValue::Sum => number_data_point::Value::AsDouble(point.sum),
        }
    }
}

/// Copy one value of the current summary point into a sibling sum metric named after the
/// summary, creating the sibling on first use.
struct SummaryToSum {
    value: SummaryValue,
    aggregation_temporality: i32,
    is_monotonic: bool,
}

impl SummaryToSum {
    fn sibling_index(&self, metrics: &[Metric], name: &str) -> Option<usize> {
        metrics.iter().position(|metric| {
            metric.name == name
                && matches!(
                    &metric.data,
                    Some(Data::Sum(sum))
                        if sum.aggregation_temporality == self.aggregation_temporality
                            && sum.is_monotonic == self.is_monotonic
                )
        })
    }
}

impl ExprFunction<DataPointKind> for SummaryToSum {
    fn call(&self, ctx: &mut DataPointContext<'_>) -> Result<Value> {
        let Some(summary) = ctx.metric() else {
            return Ok(Value::Nil);
        };
        let Some(Data::Summary(data)) = &summary.data else {
            return Ok(Value::Nil);
        };
        let Some(point) = data.data_points.get(ctx.point_index()) else {
            return Ok(Value::Nil);
        };

        let name = format!("{}{}", summary.name, self.value.suffix());
        let number = NumberDataPoint {
            attributes: point.attributes.clone(),
            start_time_unix_nano: point.start_time_unix_nano,
            time_unix_nano: point.time_unix_nano,
            flags: point.flags,
            value: Some(self.value.point_value(point)),
            ..Default::default()
        };
        let template = Metric {
            name: name.clone(),
            description: summary.description.clone(),
            unit: summary.unit.clone(),
            data: Some(Data::Sum(Sum {
                data_points: Vec::new(),
                aggregation_temporality: self.aggregation_temporality,
                is_monotonic: self.is_monotonic,
            })),
            ..Default::default()
        };

        let index = match self.sibling_index(ctx.metrics(), &name) {
            Some(index) => index,
            None => {
                let metrics = ctx.metrics_mut();
                metrics.push(template);
                metrics.len() - 1
            }
        };
        if let Some(Data::Sum(sum)) = ctx
            .metrics_mut()
            .get_mut(index)
            .and_then(|metric| metric.data.as_mut())
        {
            sum.data_points.push(number);
        }
        Ok(Value::Nil)
    }
}

fn summary_to_sum(mut args: Arguments<DataPointKind>, value: SummaryValue) -> Factory {
    let function = args.function();
    let aggregation_temporality = parse_temporality(function, &args.next_string()?)?;
    let is_monotonic = args.next_bool()?;
    Ok(Box::new(SummaryToSum {
        value,
        aggregation_temporality,
        is_monotonic,
    }))
}

pub(crate) fn convert_summary_count_val_to_sum(args: Arguments<DataPointKind>) -> Factory {
    summary_to_sum(args, SummaryValue::Count)
}

pub(crate) fn convert_summary_sum_val_to_sum(args: Arguments<DataPointKind>) -> Factory {
    summary_to_sum(args, SummaryValue::Sum)
}

//! Enum symbols
//!
//! Statements may name integral constants symbolically (`FLAG_NO_RECORDED_VALUE`,
//! `SPAN_KIND_SERVER`). Each context kind owns a frozen [`SymbolTable`] assembled from a
//! shared base table and its own entries.
//!
//! The static tables use compile-time perfect hash maps (phf).

use crate::error::{Error, Result};
use phf::phf_map;
use std::collections::HashMap;

/// Integral value of an enum symbol
pub type Enum = i64;

/// Shared by the metric and data point contexts.
pub static METRIC_SYMBOLS: phf::Map<&'static str, Enum> = phf_map! {
    "AGGREGATION_TEMPORALITY_UNSPECIFIED" => 0,
    "AGGREGATION_TEMPORALITY_DELTA" => 1,
    "AGGREGATION_TEMPORALITY_CUMULATIVE" => 2,
    "METRIC_DATA_TYPE_NONE" => 0,
    "METRIC_DATA_TYPE_GAUGE" => 1,
    "METRIC_DATA_TYPE_SUM" => 2,
    "METRIC_DATA_TYPE_HISTOGRAM" => 3,
    "METRIC_DATA_TYPE_EXPONENTIAL_HISTOGRAM" => 4,
    "METRIC_DATA_TYPE_SUMMARY" => 5,
};

pub static DATA_POINT_SYMBOLS: phf::Map<&'static str, Enum> = phf_map! {
    "FLAG_NONE" => 0,
    "FLAG_NO_RECORDED_VALUE" => 1,
};

pub static LOG_SYMBOLS: phf::Map<&'static str, Enum> = phf_map! {
    "SEVERITY_NUMBER_UNSPECIFIED" => 0,
    "SEVERITY_NUMBER_TRACE" => 1,
    "SEVERITY_NUMBER_TRACE2" => 2,
    "SEVERITY_NUMBER_TRACE3" => 3,
    "SEVERITY_NUMBER_TRACE4" => 4,
    "SEVERITY_NUMBER_DEBUG" => 5,
    "SEVERITY_NUMBER_DEBUG2" => 6,
    "SEVERITY_NUMBER_DEBUG3" => 7,
    "SEVERITY_NUMBER_DEBUG4" => 8,
    "SEVERITY_NUMBER_INFO" => 9,
    "SEVERITY_NUMBER_INFO2" => 10,
    "SEVERITY_NUMBER_INFO3" => 11,
    "SEVERITY_NUMBER_INFO4" => 12,
    "SEVERITY_NUMBER_WARN" => 13,
    "SEVERITY_NUMBER_WARN2" => 14,
    "SEVERITY_NUMBER_WARN3" => 15,
    "SEVERITY_NUMBER_WARN4" => 16,
    "SEVERITY_NUMBER_ERROR" => 17,
    "SEVERITY_NUMBER_ERROR2" => 18,
    "SEVERITY_NUMBER_ERROR3" => 19,
    "SEVERITY_NUMBER_ERROR4" => 20,
    "SEVERITY_NUMBER_FATAL" => 21,
    "SEVERITY_NUMBER_FATAL2" => 22,
    "SEVERITY_NUMBER_FATAL3" => 23,
    "SEVERITY_NUMBER_FATAL4" => 24,
};

pub static SPAN_SYMBOLS: phf::Map<&'static str, Enum> = phf_map! {
    "SPAN_KIND_UNSPECIFIED" => 0,
    "SPAN_KIND_INTERNAL" => 1,
    "SPAN_KIND_SERVER" => 2,
    "SPAN_KIND_CLIENT" => 3,
    "SPAN_KIND_PRODUCER" => 4,
    "SPAN_KIND_CONSUMER" => 5,
    "STATUS_CODE_UNSET" => 0,
    "STATUS_CODE_OK" => 1,
    "STATUS_CODE_ERROR" => 2,
};

/// Immutable symbol -> value mapping for one context kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    symbols: HashMap<String, Enum>,
}

impl SymbolTable {
    /// Copy `base`, then insert `specific`; on a name collision the specific entry wins.
    pub fn merged<'a, B, S>(base: B, specific: S) -> Self
    where
        B: IntoIterator<Item = (&'a str, Enum)>,
        S: IntoIterator<Item = (&'a str, Enum)>,
    {
        let mut symbols: HashMap<String, Enum> = HashMap::new();
        for (name, value) in base.into_iter().chain(specific) {
            symbols.insert(name.to_string(), value);
        }
        Self { symbols }
    }

    /// Build from a static base table and a static context table.
    pub fn from_static(
        base: &'static phf::Map<&'static str, Enum>,
        specific: &'static phf::Map<&'static str, Enum>,
    ) -> Self {
        Self::merged(
            base.entries().map(|(k, v)| (*k, *v)),
            specific.entries().map(|(k, v)| (*k, *v)),
        )
    }

    pub fn resolve(&self, symbol: &str) -> Result<Enum> {
        self.symbols
            .get(symbol)
            .copied()
            .ok_or_else(|| Error::SymbolNotFound(symbol.to_string()))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl From<&'static phf::Map<&'static str, Enum>> for SymbolTable {
    fn from(table: &'static phf::Map<&'static str, Enum>) -> Self {
        Self {
            symbols: table.entries().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

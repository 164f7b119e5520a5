//! Built-in functions
//!
//! Signatures live in a compile-time perfect hash map (phf); the registries handed to each
//! context kind are assembled from it.

mod converters;
mod editors;
mod metrics;

use crate::contexts::{ContextKind, DataPointKind};
use crate::functions::{FunctionFactory, FunctionKind, FunctionMetadata, FunctionRegistry};
use phf::phf_map;

const fn editor(name: &'static str, min_args: usize, max_args: usize) -> FunctionMetadata {
    FunctionMetadata {
        name,
        kind: FunctionKind::Editor,
        min_args,
        max_args: Some(max_args),
    }
}

const fn converter(name: &'static str, min_args: usize, max_args: usize) -> FunctionMetadata {
    FunctionMetadata {
        name,
        kind: FunctionKind::Converter,
        min_args,
        max_args: Some(max_args),
    }
}

static FUNCTIONS: phf::Map<&'static str, FunctionMetadata> = phf_map! {
    // Editors
    "set" => editor("set", 2, 2),
    "delete_key" => editor("delete_key", 2, 2),
    "delete_matching_keys" => editor("delete_matching_keys", 2, 2),
    "keep_keys" => editor("keep_keys", 2, 2),
    "limit" => editor("limit", 2, 3),
    "truncate_all" => editor("truncate_all", 2, 2),
    "merge_maps" => editor("merge_maps", 3, 3),
    "replace_pattern" => editor("replace_pattern", 3, 3),
    "replace_all_patterns" => editor("replace_all_patterns", 4, 4),
    "replace_match" => editor("replace_match", 3, 3),
    "replace_all_matches" => editor("replace_all_matches", 3, 3),

    // Converters
    "Concat" => converter("Concat", 2, 2),
    "ConvertCase" => converter("ConvertCase", 2, 2),
    "Double" => converter("Double", 1, 1),
    "Int" => converter("Int", 1, 1),
    "IsMatch" => converter("IsMatch", 2, 2),
    "ParseJSON" => converter("ParseJSON", 1, 1),
    "SpanID" => converter("SpanID", 1, 1),
    "Split" => converter("Split", 2, 2),
    "Substring" => converter("Substring", 3, 3),
    "TraceID" => converter("TraceID", 1, 1),

    // Data point editors
    "convert_sum_to_gauge" => editor("convert_sum_to_gauge", 0, 0),
    "convert_gauge_to_sum" => editor("convert_gauge_to_sum", 2, 2),
    "convert_summary_count_val_to_sum" => editor("convert_summary_count_val_to_sum", 2, 2),
    "convert_summary_sum_val_to_sum" => editor("convert_summary_sum_val_to_sum", 2, 2),
};

/// Signature of a built-in function, if one exists with this name.
pub fn builtin_metadata(name: &str) -> Option<&'static FunctionMetadata> {
    FUNCTIONS.get(name)
}

fn register<K: ContextKind>(
    registry: &mut FunctionRegistry<K>,
    name: &str,
    factory: FunctionFactory<K>,
) {
    if let Some(metadata) = FUNCTIONS.get(name) {
        registry.register(*metadata, factory);
    }
}

/// Editors and converters available to every context kind.
pub fn standard_functions<K: ContextKind>() -> FunctionRegistry<K> {
    let mut registry = FunctionRegistry::new();

    register(&mut registry, "set", editors::set::<K>);
    register(&mut registry, "delete_key", editors::delete_key::<K>);
    register(&mut registry, "delete_matching_keys", editors::delete_matching_keys::<K>);
    register(&mut registry, "keep_keys", editors::keep_keys::<K>);
    register(&mut registry, "limit", editors::limit::<K>);
    register(&mut registry, "truncate_all", editors::truncate_all::<K>);
    register(&mut registry, "merge_maps", editors::merge_maps::<K>);
    register(&mut registry, "replace_pattern", editors::replace_pattern::<K>);
    register(&mut registry, "replace_all_patterns", editors::replace_all_patterns::<K>);
    register(&mut registry, "replace_match", editors::replace_match::<K>);
    register(&mut registry, "replace_all_matches", editors::replace_all_matches::<K>);

    register(&mut registry, "Concat", converters::concat::<K>);
    register(&mut registry, "ConvertCase", converters::convert_case::<K>);
    register(&mut registry, "Double", converters::double::<K>);
    register(&mut registry, "Int", converters::int::<K>);
    register(&mut registry, "IsMatch", converters::is_match::<K>);
    register(&mut registry, "ParseJSON", converters::parse_json::<K>);
    register(&mut registry, "SpanID", converters::span_id::<K>);
    register(&mut registry, "Split", converters::split::<K>);
    register(&mut registry, "Substring", converters::substring::<K>);
    register(&mut registry, "TraceID", converters::trace_id::<K>);

    registry
}

/// Editors that reshape the metric owning a data point.
pub fn data_point_functions() -> FunctionRegistry<DataPointKind> {
    let mut registry = FunctionRegistry::new();

    register(&mut registry, "convert_sum_to_gauge", metrics::convert_sum_to_gauge);
    register(&mut registry, "convert_gauge_to_sum", metrics::convert_gauge_to_sum);
    register(
        &mut registry,
        "convert_summary_count_val_to_sum",
        metrics::convert_summary_count_val_to_sum,
    );
    register(
        &mut registry,
        "convert_summary_sum_val_to_sum",
        metrics::convert_summary_sum_val_to_sum,
    );

    registry
}

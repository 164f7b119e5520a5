//! Editors: functions that mutate the context.
//!
//! Map editors read the whole target map, edit a copy and write it back through the same
//! accessor, so a target of the wrong type is left untouched.

use crate::accessor::{Accessor, Getter};
use crate::contexts::ContextKind;
use crate::error::{Error, Result};
use crate::functions::{Arguments, ExprFunction};
use crate::value::{Map, Value};
use regex::Regex;
use std::collections::HashSet;

type Factory<K> = Result<Box<dyn ExprFunction<K>>>;

pub(crate) fn compile_regex(function: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        Error::invalid_arguments(function, format!("invalid pattern {:?}: {}", pattern, e))
    })
}

/// Translate a glob into an anchored regex. Supports `*`, `?`, `[...]` and `{a,b}`.
pub(crate) fn compile_glob(function: &str, glob: &str) -> Result<Regex> {
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push('^');
    let mut in_class = false;
    let mut in_group = false;
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => pattern.push_str(&regex::escape(&escaped.to_string())),
                None => pattern.push_str(r"\\"),
            },
            _ if in_class => {
                if c == ']' {
                    in_class = false;
                }
                pattern.push(c);
            }
            '[' => {
                in_class = true;
                pattern.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    pattern.push('^');
                }
            }
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            '{' if !in_group => {
                in_group = true;
                pattern.push_str("(?:");
            }
            ',' if in_group => pattern.push('|'),
            '}' if in_group => {
                in_group = false;
                pattern.push(')');
            }
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }

    if in_class || in_group {
        return Err(Error::invalid_arguments(
            function,
            format!("unterminated glob pattern {:?}", glob),
        ));
    }
    pattern.push('$');
    compile_regex(function, &pattern)
}

/// Read the target as a map, edit it, write it back.
fn edit_map<K: ContextKind>(
    target: &Accessor<K>,
    ctx: &mut K::Context<'_>,
    edit: impl FnOnce(&mut Map),
) -> Result<Value> {
    if let Value::Map(mut map) = target.get(ctx)? {
        edit(&mut map);
        target.set(ctx, Value::Map(map))?;
    }
    Ok(Value::Nil)
}

// ============================================================================
// set
// ============================================================================

struct Set<K: ContextKind> {
    target: Accessor<K>,
    value: Getter<K>,
}

impl<K: ContextKind> ExprFunction<K> for Set<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        let value = self.value.get(ctx)?;
        self.target.set(ctx, value)?;
        Ok(Value::Nil)
    }
}

pub(crate) fn set<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let target = args.next_setter()?;
    let value = args.next_getter()?;
    Ok(Box::new(Set { target, value }))
}

// ============================================================================
// Key removal and retention
// ============================================================================

struct DeleteKey<K: ContextKind> {
    target: Accessor<K>,
    key: String,
}

impl<K: ContextKind> ExprFunction<K> for DeleteKey<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        edit_map(&self.target, ctx, |map| {
            map.shift_remove(&self.key);
        })
    }
}

pub(crate) fn delete_key<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let target = args.next_setter()?;
    let key = args.next_string()?;
    Ok(Box::new(DeleteKey { target, key }))
}

struct DeleteMatchingKeys<K: ContextKind> {
    target: Accessor<K>,
    pattern: Regex,
}

impl<K: ContextKind> ExprFunction<K> for DeleteMatchingKeys<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        edit_map(&self.target, ctx, |map| {
            map.retain(|key, _| !self.pattern.is_match(key));
        })
    }
}

pub(crate) fn delete_matching_keys<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let target = args.next_setter()?;
    let pattern = compile_regex(args.function(), &args.next_string()?)?;
    Ok(Box::new(DeleteMatchingKeys { target, pattern }))
}

struct KeepKeys<K: ContextKind> {
    target: Accessor<K>,
    keys: HashSet<String>,
}

impl<K: ContextKind> ExprFunction<K> for KeepKeys<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        edit_map(&self.target, ctx, |map| {
            map.retain(|key, _| self.keys.contains(key));
        })
    }
}

pub(crate) fn keep_keys<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let target = args.next_setter()?;
    let keys = args.next_string_list()?.into_iter().collect();
    Ok(Box::new(KeepKeys { target, keys }))
}

struct Limit<K: ContextKind> {
    target: Accessor<K>,
    limit: usize,
    priority_keys: Vec<String>,
}

impl<K: ContextKind> ExprFunction<K> for Limit<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        edit_map(&self.target, ctx, |map| {
            if map.len() <= self.limit {
                return;
            }
            let mut kept: HashSet<String> = self
                .priority_keys
                .iter()
                .filter(|key| map.contains_key(key.as_str()))
                .cloned()
                .collect();
            for key in map.keys() {
                if kept.len() >= self.limit {
                    break;
                }
                if !kept.contains(key) {
                    kept.insert(key.clone());
                }
            }
            map.retain(|key, _| kept.contains(key));
        })
    }
}

pub(crate) fn limit<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let function = args.function();
    let target = args.next_setter()?;
    let limit = args.next_int()?;
    let limit = usize::try_from(limit).map_err(|_| {
        Error::invalid_arguments(function, format!("limit must be non-negative, got {}", limit))
    })?;
    let priority_keys = if args.has_next() {
        args.next_string_list()?
    } else {
        Vec::new()
    };
    if priority_keys.len() > limit {
        return Err(Error::invalid_arguments(
            function,
            format!(
                "{} priority keys exceed the limit of {}",
                priority_keys.len(),
                limit
            ),
        ));
    }
    Ok(Box::new(Limit {
        target,
        limit,
        priority_keys,
    }))
}

// ============================================================================
// Value rewriting
// ============================================================================

fn truncate(s: &mut String, limit: usize) {
    if s.len() <= limit {
        return;
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

struct TruncateAll<K: ContextKind> {
    target: Accessor<K>,
    limit: usize,
}

impl<K: ContextKind> ExprFunction<K> for TruncateAll<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        edit_map(&self.target, ctx, |map| {
            for value in map.values_mut() {
                if let Value::String(s) = value {
                    truncate(s, self.limit);
                }
            }
        })
    }
}

pub(crate) fn truncate_all<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let function = args.function();
    let target = args.next_setter()?;
    let limit = args.next_int()?;
    let limit = usize::try_from(limit).map_err(|_| {
        Error::invalid_arguments(function, format!("limit must be non-negative, got {}", limit))
    })?;
    Ok(Box::new(TruncateAll { target, limit }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeStrategy {
    /// Add keys missing from the target.
    Insert,
    /// Overwrite keys present in the target.
    Update,
    /// Both.
    Upsert,
}

struct MergeMaps<K: ContextKind> {
    target: Accessor<K>,
    source: Getter<K>,
    strategy: MergeStrategy,
}

impl<K: ContextKind> ExprFunction<K> for MergeMaps<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        let Value::Map(source) = self.source.get(ctx)? else {
            return Ok(Value::Nil);
        };
        edit_map(&self.target, ctx, |map| {
            for (key, value) in source {
                let present = map.contains_key(&key);
                let write = match self.strategy {
                    MergeStrategy::Insert => !present,
                    MergeStrategy::Update => present,
                    MergeStrategy::Upsert => true,
                };
                if write {
                    map.insert(key, value);
                }
            }
        })
    }
}

pub(crate) fn merge_maps<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let function = args.function();
    let target = args.next_setter()?;
    let source = args.next_getter()?;
    let strategy = match args.next_string()?.as_str() {
        "insert" => MergeStrategy::Insert,
        "update" => MergeStrategy::Update,
        "upsert" => MergeStrategy::Upsert,
        other => {
            return Err(Error::invalid_arguments(
                function,
                format!("unknown merge strategy {:?}, expected insert, update or upsert", other),
            ))
        }
    };
    Ok(Box::new(MergeMaps {
        target,
        source,
        strategy,
    }))
}

struct ReplacePattern<K: ContextKind> {
    target: Accessor<K>,
    pattern: Regex,
    replacement: String,
}

impl<K: ContextKind> ExprFunction<K> for ReplacePattern<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        if let Value::String(s) = self.target.get(ctx)? {
            let replaced = self.pattern.replace_all(&s, self.replacement.as_str());
            if replaced != s {
                self.target.set(ctx, Value::String(replaced.into_owned()))?;
            }
        }
        Ok(Value::Nil)
    }
}

pub(crate) fn replace_pattern<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let target = args.next_setter()?;
    let pattern = compile_regex(args.function(), &args.next_string()?)?;
    let replacement = args.next_string()?;
    Ok(Box::new(ReplacePattern {
        target,
        pattern,
        replacement,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplaceMode {
    Key,
    Value,
}

struct ReplaceAllPatterns<K: ContextKind> {
    target: Accessor<K>,
    mode: ReplaceMode,
    pattern: Regex,
    replacement: String,
}

impl<K: ContextKind> ExprFunction<K> for ReplaceAllPatterns<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        edit_map(&self.target, ctx, |map| match self.mode {
            ReplaceMode::Value => {
                for value in map.values_mut() {
                    if let Value::String(s) = value {
                        let replaced = self.pattern.replace_all(s, self.replacement.as_str());
                        *s = replaced.into_owned();
                    }
                }
            }
            ReplaceMode::Key => {
                *map = std::mem::take(map)
                    .into_iter()
                    .map(|(key, value)| {
                        let key = self
                            .pattern
                            .replace_all(&key, self.replacement.as_str())
                            .into_owned();
                        (key, value)
                    })
                    .collect();
            }
        })
    }
}

pub(crate) fn replace_all_patterns<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let function = args.function();
    let target = args.next_setter()?;
    let mode = match args.next_string()?.as_str() {
        "key" => ReplaceMode::Key,
        "value" => ReplaceMode::Value,
        other => {
            return Err(Error::invalid_arguments(
                function,
                format!("unknown mode {:?}, expected key or value", other),
            ))
        }
    };
    let pattern = compile_regex(function, &args.next_string()?)?;
    let replacement = args.next_string()?;
    Ok(Box::new(ReplaceAllPatterns {
        target,
        mode,
        pattern,
        replacement,
    }))
}

struct ReplaceMatch<K: ContextKind> {
    target: Accessor<K>,
    glob: Regex,
    replacement: Getter<K>,
}

impl<K: ContextKind> ExprFunction<K> for ReplaceMatch<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        if let Value::String(s) = self.target.get(ctx)? {
            if self.glob.is_match(&s) {
                let replacement = self.replacement.get(ctx)?;
                if let Value::String(_) = replacement {
                    self.target.set(ctx, replacement)?;
                }
            }
        }
        Ok(Value::Nil)
    }
}

pub(crate) fn replace_match<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let target = args.next_setter()?;
    let glob = compile_glob(args.function(), &args.next_string()?)?;
    let replacement = args.next_getter()?;
    Ok(Box::new(ReplaceMatch {
        target,
        glob,
        replacement,
    }))
}

struct ReplaceAllMatches<K: ContextKind> {
    target: Accessor<K>,
    glob: Regex,
    replacement: Getter<K>,
}

impl<K: ContextKind> ExprFunction<K> for ReplaceAllMatches<K> {
    fn call(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        let replacement = match self.replacement.get(ctx)? {
            Value::String(s) => s,
            _ => return Ok(Value::Nil),
        };
        edit_map(&self.target, ctx, |map| {
            for value in map.values_mut() {
                if matches!(value, Value::String(s) if self.glob.is_match(s)) {
                    *value = Value::String(replacement.clone());
                }
            }
        })
    }
}

pub(crate) fn replace_all_matches<K: ContextKind>(mut args: Arguments<K>) -> Factory<K> {
    let target = args.next_setter()?;
    let glob = compile_glob(args.function(), &args.next_string()?)?;
    let replacement = args.next_getter()?;
    Ok(Box::new(ReplaceAllMatches {
        target,
        glob,
        replacement,
    }))
}

//! Bound accessors and argument getters
//!
//! An [`Accessor`] is a path resolved against one context kind. It keeps the path text for
//! diagnostics and the kind's resolved target, never a reference into a record, so one
//! accessor serves every context of its kind.

use crate::contexts::ContextKind;
use crate::enums::Enum;
use crate::error::Result;
use crate::functions::Invocation;
use crate::path::Path;
use crate::value::Value;
use std::fmt;

/// Get/set capability for one addressed location.
pub struct Accessor<K: ContextKind> {
    path: Path,
    target: K::Path,
}

impl<K: ContextKind> Accessor<K> {
    /// Resolve a path for kind `K`; fails naming the first unresolvable segment.
    pub fn resolve(path: Path) -> Result<Self> {
        let target = K::parse_path(&path)?;
        Ok(Self { path, target })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn target(&self) -> &K::Path {
        &self.target
    }

    pub fn get(&self, ctx: &K::Context<'_>) -> Result<Value> {
        K::get(ctx, &self.target)
    }

    pub fn set(&self, ctx: &mut K::Context<'_>, value: Value) -> Result<()> {
        K::set(ctx, &self.target, value)
    }
}

impl<K: ContextKind> Clone for Accessor<K> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            target: self.target.clone(),
        }
    }
}

impl<K: ContextKind> fmt::Debug for Accessor<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("kind", &K::NAME)
            .field("path", &self.path.to_string())
            .field("target", &self.target)
            .finish()
    }
}

/// A compiled argument or operand.
pub enum Getter<K: ContextKind> {
    Literal(Value),
    Path(Accessor<K>),
    Enum(Enum),
    Converter(Invocation<K>),
    List(Vec<Getter<K>>),
}

impl<K: ContextKind> Getter<K> {
    pub fn get(&self, ctx: &mut K::Context<'_>) -> Result<Value> {
        match self {
            Getter::Literal(value) => Ok(value.clone()),
            Getter::Path(accessor) => accessor.get(ctx),
            Getter::Enum(value) => Ok(Value::Int(*value)),
            Getter::Converter(invocation) => invocation.execute(ctx),
            Getter::List(items) => items
                .iter()
                .map(|item| item.get(ctx))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
        }
    }

    /// The literal value, if this getter is a constant.
    pub fn literal(&self) -> Option<&Value> {
        match self {
            Getter::Literal(value) => Some(value),
            _ => None,
        }
    }
}

impl<K: ContextKind> fmt::Debug for Getter<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Getter::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Getter::Path(accessor) => f.debug_tuple("Path").field(accessor).finish(),
            Getter::Enum(value) => f.debug_tuple("Enum").field(value).finish(),
            Getter::Converter(invocation) => f.debug_tuple("Converter").field(invocation).finish(),
            Getter::List(items) => f.debug_tuple("List").field(items).finish(),
        }
    }
}

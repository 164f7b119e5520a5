//! Path model
//!
//! A path is the textual address of a record member, e.g. `resource.attributes["host"]`.
//! Paths only exist at compile time: each context kind resolves them once into its own
//! accessor target and the path text is kept for diagnostics.

use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;

/// One path segment: a member name and an optional map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub key: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: None,
        }
    }

    pub fn keyed(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: Some(key.into()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}[{:?}]", self.name, key),
            None => f.write_str(&self.name),
        }
    }
}

/// A non-empty sequence of fields
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    fields: SmallVec<[Field; 3]>,
}

impl Path {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Result<Self> {
        let fields: SmallVec<[Field; 3]> = fields.into_iter().collect();
        if fields.is_empty() {
            return Err(Error::ParseError("path must have at least one field".into()));
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn first(&self) -> &Field {
        &self.fields[0]
    }

    /// Error naming this path and the segment that could not be resolved.
    pub fn unresolved(&self, segment: &Field) -> Error {
        Error::invalid_path(self, segment.to_string())
    }

    /// Error for a path that ends where more segments were required.
    pub fn incomplete(&self) -> Error {
        let last = &self.fields[self.fields.len() - 1];
        Error::invalid_path(self, format!("{} (incomplete path)", last))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

/// Resolution cursor over the fields of a path.
///
/// Resolvers consume segments front to back; every helper reports failures against the
/// full path so that a nested sub-resolver still names the complete expression.
#[derive(Debug, Clone, Copy)]
pub struct Segments<'p> {
    path: &'p Path,
    offset: usize,
}

impl<'p> Segments<'p> {
    pub fn new(path: &'p Path) -> Self {
        Self { path, offset: 0 }
    }

    pub fn path(&self) -> &'p Path {
        self.path
    }

    pub fn peek(&self) -> Option<&'p Field> {
        self.path.fields.get(self.offset)
    }

    pub fn next(&mut self) -> Option<&'p Field> {
        let field = self.peek()?;
        self.offset += 1;
        Some(field)
    }

    /// Next segment, failing when the path stops early.
    pub fn expect_next(&mut self) -> Result<&'p Field> {
        self.next().ok_or_else(|| self.path.incomplete())
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.path.fields.len()
    }

    /// Fail if any segment remains.
    pub fn finish(&self) -> Result<()> {
        match self.peek() {
            Some(extra) => Err(self.path.unresolved(extra)),
            None => Ok(()),
        }
    }

    /// Fail if the field carries a key; used for members that are not maps.
    pub fn unkeyed(&self, field: &Field) -> Result<()> {
        if field.key.is_some() {
            return Err(self.path.unresolved(field));
        }
        Ok(())
    }

    /// Finish a leaf member: no key and nothing after it.
    pub fn leaf<T>(&self, field: &Field, target: T) -> Result<T> {
        self.unkeyed(field)?;
        self.finish()?;
        Ok(target)
    }

    pub fn unresolved(&self, field: &Field) -> Error {
        self.path.unresolved(field)
    }
}

//! Resource context: statements evaluated once per resource, before any of its records.

use super::common::{
    get_cache, get_resource, parse_resource_member, set_cache, set_resource, ResourcePath,
};
use super::{ContextKind, TransformContext};
use crate::enums::SymbolTable;
use crate::error::Result;
use crate::path::{Path, Segments};
use crate::value::{Map, Value};
use opentelemetry_proto::tonic::resource::v1::Resource;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKindPath {
    Cache(Option<String>),
    Resource(ResourcePath),
}

/// Evaluation state for one resource.
pub struct ResourceContext<'a> {
    resource: &'a mut Option<Resource>,
    cache: Map,
}

impl<'a> ResourceContext<'a> {
    pub fn new(resource: &'a mut Option<Resource>) -> Self {
        Self {
            resource,
            cache: Map::new(),
        }
    }
}

impl TransformContext for ResourceContext<'_> {
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

#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceKind;

impl ContextKind for ResourceKind {
    const NAME: &'static str = "resource";

    type Context<'a> = ResourceContext<'a>;
    type Path = ResourceKindPath;

    fn parse_path(path: &Path) -> Result<ResourceKindPath> {
        let mut segments = Segments::new(path);
        let field = segments.expect_next()?;
        if field.name == "cache" {
            segments.finish()?;
            return Ok(ResourceKindPath::Cache(field.key.clone()));
        }
        parse_resource_member(field, &mut segments).map(ResourceKindPath::Resource)
    }

    fn symbols() -> &'static SymbolTable {
        static SYMBOLS: OnceLock<SymbolTable> = OnceLock::new();
        SYMBOLS.get_or_init(SymbolTable::default)
    }

    fn get(ctx: &ResourceContext<'_>, path: &ResourceKindPath) -> Result<Value> {
        Ok(match path {
            ResourceKindPath::Cache(key) => get_cache(&ctx.cache, key.as_deref()),
            ResourceKindPath::Resource(path) => get_resource(ctx.resource(), path),
        })
    }

    fn set(ctx: &mut ResourceContext<'_>, path: &ResourceKindPath, value: Value) -> Result<()> {
        match path {
            ResourceKindPath::Cache(key) => set_cache(&mut ctx.cache, key.as_deref(), value),
            ResourceKindPath::Resource(_) if value.is_nil() => {}
            ResourceKindPath::Resource(path) => set_resource(ctx.resource_mut(), path, value),
        }
        Ok(())
    }
}

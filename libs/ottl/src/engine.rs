//! Statement engine
//!
//! Orchestrates the compilation pipeline: text → AST → bound statement. One engine serves
//! one context kind; compiled statements are immutable and shared across threads.

use crate::compiler::Compiler;
use crate::contexts::ContextKind;
use crate::enums::SymbolTable;
use crate::error::{Error, Result};
use crate::functions::FunctionRegistry;
use crate::parser::Parser;
use crate::statement::{Condition, ErrorMode, Statement, StatementSequence};
use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

const STATEMENT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(capacity) => capacity,
    None => panic!("statement cache capacity must be non-zero"),
};

/// Compiles statements for context kind `K`
pub struct Engine<K: ContextKind> {
    functions: Arc<FunctionRegistry<K>>,
    symbols: Arc<SymbolTable>,
    cache: Arc<Mutex<LruCache<String, Arc<Statement<K>>>>>,
}

impl<K: ContextKind> Engine<K> {
    /// Create an engine with the given functions and the kind's default symbols.
    pub fn new(functions: FunctionRegistry<K>) -> Self {
        Self::with_symbols(functions, K::symbols().clone())
    }

    /// Create an engine with a host-supplied symbol table.
    pub fn with_symbols(functions: FunctionRegistry<K>, symbols: SymbolTable) -> Self {
        Self {
            functions: Arc::new(functions),
            symbols: Arc::new(symbols),
            cache: Arc::new(Mutex::new(LruCache::new(STATEMENT_CACHE_CAPACITY))),
        }
    }

    pub fn functions(&self) -> &FunctionRegistry<K> {
        &self.functions
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    fn compiler(&self) -> Compiler<'_, K> {
        Compiler::new(&self.functions, &self.symbols)
    }

    // ============================================================================
    // Compilation
    // ============================================================================

    /// Compile one statement. Identical text returns the same compiled statement.
    pub fn parse_statement(&self, text: &str) -> Result<Arc<Statement<K>>> {
        {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(statement) = cache.get(text) {
                return Ok(statement.clone());
            }
        }

        let ast = Parser::new(text).parse_statement()?;
        let statement = Arc::new(self.compiler().compile_statement(text, ast)?);
        tracing::debug!(context = K::NAME, statement = text, "compiled statement");

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.put(text.to_string(), statement.clone());
        Ok(statement)
    }

    /// Compile a list of statements, reporting every failure at once.
    pub fn parse_statements<I, S>(&self, texts: I) -> Result<Vec<Arc<Statement<K>>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        collect_all(texts, |text| self.parse_statement(text))
    }

    /// Compile a standalone condition.
    pub fn parse_condition(&self, text: &str) -> Result<Condition<K>> {
        let ast = Parser::new(text).parse_condition()?;
        self.compiler().compile_condition(ast)
    }

    pub fn parse_conditions<I, S>(&self, texts: I) -> Result<Vec<Condition<K>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        collect_all(texts, |text| self.parse_condition(text))
    }

    /// Compile statements into a sequence run under `error_mode`.
    pub fn sequence<I, S>(&self, texts: I, error_mode: ErrorMode) -> Result<StatementSequence<K>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let statements = self.parse_statements(texts)?;
        Ok(StatementSequence::new(statements, error_mode))
    }

    /// Number of statements currently cached.
    pub fn cached_statements(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Run `compile` over every text, aggregating failures into one `Error::Compile`.
fn collect_all<T, I, S>(texts: I, compile: impl Fn(&str) -> Result<T>) -> Result<Vec<T>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut compiled = Vec::new();
    let mut errors = Vec::new();
    for (index, text) in texts.into_iter().enumerate() {
        let text = text.as_ref();
        match compile(text) {
            Ok(item) => compiled.push(item),
            Err(source) => errors.push(Error::Statement {
                index,
                statement: text.to_string(),
                source: Box::new(source),
            }),
        }
    }

    if errors.is_empty() {
        Ok(compiled)
    } else {
        Err(Error::Compile(errors))
    }
}

impl<K: ContextKind> Default for Engine<K> {
    fn default() -> Self {
        Self::new(K::default_functions())
    }
}

impl<K: ContextKind> Clone for Engine<K> {
    fn clone(&self) -> Self {
        Self {
            functions: self.functions.clone(),
            symbols: self.symbols.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<K: ContextKind> fmt::Debug for Engine<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("kind", &K::NAME)
            .field("functions", &self.functions.len())
            .field("symbols", &self.symbols.len())
            .finish()
    }
}

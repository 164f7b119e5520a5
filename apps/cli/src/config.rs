//! Transform configuration
//!
//! A JSON document naming an error mode and, per signal, ordered groups of statements that
//! each run in one context.

use anyhow::Context as _;
use lumen_ottl::ErrorMode;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Statement groups for every signal
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformConfig {
    #[serde(default)]
    pub error_mode: ErrorMode,
    #[serde(default)]
    pub metric_statements: Vec<ContextStatements>,
    #[serde(default)]
    pub log_statements: Vec<ContextStatements>,
    #[serde(default)]
    pub trace_statements: Vec<ContextStatements>,
}

/// One group of statements sharing a context
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextStatements {
    pub context: ContextName,
    /// Sequence gate: the statements run for a record when any condition holds.
    #[serde(default)]
    pub conditions: Vec<String>,
    pub statements: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextName {
    Resource,
    Metric,
    #[serde(alias = "data_point")]
    Datapoint,
    Log,
    Span,
}

impl fmt::Display for ContextName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextName::Resource => "resource",
            ContextName::Metric => "metric",
            ContextName::Datapoint => "datapoint",
            ContextName::Log => "log",
            ContextName::Span => "span",
        };
        f.write_str(name)
    }
}

/// Telemetry signal a statement group applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Signal {
    Metrics,
    Logs,
    Traces,
}

impl Signal {
    /// Configuration key holding this signal's statement groups.
    pub fn config_key(self) -> &'static str {
        match self {
            Signal::Metrics => "metric_statements",
            Signal::Logs => "log_statements",
            Signal::Traces => "trace_statements",
        }
    }

    pub fn allows(self, context: ContextName) -> bool {
        matches!(
            (self, context),
            (_, ContextName::Resource)
                | (Signal::Metrics, ContextName::Metric | ContextName::Datapoint)
                | (Signal::Logs, ContextName::Log)
                | (Signal::Traces, ContextName::Span)
        )
    }
}

impl TransformConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Failed to parse configuration {}", path.display()))
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn groups(&self, signal: Signal) -> &[ContextStatements] {
        match signal {
            Signal::Metrics => &self.metric_statements,
            Signal::Logs => &self.log_statements,
            Signal::Traces => &self.trace_statements,
        }
    }

    /// Check context/signal combinations and reject empty groups.
    pub fn validate(&self) -> Result<(), String> {
        let mut problems = Vec::new();
        for signal in [Signal::Metrics, Signal::Logs, Signal::Traces] {
            for (index, group) in self.groups(signal).iter().enumerate() {
                let location = format!("{}[{}]", signal.config_key(), index);
                if !signal.allows(group.context) {
                    problems.push(format!(
                        "{}: context '{}' is not valid for {}",
                        location,
                        group.context,
                        signal.config_key()
                    ));
                }
                if group.statements.is_empty() {
                    problems.push(format!("{}: no statements", location));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.metric_statements.is_empty()
            && self.log_statements.is_empty()
            && self.trace_statements.is_empty()
    }
}

//! `lumen` - check transform configurations and apply them to OTLP export requests
//!
//! Requests are read and written as binary protobuf (`ExportLogsServiceRequest`,
//! `ExportMetricsServiceRequest`, `ExportTraceServiceRequest`). `-` means stdin or stdout.

mod config;
mod logging;
mod processor;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{Signal, TransformConfig};
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use processor::{Processor, TransformStats};
use prost::Message;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lumen", version, about = "Telemetry transformation for OTLP data")]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile every statement in a configuration and report all errors
    Check {
        #[arg(long)]
        config: PathBuf,
    },
    /// Transform one OTLP export request
    Apply {
        #[arg(long)]
        config: PathBuf,
        #[arg(long, value_enum)]
        signal: Signal,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_logging(&cli.log_level, cli.json_logs)
        .context("Failed to initialize logging")?;

    match cli.command {
        Command::Check { config } => check(&config),
        Command::Apply {
            config,
            signal,
            input,
            output,
        } => apply(&config, signal, &input, &output),
    }
}

fn load(path: &Path) -> anyhow::Result<Processor> {
    let config = TransformConfig::load(path)?;
    if config.is_empty() {
        tracing::warn!(config = %path.display(), "Configuration has no statement groups");
    }
    let processor = Processor::new(&config)?;
    tracing::info!(
        config = %path.display(),
        error_mode = %processor.error_mode(),
        metric_stages = processor.stages(Signal::Metrics),
        log_stages = processor.stages(Signal::Logs),
        trace_stages = processor.stages(Signal::Traces),
        "Configuration compiled"
    );
    Ok(processor)
}

fn check(path: &Path) -> anyhow::Result<()> {
    load(path)?;
    println!("{}: ok", path.display());
    Ok(())
}

fn apply(config: &Path, signal: Signal, input: &Path, output: &Path) -> anyhow::Result<()> {
    let processor = load(config)?;
    let bytes = read_input(input)?;

    let (stats, encoded) = match signal {
        Signal::Metrics => {
            let mut request = ExportMetricsServiceRequest::decode(bytes.as_slice())
                .context("Failed to decode metrics request")?;
            let stats = processor.process_metrics(&mut request)?;
            (stats, request.encode_to_vec())
        }
        Signal::Logs => {
            let mut request = ExportLogsServiceRequest::decode(bytes.as_slice())
                .context("Failed to decode logs request")?;
            let stats = processor.process_logs(&mut request)?;
            (stats, request.encode_to_vec())
        }
        Signal::Traces => {
            let mut request = ExportTraceServiceRequest::decode(bytes.as_slice())
                .context("Failed to decode traces request")?;
            let stats = processor.process_traces(&mut request)?;
            (stats, request.encode_to_vec())
        }
    };

    write_output(output, &encoded)?;
    report(signal, &stats);
    Ok(())
}

fn report(signal: Signal, stats: &TransformStats) {
    tracing::info!(
        signal = signal.config_key(),
        contexts = stats.contexts,
        executed = stats.executed,
        skipped = stats.skipped,
        errors = stats.errors,
        "Request transformed"
    );
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("Failed to read stdin")?;
        return Ok(bytes);
    }
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if path == Path::new("-") {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(bytes).context("Failed to write stdout")?;
        return stdout.flush().context("Failed to flush stdout");
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

//! Logging and OpenTelemetry initialization for the quarry binaries.
//!
//! Console output is JSON or human-readable, optionally mirrored to a rotating
//! file, and optionally exported to an OTLP collector as spans.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{Sampler, TracerProvider},
    Resource,
};
use std::fs;
use std::time::Duration;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogRotation, LoggingConfig};

const TRACER_NAME: &str = "quarry-server";

/// Keeps the file writer flushing and shuts OpenTelemetry down on drop.
/// Hold it for the lifetime of the process.
pub struct TelemetryGuard {
    _file_guard: Option<WorkerGuard>,
    otel_enabled: bool,
}

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` overrides the configured level. An OTLP exporter that cannot be
/// built is reported and skipped; the process keeps logging locally.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<TelemetryGuard> {
    let (tracer_provider, otel_error) = if config.opentelemetry_enabled {
        match init_tracer_provider(config) {
            Ok(provider) => (Some(provider), None),
            Err(e) => (None, Some(e.to_string())),
        }
    } else {
        (None, None)
    };

    let otel_layer = tracer_provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer()
            .with_tracer(provider.tracer(TRACER_NAME))
            .with_tracked_inactivity(true)
    });

    let (file_writer, file_guard) = if config.file_enabled {
        let (writer, guard) = create_file_appender(config)?;
        (Some(writer), Some(guard))
    } else {
        (None, None)
    };

    let json_console = config.json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stdout)
    });
    let human_console = (!config.json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(std::io::stdout)
    });
    let json_file = file_writer
        .clone()
        .filter(|_| config.json)
        .map(|writer| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(writer)
        });
    let human_file = file_writer.filter(|_| !config.json).map(|writer| {
        fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
    });

    tracing_subscriber::registry()
        .with(build_env_filter(config))
        .with(otel_layer)
        .with(json_console)
        .with(human_console)
        .with(json_file)
        .with(human_file)
        .try_init()?;

    let otel_enabled = tracer_provider.is_some();
    if let Some(provider) = tracer_provider {
        global::set_tracer_provider(provider);
    }

    if let Some(err) = otel_error {
        tracing::warn!(
            error = %err,
            "Failed to initialize OpenTelemetry tracer provider, continuing without OpenTelemetry"
        );
    }

    tracing::info!(
        otel_enabled,
        service_name = %config.service_name,
        environment = %config.deployment_environment,
        "Logging initialized"
    );

    Ok(TelemetryGuard {
        _file_guard: file_guard,
        otel_enabled,
    })
}

fn build_resource(config: &LoggingConfig) -> Resource {
    let service_version = config
        .service_version
        .clone()
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", service_version),
        KeyValue::new(
            "deployment.environment",
            config.deployment_environment.clone(),
        ),
        KeyValue::new("telemetry.sdk.name", "opentelemetry"),
        KeyValue::new("telemetry.sdk.language", "rust"),
    ])
}

fn init_tracer_provider(config: &LoggingConfig) -> anyhow::Result<TracerProvider> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(&config.otlp_endpoint)
        .with_timeout(Duration::from_secs(config.otlp_timeout_seconds))
        .build_span_exporter()
        .map_err(|e| anyhow::anyhow!("Failed to create OTLP exporter: {}", e))?;

    let trace_config = opentelemetry_sdk::trace::Config::default()
        .with_sampler(sampler_for_ratio(config.trace_sample_ratio))
        .with_resource(build_resource(config));

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_config(trace_config)
        .build())
}

/// Parent-based ratio sampling, collapsing the edges to always on/off.
fn sampler_for_ratio(ratio: f64) -> Sampler {
    if ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(ratio)))
    }
}

fn default_directives(level: &str) -> String {
    format!(
        "quarry_server={level},quarry_cli={level},quarry_template={level},slow_query=warn,tower_http=debug,reqwest=warn,hyper=warn"
    )
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)))
}

fn create_file_appender(config: &LoggingConfig) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.file_directory)?;

    let directory = &config.file_directory;
    let prefix = &config.file_prefix;
    let appender = match config.file_rotation {
        LogRotation::Daily => tracing_appender::rolling::daily(directory, prefix),
        LogRotation::Hourly => tracing_appender::rolling::hourly(directory, prefix),
        LogRotation::Minutely => tracing_appender::rolling::minutely(directory, prefix),
        LogRotation::Never => tracing_appender::rolling::never(directory, format!("{prefix}.log")),
    };

    Ok(tracing_appender::non_blocking(appender))
}

/// Flush and uninstall the global tracer provider.
pub fn shutdown_telemetry() {
    tracing::info!("Shutting down OpenTelemetry...");
    global::shutdown_tracer_provider();
}

/// Environment-only logging for tools that carry no configuration file.
/// Writes to stderr so command output on stdout stays clean.
pub fn init_simple_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directives("warn"))),
        )
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.otel_enabled {
            shutdown_telemetry();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_collapses_edges() {
        assert!(matches!(sampler_for_ratio(1.0), Sampler::AlwaysOn));
        assert!(matches!(sampler_for_ratio(2.5), Sampler::AlwaysOn));
        assert!(matches!(sampler_for_ratio(0.0), Sampler::AlwaysOff));
        assert!(matches!(sampler_for_ratio(0.25), Sampler::ParentBased(_)));
    }

    #[test]
    fn default_directives_cover_workspace_crates() {
        let directives = default_directives("debug");
        assert!(directives.contains("quarry_server=debug"));
        assert!(directives.contains("quarry_template=debug"));
        assert!(directives.contains("slow_query=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}

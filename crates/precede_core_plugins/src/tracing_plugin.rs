//! Tracing and observability plugin.
//!
//! Provides [`TracingPlugin`], which installs a `tracing` subscriber and logs
//! every [`ChainEvent`] of the runs it observes.
//!
//! # Lifecycle
//!
//! [`Plugin::build`] registers one observer per run schedule and, unless
//! disabled with [`TracingPlugin::with_subscriber`], installs the global
//! subscriber. Installation is skipped silently when a subscriber is
//! already set, so adding the plugin to several registries is harmless.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use precede_core_plugins::{TracingFormat, TracingPlugin};
//! use precede_graph::ChainExecutor;
//! use precede_graph::hooks::HooksAPI;
//! use tracing::Level;
//!
//! let hooks = HooksAPI::new();
//! hooks.add_plugin(
//!     TracingPlugin::default()
//!         .with_level(Level::DEBUG)
//!         .with_format(TracingFormat::Compact),
//! )?;
//!
//! let executor = ChainExecutor::new().with_hooks(Arc::new(hooks));
//! # let _ = executor;
//! # Ok::<(), precede_graph::hooks::HookRegistrationError>(())
//! ```

use precede_graph::hooks::events::ChainEvent;
use precede_graph::hooks::schedule::{
    OnEntriesAbandoned, OnEntryComplete, OnEntryFailed, OnEntrySkipped, OnEntryStart,
    OnGroupDispatch, OnRunComplete, OnRunStart,
};
use precede_graph::hooks::{HookRegistrationError, HooksAPI, Plugin};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Hook name used on every schedule.
pub const TRACING_HOOK: &str = "precede::tracing";

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// The configuration a [`TracingPlugin`] was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// The configured log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing and logging plugin.
///
/// # Event Levels
///
/// | Event | Level |
/// |-------|-------|
/// | `RunStart`, `RunComplete` | `INFO` |
/// | `GroupDispatch` | `DEBUG` |
/// | `EntryStart`, `EntryComplete`, `EntrySkipped` | `TRACE` |
/// | `EntryFailed`, `EntriesAbandoned` | `WARN` |
///
/// # Configuration Options
///
/// ```
/// use precede_core_plugins::{TracingPlugin, TracingFormat};
/// use tracing::Level;
///
/// // Development: pretty output with debug level and span events
/// let dev_plugin = TracingPlugin::default()
///     .with_level(Level::DEBUG)
///     .with_format(TracingFormat::Pretty)
///     .with_span_events(true);
///
/// // Production: JSON output for log aggregation
/// let prod_plugin = TracingPlugin::default()
///     .with_level(Level::INFO)
///     .with_format(TracingFormat::Json)
///     .with_env_filter("precede_graph=info,my_app=debug");
/// ```
#[derive(Debug, Clone)]
pub struct TracingPlugin {
    /// Maximum log level.
    level: Level,
    /// Output format.
    format: TracingFormat,
    /// Environment filter (e.g., "precede_graph=debug").
    env_filter: Option<String>,
    /// Whether to include span enter/exit events.
    span_events: bool,
    /// Whether `build` installs the global subscriber.
    install_subscriber: bool,
}

impl Default for TracingPlugin {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
            install_subscriber: true,
        }
    }
}

impl TracingPlugin {
    /// Creates a new `TracingPlugin` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom environment filter string.
    ///
    /// Format: `target=level,target=level,...`. An unparsable filter falls
    /// back to the configured level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Controls whether building the plugin installs the global subscriber.
    ///
    /// Disable it when the application configures `tracing` itself and only
    /// wants the event logging.
    #[must_use]
    pub fn with_subscriber(mut self, install: bool) -> Self {
        self.install_subscriber = install;
        self
    }

    /// Returns the level and format this plugin was configured with.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::new(self.level.as_str()),
        }
    }

    /// Installs the global subscriber. Does nothing if one is already set.
    pub fn install(&self) {
        let env_filter = self.env_filter();
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        // try_init().ok() ignores the error if already initialized
        match self.format {
            TracingFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
            TracingFormat::Compact => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
            TracingFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
        }

        tracing::info!(
            level = %self.level,
            format = ?self.format,
            "TracingPlugin initialized"
        );
    }
}

/// Logs one event at the level of its kind.
fn log_event(event: &ChainEvent) {
    match event {
        ChainEvent::RunStart {
            run_id,
            groups,
            entries,
        } => tracing::info!(%run_id, groups, entries, "run started"),
        ChainEvent::RunComplete { report } => tracing::info!(
            run_id = %report.run_id,
            invoked = report.invoked,
            skipped = report.skipped,
            failed = report.failed,
            abandoned = report.abandoned,
            cancelled = report.cancelled,
            duration = ?report.duration,
            "run complete"
        ),
        ChainEvent::GroupDispatch {
            run_id,
            group,
            position,
            entries,
        } => tracing::debug!(%run_id, %group, position, entries, "group dispatched"),
        ChainEvent::EntriesAbandoned {
            run_id,
            group,
            count,
        } => tracing::warn!(%run_id, %group, count, "entries abandoned"),
        ChainEvent::EntryStart {
            run_id,
            entry,
            name,
        } => tracing::trace!(%run_id, %entry, name, "entry started"),
        ChainEvent::EntryComplete {
            run_id,
            entry,
            name,
            duration,
        } => tracing::trace!(%run_id, %entry, name, ?duration, "entry complete"),
        ChainEvent::EntryFailed {
            run_id,
            entry,
            name,
            error,
        } => tracing::warn!(%run_id, %entry, name, %error, "entry failed"),
        ChainEvent::EntrySkipped {
            run_id,
            entry,
            name,
        } => tracing::trace!(%run_id, %entry, name, "entry skipped"),
    }
}

impl Plugin for TracingPlugin {
    fn build(&self, hooks: &HooksAPI) -> Result<(), HookRegistrationError> {
        hooks.register_observer::<(
            OnRunStart,
            OnRunComplete,
            OnGroupDispatch,
            OnEntriesAbandoned,
            OnEntryStart,
            OnEntryComplete,
            OnEntryFailed,
            OnEntrySkipped,
        ), _>(TRACING_HOOK, log_event)?;

        if self.install_subscriber {
            self.install();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "precede::tracing"
    }
}

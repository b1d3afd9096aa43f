use std::cell::Cell;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub const TRACE_ENV: &str = "POLYDISPATCH_TRACE";

thread_local! {
    static TRACE_OVERRIDE: Cell<Option<TraceConfig>> = const { Cell::new(None) };
    static ACTIVE_TRACE: Cell<Option<TraceConfig>> = const { Cell::new(None) };
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub typed_fn: TypedFnConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TraceConfig {
    #[serde(default)]
    pub unify: bool,
    #[serde(default)]
    pub calls: bool,
    #[serde(default)]
    pub dispatch: bool,
    #[serde(default)]
    pub registry: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TypedFnConfig {
    /// Consult the registry for `(C a) =>` constraints before invoking.
    #[serde(default = "default_true")]
    pub check_constraints: bool,
    /// Unify the callable's actual result with the declared return type.
    #[serde(default = "default_true")]
    pub check_result: bool,
}

impl Default for TypedFnConfig {
    fn default() -> Self {
        Self {
            check_constraints: true,
            check_result: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceConcern {
    Unify,
    Calls,
    Dispatch,
    Registry,
}

impl TraceConfig {
    pub fn all() -> Self {
        Self {
            unify: true,
            calls: true,
            dispatch: true,
            registry: true,
        }
    }

    fn covers(&self, concern: TraceConcern) -> bool {
        match concern {
            TraceConcern::Unify => self.unify,
            TraceConcern::Calls => self.calls,
            TraceConcern::Dispatch => self.dispatch,
            TraceConcern::Registry => self.registry,
        }
    }
}

impl EngineConfig {
    /// Defaults, with every trace concern switched on when `POLYDISPATCH_TRACE=1`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if env_trace_enabled() {
            config.trace = TraceConfig::all();
        }
        config
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        parse_config(text, Path::new("<string>"))
    }
}

pub fn read_engine_toml(path: &Path) -> Result<EngineConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text, path)
}

fn parse_config(text: &str, path: &Path) -> Result<EngineConfig, ConfigError> {
    toml::from_str(text).map_err(|err| ConfigError::Parse {
        path: PathBuf::from(path),
        message: err.to_string(),
    })
}

fn env_trace_enabled() -> bool {
    std::env::var(TRACE_ENV).is_ok_and(|v| v == "1")
}

/// Forces the trace switches on this thread, ahead of any engine's own configuration.
pub fn install_trace(trace: TraceConfig) {
    TRACE_OVERRIDE.with(|cell| cell.set(Some(trace)));
}

/// Drops a forced trace setting installed with [`install_trace`].
pub fn clear_trace_override() {
    TRACE_OVERRIDE.with(|cell| cell.set(None));
}

/// The trace switches of the engine currently running on this thread.
/// Restores the enclosing engine's switches when dropped.
pub(crate) struct TraceScope {
    previous: Option<TraceConfig>,
}

pub(crate) fn enter_trace(trace: TraceConfig) -> TraceScope {
    let previous = ACTIVE_TRACE.with(|cell| cell.replace(Some(trace)));
    TraceScope { previous }
}

impl Drop for TraceScope {
    fn drop(&mut self) {
        ACTIVE_TRACE.with(|cell| cell.set(self.previous));
    }
}

pub(crate) fn trace_enabled(concern: TraceConcern) -> bool {
    let forced = TRACE_OVERRIDE.with(Cell::get);
    match forced.or_else(|| ACTIVE_TRACE.with(Cell::get)) {
        Some(trace) => trace.covers(concern),
        None => env_trace_enabled(),
    }
}

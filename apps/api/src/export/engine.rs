//! Template engine acquisition.
//!
//! The engine is built lazily, at most once per process. Concurrent exports
//! that arrive while it is being built wait on the same initialization
//! instead of starting their own; a failed build leaves the handle empty so
//! the next export retries.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use handlebars::{handlebars_helper, Handlebars, RenderError, TemplateError};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::models::dates::{format_month_year, parse_iso_date, INVALID_DATE};
use crate::tenant::resolver::{resolve_skill_groups, resolve_work_history};
use crate::tenant::TenantBundle;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to read partials from {path}: {source}")]
    Partials {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid partial '{name}': {source}")]
    Partial {
        name: String,
        #[source]
        source: TemplateError,
    },

    #[error("Template engine unavailable: {0}")]
    Unavailable(String),
}

/// Builds a ready-to-use engine. Called at most once per successful
/// [`EngineHandle`] lifetime.
#[async_trait]
pub trait EngineProvider: Send + Sync {
    async fn load(&self) -> Result<Handlebars<'static>, EngineError>;
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// `{{formatDate d}}`: "" for empty input, "Mon YYYY" for a date, and
/// "Invalid Date" for anything unparseable.
fn format_date_value(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::String(s) if s.trim().is_empty() => String::new(),
        Value::String(s) => parse_iso_date(s.trim())
            .map(format_month_year)
            .unwrap_or_else(|| INVALID_DATE.to_string()),
        // Epoch milliseconds
        Value::Number(n) => n
            .as_i64()
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|dt| format_month_year(dt.date_naive()))
            .unwrap_or_else(|| INVALID_DATE.to_string()),
        _ => INVALID_DATE.to_string(),
    }
}

handlebars_helper!(format_date: |value: Json| format_date_value(value));
handlebars_helper!(json_eq: |a: Json, b: Json| a == b);

pub fn register_helpers(hb: &mut Handlebars<'static>) {
    hb.register_helper("formatDate", Box::new(format_date));
    hb.register_helper("eq", Box::new(json_eq));
}

// ── Builtin provider ────────────────────────────────────────────────────────

const PARTIAL_EXTENSIONS: &[&str] = &["hbs", "handlebars", "html"];

/// Handlebars with the resume helpers, plus every partial found in
/// `partials_dir` (registered under its file stem).
#[derive(Debug, Clone, Default)]
pub struct BuiltinEngineProvider {
    pub partials_dir: Option<PathBuf>,
}

impl BuiltinEngineProvider {
    pub fn new(partials_dir: Option<PathBuf>) -> Self {
        Self { partials_dir }
    }
}

#[async_trait]
impl EngineProvider for BuiltinEngineProvider {
    async fn load(&self) -> Result<Handlebars<'static>, EngineError> {
        let mut hb = Handlebars::new();
        register_helpers(&mut hb);

        let Some(dir) = &self.partials_dir else {
            return Ok(hb);
        };

        let io_err = |source: std::io::Error| EngineError::Partials {
            path: dir.display().to_string(),
            source,
        };
        let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            let is_partial = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| PARTIAL_EXTENSIONS.contains(&e));
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_partial {
                continue;
            }
            let source = tokio::fs::read_to_string(&path).await.map_err(io_err)?;
            hb.register_partial(name, source)
                .map_err(|source| EngineError::Partial {
                    name: name.to_string(),
                    source,
                })?;
            debug!("Registered partial '{name}'");
        }
        Ok(hb)
    }
}

// ── Handle ──────────────────────────────────────────────────────────────────

/// Shared, lazily-initialized engine. Cloning shares the same cell.
#[derive(Clone)]
pub struct EngineHandle {
    cell: Arc<OnceCell<Arc<Handlebars<'static>>>>,
    provider: Arc<dyn EngineProvider>,
}

impl EngineHandle {
    pub fn new(provider: Arc<dyn EngineProvider>) -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
            provider,
        }
    }

    /// Returns the cached engine, building it first if nobody has yet.
    pub async fn acquire(&self) -> Result<Arc<Handlebars<'static>>, EngineError> {
        let engine = self
            .cell
            .get_or_try_init(|| async {
                info!("Initializing template engine");
                self.provider.load().await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(engine))
    }

    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }
}

// ── Rendering ───────────────────────────────────────────────────────────────

/// Everything a resume template can reference: the stored collections under
/// their stored names, plus the pre-joined `workHistory` and `skillGroups`.
pub fn template_context(bundle: &TenantBundle) -> Result<Value, serde_json::Error> {
    let mut context = match serde_json::to_value(bundle.dataset())? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    context.insert(
        "workHistory".to_string(),
        serde_json::to_value(resolve_work_history(bundle))?,
    );
    context.insert(
        "skillGroups".to_string(),
        serde_json::to_value(resolve_skill_groups(bundle))?,
    );
    Ok(Value::Object(context))
}

/// Compiles and renders `template` in one step. CPU-bound; callers run it on
/// the blocking pool.
pub fn render_document(
    engine: &Handlebars<'static>,
    template: &str,
    context: &Value,
) -> Result<String, RenderError> {
    engine.render_template(template, context)
}

//! Resume export state machine.
//!
//! ```text
//! Idle → TemplateLoading → Rendering → Rasterizing → Done ─┐
//!              └──────────────┴────────────┴──→ Failed ─────┴→ Idle
//! ```
//!
//! One attempt per session at a time: a trigger that arrives while the
//! session's pipeline is busy is ignored, so it can never open a second
//! surface. The rendering surface is torn down on every exit path, and the
//! attempt guard returns the pipeline to `Idle` even if the attempt future is
//! dropped halfway.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::export::engine::{render_document, template_context, EngineError, EngineHandle};
use crate::export::isolate::isolate_document;
use crate::export::page::PageConfig;
use crate::export::rasterizer::{RasterJob, RasterizeError, Rasterizer};
use crate::export::surface::{Dimensions, RenderSurface, SurfaceError, SurfaceFactory};
use crate::tenant::TenantBundle;

/// The only failure text a visitor ever sees, apart from a missing template.
pub const FAILURE_MESSAGE: &str = "Failed to generate PDF. Please try again.";

pub const MISSING_TEMPLATE_MESSAGE: &str = "Resume template not found";

const FALLBACK_FILENAME: &str = "Resume.pdf";

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ExportState {
    #[default]
    Idle,
    TemplateLoading,
    Rendering,
    Rasterizing,
    Done,
    Failed,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Resume template not found")]
    MissingTemplate,

    #[error(transparent)]
    EngineUnavailable(#[from] EngineError),

    #[error("Template rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("Layout did not settle after {waited_ms} ms ({pending} loads pending)")]
    SettleTimeout { pending: usize, waited_ms: u64 },

    #[error(transparent)]
    Rasterize(#[from] RasterizeError),

    #[error("Rasterizer output is not a PDF document ({len} bytes)")]
    InvalidDocument { len: usize },
}

impl ExportError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ExportError::MissingTemplate => MISSING_TEMPLATE_MESSAGE,
            _ => FAILURE_MESSAGE,
        }
    }
}

/// How long to wait for the surface's layout before measuring it.
///
/// Surfaces without a layout engine cannot be observed; for them the whole
/// budget ([`SettlePolicy::budget`]) is handed to the rasterizer instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Poll `pending_loads` until it reaches zero; fail once `timeout` passes.
    Poll { interval: Duration, timeout: Duration },
    /// Sleep a fixed amount and assume layout has settled.
    FixedDelay(Duration),
}

impl SettlePolicy {
    /// Longest time the policy lets layout run.
    pub fn budget(&self) -> Duration {
        match *self {
            SettlePolicy::Poll { timeout, .. } => timeout,
            SettlePolicy::FixedDelay(delay) => delay,
        }
    }
}

/// Result of the settle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// The surface reported (or was given time for) a settled layout.
    InPlace,
    /// The surface cannot observe loads; the rasterizer must wait this long.
    Deferred(Duration),
}

impl Default for SettlePolicy {
    fn default() -> Self {
        SettlePolicy::Poll {
            interval: Duration::from_millis(50),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Collaborators shared by every export attempt.
#[derive(Clone)]
pub struct ExportDeps {
    pub engine: EngineHandle,
    pub surfaces: Arc<dyn SurfaceFactory>,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub page: PageConfig,
    pub settle: SettlePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedPdf {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Ready(ExportedPdf),
    /// Another attempt was already in flight for this session.
    Ignored,
}

/// `"Ada  Lovelace"` → `Ada_Lovelace_Resume.pdf`; blank or absent → `Resume.pdf`.
pub fn export_filename(name: Option<&str>) -> String {
    let stem = name
        .map(|n| n.split_whitespace().collect::<Vec<_>>().join("_"))
        .filter(|s| !s.is_empty());
    match stem {
        Some(stem) => format!("{stem}_Resume.pdf"),
        None => FALLBACK_FILENAME.to_string(),
    }
}

// ── Pipeline ────────────────────────────────────────────────────────────────

/// One session's export state.
#[derive(Debug, Default)]
pub struct ExportPipeline {
    state: Mutex<ExportState>,
}

impl ExportPipeline {
    pub fn state(&self) -> ExportState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: ExportState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
    }

    /// Moves Idle → TemplateLoading atomically. `None` when busy.
    fn claim(&self) -> Option<AttemptGuard<'_>> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != ExportState::Idle {
            return None;
        }
        *state = ExportState::TemplateLoading;
        Some(AttemptGuard {
            pipeline: self,
            id: Uuid::new_v4(),
        })
    }

    /// Runs one export attempt for `bundle`.
    pub async fn export(
        &self,
        deps: &ExportDeps,
        bundle: &TenantBundle,
    ) -> Result<ExportOutcome, ExportError> {
        let Some(template) = bundle.template() else {
            warn!("Export requested for '{}' without a template", bundle.key());
            return Err(ExportError::MissingTemplate);
        };

        let Some(attempt) = self.claim() else {
            info!(
                "Export for '{}' ignored: attempt already in flight",
                bundle.key()
            );
            return Ok(ExportOutcome::Ignored);
        };
        info!("Export {} started for '{}'", attempt.id, bundle.key());

        match run_attempt(&attempt, deps, bundle, template).await {
            Ok(bytes) => {
                attempt.advance(ExportState::Done);
                let filename = export_filename(bundle.profile().map(|p| p.name.as_str()));
                info!(
                    "Export {} finished: {filename} ({} bytes)",
                    attempt.id,
                    bytes.len()
                );
                Ok(ExportOutcome::Ready(ExportedPdf { filename, bytes }))
            }
            Err(e) => {
                attempt.advance(ExportState::Failed);
                error!("Export {} failed: {e}", attempt.id);
                Err(e)
            }
        }
    }
}

/// Holds the pipeline out of `Idle` for exactly one attempt.
struct AttemptGuard<'a> {
    pipeline: &'a ExportPipeline,
    id: Uuid,
}

impl AttemptGuard<'_> {
    fn advance(&self, next: ExportState) {
        debug!("Export {}: {next:?}", self.id);
        self.pipeline.set_state(next);
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        self.pipeline.set_state(ExportState::Idle);
    }
}

async fn run_attempt(
    attempt: &AttemptGuard<'_>,
    deps: &ExportDeps,
    bundle: &TenantBundle,
    template: &str,
) -> Result<Vec<u8>, ExportError> {
    if !deps.engine.is_ready() {
        debug!("Export {}: template engine not loaded yet", attempt.id);
    }
    let engine = deps.engine.acquire().await?;

    attempt.advance(ExportState::Rendering);
    let context = template_context(bundle).map_err(|e| ExportError::Render(e.to_string()))?;
    let template = template.to_string();
    let html = tokio::task::spawn_blocking(move || render_document(&engine, &template, &context))
        .await
        .map_err(|e| ExportError::Render(format!("render task failed: {e}")))?
        .map_err(|e| ExportError::Render(e.to_string()))?;

    attempt.advance(ExportState::Rasterizing);
    let document = isolate_document(&html, &deps.page);
    let mut surface = deps.surfaces.create(deps.page.viewport).await?;
    debug!("Export {} using surface {}", attempt.id, surface.id());

    let result = rasterize_on(surface.as_mut(), deps, &document).await;

    let surface_id = surface.id().to_string();
    if let Err(e) = surface.teardown() {
        warn!("Surface {surface_id} teardown failed: {e}");
    }
    result
}

async fn rasterize_on(
    surface: &mut dyn RenderSurface,
    deps: &ExportDeps,
    document: &str,
) -> Result<Vec<u8>, ExportError> {
    surface.write_document(document).await?;
    let settle_delay = match wait_for_settle(surface, deps.settle).await? {
        Settled::InPlace => Duration::ZERO,
        Settled::Deferred(delay) => delay,
    };
    let dimensions = match surface.measure().await {
        Some(measured) => measured,
        None => Dimensions::from(surface.viewport()),
    };
    debug!(
        "Surface {} laid out at {}x{}",
        surface.id(),
        dimensions.width_px,
        dimensions.height_px
    );

    let job = RasterJob {
        page: &deps.page,
        dimensions,
        settle_delay,
    };
    let bytes = deps.rasterizer.rasterize(surface, job).await?;
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ExportError::InvalidDocument { len: bytes.len() });
    }
    Ok(bytes)
}

pub async fn wait_for_settle(
    surface: &dyn RenderSurface,
    policy: SettlePolicy,
) -> Result<Settled, ExportError> {
    if surface.pending_loads().is_none() {
        debug!(
            "Surface {} cannot report loads; rasterizer waits {:?}",
            surface.id(),
            policy.budget()
        );
        return Ok(Settled::Deferred(policy.budget()));
    }

    match policy {
        SettlePolicy::FixedDelay(delay) => {
            tokio::time::sleep(delay).await;
            Ok(Settled::InPlace)
        }
        SettlePolicy::Poll { interval, timeout } => {
            let started = tokio::time::Instant::now();
            loop {
                let pending = surface.pending_loads().unwrap_or(0);
                if pending == 0 {
                    return Ok(Settled::InPlace);
                }
                let waited = started.elapsed();
                if waited >= timeout {
                    return Err(ExportError::SettleTimeout {
                        pending,
                        waited_ms: waited.as_millis() as u64,
                    });
                }
                tokio::time::sleep(interval).await;
            }
        }
    }
}

// ── Sessions ────────────────────────────────────────────────────────────────

/// Per-session pipelines, created on first use and dropped once idle.
#[derive(Clone, Default)]
pub struct ExportSessions {
    inner: Arc<DashMap<String, Arc<ExportPipeline>>>,
}

impl ExportSessions {
    pub fn pipeline(&self, session: &str) -> Arc<ExportPipeline> {
        self.inner
            .entry(session.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Forgets pipelines nobody holds that are back at `Idle`.
    pub fn prune_idle(&self) {
        self.inner
            .retain(|_, p| Arc::strong_count(p) > 1 || p.state() != ExportState::Idle);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Entry point used by the HTTP layer.
#[derive(Clone)]
pub struct ResumeExporter {
    deps: ExportDeps,
    sessions: ExportSessions,
}

impl ResumeExporter {
    pub fn new(deps: ExportDeps) -> Self {
        Self {
            deps,
            sessions: ExportSessions::default(),
        }
    }

    pub fn sessions(&self) -> &ExportSessions {
        &self.sessions
    }

    pub async fn export(
        &self,
        session: &str,
        bundle: &TenantBundle,
    ) -> Result<ExportOutcome, ExportError> {
        let pipeline = self.sessions.pipeline(session);
        let outcome = pipeline.export(&self.deps, bundle).await;
        drop(pipeline);
        self.sessions.prune_idle();
        debug!("{} export sessions active", self.sessions.len());
        outcome
    }
}

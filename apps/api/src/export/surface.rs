//! Off-screen rendering surfaces.
//!
//! A surface holds exactly one isolated document for the duration of one
//! export attempt. The pipeline always calls [`RenderSurface::teardown`];
//! implementations must also release their resources on drop in case the
//! attempt is abandoned mid-flight.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

use crate::export::page::Viewport;

/// File the isolated document is written to inside a surface.
pub const DOCUMENT_FILE: &str = "document.html";

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Failed to create rendering surface: {0}")]
    Create(#[source] std::io::Error),

    #[error("Failed to write document into surface {id}: {source}")]
    Write {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to tear down surface {id}: {source}")]
    Teardown {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

/// Rendered size of a surface's content, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width_px: u32,
    pub height_px: u32,
}

impl From<Viewport> for Dimensions {
    fn from(viewport: Viewport) -> Self {
        Self {
            width_px: viewport.width_px,
            height_px: viewport.height_px,
        }
    }
}

#[async_trait]
pub trait RenderSurface: Send + Sync {
    fn id(&self) -> &str;

    fn viewport(&self) -> Viewport;

    /// Replaces the surface content with `html`.
    async fn write_document(&mut self, html: &str) -> Result<(), SurfaceError>;

    /// Where the current document lives, for rasterizers that read files.
    fn content_path(&self) -> &Path;

    /// Scratch directory owned by the surface.
    fn work_dir(&self) -> &Path;

    /// Images, fonts and stylesheets still loading; zero means layout has
    /// settled. `None` when the surface has no layout engine of its own, in
    /// which case the rasterizer waits out the settle budget itself.
    fn pending_loads(&self) -> Option<usize> {
        None
    }

    /// Size of the laid-out content. `None` under the same condition as
    /// [`RenderSurface::pending_loads`]; the rasterizer then lays the
    /// document out at [`RenderSurface::viewport`].
    async fn measure(&self) -> Option<Dimensions>;

    fn teardown(self: Box<Self>) -> Result<(), SurfaceError>;
}

#[async_trait]
pub trait SurfaceFactory: Send + Sync {
    async fn create(&self, viewport: Viewport) -> Result<Box<dyn RenderSurface>, SurfaceError>;
}

// ── Temp-dir surface ────────────────────────────────────────────────────────

/// A private temporary directory holding `document.html`. The directory is
/// removed on teardown or drop, whichever comes first.
pub struct TempDirSurface {
    id: String,
    dir: TempDir,
    document: PathBuf,
    viewport: Viewport,
}

impl TempDirSurface {
    fn new(dir: TempDir, viewport: Viewport) -> Self {
        let document = dir.path().join(DOCUMENT_FILE);
        Self {
            id: Uuid::new_v4().to_string(),
            dir,
            document,
            viewport,
        }
    }
}

#[async_trait]
impl RenderSurface for TempDirSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    async fn write_document(&mut self, html: &str) -> Result<(), SurfaceError> {
        tokio::fs::write(&self.document, html)
            .await
            .map_err(|source| SurfaceError::Write {
                id: self.id.clone(),
                source,
            })
    }

    fn content_path(&self) -> &Path {
        &self.document
    }

    fn work_dir(&self) -> &Path {
        self.dir.path()
    }

    /// A file has no layout engine; the rasterizer does the layout.
    async fn measure(&self) -> Option<Dimensions> {
        None
    }

    fn teardown(self: Box<Self>) -> Result<(), SurfaceError> {
        let id = self.id;
        debug!("Tearing down surface {id}");
        self.dir
            .close()
            .map_err(|source| SurfaceError::Teardown { id, source })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TempDirSurfaceFactory {
    /// Parent of every surface directory; the OS temp dir when unset.
    pub work_dir: Option<PathBuf>,
}

impl TempDirSurfaceFactory {
    pub fn new(work_dir: Option<PathBuf>) -> Self {
        Self { work_dir }
    }
}

#[async_trait]
impl SurfaceFactory for TempDirSurfaceFactory {
    async fn create(&self, viewport: Viewport) -> Result<Box<dyn RenderSurface>, SurfaceError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("vitae-export-");
        let dir = match &self.work_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(SurfaceError::Create)?;

        let surface = TempDirSurface::new(dir, viewport);
        debug!(
            "Created surface {} at {}",
            surface.id,
            surface.dir.path().display()
        );
        Ok(Box::new(surface))
    }
}

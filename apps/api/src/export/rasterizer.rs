//! HTML-to-PDF conversion.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::export::page::{PageConfig, PaginationMode};
use crate::export::surface::{Dimensions, RenderSurface};

/// Output file written next to the document inside the surface.
const OUTPUT_FILE: &str = "output.pdf";

/// Upper bound on one conversion, on top of the settle delay.
const CONVERSION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error("Failed to launch rasterizer {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Rasterizer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Rasterizer did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("Failed to read rasterizer output: {0}")]
    Output(#[source] std::io::Error),
}

/// One conversion request.
#[derive(Debug, Clone, Copy)]
pub struct RasterJob<'a> {
    pub page: &'a PageConfig,
    /// Layout size: the surface's measurement, or its viewport when it has
    /// no layout engine.
    pub dimensions: Dimensions,
    /// How long the rasterizer must let the document load before printing.
    /// Zero once the surface has already reported a settled layout.
    pub settle_delay: Duration,
}

#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Converts the surface's current document into PDF bytes.
    async fn rasterize(
        &self,
        surface: &dyn RenderSurface,
        job: RasterJob<'_>,
    ) -> Result<Vec<u8>, RasterizeError>;
}

/// Drives an external `wkhtmltopdf`-compatible binary.
#[derive(Debug, Clone)]
pub struct CommandRasterizer {
    bin: PathBuf,
}

impl CommandRasterizer {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    /// Command-line flags for one conversion, input and output excluded.
    pub fn args(job: &RasterJob<'_>) -> Vec<String> {
        let page = job.page;
        let m = page.margins;
        let mut args = vec![
            "--quiet".to_string(),
            "--page-size".to_string(),
            page.format.as_str().to_string(),
            "--orientation".to_string(),
            page.orientation.as_str().to_string(),
            "--margin-top".to_string(),
            format!("{}in", m.top_in),
            "--margin-right".to_string(),
            format!("{}in", m.right_in),
            "--margin-bottom".to_string(),
            format!("{}in", m.bottom_in),
            "--margin-left".to_string(),
            format!("{}in", m.left_in),
            "--dpi".to_string(),
            page.dpi().to_string(),
            "--image-quality".to_string(),
            page.image_quality_percent().to_string(),
            "--viewport-size".to_string(),
            format!("{}x{}", job.dimensions.width_px, job.dimensions.height_px),
            "--javascript-delay".to_string(),
            job.settle_delay.as_millis().to_string(),
            "--enable-local-file-access".to_string(),
            "--print-media-type".to_string(),
        ];
        if page.pagination == PaginationMode::Css {
            args.push("--disable-smart-shrinking".to_string());
        }
        args
    }
}

#[async_trait]
impl Rasterizer for CommandRasterizer {
    async fn rasterize(
        &self,
        surface: &dyn RenderSurface,
        job: RasterJob<'_>,
    ) -> Result<Vec<u8>, RasterizeError> {
        let output = surface.work_dir().join(OUTPUT_FILE);
        debug!(
            "Rasterizing surface {} with {} (settle delay {:?})",
            surface.id(),
            self.bin.display(),
            job.settle_delay
        );

        let limit = job.settle_delay + CONVERSION_TIMEOUT;
        let run = Command::new(&self.bin)
            .args(Self::args(&job))
            .arg(surface.content_path())
            .arg(&output)
            .kill_on_drop(true)
            .output();
        // Dropping the timed-out future kills the child.
        let result = tokio::time::timeout(limit, run)
            .await
            .map_err(|_| RasterizeError::TimedOut(limit))?
            .map_err(|source| RasterizeError::Spawn {
                bin: self.bin.display().to_string(),
                source,
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            warn!("Rasterizer failed for surface {}: {stderr}", surface.id());
            return Err(RasterizeError::Failed {
                status: result.status.to_string(),
                stderr,
            });
        }

        tokio::fs::read(&output).await.map_err(RasterizeError::Output)
    }
}

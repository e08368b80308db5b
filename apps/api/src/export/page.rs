//! Fixed page and raster configuration for exported resumes.
//!
//! None of this is user-tunable: every export is US Letter, portrait, with
//! uniform half-inch margins, rasterized at 2x for sharpness.

use serde::Serialize;

// ────────────────────────────────────────────────────────────────────────────
// Page geometry
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageFormat {
    Letter,
}

impl PageFormat {
    /// Name understood by the rasterizer's `--page-size` flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageFormat::Letter => "Letter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Orientation {
    Portrait,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "Portrait",
        }
    }
}

/// Margins in inches, top/right/bottom/left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margins {
    pub top_in: f32,
    pub right_in: f32,
    pub bottom_in: f32,
    pub left_in: f32,
}

impl Margins {
    pub fn uniform(inches: f32) -> Self {
        Self {
            top_in: inches,
            right_in: inches,
            bottom_in: inches,
            left_in: inches,
        }
    }
}

/// How page breaks treat block elements. `AvoidAll` keeps every block on one
/// page when it fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaginationMode {
    AvoidAll,
    Css,
}

// ────────────────────────────────────────────────────────────────────────────
// Page configuration
// ────────────────────────────────────────────────────────────────────────────

/// Width and height of the off-screen surface, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageConfig {
    pub format: PageFormat,
    pub orientation: Orientation,
    pub margins: Margins,
    /// Raster scale relative to CSS pixels.
    pub scale: f32,
    /// JPEG quality for embedded raster content, 0.0..=1.0.
    pub image_quality: f32,
    pub pagination: PaginationMode,
    pub viewport: Viewport,
}

/// CSS reference resolution; `scale` multiplies it.
const CSS_DPI: f32 = 96.0;

impl PageConfig {
    pub fn dpi(&self) -> u32 {
        (CSS_DPI * self.scale).round() as u32
    }

    /// Quality as the 0..=100 integer most rasterizers take.
    pub fn image_quality_percent(&self) -> u8 {
        (self.image_quality.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// Letter, portrait, 0.5" margins, scale 2, JPEG 0.98, avoid-all pagination,
/// rendered on an 850×1100 px surface.
pub fn default_page_config() -> PageConfig {
    PageConfig {
        format: PageFormat::Letter,
        orientation: Orientation::Portrait,
        margins: Margins::uniform(0.5),
        scale: 2.0,
        image_quality: 0.98,
        pagination: PaginationMode::AvoidAll,
        viewport: Viewport {
            width_px: 850,
            height_px: 1100,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_page_config_is_letter_half_inch() {
        let page = default_page_config();
        assert_eq!(page.format.as_str(), "Letter");
        assert_eq!(page.margins, Margins::uniform(0.5));
        assert_eq!(page.pagination, PaginationMode::AvoidAll);
    }

    #[test]
    fn test_scale_two_is_192_dpi() {
        let page = default_page_config();
        assert_eq!(page.dpi(), 192);
        assert_eq!(page.image_quality_percent(), 98);
    }
}

//! Session configuration
//!
//! Every field has a default, so hosts only pass the values they want to
//! change, e.g. `{"highlight_color": "#00ff00"}`.

use crate::color::Color;
use crate::error::AnnotateError;
use crate::geometry::Size;
use crate::raster::MAX_DIMENSION;
use serde::{Deserialize, Serialize};

pub const DEFAULT_EXPORT_FILENAME: &str = "annotated-document.pdf";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Initial session highlight color
    pub highlight_color: Color,
    /// Document container size in CSS pixels until the host reports one
    pub container: Size,
    /// Ink width for signature strokes
    pub stroke_width: f64,
    pub stroke_color: Color,
    /// Display box the rasterized signature is scaled into
    pub signature_display: Size,
    pub underline_thickness: f64,
    pub export: ExportLayout,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            highlight_color: Color::YELLOW,
            container: Size::new(672.0, 600.0),
            stroke_width: 2.0,
            stroke_color: Color::BLACK,
            signature_display: Size::new(150.0, 50.0),
            underline_thickness: 2.0,
            export: ExportLayout::default(),
        }
    }
}

impl AnnotatorConfig {
    pub fn from_json(json: &str) -> Result<Self, AnnotateError> {
        let config: AnnotatorConfig =
            serde_json::from_str(json).map_err(|e| AnnotateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnnotateError> {
        if self.container.is_empty() {
            return Err(AnnotateError::Config(
                "container must have a positive size".to_string(),
            ));
        }
        let limit = MAX_DIMENSION as f64;
        if self.container.width > limit || self.container.height > limit {
            return Err(AnnotateError::Config(format!(
                "container must fit within {}x{}",
                MAX_DIMENSION, MAX_DIMENSION
            )));
        }
        if self.signature_display.is_empty() {
            return Err(AnnotateError::Config(
                "signature_display must have a positive size".to_string(),
            ));
        }
        if !(self.stroke_width > 0.0) || !(self.underline_thickness > 0.0) {
            return Err(AnnotateError::Config(
                "stroke_width and underline_thickness must be positive".to_string(),
            ));
        }
        self.export.validate()
    }
}

/// Page geometry of the exported PDF, in millimetres (top-left origin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportLayout {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub image_x_mm: f64,
    pub image_y_mm: f64,
    pub image_width_mm: f64,
    pub image_height_mm: f64,
    pub filename: String,
}

impl Default for ExportLayout {
    fn default() -> Self {
        // A4 portrait, 10 mm margin
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            image_x_mm: 10.0,
            image_y_mm: 10.0,
            image_width_mm: 190.0,
            image_height_mm: 277.0,
            filename: DEFAULT_EXPORT_FILENAME.to_string(),
        }
    }
}

impl ExportLayout {
    pub fn validate(&self) -> Result<(), AnnotateError> {
        let positive = [
            self.page_width_mm,
            self.page_height_mm,
            self.image_width_mm,
            self.image_height_mm,
        ];
        if positive.iter().any(|v| !(*v > 0.0)) {
            return Err(AnnotateError::Config(
                "export page and image sizes must be positive".to_string(),
            ));
        }
        if self.filename.trim().is_empty() {
            return Err(AnnotateError::Config(
                "export filename must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

//! Freehand signature capture
//!
//! Two states: `Idle` (no drawing surface) and `Capturing` (a transparent
//! surface the size of the document container, receiving pointer strokes).
//! Leaving `Capturing` rasterizes the ink into a PNG anchored at the start of
//! the most recent stroke.

use crate::color::Color;
use crate::error::AnnotateError;
use crate::geometry::{Point, Rect, Size};
use crate::raster::Raster;
use base64::Engine;

/// Transient surface overlaid on the document while signing.
#[derive(Debug, Clone)]
pub struct DrawingSurface {
    size: Size,
    raster: Raster,
    stroke_width: f64,
    ink: Color,
    /// Last point of the stroke in progress
    pen: Option<Point>,
    /// Start of the most recent stroke
    anchor: Option<Point>,
    strokes: usize,
}

impl DrawingSurface {
    fn new(size: Size, stroke_width: f64, ink: Color) -> Result<Self, AnnotateError> {
        let (w, h) = Raster::dimensions_for(size.width, size.height);
        Ok(Self {
            size,
            raster: Raster::new(w, h)?,
            stroke_width,
            ink,
            pen: None,
            anchor: None,
            strokes: 0,
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes
    }

    pub fn is_drawing(&self) -> bool {
        self.pen.is_some()
    }

    pub fn anchor(&self) -> Option<Point> {
        self.anchor
    }
}

#[derive(Debug, Clone, Default)]
enum CaptureState {
    #[default]
    Idle,
    Capturing(DrawingSurface),
}

/// Rasterized signature kept as an overlay for the rest of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureImage {
    pub png: Vec<u8>,
    pub raster: Raster,
    /// Top-left of the overlay in container coordinates
    pub position: Point,
    /// Box the image is scaled into when displayed
    pub display: Size,
}

impl SignatureImage {
    pub fn data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }

    pub fn display_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.display.width,
            self.display.height,
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignatureCapture {
    state: CaptureState,
}

impl SignatureCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, CaptureState::Capturing(_))
    }

    pub fn surface(&self) -> Option<&DrawingSurface> {
        match &self.state {
            CaptureState::Capturing(surface) => Some(surface),
            CaptureState::Idle => None,
        }
    }

    /// Idle -> Capturing. Returns false if a surface already exists.
    pub fn begin(
        &mut self,
        size: Size,
        stroke_width: f64,
        ink: Color,
    ) -> Result<bool, AnnotateError> {
        if self.is_capturing() {
            tracing::debug!("drawing surface already present");
            return Ok(false);
        }
        self.state = CaptureState::Capturing(DrawingSurface::new(size, stroke_width, ink)?);
        tracing::debug!(width = size.width, height = size.height, "drawing surface created");
        Ok(true)
    }

    /// Start a stroke and make its start point the signature anchor.
    pub fn pointer_down(&mut self, at: Point) -> bool {
        let CaptureState::Capturing(surface) = &mut self.state else {
            return false;
        };
        surface.pen = Some(at);
        surface.anchor = Some(at);
        surface.strokes += 1;
        true
    }

    /// Extend the active stroke. Ignored when no stroke is active.
    pub fn pointer_move(&mut self, to: Point) -> bool {
        let CaptureState::Capturing(surface) = &mut self.state else {
            return false;
        };
        let Some(from) = surface.pen else {
            return false;
        };
        let (width, ink) = (surface.stroke_width, surface.ink);
        surface.raster.stroke_segment(from, to, width, ink);
        surface.pen = Some(to);
        true
    }

    /// End the active stroke (pointer-up or pointer-leave).
    pub fn pointer_up(&mut self) {
        if let CaptureState::Capturing(surface) = &mut self.state {
            surface.pen = None;
        }
    }

    /// Capturing -> Idle.
    ///
    /// The surface is always discarded. An image is produced only if at least
    /// one stroke was started; finishing while idle does nothing.
    pub fn finish(&mut self, display: Size) -> Result<Option<SignatureImage>, AnnotateError> {
        let CaptureState::Capturing(surface) = std::mem::take(&mut self.state) else {
            tracing::debug!("no drawing surface to rasterize");
            return Ok(None);
        };

        let Some(position) = surface.anchor else {
            tracing::debug!("drawing surface removed without strokes");
            return Ok(None);
        };

        let png = surface.raster.encode_png()?;
        tracing::info!(
            strokes = surface.strokes,
            x = position.x,
            y = position.y,
            bytes = png.len(),
            "signature captured"
        );

        Ok(Some(SignatureImage {
            png,
            raster: surface.raster,
            position,
            display,
        }))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Event {
        Down(f64, f64),
        Move(f64, f64),
        Up,
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            (0.0..100.0f64, 0.0..100.0f64).prop_map(|(x, y)| Event::Down(x, y)),
            (0.0..100.0f64, 0.0..100.0f64).prop_map(|(x, y)| Event::Move(x, y)),
            Just(Event::Up),
        ]
    }

    proptest! {
        #[test]
        fn image_anchored_at_last_stroke_start(events in prop::collection::vec(event(), 0..30)) {
            let mut capture = SignatureCapture::new();
            capture.begin(Size::new(100.0, 100.0), 2.0, Color::BLACK).unwrap();

            let mut last_down = None;
            for e in &events {
                match e {
                    Event::Down(x, y) => {
                        capture.pointer_down(Point::new(*x, *y));
                        last_down = Some(Point::new(*x, *y));
                    }
                    Event::Move(x, y) => {
                        capture.pointer_move(Point::new(*x, *y));
                    }
                    Event::Up => capture.pointer_up(),
                }
            }

            let image = capture.finish(Size::new(150.0, 50.0)).unwrap();
            prop_assert_eq!(image.map(|i| i.position), last_down);
            prop_assert!(!capture.is_capturing());
        }
    }
}

//! RGBA pixel surfaces used for signature ink and document capture.

use crate::color::Color;
use crate::error::AnnotateError;
use crate::geometry::{Point, Rect};

/// Largest accepted width or height of a surface.
pub const MAX_DIMENSION: u32 = 8192;

/// Straight-alpha RGBA8 image, row-major, top-left origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

fn byte_len(width: u32, height: u32) -> Result<usize, AnnotateError> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(AnnotateError::InvalidImage(format!(
            "{}x{} exceeds the {} pixel limit",
            width, height, MAX_DIMENSION
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| AnnotateError::InvalidImage(format!("{}x{} is too large", width, height)))
}

impl Raster {
    /// Fully transparent surface.
    pub fn new(width: u32, height: u32) -> Result<Self, AnnotateError> {
        Ok(Self {
            width,
            height,
            pixels: vec![0; byte_len(width, height)?],
        })
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Result<Self, AnnotateError> {
        let len = byte_len(width, height)?;
        let mut pixels = Vec::with_capacity(len);
        for _ in 0..len / 4 {
            pixels.extend_from_slice(&[color.r, color.g, color.b, 255]);
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Wrap pixel data from the host (e.g. canvas `ImageData`).
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, AnnotateError> {
        let expected = byte_len(width, height)?;
        if pixels.len() != expected {
            return Err(AnnotateError::InvalidImage(format!(
                "expected {} bytes of RGBA data for {}x{}, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Surface dimensions for a CSS-pixel size, clamped to `1..=MAX_DIMENSION`.
    pub fn dimensions_for(width: f64, height: f64) -> (u32, u32) {
        let px = |v: f64| {
            if v.is_finite() && v >= 1.0 {
                v.ceil().min(MAX_DIMENSION as f64) as u32
            } else {
                1
            }
        };
        (px(width), px(height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// True when no pixel has any coverage.
    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|p| p[3] == 0)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Source-over composite of one pixel; out-of-bounds writes are dropped.
    pub fn blend_pixel(&mut self, x: i64, y: i64, src: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 || src[3] == 0 {
            return;
        }
        let i = self.offset(x as u32, y as u32);
        let dst = &mut self.pixels[i..i + 4];

        if src[3] == 255 {
            dst.copy_from_slice(&src);
            return;
        }

        let sa = src[3] as f32 / 255.0;
        let da = dst[3] as f32 / 255.0;
        let oa = sa + da * (1.0 - sa);
        if oa <= 0.0 {
            dst.copy_from_slice(&[0, 0, 0, 0]);
            return;
        }
        for c in 0..3 {
            let s = src[c] as f32 / 255.0;
            let d = dst[c] as f32 / 255.0;
            let o = (s * sa + d * da * (1.0 - sa)) / oa;
            dst[c] = (o * 255.0).round() as u8;
        }
        dst[3] = (oa * 255.0).round() as u8;
    }

    /// Paint a solid segment with round caps. A zero-length segment paints a dot.
    pub fn stroke_segment(&mut self, from: Point, to: Point, width: f64, color: Color) {
        let radius = (width / 2.0).max(0.5);
        let min_x = (from.x.min(to.x) - radius).floor() as i64;
        let max_x = (from.x.max(to.x) + radius).ceil() as i64;
        let min_y = (from.y.min(to.y) - radius).floor() as i64;
        let max_y = (from.y.max(to.y) + radius).ceil() as i64;

        let min_x = min_x.max(0);
        let min_y = min_y.max(0);
        let max_x = max_x.min(self.width as i64 - 1);
        let max_y = max_y.min(self.height as i64 - 1);

        let ink = [color.r, color.g, color.b, 255];
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if distance_to_segment(center, from, to) <= radius {
                    self.blend_pixel(x, y, ink);
                }
            }
        }
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let ink = [color.r, color.g, color.b, 255];
        self.for_each_in(rect, |raster, x, y| raster.blend_pixel(x, y, ink));
    }

    /// Multiply `color` into the pixels under `rect`, keeping what is already
    /// drawn visible beneath the tint.
    pub fn multiply_rect(&mut self, rect: Rect, color: Color) {
        let tint = [color.r, color.g, color.b];
        self.for_each_in(rect, |raster, x, y| {
            let i = raster.offset(x as u32, y as u32);
            for c in 0..3 {
                let v = raster.pixels[i + c] as u16 * tint[c] as u16 / 255;
                raster.pixels[i + c] = v as u8;
            }
        });
    }

    /// Nearest-neighbour scale of `src` into `dest`, composited source-over.
    pub fn draw_scaled(&mut self, src: &Raster, dest: Rect) {
        if src.width == 0 || src.height == 0 || !(dest.width > 0.0) || !(dest.height > 0.0) {
            return;
        }
        let sx = src.width as f64 / dest.width;
        let sy = src.height as f64 / dest.height;
        self.for_each_in(dest, |raster, x, y| {
            let u = ((x as f64 + 0.5 - dest.x) * sx).floor() as i64;
            let v = ((y as f64 + 0.5 - dest.y) * sy).floor() as i64;
            let u = u.clamp(0, src.width as i64 - 1) as u32;
            let v = v.clamp(0, src.height as i64 - 1) as u32;
            if let Some(p) = src.pixel(u, v) {
                raster.blend_pixel(x, y, p);
            }
        });
    }

    fn for_each_in(&mut self, rect: Rect, mut f: impl FnMut(&mut Raster, i64, i64)) {
        let x0 = rect.x.round().max(0.0) as i64;
        let y0 = rect.y.round().max(0.0) as i64;
        let x1 = (rect.right().round() as i64).min(self.width as i64);
        let y1 = (rect.bottom().round() as i64).min(self.height as i64);
        for y in y0..y1 {
            for x in x0..x1 {
                f(self, x, y);
            }
        }
    }

    /// Opaque RGB bytes with transparency flattened onto white.
    pub fn to_rgb_on_white(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for p in self.pixels.chunks_exact(4) {
            let a = p[3] as u16;
            for c in &p[..3] {
                let v = (*c as u16 * a + 255 * (255 - a)) / 255;
                rgb.push(v as u8);
            }
        }
        rgb
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, AnnotateError> {
        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| AnnotateError::Encode(e.to_string()))?;
        writer
            .write_image_data(&self.pixels)
            .map_err(|e| AnnotateError::Encode(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| AnnotateError::Encode(e.to_string()))?;

        Ok(out)
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_is_blank() {
        let raster = Raster::new(4, 3).unwrap();
        assert_eq!(raster.pixels().len(), 48);
        assert!(raster.is_blank());
        assert_eq!(raster.pixel(4, 0), None);
    }

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(Raster::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(Raster::from_rgba(2, 2, vec![0; 15]).is_err());
    }

    #[test]
    fn test_oversized_dimensions_are_rejected() {
        let err = Raster::from_rgba(u32::MAX, u32::MAX, vec![]).unwrap_err();
        assert!(matches!(err, AnnotateError::InvalidImage(_)));
        // wraps to zero bytes with 32-bit usize
        assert!(Raster::from_rgba(65536, 16384, vec![]).is_err());
        assert!(Raster::new(MAX_DIMENSION + 1, 1).is_err());
        assert!(Raster::filled(1, MAX_DIMENSION + 1, Color::WHITE).is_err());
    }

    #[test]
    fn test_dimensions_for_rounds_up() {
        assert_eq!(Raster::dimensions_for(10.2, 5.0), (11, 5));
        assert_eq!(Raster::dimensions_for(0.0, f64::NAN), (1, 1));
        assert_eq!(Raster::dimensions_for(1e12, 20.0), (MAX_DIMENSION, 20));
    }

    #[test]
    fn test_stroke_segment_paints_line_and_caps() {
        let mut raster = Raster::new(60, 60).unwrap();
        raster.stroke_segment(Point::new(10.0, 10.0), Point::new(50.0, 50.0), 2.0, Color::BLACK);

        assert_eq!(raster.pixel(30, 30), Some([0, 0, 0, 255]));
        assert_eq!(raster.pixel(10, 10), Some([0, 0, 0, 255]));
        assert_eq!(raster.pixel(50, 10), Some([0, 0, 0, 0]));
        assert!(!raster.is_blank());
    }

    #[test]
    fn test_stroke_outside_bounds_is_clipped() {
        let mut raster = Raster::new(10, 10).unwrap();
        let (from, to) = (Point::new(-50.0, -50.0), Point::new(-20.0, -20.0));
        raster.stroke_segment(from, to, 2.0, Color::BLACK);
        assert!(raster.is_blank());
    }

    #[test]
    fn test_multiply_keeps_dark_pixels() {
        let mut raster = Raster::filled(4, 1, Color::WHITE).unwrap();
        raster.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::BLACK);
        raster.multiply_rect(Rect::new(0.0, 0.0, 4.0, 1.0), Color::rgb(255, 255, 0));

        assert_eq!(raster.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(raster.pixel(1, 0), Some([255, 255, 0, 255]));
    }

    #[test]
    fn test_draw_scaled_fills_destination() {
        let src = Raster::filled(2, 2, Color::rgb(255, 0, 0)).unwrap();
        let mut dst = Raster::filled(10, 10, Color::WHITE).unwrap();
        dst.draw_scaled(&src, Rect::new(2.0, 2.0, 4.0, 4.0));

        assert_eq!(dst.pixel(2, 2), Some([255, 0, 0, 255]));
        assert_eq!(dst.pixel(5, 5), Some([255, 0, 0, 255]));
        assert_eq!(dst.pixel(6, 6), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_transparent_source_leaves_destination() {
        let src = Raster::new(2, 2).unwrap();
        let mut dst = Raster::filled(4, 4, Color::WHITE).unwrap();
        dst.draw_scaled(&src, Rect::new(0.0, 0.0, 4.0, 4.0));
        assert_eq!(dst, Raster::filled(4, 4, Color::WHITE).unwrap());
    }

    #[test]
    fn test_rgb_on_white_flattens_alpha() {
        let mut raster = Raster::new(2, 1).unwrap();
        raster.blend_pixel(0, 0, [0, 0, 0, 255]);
        assert_eq!(raster.to_rgb_on_white(), vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_encode_png_round_trips_dimensions() {
        let mut raster = Raster::new(7, 3).unwrap();
        raster.blend_pixel(1, 1, [10, 20, 30, 255]);
        let bytes = raster.encode_png().unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));

        let decoder = png::Decoder::new(&bytes[..]);
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        assert_eq!((info.width, info.height), (7, 3));
        assert_eq!(&buf[..info.buffer_size()], raster.pixels());
    }
}

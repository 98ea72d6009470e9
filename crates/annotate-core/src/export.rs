//! Document capture and PDF packaging
//!
//! Capture flattens the visible document container (page bitmaps, highlight
//! and underline styling, the signature overlay) into one raster. Packaging
//! wraps that raster in a single-page PDF with a fixed layout.

use crate::applicator::Presentation;
use crate::color::Color;
use crate::config::ExportLayout;
use crate::error::AnnotateError;
use crate::geometry::{Point, Rect, Size};
use crate::raster::Raster;
use crate::signature::SignatureImage;
use crate::text_layer::TextLayer;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use serde::Serialize;
use std::io::Write;

const MM_TO_PT: f64 = 72.0 / 25.4;
const IMAGE_NAME: &[u8] = b"Im1";

/// Rendered pixels of one page, placed in the container.
#[derive(Debug, Clone, PartialEq)]
pub struct PageBitmap {
    pub page: u32,
    pub origin: Point,
    /// Display size in the container; the raster is scaled to fit
    pub size: Size,
    pub raster: Raster,
    /// Set when the pixels include cross-origin data the host may not read
    pub tainted: bool,
}

/// Everything visible inside the document container.
pub struct DocumentScene<'a> {
    pub container: Size,
    pub pages: Vec<&'a PageBitmap>,
    pub text_layer: &'a TextLayer,
    pub presentation: &'a Presentation,
    pub signature: Option<&'a SignatureImage>,
    /// Ink on the drawing surface while signing is in progress
    pub surface: Option<&'a Raster>,
}

/// Rasterizes a scene. Hosts with their own capture path implement this.
pub trait Capture {
    fn capture(&self, scene: &DocumentScene<'_>) -> Result<Raster, AnnotateError>;
}

/// Software capture of a [`DocumentScene`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Compositor;

impl Capture for Compositor {
    fn capture(&self, scene: &DocumentScene<'_>) -> Result<Raster, AnnotateError> {
        if scene.container.is_empty() {
            return Err(AnnotateError::Capture(
                "document container has no area".to_string(),
            ));
        }
        if let Some(page) = scene.pages.iter().find(|p| p.tainted) {
            return Err(AnnotateError::Capture(format!(
                "page {} contains cross-origin image data",
                page.page
            )));
        }

        let (width, height) =
            Raster::dimensions_for(scene.container.width, scene.container.height);
        let mut out = Raster::filled(width, height, Color::WHITE)?;

        for page in &scene.pages {
            out.draw_scaled(
                &page.raster,
                Rect::new(page.origin.x, page.origin.y, page.size.width, page.size.height),
            );
        }

        for (id, style) in scene.presentation.styles() {
            let Some(rect) = scene.text_layer.container_rect(id) else {
                continue;
            };
            if let Some(background) = style.background {
                out.multiply_rect(rect, background);
            }
            if let Some(underline) = style.underline {
                let line = Rect::new(
                    rect.x,
                    rect.bottom() - underline.thickness,
                    rect.width,
                    underline.thickness,
                );
                out.fill_rect(line, underline.color);
            }
        }

        if let Some(signature) = scene.signature {
            out.draw_scaled(&signature.raster, signature.display_rect());
        }

        if let Some(surface) = scene.surface {
            let area = Rect::new(0.0, 0.0, scene.container.width, scene.container.height);
            out.draw_scaled(surface, area);
        }

        Ok(out)
    }
}

/// Downloadable export result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportArtifact {
    pub filename: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub size: usize,
}

/// Capture the scene and package it.
pub fn export_document(
    scene: &DocumentScene<'_>,
    capture: &impl Capture,
    layout: &ExportLayout,
) -> Result<ExportArtifact, AnnotateError> {
    let raster = capture.capture(scene)?;
    let bytes = package_pdf(&raster, layout)?;
    tracing::info!(
        filename = %layout.filename,
        width = raster.width(),
        height = raster.height(),
        bytes = bytes.len(),
        "document exported"
    );
    Ok(ExportArtifact {
        filename: layout.filename.clone(),
        size: bytes.len(),
        bytes,
    })
}

/// Build a one-page PDF showing `raster` at the layout's image box.
pub fn package_pdf(raster: &Raster, layout: &ExportLayout) -> Result<Vec<u8>, AnnotateError> {
    let page_w = layout.page_width_mm * MM_TO_PT;
    let page_h = layout.page_height_mm * MM_TO_PT;
    let img_w = layout.image_width_mm * MM_TO_PT;
    let img_h = layout.image_height_mm * MM_TO_PT;
    let img_x = layout.image_x_mm * MM_TO_PT;
    // Layout is top-left based; PDF user space starts bottom-left
    let img_y = page_h - (layout.image_y_mm * MM_TO_PT) - img_h;

    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => raster.width() as i64,
            "Height" => raster.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflate(&raster.to_rgb_on_white())?,
    );
    let image_id = doc.add_object(image);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(img_w as f32),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(img_h as f32),
                    Object::Real(img_x as f32),
                    Object::Real(img_y as f32),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| AnnotateError::Pdf(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let mut xobjects = Dictionary::new();
    xobjects.set(IMAGE_NAME.to_vec(), Object::Reference(image_id));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page_w as f32),
            Object::Real(page_h as f32),
        ],
        "Resources" => dictionary! {
            "XObject" => xobjects,
        },
        "Contents" => Object::Reference(content_id),
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let created = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal(concat!("annotate-core ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::string_literal(created),
    });
    doc.trailer.set("Info", Object::Reference(info_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AnnotateError::Pdf(format!("Save failed: {}", e)))?;
    Ok(buffer)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, AnnotateError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| AnnotateError::Encode(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| AnnotateError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applicator::Presentation;
    use crate::signature::SignatureCapture;
    use crate::text_layer::{Fragment, PageLayer};
    use flate2::read::ZlibDecoder;
    use pretty_assertions::assert_eq;
    use std::io::Read;

    fn page_bitmap(tainted: bool) -> PageBitmap {
        PageBitmap {
            page: 1,
            origin: Point::new(0.0, 0.0),
            size: Size::new(100.0, 50.0),
            raster: Raster::filled(50, 25, Color::rgb(200, 200, 200)).unwrap(),
            tainted,
        }
    }

    fn text_layer() -> TextLayer {
        let mut layer = TextLayer::new();
        layer.set_page(
            1,
            PageLayer {
                origin: Point::new(0.0, 0.0),
                size: Size::new(100.0, 50.0),
                fragments: vec![Fragment::new("Invoice", Rect::new(10.0, 10.0, 30.0, 10.0))],
            },
        );
        layer
    }

    #[test]
    fn test_compositor_paints_pages_and_styles() {
        let layer = text_layer();
        let mut presentation = Presentation::new();
        presentation.highlight(&layer, "Invoice", Color::rgb(255, 0, 0));
        let page = page_bitmap(false);

        let scene = DocumentScene {
            container: Size::new(120.0, 60.0),
            pages: vec![&page],
            text_layer: &layer,
            presentation: &presentation,
            signature: None,
            surface: None,
        };
        let raster = Compositor.capture(&scene).unwrap();

        assert_eq!((raster.width(), raster.height()), (120, 60));
        // page background
        assert_eq!(raster.pixel(5, 5), Some([200, 200, 200, 255]));
        // highlighted fragment, multiplied over the page
        assert_eq!(raster.pixel(15, 15), Some([200, 0, 0, 255]));
        // outside the page
        assert_eq!(raster.pixel(110, 55), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_compositor_draws_underline_at_fragment_bottom() {
        let layer = text_layer();
        let mut presentation = Presentation::new();
        presentation.underline(&layer, "Invoice", Color::rgb(0, 0, 255), 2.0);

        let scene = DocumentScene {
            container: Size::new(100.0, 50.0),
            pages: vec![],
            text_layer: &layer,
            presentation: &presentation,
            signature: None,
            surface: None,
        };
        let raster = Compositor.capture(&scene).unwrap();

        assert_eq!(raster.pixel(20, 19), Some([0, 0, 255, 255]));
        assert_eq!(raster.pixel(20, 15), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_compositor_overlays_signature() {
        let layer = TextLayer::new();
        let presentation = Presentation::new();
        let mut capture = SignatureCapture::new();
        capture.begin(Size::new(20.0, 20.0), 40.0, Color::BLACK).unwrap();
        capture.pointer_down(Point::new(10.0, 10.0));
        capture.pointer_move(Point::new(10.0, 10.0));
        let signature = capture.finish(Size::new(20.0, 20.0)).unwrap().unwrap();

        let scene = DocumentScene {
            container: Size::new(50.0, 50.0),
            pages: vec![],
            text_layer: &layer,
            presentation: &presentation,
            signature: Some(&signature),
            surface: None,
        };
        let raster = Compositor.capture(&scene).unwrap();

        assert_eq!(raster.pixel(15, 15), Some([0, 0, 0, 255]));
        assert_eq!(raster.pixel(5, 5), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_compositor_includes_live_surface_ink() {
        let layer = TextLayer::new();
        let presentation = Presentation::new();
        let mut capture = SignatureCapture::new();
        capture.begin(Size::new(50.0, 50.0), 4.0, Color::BLACK).unwrap();
        capture.pointer_down(Point::new(30.0, 30.0));
        capture.pointer_move(Point::new(40.0, 30.0));

        let scene = DocumentScene {
            container: Size::new(50.0, 50.0),
            pages: vec![],
            text_layer: &layer,
            presentation: &presentation,
            signature: None,
            surface: capture.surface().map(|s| s.raster()),
        };
        let raster = Compositor.capture(&scene).unwrap();

        assert_eq!(raster.pixel(35, 30), Some([0, 0, 0, 255]));
        assert_eq!(raster.pixel(5, 5), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_tainted_page_fails_capture() {
        let layer = TextLayer::new();
        let presentation = Presentation::new();
        let page = page_bitmap(true);
        let scene = DocumentScene {
            container: Size::new(100.0, 50.0),
            pages: vec![&page],
            text_layer: &layer,
            presentation: &presentation,
            signature: None,
            surface: None,
        };

        let err = Compositor.capture(&scene).unwrap_err();
        assert!(matches!(err, AnnotateError::Capture(_)));
    }

    #[test]
    fn test_package_pdf_single_a4_page_with_image() {
        let raster = Raster::filled(8, 4, Color::rgb(255, 0, 0)).unwrap();
        let bytes = package_pdf(&raster, &ExportLayout::default()).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let page = doc.get_dictionary(pages[&1]).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        let height = media_box[3].as_float().unwrap();
        assert!((height - 841.89).abs() < 0.01);

        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(IMAGE_NAME).unwrap().as_reference().unwrap();
        let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 8);
        assert_eq!(image.dict.get(b"Height").unwrap().as_i64().unwrap(), 4);

        let mut decoded = Vec::new();
        ZlibDecoder::new(&image.content[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded.len(), 8 * 4 * 3);
        assert_eq!(&decoded[..3], &[255, 0, 0]);
    }

    #[test]
    fn test_package_pdf_places_image_with_margin() {
        let raster = Raster::filled(2, 2, Color::WHITE).unwrap();
        let bytes = package_pdf(&raster, &ExportLayout::default()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = doc.get_pages()[&1];

        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let cm = content
            .operations
            .iter()
            .find(|op| op.operator == "cm")
            .unwrap();
        let values: Vec<f32> = cm.operands.iter().map(|o| o.as_float().unwrap()).collect();

        let mm = |v: f32| v * 72.0 / 25.4;
        assert!((values[0] - mm(190.0)).abs() < 0.01);
        assert!((values[3] - mm(277.0)).abs() < 0.01);
        assert!((values[4] - mm(10.0)).abs() < 0.01);
        assert!((values[5] - mm(10.0)).abs() < 0.01);
    }

    #[test]
    fn test_export_document_uses_layout_filename() {
        let layer = TextLayer::new();
        let presentation = Presentation::new();
        let scene = DocumentScene {
            container: Size::new(10.0, 10.0),
            pages: vec![],
            text_layer: &layer,
            presentation: &presentation,
            signature: None,
            surface: None,
        };

        let artifact = export_document(&scene, &Compositor, &ExportLayout::default()).unwrap();
        assert_eq!(artifact.filename, "annotated-document.pdf");
        assert_eq!(artifact.size, artifact.bytes.len());
        assert!(artifact.bytes.starts_with(b"%PDF-1.4"));
    }
}

//! Annotation session state container
//!
//! All session state lives in [`AnnotatorState`] and changes only through
//! [`AnnotatorState::dispatch`]. Each action returns the effects the host must
//! apply (DOM styling, dialogs, downloads); the state itself never touches the
//! platform.

use crate::applicator::{Presentation, StyledFragment};
use crate::color::Color;
use crate::config::AnnotatorConfig;
use crate::error::AnnotateError;
use crate::export::{
    export_document, Capture, Compositor, DocumentScene, ExportArtifact, PageBitmap,
};
use crate::geometry::{Point, Size};
use crate::raster::{Raster, MAX_DIMENSION};
use crate::signature::{DrawingSurface, SignatureCapture, SignatureImage};
use crate::store::{AnnotationStore, CommentRecord};
use crate::text_layer::{FragmentId, PageLayer, TextLayer};
use crate::upload::{validate_upload, DocumentInfo, INVALID_UPLOAD_MESSAGE};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A file was dropped or picked
    Upload {
        name: String,
        mime: String,
        bytes: Vec<u8>,
    },
    /// The renderer painted a page
    RenderPage {
        page: u32,
        layer: PageLayer,
        bitmap: Option<Raster>,
        tainted: bool,
    },
    ResizeContainer(Size),
    /// Pointer-up over the document with this selection
    SelectText(String),
    SetColor(String),
    Highlight,
    Underline,
    /// Result of the comment dialog; `None` when cancelled
    SubmitComment(Option<String>),
    ClickFragment(FragmentId),
    ToggleSigning,
    StrokeStart(Point),
    StrokeMove(Point),
    StrokeEnd,
    Export,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Effect {
    Alert {
        message: String,
    },
    DocumentLoaded {
        info: DocumentInfo,
    },
    /// Drop the platform's active selection range
    ClearSelection,
    /// Open the comment dialog for a highlight
    PromptComment {
        text: String,
    },
    StyleChanged {
        fragments: Vec<StyledFragment>,
    },
    SelectedComment {
        comment: String,
    },
    SurfaceCreated {
        width: f64,
        height: f64,
    },
    SurfaceRemoved,
    SignaturePlaced {
        data_url: String,
        position: Point,
        display: Size,
    },
    Download {
        artifact: ExportArtifact,
    },
}

pub struct AnnotatorState {
    config: AnnotatorConfig,
    document: Option<DocumentInfo>,
    container: Size,
    highlight_color: Color,
    selected_text: Option<String>,
    underline_target: Option<String>,
    pending_comment: Option<String>,
    selected_comment: Option<String>,
    text_layer: TextLayer,
    page_bitmaps: BTreeMap<u32, PageBitmap>,
    presentation: Presentation,
    store: AnnotationStore,
    signing: bool,
    capture: SignatureCapture,
    signature: Option<SignatureImage>,
}

impl Default for AnnotatorState {
    fn default() -> Self {
        Self::new(AnnotatorConfig::default())
    }
}

impl AnnotatorState {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self {
            container: config.container,
            highlight_color: config.highlight_color,
            config,
            document: None,
            selected_text: None,
            underline_target: None,
            pending_comment: None,
            selected_comment: None,
            text_layer: TextLayer::new(),
            page_bitmaps: BTreeMap::new(),
            presentation: Presentation::new(),
            store: AnnotationStore::new(),
            signing: false,
            capture: SignatureCapture::new(),
            signature: None,
        }
    }

    pub fn dispatch(&mut self, action: Action) -> Result<Vec<Effect>, AnnotateError> {
        self.dispatch_with(action, &Compositor)
    }

    /// Like [`dispatch`](Self::dispatch), exporting through `capture`.
    pub fn dispatch_with(
        &mut self,
        action: Action,
        capture: &impl Capture,
    ) -> Result<Vec<Effect>, AnnotateError> {
        match action {
            Action::Upload { name, mime, bytes } => Ok(self.upload(&name, &mime, &bytes)),
            Action::RenderPage {
                page,
                layer,
                bitmap,
                tainted,
            } => {
                self.render_page(page, layer, bitmap, tainted);
                Ok(Vec::new())
            }
            Action::ResizeContainer(size) => {
                if size.is_empty() {
                    tracing::warn!(?size, "ignoring empty container size");
                } else if size.width > MAX_DIMENSION as f64 || size.height > MAX_DIMENSION as f64 {
                    tracing::warn!(?size, "ignoring oversized container size");
                } else {
                    self.container = size;
                }
                Ok(Vec::new())
            }
            Action::SelectText(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    tracing::debug!(text, "text selected");
                    self.selected_text = Some(text.to_string());
                    self.underline_target = Some(text.to_string());
                }
                Ok(Vec::new())
            }
            Action::SetColor(color) => {
                self.highlight_color = Color::parse_hex(&color)?;
                Ok(Vec::new())
            }
            Action::Highlight => Ok(self.highlight()),
            Action::Underline => Ok(self.underline()),
            Action::SubmitComment(input) => Ok(self.submit_comment(input)),
            Action::ClickFragment(id) => Ok(self.click_fragment(id)),
            Action::ToggleSigning => self.toggle_signing(),
            Action::StrokeStart(at) => {
                self.capture.pointer_down(at);
                Ok(Vec::new())
            }
            Action::StrokeMove(to) => {
                self.capture.pointer_move(to);
                Ok(Vec::new())
            }
            Action::StrokeEnd => {
                self.capture.pointer_up();
                Ok(Vec::new())
            }
            Action::Export => Ok(self.export(capture)),
        }
    }

    fn upload(&mut self, name: &str, mime: &str, bytes: &[u8]) -> Vec<Effect> {
        match validate_upload(name, mime, bytes) {
            Ok(info) => {
                tracing::info!(name, pages = info.page_count, "document uploaded");
                self.document = Some(info.clone());
                self.text_layer.clear();
                self.page_bitmaps.clear();
                self.presentation.clear();
                self.pending_comment = None;
                vec![Effect::DocumentLoaded { info }]
            }
            Err(e) => {
                tracing::warn!(name, mime, error = %e, "upload rejected");
                vec![Effect::Alert {
                    message: INVALID_UPLOAD_MESSAGE.to_string(),
                }]
            }
        }
    }

    fn render_page(&mut self, page: u32, layer: PageLayer, bitmap: Option<Raster>, tainted: bool) {
        if self.document.is_none() {
            tracing::debug!(page, "ignoring render without a document");
            return;
        }

        match bitmap {
            Some(raster) => {
                self.page_bitmaps.insert(
                    page,
                    PageBitmap {
                        page,
                        origin: layer.origin,
                        size: layer.size,
                        raster,
                        tainted,
                    },
                );
            }
            None => {
                self.page_bitmaps.remove(&page);
            }
        }

        self.presentation.clear_page(page);
        tracing::debug!(page, fragments = layer.fragments.len(), "page indexed");
        self.text_layer.set_page(page, layer);

        let stale = self
            .pending_comment
            .as_deref()
            .is_some_and(|text| self.text_layer.find_matches(text).is_empty());
        if stale {
            tracing::debug!(page, "closing comment dialog for text no longer on the page");
            self.pending_comment = None;
        }
    }

    fn highlight(&mut self) -> Vec<Effect> {
        let Some(text) = self.selected_text.take() else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        let matches = self
            .presentation
            .highlight(&self.text_layer, &text, self.highlight_color);

        if !matches.is_empty() {
            effects.push(Effect::StyleChanged {
                fragments: self.presentation.snapshot(&matches),
            });
            self.pending_comment = Some(text.clone());
            effects.push(Effect::PromptComment { text });
        }

        effects.push(Effect::ClearSelection);
        effects
    }

    fn underline(&mut self) -> Vec<Effect> {
        let Some(text) = self.underline_target.take() else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        let matches = self.presentation.underline(
            &self.text_layer,
            &text,
            self.highlight_color,
            self.config.underline_thickness,
        );

        if !matches.is_empty() {
            effects.push(Effect::StyleChanged {
                fragments: self.presentation.snapshot(&matches),
            });
        }

        effects.push(Effect::ClearSelection);
        effects
    }

    fn submit_comment(&mut self, input: Option<String>) -> Vec<Effect> {
        let Some(text) = self.pending_comment.take() else {
            return Vec::new();
        };

        match input.filter(|c| !c.trim().is_empty()) {
            Some(comment) => {
                self.store.record(text, comment.clone());
                self.selected_comment = Some(comment.clone());
                vec![Effect::SelectedComment { comment }]
            }
            None => Vec::new(),
        }
    }

    fn click_fragment(&mut self, id: FragmentId) -> Vec<Effect> {
        let Some(key) = self.presentation.comment_key(id) else {
            return Vec::new();
        };

        let comment = self.store.comment_for(key).to_string();
        self.selected_comment = Some(comment.clone());
        vec![Effect::SelectedComment { comment }]
    }

    fn toggle_signing(&mut self) -> Result<Vec<Effect>, AnnotateError> {
        self.signing = !self.signing;

        if self.signing {
            if self.document.is_none() {
                tracing::debug!("signing enabled without a document container");
                return Ok(Vec::new());
            }
            let created = self
                .capture
                .begin(
                    self.container,
                    self.config.stroke_width,
                    self.config.stroke_color,
                )
                .inspect_err(|_| self.signing = false)?;
            return Ok(if created {
                vec![Effect::SurfaceCreated {
                    width: self.container.width,
                    height: self.container.height,
                }]
            } else {
                Vec::new()
            });
        }

        if !self.capture.is_capturing() {
            return Ok(Vec::new());
        }

        let mut effects = vec![Effect::SurfaceRemoved];
        if let Some(image) = self.capture.finish(self.config.signature_display)? {
            effects.push(Effect::SignaturePlaced {
                data_url: image.data_url(),
                position: image.position,
                display: image.display,
            });
            self.signature = Some(image);
        }
        Ok(effects)
    }

    fn export(&self, capture: &impl Capture) -> Vec<Effect> {
        if self.document.is_none() {
            tracing::error!("document container not found");
            return Vec::new();
        }

        match export_document(&self.scene(), capture, &self.config.export) {
            Ok(artifact) => vec![Effect::Download { artifact }],
            Err(e) => {
                tracing::error!(error = %e, "error capturing document");
                Vec::new()
            }
        }
    }

    /// Current visual state of the document container.
    pub fn scene(&self) -> DocumentScene<'_> {
        DocumentScene {
            container: self.container,
            pages: self.page_bitmaps.values().collect(),
            text_layer: &self.text_layer,
            presentation: &self.presentation,
            signature: self.signature.as_ref(),
            surface: self.capture.surface().map(|s| s.raster()),
        }
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    pub fn document(&self) -> Option<&DocumentInfo> {
        self.document.as_ref()
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn highlight_color(&self) -> Color {
        self.highlight_color
    }

    pub fn selected_text(&self) -> Option<&str> {
        self.selected_text.as_deref()
    }

    pub fn underline_target(&self) -> Option<&str> {
        self.underline_target.as_deref()
    }

    /// Text whose comment dialog is open.
    pub fn pending_comment(&self) -> Option<&str> {
        self.pending_comment.as_deref()
    }

    pub fn selected_comment(&self) -> Option<&str> {
        self.selected_comment.as_deref()
    }

    pub fn comments(&self) -> &[CommentRecord] {
        self.store.list()
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn text_layer(&self) -> &TextLayer {
        &self.text_layer
    }

    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    pub fn is_signing(&self) -> bool {
        self.signing
    }

    pub fn surface(&self) -> Option<&DrawingSurface> {
        self.capture.surface()
    }

    pub fn signature(&self) -> Option<&SignatureImage> {
        self.signature.as_ref()
    }
}

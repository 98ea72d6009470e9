//! Stateful annotation session exposed to JavaScript
//!
//! JavaScript forwards DOM events and renderer output here and applies the
//! returned effects (an array of `{type, ...}` objects) to the page.

use annotate_core::{
    Action, AnnotatorConfig, AnnotatorState, Effect, ExportArtifact, Fragment, FragmentId,
    PageLayer, Point, Raster, Size,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct AnnotatorSession {
    state: AnnotatorState,
    last_export: Option<ExportArtifact>,
}

impl AnnotatorSession {
    /// Internal constructor (testable without JsValue)
    fn new_internal(config_json: Option<&str>) -> Result<Self, String> {
        let config = match config_json {
            Some(json) if !json.trim().is_empty() => {
                AnnotatorConfig::from_json(json).map_err(|e| e.to_string())?
            }
            _ => AnnotatorConfig::default(),
        };

        Ok(Self {
            state: AnnotatorState::new(config),
            last_export: None,
        })
    }

    /// Dispatch an action, keeping any exported bytes for `takeExport`.
    fn dispatch_internal(&mut self, action: Action) -> Result<Vec<Effect>, String> {
        let effects = self.state.dispatch(action).map_err(|e| e.to_string())?;

        for effect in &effects {
            if let Effect::Download { artifact } = effect {
                self.last_export = Some(artifact.clone());
            }
        }

        Ok(effects)
    }

    #[allow(clippy::too_many_arguments)]
    fn render_page_internal(
        &mut self,
        page: u32,
        origin: Point,
        size: Size,
        fragments_json: &str,
        bitmap: Option<(u32, u32, Vec<u8>)>,
        tainted: bool,
    ) -> Result<Vec<Effect>, String> {
        let fragments: Vec<Fragment> = serde_json::from_str(fragments_json)
            .map_err(|e| format!("Invalid fragments JSON: {}", e))?;

        let bitmap = match bitmap {
            Some((width, height, rgba)) => {
                Some(Raster::from_rgba(width, height, rgba).map_err(|e| e.to_string())?)
            }
            None => None,
        };

        self.dispatch_internal(Action::RenderPage {
            page,
            layer: PageLayer {
                origin,
                size,
                fragments,
            },
            bitmap,
            tainted,
        })
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn effects_to_js(result: Result<Vec<Effect>, String>) -> Result<JsValue, JsValue> {
    let effects = result.map_err(|e| JsValue::from_str(&e))?;
    to_js(&effects)
}

#[wasm_bindgen]
impl AnnotatorSession {
    /// Create a session. `config_json` overrides individual defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<AnnotatorSession, JsValue> {
        Self::new_internal(config_json.as_deref()).map_err(|e| JsValue::from_str(&e))
    }

    /// Validate and load a dropped or picked file
    pub fn upload(&mut self, name: &str, mime: &str, bytes: &[u8]) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::Upload {
            name: name.to_string(),
            mime: mime.to_string(),
            bytes: bytes.to_vec(),
        }))
    }

    /// Index a rendered page.
    /// fragments_json: `[{"text": "...", "rect": {"x":0,"y":0,"width":10,"height":10}}, ...]`
    /// rgba: optional canvas pixels of `bitmap_width` x `bitmap_height`
    #[wasm_bindgen(js_name = renderPage)]
    #[allow(clippy::too_many_arguments)]
    pub fn render_page(
        &mut self,
        page: u32,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fragments_json: &str,
        rgba: Option<Vec<u8>>,
        bitmap_width: u32,
        bitmap_height: u32,
        tainted: bool,
    ) -> Result<JsValue, JsValue> {
        let bitmap = rgba.map(|pixels| (bitmap_width, bitmap_height, pixels));
        effects_to_js(self.render_page_internal(
            page,
            Point::new(x, y),
            Size::new(width, height),
            fragments_json,
            bitmap,
            tainted,
        ))
    }

    #[wasm_bindgen(js_name = resizeContainer)]
    pub fn resize_container(&mut self, width: f64, height: f64) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::ResizeContainer(Size::new(width, height))))
    }

    /// Record the selection after pointer-up over the document
    #[wasm_bindgen(js_name = selectText)]
    pub fn select_text(&mut self, text: &str) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::SelectText(text.to_string())))
    }

    /// Set the session highlight color (e.g., "#FF0000")
    #[wasm_bindgen(js_name = setColor)]
    pub fn set_color(&mut self, color: &str) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::SetColor(color.to_string())))
    }

    pub fn highlight(&mut self) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::Highlight))
    }

    pub fn underline(&mut self) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::Underline))
    }

    /// Close the comment dialog. Pass null/undefined when cancelled.
    #[wasm_bindgen(js_name = submitComment)]
    pub fn submit_comment(&mut self, comment: Option<String>) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::SubmitComment(comment)))
    }

    #[wasm_bindgen(js_name = clickFragment)]
    pub fn click_fragment(&mut self, page: u32, index: u32) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::ClickFragment(FragmentId::new(page, index))))
    }

    #[wasm_bindgen(js_name = toggleSigning)]
    pub fn toggle_signing(&mut self) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::ToggleSigning))
    }

    #[wasm_bindgen(js_name = strokeStart)]
    pub fn stroke_start(&mut self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::StrokeStart(Point::new(x, y))))
    }

    #[wasm_bindgen(js_name = strokeMove)]
    pub fn stroke_move(&mut self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::StrokeMove(Point::new(x, y))))
    }

    /// Pointer-up or pointer-leave on the drawing surface
    #[wasm_bindgen(js_name = strokeEnd)]
    pub fn stroke_end(&mut self) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::StrokeEnd))
    }

    /// Capture and package the document. On success the effects contain a
    /// `Download` entry and the bytes are available from `takeExport`.
    pub fn export(&mut self) -> Result<JsValue, JsValue> {
        effects_to_js(self.dispatch_internal(Action::Export))
    }

    /// Bytes of the most recent export, handed over once.
    #[wasm_bindgen(js_name = takeExport)]
    pub fn take_export(&mut self) -> Option<js_sys::Uint8Array> {
        self.last_export.take().map(|artifact| {
            let array = js_sys::Uint8Array::new_with_length(artifact.bytes.len() as u32);
            array.copy_from(&artifact.bytes);
            array
        })
    }

    /// Sidebar list: `[{text, comment}, ...]` in insertion order
    #[wasm_bindgen(js_name = getComments)]
    pub fn get_comments(&self) -> Result<JsValue, JsValue> {
        to_js(self.state.comments())
    }

    #[wasm_bindgen(getter, js_name = selectedComment)]
    pub fn selected_comment(&self) -> Option<String> {
        self.state.selected_comment().map(str::to_string)
    }

    #[wasm_bindgen(getter, js_name = pendingComment)]
    pub fn pending_comment(&self) -> Option<String> {
        self.state.pending_comment().map(str::to_string)
    }

    #[wasm_bindgen(getter, js_name = highlightColor)]
    pub fn highlight_color(&self) -> String {
        self.state.highlight_color().to_hex()
    }

    #[wasm_bindgen(getter, js_name = isSigning)]
    pub fn is_signing(&self) -> bool {
        self.state.is_signing()
    }

    /// Whether the Highlight button should be enabled
    #[wasm_bindgen(getter, js_name = canHighlight)]
    pub fn can_highlight(&self) -> bool {
        self.state.selected_text().is_some()
    }

    /// Whether the Underline button should be enabled
    #[wasm_bindgen(getter, js_name = canUnderline)]
    pub fn can_underline(&self) -> bool {
        self.state.underline_target().is_some()
    }

    #[wasm_bindgen(getter, js_name = hasDocument)]
    pub fn has_document(&self) -> bool {
        self.state.document().is_some()
    }

    #[wasm_bindgen(js_name = getSignatureDataUrl)]
    pub fn get_signature_data_url(&self) -> Option<String> {
        self.state.signature().map(|s| s.data_url())
    }
}

//! WASM bindings for the PDF annotator
//!
//! All session state lives in Rust (`AnnotatorSession`); JavaScript renders
//! pages with PDF.js, forwards DOM events, and applies the returned effects.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { AnnotatorSession, createDisplayUrl } from './pkg/annotate_wasm.js';
//!
//! await init();
//!
//! const session = new AnnotatorSession(null);
//! const effects = session.upload(file.name, file.type, bytes);
//! viewer.open(createDisplayUrl(bytes));
//!
//! // after PDF.js paints a page
//! session.renderPage(1, 0, 0, w, h, JSON.stringify(spans), imageData.data, iw, ih, false);
//!
//! session.selectText(window.getSelection().toString());
//! applyEffects(session.highlight());          // may open the comment dialog
//! applyEffects(session.submitComment(input)); // null when cancelled
//!
//! applyEffects(session.export());
//! downloadBlob(session.takeExport(), "annotated-document.pdf");
//! ```

pub mod logging;
pub mod session;

use annotate_core::upload::{validate_upload, PDF_MIME};
use wasm_bindgen::prelude::*;

pub use session::AnnotatorSession;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::init(tracing::Level::INFO);
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Check a file before loading it. Returns Ok(()) if it is a usable PDF.
#[wasm_bindgen(js_name = validateUpload)]
pub fn validate_upload_js(name: &str, mime: &str, bytes: &[u8]) -> Result<(), JsValue> {
    validate_upload(name, mime, bytes)
        .map(|_| ())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Create a `blob:` URL the viewer can open. The URL is not revoked.
#[wasm_bindgen(js_name = createDisplayUrl)]
pub fn create_display_url(bytes: &[u8]) -> Result<String, JsValue> {
    let array = js_sys::Uint8Array::from(bytes);
    let parts = js_sys::Array::of1(&array);

    let options = web_sys::BlobPropertyBag::new();
    options.set_type(PDF_MIME);

    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    web_sys::Url::create_object_url_with_blob(&blob)
}

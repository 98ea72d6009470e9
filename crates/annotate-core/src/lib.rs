//! PDF annotation session core
//!
//! This crate holds the platform-independent part of the annotator: the
//! renderer-supplied text index, highlight/underline presentation, comment
//! records, freehand signature capture and the rasterized PDF export.
//!
//! The host (see `apps/annotate-web/wasm`) forwards user input and renderer
//! output as [`Action`]s and applies the returned [`Effect`]s to the page.
//!
//! ```
//! use annotate_core::{Action, AnnotatorState};
//!
//! let mut state = AnnotatorState::default();
//! state.dispatch(Action::SelectText("Invoice".into())).unwrap();
//! // nothing rendered yet, so highlighting only clears the selection
//! let effects = state.dispatch(Action::Highlight).unwrap();
//! assert_eq!(effects.len(), 1);
//! ```

pub mod applicator;
pub mod color;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod raster;
pub mod signature;
pub mod state;
pub mod store;
pub mod text_layer;
pub mod upload;

pub use applicator::{FragmentStyle, Presentation, StyledFragment, Underline};
pub use color::Color;
pub use config::{AnnotatorConfig, ExportLayout};
pub use error::AnnotateError;
pub use export::{Capture, Compositor, DocumentScene, ExportArtifact, PageBitmap};
pub use geometry::{Point, Rect, Size};
pub use raster::{Raster, MAX_DIMENSION};
pub use signature::{SignatureCapture, SignatureImage};
pub use state::{Action, AnnotatorState, Effect};
pub use store::{AnnotationStore, CommentRecord, NO_COMMENT};
pub use text_layer::{Fragment, FragmentId, PageLayer, TextLayer};
pub use upload::{validate_upload, DocumentInfo};

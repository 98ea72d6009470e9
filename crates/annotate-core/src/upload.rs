//! Upload intake validation
//!
//! Accepts only `application/pdf` files whose bytes parse as a PDF with at
//! least one page, and extracts the document info shown after upload.

use crate::error::AnnotateError;
use lopdf::Document;
use serde::Serialize;

pub const PDF_MIME: &str = "application/pdf";

/// User-facing message for a rejected file.
pub const INVALID_UPLOAD_MESSAGE: &str = "Please upload a valid PDF file.";

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DocumentInfo {
    pub name: String,
    pub page_count: u32,
    /// PDF version from the header (e.g., "1.7")
    pub version: String,
    pub encrypted: bool,
    pub size_bytes: usize,
    pub title: Option<String>,
    pub author: Option<String>,
}

/// True for `application/pdf`, ignoring case and parameters.
pub fn is_pdf_mime(mime: &str) -> bool {
    mime.split(';')
        .next()
        .map(|m| m.trim().eq_ignore_ascii_case(PDF_MIME))
        .unwrap_or(false)
}

pub fn validate_upload(
    name: &str,
    mime: &str,
    bytes: &[u8],
) -> Result<DocumentInfo, AnnotateError> {
    if !is_pdf_mime(mime) {
        return Err(AnnotateError::InvalidUpload(format!(
            "unsupported file type '{}'",
            mime
        )));
    }

    let mut info = validate_pdf(bytes)?;
    info.name = name.to_string();
    Ok(info)
}

/// Validate PDF bytes and extract basic info.
pub fn validate_pdf(bytes: &[u8]) -> Result<DocumentInfo, AnnotateError> {
    if bytes.len() < 8 {
        return Err(AnnotateError::InvalidUpload(
            "File too small to be a valid PDF".to_string(),
        ));
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err(AnnotateError::InvalidUpload(
            "Not a valid PDF file (missing %PDF- header)".to_string(),
        ));
    }

    let document = Document::load_mem(bytes)
        .map_err(|e| AnnotateError::InvalidUpload(format!("Failed to parse PDF: {}", e)))?;

    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(AnnotateError::InvalidUpload("PDF has no pages".to_string()));
    }

    let (title, author) = extract_metadata(&document);

    Ok(DocumentInfo {
        name: String::new(),
        page_count,
        version: extract_version(bytes),
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title,
        author,
    })
}

fn extract_version(bytes: &[u8]) -> String {
    bytes
        .get(5..8)
        .and_then(|v| std::str::from_utf8(v).ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "1.4".to_string())
}

fn extract_metadata(document: &Document) -> (Option<String>, Option<String>) {
    let info = document
        .trailer
        .get(b"Info")
        .and_then(|o| o.as_reference())
        .and_then(|id| document.get_dictionary(id));

    let Ok(info) = info else {
        return (None, None);
    };

    let field = |key: &[u8]| {
        info.get(key)
            .and_then(|o| o.as_str())
            .ok()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .filter(|s| !s.is_empty())
    };

    (field(b"Title"), field(b"Author"))
}

//! PDF loader: page text via pdfium.
//!
//! Text is pulled from each page's text layer and the pages are concatenated;
//! page boundaries are not preserved. Scanned PDFs without a text layer come
//! out empty and are reported as unreadable by the caller.
//!
//! pdfium is not async-safe, so this runs on the blocking pool (see
//! [`super::load_file`]).

use super::ooxml::unreadable;
use crate::error::DynamoError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Bind pdfium from `lib_dir` when given, otherwise from the system library path.
fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Pdfium, DynamoError> {
    let bindings = match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| DynamoError::PdfEngineUnavailable(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Extract the text of every page in a PDF.
pub fn extract(source_id: &str, bytes: &[u8], lib_dir: Option<&Path>) -> Result<String, DynamoError> {
    if !bytes.starts_with(b"%PDF") {
        let magic: Vec<u8> = bytes.iter().take(4).copied().collect();
        return Err(unreadable(
            source_id,
            format!("not a PDF (first bytes: {magic:?})"),
        ));
    }

    let pdfium = bind_pdfium(lib_dir)?;

    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            unreadable(source_id, "PDF is encrypted and requires a password")
        } else {
            unreadable(source_id, format!("PDF is corrupt: {err_str}"))
        }
    })?;

    let pages = document.pages();
    debug!("{}: {} pages", source_id, pages.len());

    let mut out = String::new();
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| unreadable(source_id, format!("page {}: {:?}", idx + 1, e)))?;
        let page_text = text.all();
        let page_text = page_text.trim();
        if !page_text.is_empty() {
            out.push_str(page_text);
            out.push('\n');
        }
    }
    Ok(out)
}

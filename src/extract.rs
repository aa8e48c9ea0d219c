//! Content extraction for uploaded documents.
//!
//! Turns stored bytes into oracle input: plain UTF-8 text for PDF, DOCX,
//! and text-like files, or a base64 data payload for images (the oracle is
//! multimodal and reads those directly). Extraction never panics; corrupt
//! or unreadable input returns a typed error and the calling operation
//! fails cleanly.

use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::AppError;
use crate::models::FileType;

/// Cap on extracted text forwarded to the oracle, in characters.
const MAX_TEXT_CHARS: usize = 50_000;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Oracle-ready representation of one document's content.
#[derive(Debug, Clone)]
pub enum DocumentPayload {
    Text(String),
    Image { mime: String, base64: String },
}

/// Extracts an oracle payload from stored bytes.
///
/// The extension (taken from the stored filename) decides the handling for
/// `FileType::Other`, which covers both text-like (md, csv) and image
/// (gif, webp) uploads.
pub fn payload_for(
    bytes: &[u8],
    filename: &str,
    file_type: FileType,
) -> Result<DocumentPayload, AppError> {
    match file_type {
        FileType::Pdf => extract_pdf(bytes).map(DocumentPayload::Text),
        FileType::Docx | FileType::Doc => extract_docx(bytes).map(DocumentPayload::Text),
        FileType::Png | FileType::Jpg | FileType::Jpeg => Ok(image_payload(bytes, filename)),
        FileType::Txt => text_payload(bytes),
        FileType::Other => match extension_of(filename).as_deref() {
            Some("gif") | Some("webp") => Ok(image_payload(bytes, filename)),
            _ => text_payload(bytes),
        },
    }
}

pub fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

pub fn mime_for(filename: &str) -> &'static str {
    match extension_of(filename).as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("doc") => "application/msword",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

fn image_payload(bytes: &[u8], filename: &str) -> DocumentPayload {
    DocumentPayload::Image {
        mime: mime_for(filename).to_string(),
        base64: BASE64.encode(bytes),
    }
}

fn text_payload(bytes: &[u8]) -> Result<DocumentPayload, AppError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| AppError::Extract(format!("not valid UTF-8: {}", e)))?;
    Ok(DocumentPayload::Text(truncate_chars(text, MAX_TEXT_CHARS)))
}

/// Truncates at a char boundary so multi-byte text never splits mid-codepoint.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, AppError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| AppError::Extract(format!("PDF extraction failed: {}", e)))?;
    Ok(truncate_chars(&text, MAX_TEXT_CHARS))
}

fn extract_docx(bytes: &[u8]) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| AppError::Extract(format!("not a DOCX archive: {}", e)))?;
    let mut doc_xml = Vec::new();
    let mut found = false;
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| AppError::Extract(e.to_string()))?;
        if entry.name() == "word/document.xml" {
            entry
                .take(MAX_XML_ENTRY_BYTES)
                .read_to_end(&mut doc_xml)
                .map_err(|e| AppError::Extract(e.to_string()))?;
            if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
                return Err(AppError::Extract(
                    "word/document.xml exceeds size limit".to_string(),
                ));
            }
            found = true;
            break;
        }
    }
    if !found {
        return Err(AppError::Extract(
            "word/document.xml not found".to_string(),
        ));
    }
    let text = extract_w_t_elements(&doc_xml)?;
    Ok(truncate_chars(&text, MAX_TEXT_CHARS))
}

fn extract_w_t_elements(xml: &[u8]) -> Result<String, AppError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        if !out.is_empty() {
                            out.push(' ');
                        }
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(AppError::Extract(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

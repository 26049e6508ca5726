//! services/api/src/adapters/document_reader.rs
//!
//! This module contains the document reader adapter, the concrete implementation
//! of the `DocumentReader` port. It extracts plain text from `.txt`, `.pdf` and
//! `.docx` uploads.

use std::io::{Cursor, Read};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use translation_workflow_core::domain::SourceDocument;
use translation_workflow_core::ports::{DocumentReader, PortError, PortResult};

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// The upload formats the reader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    Docx,
}

/// Detect the format from the file name extension.
pub fn detect_format_from_filename(file_name: &str) -> Option<DocumentFormat> {
    let (_, ext) = file_name.rsplit_once('.')?;

    match ext.to_lowercase().as_str() {
        "txt" => Some(DocumentFormat::PlainText),
        "pdf" => Some(DocumentFormat::Pdf),
        "docx" => Some(DocumentFormat::Docx),
        _ => None,
    }
}

/// Detect the format from a MIME type.
pub fn detect_format_from_mime(mime: &str) -> Option<DocumentFormat> {
    let mime_lower = mime.to_lowercase();

    if mime_lower.starts_with("text/plain") {
        return Some(DocumentFormat::PlainText);
    }
    if mime_lower.starts_with("application/pdf") {
        return Some(DocumentFormat::Pdf);
    }
    if mime_lower.starts_with(DOCX_MIME) {
        return Some(DocumentFormat::Docx);
    }

    None
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A reader that implements the `DocumentReader` port for text, PDF and DOCX files.
#[derive(Clone, Default)]
pub struct FileDocumentReader;

impl FileDocumentReader {
    pub fn new() -> Self {
        Self
    }

    fn detect(document: &SourceDocument) -> PortResult<DocumentFormat> {
        detect_format_from_filename(&document.file_name)
            .or_else(|| {
                document
                    .content_type
                    .as_deref()
                    .and_then(detect_format_from_mime)
            })
            .ok_or_else(|| {
                PortError::UnsupportedFormat(format!(
                    "{} ({})",
                    document.file_name,
                    document.content_type.as_deref().unwrap_or("unknown type")
                ))
            })
    }

    fn read_pdf(bytes: &[u8]) -> PortResult<String> {
        // pdf-extract panics on some malformed inputs.
        let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
            .map_err(|_| PortError::Unexpected("the PDF could not be parsed".to_string()))?;
        extracted.map_err(|e| PortError::Unexpected(format!("Failed to read PDF: {}", e)))
    }

    fn read_docx(bytes: &[u8]) -> PortResult<String> {
        Ok(docx_paragraphs(bytes)?.join("\n"))
    }
}

//=========================================================================================
// `DocumentReader` Trait Implementation
//=========================================================================================

impl DocumentReader for FileDocumentReader {
    fn extract_text(&self, document: &SourceDocument) -> PortResult<String> {
        let format = Self::detect(document)?;
        if document.bytes.is_empty() {
            return Ok(String::new());
        }

        match format {
            DocumentFormat::PlainText => Ok(String::from_utf8_lossy(&document.bytes)
                .trim_start_matches('\u{feff}')
                .to_string()),
            DocumentFormat::Pdf => Self::read_pdf(&document.bytes),
            DocumentFormat::Docx => Self::read_docx(&document.bytes),
        }
    }
}

//=========================================================================================
// WordprocessingML parsing
//=========================================================================================

fn paragraph_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<w:p(?:\s[^>]*?)?/>|<w:p(?:\s[^>]*)?>(.*?)</w:p>")
            .expect("paragraph pattern is valid")
    })
}

fn run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab/>|<w:br(?:\s[^>]*)?/>|<w:cr/>")
            .expect("run pattern is valid")
    })
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);")
            .expect("entity pattern is valid")
    })
}

/// Returns the text of every paragraph in the main document part, in order.
pub fn docx_paragraphs(bytes: &[u8]) -> PortResult<Vec<String>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PortError::Unexpected(format!("Not a valid .docx archive: {}", e)))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| PortError::Unexpected(format!("Missing word/document.xml: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| PortError::Unexpected(format!("Failed to read word/document.xml: {}", e)))?;

    Ok(parse_document_xml(&xml))
}

fn parse_document_xml(xml: &str) -> Vec<String> {
    paragraph_regex()
        .captures_iter(xml)
        .map(|para| match para.get(1) {
            Some(body) => paragraph_text(body.as_str()),
            None => String::new(),
        })
        .collect()
}

fn paragraph_text(body: &str) -> String {
    let mut text = String::new();
    for run in run_regex().captures_iter(body) {
        match run.get(1) {
            Some(t) => text.push_str(&unescape_xml(t.as_str())),
            None if run[0].starts_with("<w:tab") => text.push('\t'),
            None => text.push('\n'),
        }
    }
    text
}

fn unescape_xml(text: &str) -> String {
    entity_regex()
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ if entity.starts_with("#x") => u32::from_str_radix(&entity[2..], 16)
                    .ok()
                    .and_then(char::from_u32),
                _ => entity[1..].parse::<u32>().ok().and_then(char::from_u32),
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::docx_writer::DocxWriter;
    use translation_workflow_core::ports::DocumentWriter;

    #[test]
    fn test_detect_format_from_filename() {
        assert_eq!(detect_format_from_filename("a.txt"), Some(DocumentFormat::PlainText));
        assert_eq!(detect_format_from_filename("A.PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(detect_format_from_filename("contract.v2.docx"), Some(DocumentFormat::Docx));
        assert_eq!(detect_format_from_filename("notes.rtf"), None);
        assert_eq!(detect_format_from_filename("noextension"), None);
    }

    #[test]
    fn test_detect_format_from_mime() {
        assert_eq!(
            detect_format_from_mime("text/plain; charset=utf-8"),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(detect_format_from_mime("application/pdf"), Some(DocumentFormat::Pdf));
        assert_eq!(detect_format_from_mime(DOCX_MIME), Some(DocumentFormat::Docx));
        assert_eq!(detect_format_from_mime("application/rtf"), None);
    }

    #[test]
    fn plain_text_is_returned_verbatim() {
        let doc = SourceDocument::new("a.txt", "\u{feff}Olá\n\nmundo".as_bytes().to_vec());
        assert_eq!(FileDocumentReader::new().extract_text(&doc).unwrap(), "Olá\n\nmundo");
    }

    #[test]
    fn mime_type_rescues_files_without_extension() {
        let doc = SourceDocument::new("upload", b"hello".to_vec()).with_content_type("text/plain");
        assert_eq!(FileDocumentReader::new().extract_text(&doc).unwrap(), "hello");
    }

    #[test]
    fn unknown_formats_are_rejected() {
        let doc = SourceDocument::new("letter.rtf", b"{\\rtf1}".to_vec());
        let err = FileDocumentReader::new().extract_text(&doc).unwrap_err();
        assert!(matches!(err, PortError::UnsupportedFormat(_)));
    }

    const ONE_PAGE_PDF: &[u8] = include_bytes!("../../tests/fixtures/one_page.pdf");
    const BLANK_SECOND_PAGE_PDF: &[u8] =
        include_bytes!("../../tests/fixtures/blank_second_page.pdf");

    #[test]
    fn pdf_text_layer_is_extracted() {
        let doc = SourceDocument::new("letter.pdf", ONE_PAGE_PDF.to_vec());
        let text = FileDocumentReader::new().extract_text(&doc).unwrap();
        assert!(!text.trim().is_empty());
        assert!(text.contains("Hello"));
        assert!(text.contains("PDF"));
    }

    #[test]
    fn pdf_page_without_text_adds_nothing() {
        let reader = FileDocumentReader::new();
        let one = reader
            .extract_text(&SourceDocument::new("one.pdf", ONE_PAGE_PDF.to_vec()))
            .unwrap();
        let two = reader
            .extract_text(&SourceDocument::new("two.pdf", BLANK_SECOND_PAGE_PDF.to_vec()))
            .unwrap();
        assert_eq!(two.trim(), one.trim());
    }

    #[test]
    fn malformed_pdf_is_an_error_not_a_panic() {
        let doc = SourceDocument::new("broken.pdf", b"this is not a pdf".to_vec());
        let err = FileDocumentReader::new().extract_text(&doc).unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }

    #[test]
    fn empty_upload_of_a_supported_format_yields_no_text() {
        let doc = SourceDocument::new("empty.pdf", Vec::new());
        assert_eq!(FileDocumentReader::new().extract_text(&doc).unwrap(), "");
    }

    #[test]
    fn document_xml_runs_tabs_breaks_and_entities() {
        let xml = r#"<w:document><w:body>
            <w:p w:rsidR="00A1"><w:pPr><w:jc w:val="left"/></w:pPr><w:r><w:t>Fish &amp; </w:t></w:r><w:r><w:t xml:space="preserve">chips</w:t></w:r></w:p>
            <w:p/>
            <w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>&#233;t&#xE9;</w:t></w:r></w:p>
            <w:sectPr/></w:body></w:document>"#;

        assert_eq!(
            parse_document_xml(xml),
            vec!["Fish & chips".to_string(), String::new(), "a\tb\nété".to_string()]
        );
    }

    #[test]
    fn written_documents_read_back_paragraph_by_paragraph() {
        let text = "Primeira linha\n\n<Segunda> & \"terceira\"\n";
        let bytes = DocxWriter::new().render_document(text).unwrap();

        let paragraphs = docx_paragraphs(&bytes).unwrap();
        assert_eq!(paragraphs, text.split('\n').collect::<Vec<_>>());

        let doc = SourceDocument::new("out.docx", bytes);
        assert_eq!(FileDocumentReader::new().extract_text(&doc).unwrap(), text);
    }
}

//! services/api/src/adapters/docx_writer.rs
//!
//! This module contains the adapter that renders the final translation into a
//! `.docx` package. It implements the `DocumentWriter` port from the `core` crate.

use std::io::{Cursor, Write};

use translation_workflow_core::ports::{DocumentWriter, PortError, PortResult};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::adapters::document_reader::DOCX_MIME;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const DOCUMENT_FOOTER: &str = "<w:sectPr/></w:body></w:document>";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Writes one paragraph per line of text. Blank lines become empty paragraphs.
#[derive(Clone, Default)]
pub struct DocxWriter;

impl DocxWriter {
    pub fn new() -> Self {
        Self
    }

    fn document_xml(text: &str) -> String {
        let mut xml = String::from(DOCUMENT_HEADER);
        for line in text.split('\n') {
            if line.is_empty() {
                xml.push_str("<w:p/>");
            } else {
                xml.push_str("<w:p><w:r><w:t xml:space=\"preserve\">");
                xml.push_str(&escape_xml(line));
                xml.push_str("</w:t></w:r></w:p>");
            }
        }
        xml.push_str(DOCUMENT_FOOTER);
        xml
    }
}

/// Escapes markup characters and drops control characters XML 1.0 cannot carry.
fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\t' => escaped.push('\t'),
            c if c.is_control() => {}
            c => escaped.push(c),
        }
    }
    escaped
}

//=========================================================================================
// `DocumentWriter` Trait Implementation
//=========================================================================================

impl DocumentWriter for DocxWriter {
    fn render_document(&self, text: &str) -> PortResult<Vec<u8>> {
        let to_port_error = |e: zip::result::ZipError| PortError::Unexpected(e.to_string());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
            ("_rels/.rels", RELS_XML.to_string()),
            ("word/document.xml", Self::document_xml(text)),
        ];
        for (name, content) in parts {
            zip.start_file(name, options).map_err(to_port_error)?;
            zip.write_all(content.as_bytes())
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }

        let cursor = zip.finish().map_err(to_port_error)?;
        Ok(cursor.into_inner())
    }

    fn file_extension(&self) -> &'static str {
        "docx"
    }

    fn content_type(&self) -> &'static str {
        DOCX_MIME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_become_empty_paragraphs() {
        let xml = DocxWriter::document_xml("one\n\ntwo");
        assert!(xml.contains(
            "<w:p><w:r><w:t xml:space=\"preserve\">one</w:t></w:r></w:p><w:p/><w:p><w:r><w:t xml:space=\"preserve\">two</w:t></w:r></w:p>"
        ));
    }

    #[test]
    fn markup_is_escaped_and_control_characters_dropped() {
        assert_eq!(escape_xml("a<b & c>\u{7}\td\r"), "a&lt;b &amp; c&gt;\td");
    }

    #[test]
    fn package_is_a_zip_with_the_document_part() {
        let bytes = DocxWriter::new().render_document("Olá").unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert_eq!(DocxWriter::new().file_extension(), "docx");
    }
}

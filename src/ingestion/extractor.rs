//! Text extraction for supported document formats
//!
//! Each format is handled by a [`TextExtractor`] behind a registry resolved
//! once at pipeline construction; the pipeline never sees concrete format
//! logic.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::Reader;
use pulldown_cmark::{Event as MarkdownEvent, Parser as MarkdownParser, TagEnd};

use crate::error::{Error, Result};
use crate::types::FileFormat;

/// Text extracted from an uploaded file
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Extracted plain text
    pub text: String,
    /// Page or sheet count, where the format reports one
    pub pages: Option<u32>,
}

impl ExtractedText {
    fn plain(text: String) -> Self {
        Self { text, pages: None }
    }
}

/// Extracts plain text from one file format
pub trait TextExtractor: Send + Sync {
    fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedText>;
}

/// Format-to-extractor table, resolved once per pipeline
pub struct ExtractorRegistry {
    extractors: HashMap<FileFormat, Box<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    /// Registry covering all supported formats
    pub fn with_defaults() -> Self {
        let mut extractors: HashMap<FileFormat, Box<dyn TextExtractor>> = HashMap::new();
        extractors.insert(FileFormat::Txt, Box::new(PlainTextExtractor));
        extractors.insert(FileFormat::Markdown, Box::new(MarkdownExtractor));
        extractors.insert(FileFormat::Csv, Box::new(CsvExtractor));
        extractors.insert(FileFormat::Json, Box::new(JsonExtractor));
        extractors.insert(FileFormat::Pdf, Box::new(PdfExtractor));
        extractors.insert(FileFormat::Docx, Box::new(DocxExtractor));
        extractors.insert(FileFormat::Xlsx, Box::new(XlsxExtractor));
        Self { extractors }
    }

    /// Resolve the extractor for a filename and run it
    pub fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let format = FileFormat::from_filename(filename);
        let extractor = self.extractors.get(&format).ok_or_else(|| {
            Error::extraction(
                filename,
                format!("unsupported file type '{}'", format.display_name()),
            )
        })?;
        extractor.extract(filename, data)
    }
}

/// Plain text files
struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, _filename: &str, data: &[u8]) -> Result<ExtractedText> {
        Ok(ExtractedText::plain(
            String::from_utf8_lossy(data).into_owned(),
        ))
    }
}

/// Markdown files, rendered down to plain text
struct MarkdownExtractor;

impl TextExtractor for MarkdownExtractor {
    fn extract(&self, _filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let raw = String::from_utf8_lossy(data);
        let mut text = String::new();

        for event in MarkdownParser::new(&raw) {
            match event {
                MarkdownEvent::Text(t) | MarkdownEvent::Code(t) => text.push_str(&t),
                MarkdownEvent::SoftBreak | MarkdownEvent::HardBreak => text.push('\n'),
                MarkdownEvent::End(
                    TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
                ) => text.push_str("\n\n"),
                _ => {}
            }
        }

        Ok(ExtractedText::plain(text))
    }
}

/// CSV files, one line per row with `|`-separated cells
struct CsvExtractor;

impl TextExtractor for CsvExtractor {
    fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let mut reader = csv::Reader::from_reader(data);
        let mut text = String::new();

        if let Ok(headers) = reader.headers() {
            text.push_str(&headers.iter().collect::<Vec<_>>().join(" | "));
            text.push('\n');
        }

        for record in reader.records() {
            let record = record.map_err(|e| Error::extraction(filename, e.to_string()))?;
            text.push_str(&record.iter().collect::<Vec<_>>().join(" | "));
            text.push('\n');
        }

        Ok(ExtractedText::plain(text))
    }
}

/// JSON files, normalized to pretty-printed text
struct JsonExtractor;

impl TextExtractor for JsonExtractor {
    fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let value: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| Error::extraction(filename, format!("invalid JSON: {e}")))?;
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| Error::extraction(filename, e.to_string()))?;
        Ok(ExtractedText::plain(text))
    }
}

/// PDF documents
struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::extraction(filename, e.to_string()))?;
        Ok(ExtractedText::plain(text))
    }
}

/// Word documents (.docx)
struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::extraction(filename, e.to_string()))?;

        let mut text = String::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
                for child in paragraph.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                text.push('\n');
            }
        }

        Ok(ExtractedText::plain(text))
    }
}

/// Excel spreadsheets (.xlsx), one line per row with `|`-separated cells
struct XlsxExtractor;

impl TextExtractor for XlsxExtractor {
    fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let cursor = Cursor::new(data);
        let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
            .map_err(|e| Error::extraction(filename, e.to_string()))?;

        let mut text = String::new();
        let mut sheets = 0u32;

        for sheet_name in workbook.sheet_names().to_vec() {
            let Ok(range) = workbook.worksheet_range(&sheet_name) else {
                continue;
            };
            sheets += 1;
            text.push_str(&format!("Sheet: {sheet_name}\n"));

            for row in range.rows() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|cell| match cell {
                        calamine::Data::Empty => String::new(),
                        calamine::Data::String(s) => s.clone(),
                        calamine::Data::Float(f) => f.to_string(),
                        calamine::Data::Int(i) => i.to_string(),
                        calamine::Data::Bool(b) => b.to_string(),
                        calamine::Data::DateTime(dt) => dt.to_string(),
                        _ => String::new(),
                    })
                    .collect();

                if !cells.iter().all(|cell| cell.is_empty()) {
                    text.push_str(&cells.join(" | "));
                    text.push('\n');
                }
            }
            text.push('\n');
        }

        Ok(ExtractedText {
            text,
            pages: Some(sheets),
        })
    }
}

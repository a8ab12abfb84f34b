//! Document types

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported file formats
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Excel spreadsheet (.xlsx)
    Xlsx,
    /// CSV file
    Csv,
    /// JSON file
    Json,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Unknown file format
    Unknown,
}

impl FileFormat {
    /// Detect format from a file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "xlsx" => Self::Xlsx,
            "csv" => Self::Csv,
            "json" => Self::Json,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect format from a filename
    pub fn from_filename(filename: &str) -> Self {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this format has an extractor
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Xlsx => "Excel Spreadsheet (.xlsx)",
            Self::Csv => "CSV",
            Self::Json => "JSON",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Unknown => "Unknown",
        }
    }
}

/// A document that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Source filename as uploaded
    pub filename: String,
    /// File format
    pub format: FileFormat,
    /// SHA-256 of the uploaded bytes
    pub content_hash: String,
    /// Page or sheet count, where the extractor reports one
    pub total_pages: Option<u32>,
    /// Number of chunks created from this document
    pub total_chunks: u32,
    /// Upload size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record
    pub fn new(
        filename: impl Into<String>,
        format: FileFormat,
        content_hash: String,
        file_size: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            format,
            content_hash,
            total_pages: None,
            total_chunks: 0,
            file_size,
            ingested_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(FileFormat::from_extension("PDF"), FileFormat::Pdf);
        assert_eq!(FileFormat::from_extension("md"), FileFormat::Markdown);
        assert_eq!(FileFormat::from_extension("text"), FileFormat::Txt);
        assert_eq!(FileFormat::from_extension("exe"), FileFormat::Unknown);
    }

    #[test]
    fn detects_format_from_filename() {
        assert_eq!(FileFormat::from_filename("report.docx"), FileFormat::Docx);
        assert_eq!(FileFormat::from_filename("data.2024.csv"), FileFormat::Csv);
        assert_eq!(FileFormat::from_filename("no_extension"), FileFormat::Unknown);
        assert!(!FileFormat::from_filename("archive.zip").is_supported());
    }
}

//! Plain-text extraction from resume files

use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("pdftotext failed for {path}: {message}")]
    Pdf { path: String, message: String },

    #[error("No text extracted from {0}")]
    Empty(String),
}

/// Turns a file on disk into raw text
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractError>;
}

/// `.pdf` through the poppler `pdftotext` binary, `.txt` and `.md` as UTF-8
pub struct FileExtractor {
    pdftotext_bin: String,
}

impl FileExtractor {
    pub fn new(pdftotext_bin: impl Into<String>) -> Self {
        Self {
            pdftotext_bin: pdftotext_bin.into(),
        }
    }

    fn pdf_to_text(&self, path: &Path) -> Result<String, ExtractError> {
        let output = Command::new(&self.pdftotext_bin)
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| ExtractError::Pdf {
                path: path.display().to_string(),
                message: format!("could not run {} ({}); is poppler installed?", self.pdftotext_bin, e),
            })?;

        if !output.status.success() {
            return Err(ExtractError::Pdf {
                path: path.display().to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TextExtractor for FileExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let text = match extension.as_str() {
            "pdf" => self.pdf_to_text(path)?,
            "txt" | "md" => std::fs::read_to_string(path).map_err(|e| ExtractError::Read {
                path: path.display().to_string(),
                source: e,
            })?,
            other => {
                return Err(ExtractError::Unsupported(if other.is_empty() {
                    path.display().to_string()
                } else {
                    format!(".{}", other)
                }))
            }
        };

        if text.trim().is_empty() {
            return Err(ExtractError::Empty(path.display().to_string()));
        }

        debug!("Extracted {} characters from {}", text.len(), path.display());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plain_text() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resume.txt");
        std::fs::write(&path, "Jane Doe\nRust engineer").unwrap();

        let text = FileExtractor::new("pdftotext").extract_text(&path).unwrap();
        assert_eq!(text, "Jane Doe\nRust engineer");
    }

    #[test]
    fn test_docx_unsupported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resume.docx");
        std::fs::write(&path, b"PK").unwrap();

        let result = FileExtractor::new("pdftotext").extract_text(&path);
        assert!(matches!(result, Err(ExtractError::Unsupported(_))));
    }

    #[test]
    fn test_blank_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blank.md");
        std::fs::write(&path, " \n\t").unwrap();

        let result = FileExtractor::new("pdftotext").extract_text(&path);
        assert!(matches!(result, Err(ExtractError::Empty(_))));
    }

    #[test]
    fn test_missing_pdftotext_binary() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resume.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let result = FileExtractor::new("/nonexistent/pdftotext").extract_text(&path);
        assert!(matches!(result, Err(ExtractError::Pdf { .. })));
    }
}

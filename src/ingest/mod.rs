//! Resume ingestion from CSV exports and document folders
//!
//! Every candidate is identified by the content hash of its text, so
//! re-ingesting the same resume is a no-op. New candidates are embedded and
//! appended to the vector index first, then recorded in the candidate store.

mod extract;

pub use extract::{ExtractError, FileExtractor, TextExtractor};

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{error, info, warn};

use crate::embedding::VectorIndex;
use crate::error::{Result, SiftError};
use crate::storage::{content_hash, Candidate, Database};

/// Outcome counts of one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub indexed: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl IngestReport {
    pub fn merge(&mut self, other: IngestReport) {
        self.indexed += other.indexed;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
    }
}

enum Ingested {
    New,
    Duplicate,
    Skipped,
}

/// Collapse every whitespace run to one space and trim
pub fn clean_text(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    re.replace_all(text, " ").trim().to_string()
}

/// Labelled row text: `"<col>: <value>; <col>: <value>"`
pub fn row_text(columns: &[String], values: &[String]) -> String {
    columns
        .iter()
        .zip(values.iter())
        .map(|(column, value)| format!("{}: {}", column, value))
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct Ingestor<'a> {
    database: &'a Database,
    vectors: &'a mut VectorIndex,
    extractor: &'a dyn TextExtractor,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        database: &'a Database,
        vectors: &'a mut VectorIndex,
        extractor: &'a dyn TextExtractor,
    ) -> Self {
        Self {
            database,
            vectors,
            extractor,
        }
    }

    /// Index one candidate per CSV row, built from `columns`.
    ///
    /// Columns absent from the header, and empty cells, contribute an empty
    /// value. A row that cannot be parsed is counted as failed.
    pub fn index_csv(
        &mut self,
        csv_path: &Path,
        columns: &[String],
        name_column: Option<&str>,
    ) -> Result<IngestReport> {
        info!("Indexing CSV resumes from {}", csv_path.display());

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(csv_path)
            .map_err(|e| SiftError::Csv {
                source: e,
                context: format!("Failed to open {}", csv_path.display()),
            })?;

        let headers = reader
            .headers()
            .map_err(|e| SiftError::Csv {
                source: e,
                context: format!("Failed to read header of {}", csv_path.display()),
            })?
            .clone();

        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let column_positions: Vec<Option<usize>> =
            columns.iter().map(|c| position(c.as_str())).collect();
        for (column, found) in columns.iter().zip(&column_positions) {
            if found.is_none() {
                warn!("CSV column '{}' not found; using empty values", column);
            }
        }
        let name_position = name_column.and_then(position);

        let mut report = IngestReport::default();
        for (row_number, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    error!("Failed to parse CSV row {}: {}", row_number + 1, e);
                    report.failed += 1;
                    continue;
                }
            };

            let cell = |p: Option<usize>| {
                p.and_then(|p| record.get(p))
                    .unwrap_or_default()
                    .to_string()
            };
            let values: Vec<String> = column_positions.iter().map(|p| cell(*p)).collect();
            let text = row_text(columns, &values);
            let name = name_position.map(|p| cell(Some(p))).unwrap_or_default();

            match self.ingest_one(name, text, "CSV")? {
                Ingested::New => report.indexed += 1,
                Ingested::Duplicate => report.duplicates += 1,
                Ingested::Skipped => report.failed += 1,
            }
        }

        info!(
            "Finished CSV indexing: {} new, {} existing, {} failed",
            report.indexed, report.duplicates, report.failed
        );
        Ok(report)
    }

    /// Index every file in `dir` (non-recursive) whose extension is listed
    pub fn index_documents(&mut self, dir: &Path, extensions: &[String]) -> Result<IngestReport> {
        info!("Indexing document resumes from {}", dir.display());

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| SiftError::Io {
                source: e,
                context: format!("Failed to list documents directory: {}", dir.display()),
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_extension(path, extensions))
            .collect();
        files.sort();

        let mut report = IngestReport::default();
        for path in files {
            let text = match self.extractor.extract_text(&path) {
                Ok(raw) => clean_text(&raw),
                Err(e) => {
                    error!("Failed to process {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };
            if text.is_empty() {
                error!("No text in {}, skipping", path.display());
                report.failed += 1;
                continue;
            }

            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            match self.ingest_one(name, text, "document")? {
                Ingested::New => report.indexed += 1,
                Ingested::Duplicate => report.duplicates += 1,
                Ingested::Skipped => report.failed += 1,
            }
        }

        info!(
            "Finished document indexing: {} new, {} existing, {} failed",
            report.indexed, report.duplicates, report.failed
        );
        Ok(report)
    }

    /// Add one candidate unless its content hash is already stored.
    ///
    /// An embedding failure skips the candidate; a storage failure aborts.
    fn ingest_one(&mut self, name: String, text: String, source: &str) -> Result<Ingested> {
        let id = content_hash(&text);

        if self.database.candidate_exists(&id)? {
            info!("{} candidate already exists: {}", source, id);
            return Ok(Ingested::Duplicate);
        }

        match self.vectors.add(&id, &text) {
            Ok(()) => {}
            Err(SiftError::Embedding(e)) => {
                error!("Failed to embed {} candidate {}: {}", source, id, e);
                return Ok(Ingested::Skipped);
            }
            Err(e) => return Err(e),
        }

        self.database.insert_candidate(&Candidate::new(id.clone(), name.trim(), text))?;
        info!("Indexed {} candidate: {}", source, id);
        Ok(Ingested::New)
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Jane\n\nDoe \t Rust  "), "Jane Doe Rust");
        assert_eq!(clean_text("\n\t "), "");
    }

    #[test]
    fn test_row_text_format() {
        let columns = vec!["skills".to_string(), "positions".to_string()];
        let values = vec!["Rust, SQL".to_string(), String::new()];
        assert_eq!(row_text(&columns, &values), "skills: Rust, SQL; positions: ");
    }

    #[test]
    fn test_has_extension_ignores_case() {
        let extensions = vec!["pdf".to_string()];
        assert!(has_extension(Path::new("cv/Jane.PDF"), &extensions));
        assert!(!has_extension(Path::new("cv/notes.txt"), &extensions));
        assert!(!has_extension(Path::new("cv/README"), &extensions));
    }

    #[test]
    fn test_report_merge() {
        let mut total = IngestReport {
            indexed: 2,
            duplicates: 1,
            failed: 0,
        };
        total.merge(IngestReport {
            indexed: 1,
            duplicates: 0,
            failed: 3,
        });
        assert_eq!(
            total,
            IngestReport {
                indexed: 3,
                duplicates: 1,
                failed: 3
            }
        );
    }
}

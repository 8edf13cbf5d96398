//! # Corpus Loading Module
//!
//! ## Purpose
//! Loads the PDF corpus from a configured directory, extracts per-page text,
//! and splits pages into chunks ready for identity assignment and indexing.
//!
//! ## Input/Output Specification
//! - **Input**: Directory of PDF files
//! - **Output**: `Document` values with cleaned per-page text, plus a per-file
//!   outcome report for files that could not be loaded
//! - **Errors**: Missing files, unsupported extensions and image-only PDFs
//!   surface as per-file outcomes at this boundary, never as panics
//!
//! ## Key Features
//! - Per-page text extraction with cleanup of common PDF artifacts
//! - Explicit outcome for every file encountered, loaded or skipped
//! - Deterministic document order (sorted by file name)

pub mod splitter;

use crate::errors::{RagError, Result};
use crate::{Document, Page};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Outcome of attempting to load a single corpus file
#[derive(Debug)]
pub enum FileOutcome {
    /// File was loaded; number of pages with extractable text
    Loaded { path: PathBuf, pages: usize },
    /// File was skipped with a specific input error
    Skipped { path: PathBuf, error: RagError },
}

/// Result of a corpus load pass
#[derive(Debug, Default)]
pub struct CorpusReport {
    pub documents: Vec<Document>,
    pub outcomes: Vec<FileOutcome>,
}

impl CorpusReport {
    pub fn loaded_count(&self) -> usize {
        self.documents.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Skipped { .. }))
            .count()
    }
}

/// Loads PDF documents from a directory
pub struct CorpusLoader {
    pdf_dir: PathBuf,
}

impl CorpusLoader {
    pub fn new<P: AsRef<Path>>(pdf_dir: P) -> Self {
        Self {
            pdf_dir: pdf_dir.as_ref().to_path_buf(),
        }
    }

    /// Load every PDF in the corpus directory.
    ///
    /// Files that fail to load are recorded as skipped outcomes; the pass
    /// continues with the remaining files. A missing corpus directory is a
    /// hard error since it means the service is misconfigured.
    pub fn load_all(&self) -> Result<CorpusReport> {
        if !self.pdf_dir.is_dir() {
            return Err(RagError::SourceNotFound {
                path: self.pdf_dir.display().to_string(),
            });
        }

        let mut entries: Vec<PathBuf> = std::fs::read_dir(&self.pdf_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        let mut report = CorpusReport::default();
        for path in entries {
            match self.load_file(&path) {
                Ok(document) => {
                    let words: usize = document
                        .pages
                        .iter()
                        .map(|p| crate::utils::word_count(&p.text))
                        .sum();
                    debug!(
                        source = %document.source,
                        pages = document.pages.len(),
                        words,
                        "Loaded corpus document"
                    );
                    report.outcomes.push(FileOutcome::Loaded {
                        path: path.clone(),
                        pages: document.pages.len(),
                    });
                    report.documents.push(document);
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "Skipping corpus file");
                    report.outcomes.push(FileOutcome::Skipped { path, error });
                }
            }
        }

        info!(
            loaded = report.loaded_count(),
            skipped = report.skipped_count(),
            "Corpus load complete"
        );
        Ok(report)
    }

    /// Load a single PDF file into a `Document`
    pub fn load_file(&self, path: &Path) -> Result<Document> {
        if !path.exists() {
            return Err(RagError::SourceNotFound {
                path: path.display().to_string(),
            });
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if extension != "pdf" {
            return Err(RagError::UnsupportedFileType {
                path: path.display().to_string(),
                extension,
            });
        }

        let bytes = std::fs::read(path)?;
        let raw_pages =
            pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
                RagError::ExtractionFailed {
                    path: path.display().to_string(),
                    details: e.to_string(),
                }
            })?;

        let pages: Vec<Page> = raw_pages
            .iter()
            .enumerate()
            .map(|(index, raw)| Page {
                index,
                text: clean_text(raw),
            })
            .filter(|page| !page.text.is_empty())
            .collect();

        if pages.is_empty() {
            return Err(RagError::NoExtractableText {
                path: path.display().to_string(),
                details: "document may be image-only".to_string(),
            });
        }

        let source = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.pdf")
            .to_string();

        Ok(Document { source, pages })
    }
}

/// Clean up common PDF extraction artifacts: trim each line, collapse runs of
/// spaces within a line, collapse runs of blank lines to a single paragraph
/// break.
pub fn clean_text(text: &str) -> String {
    static INNER_SPACE: OnceLock<Regex> = OnceLock::new();
    let inner_space = INNER_SPACE.get_or_init(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));

    text.lines()
        .map(|l| inner_space.replace_all(l.trim(), " ").into_owned())
        .fold(Vec::new(), |mut acc: Vec<String>, line| {
            if line.is_empty() {
                if acc.last().map(|l| !l.is_empty()).unwrap_or(false) {
                    acc.push(String::new());
                }
            } else {
                acc.push(line);
            }
            acc
        })
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_blank_runs() {
        let dirty = "  Section 12  \n\n\n  The tenant may  \n  \n  terminate.  ";
        assert_eq!(clean_text(dirty), "Section 12\n\nThe tenant may\n\nterminate.");
    }

    #[test]
    fn clean_text_collapses_runs_of_spaces() {
        assert_eq!(clean_text("The  lessor \t shall"), "The lessor shall");
    }

    #[test]
    fn missing_directory_is_an_input_error() {
        let loader = CorpusLoader::new("/nonexistent/corpus/dir");
        let err = loader.load_all().unwrap_err();
        assert_eq!(err.category(), "input");
    }

    #[test]
    fn non_pdf_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();

        let loader = CorpusLoader::new(dir.path());
        let err = loader.load_file(&path).unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFileType { .. }));
    }

    #[test]
    fn bad_files_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"not a real pdf").unwrap();

        let loader = CorpusLoader::new(dir.path());
        let report = loader.load_all().unwrap();
        assert_eq!(report.loaded_count(), 0);
        assert_eq!(report.skipped_count(), 1);
    }
}

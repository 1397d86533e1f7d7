//! Prompt templates, embedded at build time and overridable from disk

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    ExpandQuery,
    RerankResults,
    GenerateSummary,
}

impl PromptKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::ExpandQuery => "expand_query",
            Self::RerankResults => "rerank_results",
            Self::GenerateSummary => "generate_summary",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            Self::ExpandQuery => include_str!("../../prompts/expand_query.txt"),
            Self::RerankResults => include_str!("../../prompts/rerank_results.txt"),
            Self::GenerateSummary => include_str!("../../prompts/generate_summary.txt"),
        }
    }
}

/// Resolves `<overrides_dir>/<name>.txt` first, then the built-in template
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    overrides_dir: Option<PathBuf>,
}

impl PromptLibrary {
    pub fn new(overrides_dir: Option<PathBuf>) -> Self {
        Self { overrides_dir }
    }

    pub fn get(&self, kind: PromptKind) -> String {
        if let Some(dir) = &self.overrides_dir {
            if let Some(text) = read_override(dir, kind) {
                return text;
            }
        }
        kind.builtin().to_string()
    }
}

fn read_override(dir: &Path, kind: PromptKind) -> Option<String> {
    let path = dir.join(format!("{}.txt", kind.name()));
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            debug!("Using prompt override {}", path.display());
            Some(text)
        }
        Err(e) => {
            warn!("Failed to read prompt override {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_templates() {
        let library = PromptLibrary::default();
        let rerank = library.get(PromptKind::RerankResults);
        assert!(rerank.contains("{query}"));
        assert!(rerank.contains("{resume_ids}"));
        assert!(library.get(PromptKind::ExpandQuery).contains("total_resume"));
    }

    #[test]
    fn test_override_from_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("generate_summary.txt"), "Summarize briefly.").unwrap();

        let library = PromptLibrary::new(Some(temp.path().to_path_buf()));
        assert_eq!(library.get(PromptKind::GenerateSummary), "Summarize briefly.");
        // No override for this one
        assert!(library.get(PromptKind::ExpandQuery).contains("expanded_query"));
    }
}

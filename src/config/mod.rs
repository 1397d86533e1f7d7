//! Configuration management for Talentsift
//!
//! Loads the TOML configuration file, applies `TALENTSIFT_*` environment
//! overrides and validates the result before anything touches the data dir.

use crate::error::{Result, SiftError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    pub summary: SummaryConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

/// Resume sources picked up by `talentsift ingest`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub csv_path: PathBuf,
    pub documents_dir: PathBuf,
    /// CSV columns concatenated (as `column: value`) into the resume text
    pub csv_columns: Vec<String>,
    /// Optional CSV column holding the candidate's display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_column: Option<String>,
    /// Lower-case file extensions ingested from `documents_dir`
    pub document_extensions: Vec<String>,
    pub pdftotext_bin: String,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// FastEmbed model name, or "hash" for the offline hashing embedder
    pub model: String,
    pub dimension: usize,
}

/// Hybrid retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Fraction of the corpus each lexical filter keeps
    pub top_percentage: f64,
    /// Number of nearest neighbours pulled from the vector index
    pub top_n_vector: usize,
    /// Result count used when query expansion does not supply one
    pub default_result_limit: usize,
    /// "llm", "cross-encoder" or "none"
    pub reranker: String,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub max_completion_tokens: u32,
    pub timeout_secs: u64,
    /// Directory with `<prompt>.txt` overrides for the built-in prompts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,
}

/// Per-candidate summary generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub enabled: bool,
    pub max_workers: usize,
    pub placeholder: String,
}

/// Report output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// "json" or "csv"
    pub format: String,
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, logs go to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SiftError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SiftError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| SiftError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: TALENTSIFT_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("TALENTSIFT_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    pub(crate) fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => {
                self.storage.data_dir = PathBuf::from(value);
            }
            "LLM__ENABLED" => {
                self.llm.enabled = parse_value(path, value)?;
            }
            "LLM__MODEL" => {
                self.llm.model = value.to_string();
            }
            "LLM__BASE_URL" => {
                self.llm.base_url = value.to_string();
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "RETRIEVAL__TOP_PERCENTAGE" => {
                self.retrieval.top_percentage = parse_value(path, value)?;
            }
            "RETRIEVAL__TOP_N_VECTOR" => {
                self.retrieval.top_n_vector = parse_value(path, value)?;
            }
            "RETRIEVAL__RERANKER" => {
                self.retrieval.reranker = value.to_string();
            }
            "SUMMARY__MAX_WORKERS" => {
                self.summary.max_workers = parse_value(path, value)?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SiftError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("talentsift").join("config.toml"))
    }

    /// Data directory with `~/` expanded
    pub fn data_dir(&self) -> Result<PathBuf> {
        expand_path(&self.storage.data_dir)
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| SiftError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

/// Expand a leading `~/` to the user's home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| SiftError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| SiftError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("~/.talentsift");

        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: data_dir.clone(),
            },
            ingest: IngestConfig {
                csv_path: PathBuf::from("resumes/resume_data.csv"),
                documents_dir: PathBuf::from("resumes/"),
                csv_columns: [
                    "skills",
                    "start_dates",
                    "end_dates",
                    "professional_company_names",
                    "educational_institution_name",
                    "degree_names",
                    "passing_years",
                    "positions",
                    "responsibilities",
                ]
                .iter()
                .map(|c| c.to_string())
                .collect(),
                name_column: None,
                document_extensions: vec!["pdf".to_string()],
                pdftotext_bin: "pdftotext".to_string(),
            },
            embedding: EmbeddingConfig {
                model: "all-MiniLM-L6-v2".to_string(),
                dimension: 384,
            },
            retrieval: RetrievalConfig {
                top_percentage: 0.1,
                top_n_vector: 10,
                default_result_limit: 5,
                reranker: "llm".to_string(),
            },
            llm: LlmConfig {
                enabled: false,
                base_url: "https://api.openai.com/v1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                model: "gpt-4o".to_string(),
                temperature: 0.0,
                max_completion_tokens: 2048,
                timeout_secs: 60,
                prompts_dir: None,
            },
            summary: SummaryConfig {
                enabled: true,
                max_workers: 5,
                placeholder: "No summary available.".to_string(),
            },
            output: OutputConfig {
                dir: PathBuf::from("output"),
                format: "csv".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some(data_dir.join("logs").join("query_log.txt")),
            },
        }
    }
}

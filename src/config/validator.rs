use crate::config::Config;
use crate::error::{Result, SiftError, ValidationError};

const RERANKERS: [&str; 3] = ["llm", "cross-encoder", "none"];
const OUTPUT_FORMATS: [&str; 2] = ["json", "csv"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every violation
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_ingest(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_summary(config, &mut errors);
        Self::validate_output(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SiftError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_ingest(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.ingest.csv_columns.is_empty() {
            errors.push(ValidationError::new(
                "ingest.csv_columns",
                "At least one CSV column is required",
            ));
        }

        if config.ingest.pdftotext_bin.is_empty() {
            errors.push(ValidationError::new(
                "ingest.pdftotext_bin",
                "pdftotext binary cannot be empty",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Vector dimension must be greater than 0",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let pct = config.retrieval.top_percentage;
        if !(pct > 0.0 && pct <= 1.0) {
            errors.push(ValidationError::new(
                "retrieval.top_percentage",
                format!("Top percentage must be in (0.0, 1.0], got {}", pct),
            ));
        }

        if config.retrieval.top_n_vector == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_n_vector",
                "Vector search size must be greater than 0",
            ));
        }

        if config.retrieval.default_result_limit == 0 {
            errors.push(ValidationError::new(
                "retrieval.default_result_limit",
                "Result limit must be greater than 0",
            ));
        }

        let reranker = &config.retrieval.reranker;
        if !RERANKERS.contains(&reranker.as_str()) {
            errors.push(ValidationError::new(
                "retrieval.reranker",
                format!("Reranker must be one of {:?}, got '{}'", RERANKERS, reranker),
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        // If LLM is enabled, validate API key environment variable is set
        if config.llm.enabled {
            let env_var = &config.llm.api_key_env;
            match std::env::var(env_var) {
                Ok(key) if key.is_empty() => {
                    errors.push(ValidationError::new(
                        "llm.api_key_env",
                        format!("Environment variable {} is empty", env_var),
                    ));
                }
                Ok(_) => {}
                Err(_) => {
                    errors.push(ValidationError::new(
                        "llm.api_key_env",
                        format!("Environment variable {} is not set", env_var),
                    ));
                }
            }
        }

        let temp = config.llm.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        if config.llm.base_url.is_empty() {
            errors.push(ValidationError::new(
                "llm.base_url",
                "Base URL cannot be empty",
            ));
        }
    }

    fn validate_summary(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.summary.max_workers == 0 {
            errors.push(ValidationError::new(
                "summary.max_workers",
                "Worker count must be greater than 0",
            ));
        }
    }

    fn validate_output(config: &Config, errors: &mut Vec<ValidationError>) {
        let format = &config.output.format;
        if !OUTPUT_FORMATS.contains(&format.as_str()) {
            errors.push(ValidationError::new(
                "output.format",
                format!(
                    "Format must be one of {:?}, got '{}'",
                    OUTPUT_FORMATS, format
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_top_percentage() {
        let mut config = Config::default();
        config.retrieval.top_percentage = 0.0;
        assert!(ConfigValidator::validate(&config).is_err());

        config.retrieval.top_percentage = 1.5;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_unknown_reranker() {
        let mut config = Config::default();
        config.retrieval.reranker = "magic".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = Config::default();
        config.summary.max_workers = 0;
        config.output.format = "xlsx".to_string();
        config.embedding.dimension = 0;

        match ConfigValidator::validate(&config) {
            Err(SiftError::ConfigValidation { errors }) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }
}

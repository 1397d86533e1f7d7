use std::io::{BufRead, Write};
use std::path::PathBuf;

use talentsift::cli::{Cli, Commands, ConfigAction};
use talentsift::config::{expand_path, Config, ConfigValidator};
use talentsift::embedding::{create_provider, VectorIndex};
use talentsift::error::{Result, SiftError};
use talentsift::ingest::{FileExtractor, IngestReport, Ingestor};
use talentsift::lexical::LexicalIndexStore;
use talentsift::pipeline::{QueryOptions, QueryPipeline};
use talentsift::report::{QueryReport, ReportFormat, ReportWriter};
use talentsift::storage::StorageManager;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    let (config, config_found) = load_config(cli.config.clone())?;

    // Initialize logging
    init_logging(&config, cli.verbose)?;
    if !config_found {
        tracing::warn!(
            "Config file not found, using defaults. Run 'talentsift config init' to create one."
        );
    }

    // Handle commands
    match cli.command {
        Commands::Ingest {
            csv,
            documents,
            skip_csv,
            skip_documents,
        } => {
            cmd_ingest(&config, csv, documents, skip_csv, skip_documents)?;
        }
        Commands::Query {
            query,
            limit,
            top_n_vector,
            top_percentage,
            no_summary,
            format,
            print,
        } => {
            let options = QueryOptions {
                limit,
                top_n_vector,
                top_percentage,
                summarize: !no_summary,
            };
            cmd_query(&config, query, options, format, print)?;
        }
        Commands::Status => {
            cmd_status(&config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, &config, action)?;
        }
    }

    Ok(())
}

fn init_logging(config: &Config, verbose: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("talentsift={}", level)));

    match &config.logging.file {
        Some(file) => {
            let path = expand_path(file)?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SiftError::Io {
                    source: e,
                    context: format!("Failed to create log directory: {}", parent.display()),
                })?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| SiftError::Io {
                    source: e,
                    context: format!("Failed to open log file: {}", path.display()),
                })?;

            fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

fn cmd_ingest(
    config: &Config,
    csv: Option<PathBuf>,
    documents: Option<PathBuf>,
    skip_csv: bool,
    skip_documents: bool,
) -> Result<()> {
    let storage = StorageManager::new(config.data_dir()?)?;
    let provider = create_provider(&config.embedding)?;
    let mut vectors = VectorIndex::open(
        provider,
        storage.vector_index_path(),
        storage.vector_ids_path(),
    )?;
    let extractor = FileExtractor::new(config.ingest.pdftotext_bin.clone());
    let mut ingestor = Ingestor::new(&storage.database, &mut vectors, &extractor);

    let mut total = IngestReport::default();

    if !skip_csv {
        let explicit = csv.is_some();
        let path = expand_path(&csv.unwrap_or_else(|| config.ingest.csv_path.clone()))?;
        if path.exists() {
            let report = ingestor.index_csv(
                &path,
                &config.ingest.csv_columns,
                config.ingest.name_column.as_deref(),
            )?;
            println!(
                "CSV {}: {} indexed, {} already present, {} failed",
                path.display(),
                report.indexed,
                report.duplicates,
                report.failed
            );
            total.merge(report);
        } else if explicit {
            return Err(SiftError::Config(format!(
                "CSV file not found: {}",
                path.display()
            )));
        } else {
            tracing::warn!("No CSV file at {}, skipping", path.display());
        }
    }

    if !skip_documents {
        let explicit = documents.is_some();
        let dir = expand_path(&documents.unwrap_or_else(|| config.ingest.documents_dir.clone()))?;
        if dir.is_dir() {
            let report = ingestor.index_documents(&dir, &config.ingest.document_extensions)?;
            println!(
                "Documents {}: {} indexed, {} already present, {} failed",
                dir.display(),
                report.indexed,
                report.duplicates,
                report.failed
            );
            total.merge(report);
        } else if explicit {
            return Err(SiftError::Config(format!(
                "Documents directory not found: {}",
                dir.display()
            )));
        } else {
            tracing::warn!("No documents directory at {}, skipping", dir.display());
        }
    }

    println!(
        "✓ Ingestion complete: {} indexed, {} already present, {} failed",
        total.indexed, total.duplicates, total.failed
    );
    println!("  Candidates in store: {}", storage.database.candidate_count()?);

    Ok(())
}

fn cmd_query(
    config: &Config,
    query: Option<String>,
    options: QueryOptions,
    format: Option<String>,
    print: bool,
) -> Result<()> {
    if let Some(pct) = options.top_percentage {
        if !(pct > 0.0 && pct <= 1.0) {
            return Err(SiftError::InvalidConfigValue {
                path: "--top-percentage".to_string(),
                message: format!("{} is not in (0, 1]", pct),
            });
        }
    }

    let query = match query {
        Some(query) => query,
        None => prompt_for_query()?,
    };
    let query = query.trim().to_string();
    if query.is_empty() {
        println!("No query given.");
        return Ok(());
    }

    let format: ReportFormat = format
        .as_deref()
        .unwrap_or(config.output.format.as_str())
        .parse()?;

    let mut pipeline = QueryPipeline::from_config(config)?;
    let report = pipeline.run(&query, &options)?;

    let writer = ReportWriter::new(expand_path(&config.output.dir)?, format);
    let path = writer.write(&report)?;

    if print {
        print_report(&report);
    }
    println!(
        "✓ {} candidates written to {}",
        report.candidates.len(),
        path.display()
    );

    Ok(())
}

fn prompt_for_query() -> Result<String> {
    print!("Enter your query: ");
    std::io::stdout().flush().map_err(|e| SiftError::Io {
        source: e,
        context: "Failed to flush stdout".to_string(),
    })?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| SiftError::Io {
            source: e,
            context: "Failed to read query from stdin".to_string(),
        })?;
    Ok(line)
}

fn print_report(report: &QueryReport) {
    println!("Query: {}", report.query);
    if report.expanded_query != report.query {
        println!("Expanded: {}", report.expanded_query);
    }
    if report.candidates.is_empty() {
        println!("No candidates matched.");
        return;
    }
    for candidate in &report.candidates {
        let name = if candidate.name.is_empty() {
            "(unnamed)"
        } else {
            candidate.name.as_str()
        };
        let short_id = candidate.id.get(..12).unwrap_or(candidate.id.as_str());
        println!("\n{}. {} [{}]", candidate.rank, name, short_id);
        if !candidate.summary.is_empty() {
            println!("   {}", candidate.summary);
        }
    }
}

fn cmd_status(config: &Config) -> Result<()> {
    let data_dir = config.data_dir()?;
    let storage = StorageManager::new(data_dir.clone())?;

    println!("Talentsift Status");
    println!("=================");
    println!("Data directory: {}", data_dir.display());
    println!("Candidates:     {}", storage.database.candidate_count()?);

    let provider = create_provider(&config.embedding)?;
    match VectorIndex::open(
        provider,
        storage.vector_index_path(),
        storage.vector_ids_path(),
    ) {
        Ok(index) => println!(
            "Vector index:   {} entries ({} dims, {})",
            index.len(),
            index.dimension(),
            config.embedding.model
        ),
        Err(e) => println!("Vector index:   ERROR {}", e),
    }

    let lexical = LexicalIndexStore::new(storage.lexical_snapshot_path());
    match lexical.stored_doc_count() {
        Some(count) => println!("Lexical cache:  built for {} documents", count),
        None => println!("Lexical cache:  not built"),
    }

    println!(
        "LLM:            {}",
        if config.llm.enabled {
            format!("enabled ({})", config.llm.model)
        } else {
            "disabled".to_string()
        }
    );
    println!("Re-ranker:      {}", config.retrieval.reranker);

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, config: &Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml = toml::to_string_pretty(config)?;
            println!("{}", toml);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SiftError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

/// Load the config file, falling back to defaults when it does not exist.
/// The flag reports whether a file was found.
fn load_config(config_path: Option<PathBuf>) -> Result<(Config, bool)> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        let mut config = Config::default();
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        return Ok((config, false));
    }

    Ok((Config::load(&path)?, true))
}

//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "talentsift",
    version,
    author = "neur0map",
    about = "Hybrid resume search: lexical gating, vector search and LLM re-ranking",
    long_about = "Talentsift ingests resumes from CSV exports and document folders, indexes them \
                  for BM25, TF-IDF and dense vector search, and answers recruiter queries with a \
                  ranked, summarized shortlist."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/talentsift/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index resumes from the configured CSV file and documents folder
    Ingest {
        /// CSV file to index instead of ingest.csv_path
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,

        /// Folder to index instead of ingest.documents_dir
        #[arg(long, value_name = "DIR")]
        documents: Option<PathBuf>,

        /// Do not read the CSV file
        #[arg(long)]
        skip_csv: bool,

        /// Do not read the documents folder
        #[arg(long)]
        skip_documents: bool,
    },

    /// Search indexed resumes (prompts for the query when omitted)
    Query {
        /// Recruiter query text
        query: Option<String>,

        /// Number of candidates to return (defaults to the expanded query's count)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Nearest neighbours pulled from the vector index
        #[arg(long)]
        top_n_vector: Option<usize>,

        /// Fraction of the corpus each lexical filter keeps (0-1]
        #[arg(long)]
        top_percentage: Option<f64>,

        /// Skip per-candidate summaries
        #[arg(long)]
        no_summary: bool,

        /// Report format (defaults to output.format)
        #[arg(short, long, value_parser = ["json", "csv"])]
        format: Option<String>,

        /// Also print the ranked candidates to stdout
        #[arg(short, long)]
        print: bool,
    },

    /// Show store and index status
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

//! Talentsift - hybrid resume search
//!
//! Ingests resumes, indexes them for BM25, TF-IDF and dense vector search, and
//! answers recruiter queries by gating vector hits with the lexical filters,
//! re-ranking the survivors and summarizing each one.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod lexical;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod retrieval;
pub mod storage;

pub use error::{Result, SiftError};

//! Exact L2 nearest-neighbor index over candidate embeddings
//!
//! Two files form one unit: `index.bin` holds the embedding matrix and
//! `ids.json` the candidate id for each row. Both are rewritten after every
//! insertion, and loading refuses to proceed unless they agree.
//!
//! `index.bin` layout (little endian):
//!
//! ```text
//! magic  b"TSVX"
//! u32    format version
//! u32    dimension
//! u64    row count
//! f32 *  row count * dimension, row-major
//! ```

use ndarray::{Array2, ArrayView1};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use super::EmbeddingProvider;
use crate::error::{Result, SiftError};
use crate::storage::{commit_staged, stage_atomic, write_atomic};

const MAGIC: &[u8; 4] = b"TSVX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Vector index and id mapping are out of sync: {0}")]
    Desynchronized(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Vector index file is corrupt: {0}")]
    Corrupt(String),
}

/// Append-only dense index keyed by insertion position
pub struct VectorIndex {
    provider: Arc<dyn EmbeddingProvider>,
    vectors: Array2<f32>,
    ids: Vec<String>,
    index_path: PathBuf,
    ids_path: PathBuf,
}

impl VectorIndex {
    /// Open the index stored at `index_path` / `ids_path`.
    ///
    /// Neither file present starts an empty index. Exactly one present, or a
    /// row count that differs from the id count, is an error.
    pub fn open(
        provider: Arc<dyn EmbeddingProvider>,
        index_path: PathBuf,
        ids_path: PathBuf,
    ) -> Result<Self> {
        let dimension = provider.dimension();

        let (vectors, ids) = match (index_path.exists(), ids_path.exists()) {
            (false, false) => {
                debug!("No vector index at {}, starting empty", index_path.display());
                (Array2::zeros((0, dimension)), Vec::new())
            }
            (true, true) => {
                let vectors = read_matrix(&index_path, dimension)?;
                let ids = read_ids(&ids_path)?;
                if vectors.nrows() != ids.len() {
                    return Err(VectorIndexError::Desynchronized(format!(
                        "{} embeddings but {} ids",
                        vectors.nrows(),
                        ids.len()
                    ))
                    .into());
                }
                info!("Loaded vector index with {} entries", ids.len());
                (vectors, ids)
            }
            (index_present, _) => {
                let (present, missing) = if index_present {
                    (&index_path, &ids_path)
                } else {
                    (&ids_path, &index_path)
                };
                return Err(VectorIndexError::Desynchronized(format!(
                    "{} exists but {} is missing",
                    present.display(),
                    missing.display()
                ))
                .into());
            }
        };

        Ok(Self {
            provider,
            vectors,
            ids,
            index_path,
            ids_path,
        })
    }

    /// Embed `text`, append it under `candidate_id` and persist both files
    /// before returning.
    ///
    /// Embedding failures surface as [`SiftError::Embedding`] and leave the
    /// index untouched.
    pub fn add(&mut self, candidate_id: &str, text: &str) -> Result<()> {
        let embedding = self.provider.embed(text)?;
        self.check_dimension(embedding.len())?;

        let mut vectors = self.vectors.clone();
        vectors
            .push_row(ArrayView1::from(&embedding))
            .map_err(|e| VectorIndexError::Corrupt(e.to_string()))?;
        let mut ids = self.ids.clone();
        ids.push(candidate_id.to_string());

        self.save(&vectors, &ids)?;
        self.vectors = vectors;
        self.ids = ids;

        debug!("Indexed vector for {} ({} total)", candidate_id, self.ids.len());
        Ok(())
    }

    /// Ids of the `top_n` entries nearest to `query`, nearest first
    pub fn search(&self, query: &str, top_n: usize) -> Result<Vec<String>> {
        if self.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.provider.embed(query)?;
        self.check_dimension(embedding.len())?;

        // Positions past the id mapping are skipped rather than reported;
        // the load-time check makes them unreachable in practice.
        let ids = self
            .nearest(&embedding, top_n)
            .into_iter()
            .filter_map(|(position, _)| self.ids.get(position).cloned())
            .collect();

        Ok(ids)
    }

    /// `(position, squared L2 distance)` of the `k` nearest rows.
    /// Equal distances keep insertion order.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let query = ArrayView1::from(query);
        let mut distances: Vec<(usize, f32)> = self
            .vectors
            .outer_iter()
            .enumerate()
            .map(|(position, row)| {
                let distance = row
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>();
                (position, distance)
            })
            .collect();

        distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        distances.truncate(k);
        distances
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    /// Candidate ids in insertion order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        let expected = self.dimension();
        if actual != expected {
            return Err(VectorIndexError::InvalidDimension { expected, actual }.into());
        }
        Ok(())
    }

    /// Persist `vectors` and `ids` as the new on-disk pair.
    ///
    /// Both files are staged before either is replaced. If the id mapping
    /// cannot be swapped in after the matrix was, the matrix is put back to
    /// the current in-memory state so the pair on disk still agrees.
    fn save(&self, vectors: &Array2<f32>, ids: &[String]) -> Result<()> {
        let ids = serde_json::to_vec(ids).map_err(|e| SiftError::Json {
            source: e,
            context: "Failed to serialize vector id mapping".to_string(),
        })?;

        let staged_index = stage_atomic(&self.index_path, &encode_matrix(vectors))?;
        let staged_ids = match stage_atomic(&self.ids_path, &ids) {
            Ok(staged) => staged,
            Err(e) => {
                let _ = std::fs::remove_file(&staged_index);
                return Err(e);
            }
        };

        let index_existed = self.index_path.exists();
        if let Err(e) = commit_staged(&staged_index, &self.index_path) {
            let _ = std::fs::remove_file(&staged_index);
            let _ = std::fs::remove_file(&staged_ids);
            return Err(e);
        }

        if let Err(e) = commit_staged(&staged_ids, &self.ids_path) {
            let _ = std::fs::remove_file(&staged_ids);
            let restored = if index_existed {
                write_atomic(&self.index_path, &encode_matrix(&self.vectors))
            } else {
                std::fs::remove_file(&self.index_path).map_err(|e| SiftError::Io {
                    source: e,
                    context: format!("Failed to remove {}", self.index_path.display()),
                })
            };
            if let Err(restore) = restored {
                error!("Failed to roll back vector index after a failed save: {}", restore);
            }
            return Err(e);
        }

        Ok(())
    }
}

fn encode_matrix(vectors: &Array2<f32>) -> Vec<u8> {
    let mut data = Vec::with_capacity(HEADER_LEN + vectors.len() * 4);
    data.extend_from_slice(MAGIC);
    data.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    data.extend_from_slice(&(vectors.ncols() as u32).to_le_bytes());
    data.extend_from_slice(&(vectors.nrows() as u64).to_le_bytes());
    for value in vectors.iter() {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data
}

fn read_matrix(path: &Path, dimension: usize) -> Result<Array2<f32>> {
    let data = std::fs::read(path).map_err(|e| SiftError::Io {
        source: e,
        context: format!("Failed to read vector index: {}", path.display()),
    })?;

    if data.len() < HEADER_LEN || &data[0..4] != MAGIC {
        return Err(VectorIndexError::Corrupt(format!("bad header in {}", path.display())).into());
    }

    let version = u32::from_le_bytes(le_bytes(&data[4..8]));
    if version != FORMAT_VERSION {
        return Err(
            VectorIndexError::Corrupt(format!("unsupported format version {}", version)).into(),
        );
    }

    let stored_dimension = u32::from_le_bytes(le_bytes(&data[8..12])) as usize;
    if stored_dimension != dimension {
        return Err(VectorIndexError::InvalidDimension {
            expected: dimension,
            actual: stored_dimension,
        }
        .into());
    }

    let rows = u64::from_le_bytes(le_bytes(&data[12..20])) as usize;
    let body = &data[HEADER_LEN..];
    if body.len() != rows * dimension * 4 {
        return Err(VectorIndexError::Corrupt(format!(
            "expected {} rows of {} floats, found {} bytes",
            rows,
            dimension,
            body.len()
        ))
        .into());
    }

    let values: Vec<f32> = body
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(le_bytes(chunk)))
        .collect();

    Array2::from_shape_vec((rows, dimension), values)
        .map_err(|e| VectorIndexError::Corrupt(e.to_string()).into())
}

fn read_ids(path: &Path) -> Result<Vec<String>> {
    let data = std::fs::read(path).map_err(|e| SiftError::Io {
        source: e,
        context: format!("Failed to read vector id mapping: {}", path.display()),
    })?;
    serde_json::from_slice(&data).map_err(|e| SiftError::Json {
        source: e,
        context: format!("Failed to parse vector id mapping: {}", path.display()),
    })
}

fn le_bytes<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(slice);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use tempfile::TempDir;

    fn open(temp: &TempDir) -> Result<VectorIndex> {
        VectorIndex::open(
            Arc::new(HashEmbedder::default()),
            temp.path().join("index.bin"),
            temp.path().join("ids.json"),
        )
    }

    #[test]
    fn test_empty_index_search() {
        let temp = TempDir::new().unwrap();
        let index = open(&temp).unwrap();
        assert!(index.is_empty());
        assert!(index.search("rust", 5).unwrap().is_empty());
    }

    #[test]
    fn test_add_persists_and_reloads() {
        let temp = TempDir::new().unwrap();
        {
            let mut index = open(&temp).unwrap();
            index.add("a", "java backend engineer").unwrap();
            index.add("b", "python data scientist").unwrap();
        }

        let reopened = open(&temp).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.ids(), &["a".to_string(), "b".to_string()]);
        assert_eq!(reopened.search("python data scientist", 1).unwrap(), vec!["b"]);
    }

    #[test]
    fn test_search_returns_at_most_len() {
        let temp = TempDir::new().unwrap();
        let mut index = open(&temp).unwrap();
        index.add("a", "welder").unwrap();
        index.add("b", "plumber").unwrap();

        assert_eq!(index.search("welder", 10).unwrap().len(), 2);
        assert_eq!(index.search("welder", 10).unwrap()[0], "a");
    }

    #[test]
    fn test_equal_distances_keep_insertion_order() {
        let temp = TempDir::new().unwrap();
        let mut index = open(&temp).unwrap();
        index.add("first", "same text").unwrap();
        index.add("second", "same text").unwrap();
        index.add("third", "same text").unwrap();

        assert_eq!(
            index.search("same text", 3).unwrap(),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_missing_id_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        {
            let mut index = open(&temp).unwrap();
            index.add("a", "java").unwrap();
        }
        std::fs::remove_file(temp.path().join("ids.json")).unwrap();

        let result = open(&temp);
        assert!(matches!(
            result,
            Err(SiftError::VectorIndex(VectorIndexError::Desynchronized(_)))
        ));
    }

    #[test]
    fn test_count_mismatch_is_an_error() {
        let temp = TempDir::new().unwrap();
        {
            let mut index = open(&temp).unwrap();
            index.add("a", "java").unwrap();
        }
        std::fs::write(temp.path().join("ids.json"), br#"["a","b"]"#).unwrap();

        assert!(matches!(
            open(&temp),
            Err(SiftError::VectorIndex(VectorIndexError::Desynchronized(_)))
        ));
    }

    #[test]
    fn test_dimension_change_is_rejected() {
        let temp = TempDir::new().unwrap();
        {
            let mut index = open(&temp).unwrap();
            index.add("a", "java").unwrap();
        }

        let result = VectorIndex::open(
            Arc::new(HashEmbedder::new(16)),
            temp.path().join("index.bin"),
            temp.path().join("ids.json"),
        );
        assert!(matches!(
            result,
            Err(SiftError::VectorIndex(VectorIndexError::InvalidDimension { .. }))
        ));
    }

    #[test]
    fn test_failed_id_write_keeps_files_in_sync() {
        let temp = TempDir::new().unwrap();
        let mut index = open(&temp).unwrap();
        index.add("a", "java backend engineer").unwrap();

        // A directory where the staged id file should go makes that write fail
        let blocker = temp.path().join("ids.json.tmp");
        std::fs::create_dir(&blocker).unwrap();

        let result = index.add("b", "python data scientist");
        assert!(matches!(result, Err(SiftError::Io { .. })));
        assert_eq!(index.len(), 1);
        assert!(!temp.path().join("index.bin.tmp").exists());

        let reopened = open(&temp).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.ids(), &["a".to_string()]);

        std::fs::remove_dir(&blocker).unwrap();
        index.add("b", "python data scientist").unwrap();
        assert_eq!(open(&temp).unwrap().len(), 2);
    }

    #[test]
    fn test_failed_embedding_leaves_index_untouched() {
        let temp = TempDir::new().unwrap();
        let mut index = open(&temp).unwrap();
        index.add("a", "java").unwrap();

        let result = index.add("b", "   ");
        assert!(matches!(result, Err(SiftError::Embedding(_))));
        assert_eq!(index.len(), 1);
        assert_eq!(open(&temp).unwrap().len(), 1);
    }
}

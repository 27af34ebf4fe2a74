use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::mmr::{cosine_similarity, mmr_select};
use crate::chunking::Chunk;

const INDEX_FILE: &str = "vectors.json";

/// A stored vector entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedRecord {
    pub source: String,
    pub language: String,
    pub ordinal: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
    pub vector: Vec<f32>,
}

impl IndexedRecord {
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            source: chunk.source,
            language: chunk.language,
            ordinal: chunk.ordinal,
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            text: chunk.text,
            vector,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    dims: usize,
    records: Vec<IndexedRecord>,
}

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub source: String,
    pub language: String,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
    pub score: f32,
}

/// One project's embeddings, held in memory and persisted as a single file
/// under the project's index directory.
pub struct VectorIndex {
    dims: usize,
    records: Vec<IndexedRecord>,
}

impl VectorIndex {
    /// Write a new index in `dir`, atomically replacing any previous one.
    pub fn build(dir: &Path, dims: usize, records: Vec<IndexedRecord>) -> Result<Self> {
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dims) {
            anyhow::bail!(
                "Vector for {} chunk {} has dimension {}, index expects {dims}",
                bad.source,
                bad.ordinal,
                bad.vector.len()
            );
        }

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index directory {}", dir.display()))?;
        let path = dir.join(INDEX_FILE);
        let tmp = dir.join(format!("{INDEX_FILE}.tmp"));

        let file = IndexFile { dims, records };
        let data = serde_json::to_vec(&file).context("Failed to serialize vector index")?;
        std::fs::write(&tmp, data)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        tracing::info!("Wrote {} vectors to {}", file.records.len(), path.display());
        Ok(Self {
            dims,
            records: file.records,
        })
    }

    /// Reopen an index persisted by [`VectorIndex::build`].
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(INDEX_FILE);
        let data = std::fs::read(&path)
            .with_context(|| format!("Failed to read vector index {}", path.display()))?;
        let file: IndexFile = serde_json::from_slice(&data)
            .with_context(|| format!("Corrupt vector index {}", path.display()))?;

        Ok(Self {
            dims: file.dims,
            records: file.records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rank every record by cosine similarity, keep the best `fetch_k`, then
    /// pick `k` of those by maximal marginal relevance.
    pub fn query_mmr(
        &self,
        query: &[f32],
        k: usize,
        fetch_k: usize,
        lambda: f32,
    ) -> Result<Vec<VectorHit>> {
        if query.len() != self.dims {
            anyhow::bail!(
                "Query vector has dimension {}, index expects {}",
                query.len(),
                self.dims
            );
        }

        let mut scored: Vec<(f32, &IndexedRecord)> = self
            .records
            .iter()
            .map(|r| (cosine_similarity(query, &r.vector), r))
            .collect();

        // Sort descending by score
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(fetch_k.max(k));

        let candidates: Vec<&[f32]> = scored.iter().map(|(_, r)| r.vector.as_slice()).collect();
        let relevance: Vec<f32> = scored.iter().map(|(s, _)| *s).collect();

        Ok(mmr_select(&candidates, &relevance, k, lambda)
            .into_iter()
            .map(|i| {
                let (score, r) = scored[i];
                VectorHit {
                    source: r.source.clone(),
                    language: r.language.clone(),
                    start_line: r.start_line,
                    end_line: r.end_line,
                    text: r.text.clone(),
                    score,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source: &str, vector: Vec<f32>) -> IndexedRecord {
        IndexedRecord {
            source: source.to_string(),
            language: "python".to_string(),
            ordinal: 0,
            start_line: 1,
            end_line: 10,
            text: format!("contents of {source}"),
            vector,
        }
    }

    #[test]
    fn test_build_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("db").join("demo");
        let built = VectorIndex::build(
            &index_dir,
            2,
            vec![record("a.py", vec![1.0, 0.0]), record("b.py", vec![0.0, 1.0])],
        )
        .unwrap();
        assert_eq!(built.len(), 2);

        let reopened = VectorIndex::open(&index_dir).unwrap();
        assert_eq!(reopened.len(), 2);
        let hits = reopened.query_mmr(&[0.0, 1.0], 1, 20, 1.0).unwrap();
        assert_eq!(hits[0].source, "b.py");
        assert!(!index_dir.join("vectors.json.tmp").exists());
    }

    #[test]
    fn test_rebuild_replaces_previous_records() {
        let dir = tempfile::tempdir().unwrap();
        VectorIndex::build(dir.path(), 2, vec![record("old.py", vec![1.0, 0.0])]).unwrap();
        VectorIndex::build(dir.path(), 2, vec![record("new.py", vec![0.0, 1.0])]).unwrap();

        let index = VectorIndex::open(dir.path()).unwrap();
        assert_eq!(index.len(), 1);
        let hits = index.query_mmr(&[1.0, 0.0], 8, 20, 0.5).unwrap();
        assert_eq!(hits[0].source, "new.py");
    }

    #[test]
    fn test_build_rejects_wrong_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let result = VectorIndex::build(dir.path(), 3, vec![record("a.py", vec![1.0, 0.0])]);
        assert!(result.is_err());
        assert!(!dir.path().join(INDEX_FILE).exists());
    }

    #[test]
    fn test_open_missing_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(VectorIndex::open(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_query_mmr_orders_and_limits() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record("far.py", vec![0.0, 1.0]),
            record("near.py", vec![1.0, 0.1]),
            record("mid.py", vec![0.7, 0.7]),
        ];
        let index = VectorIndex::build(dir.path(), 2, records).unwrap();

        let hits = index.query_mmr(&[1.0, 0.0], 2, 20, 0.5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "near.py");
        assert!(hits[0].score > 0.9);
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::build(dir.path(), 2, vec![record("a.py", vec![1.0, 0.0])]).unwrap();
        assert!(index.query_mmr(&[1.0, 0.0, 0.0], 8, 20, 0.5).is_err());
    }
}

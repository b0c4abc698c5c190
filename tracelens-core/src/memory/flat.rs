use std::cmp::Ordering;

use parking_lot::RwLock;

use super::{Document, SearchResult, VectorStore, VectorStoreError};

/// In-memory vector store with exact (brute-force) cosine search.
///
/// Vectors are L2-normalized on the way in and kept in one contiguous buffer,
/// so similarity is a plain dot product. The buffer and the document list sit
/// behind a single `RwLock`: searches share the read lock, mutations take the
/// write lock, and the two always stay the same length.
pub struct FlatVectorStore {
    inner: RwLock<Inner>,
    dimensions: usize,
}

struct Inner {
    /// `documents.len() * dimensions` normalized components.
    vectors: Vec<f32>,
    documents: Vec<Document>,
}

impl FlatVectorStore {
    pub fn new(dimensions: usize) -> Result<Self, VectorStoreError> {
        if dimensions == 0 {
            return Err(VectorStoreError::ZeroDimension);
        }
        Ok(Self {
            inner: RwLock::new(Inner {
                vectors: Vec::new(),
                documents: Vec::new(),
            }),
            dimensions,
        })
    }

    fn validate(&self, vector: &[f32]) -> Result<(), VectorStoreError> {
        if vector.len() != self.dimensions {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimensions,
                got: vector.len(),
            });
        }
        if let Some(index) = vector.iter().position(|v| !v.is_finite()) {
            return Err(VectorStoreError::NonFiniteComponent { index });
        }
        Ok(())
    }
}

/// Scale `vector` to unit L2 norm, appending the result to `out`.
///
/// A zero vector stays zero so it scores 0 against every query.
fn normalize_into(vector: &[f32], out: &mut Vec<f32>) {
    // Accumulate in f64 so large components cannot overflow the norm.
    let norm = vector
        .iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt();
    if norm == 0.0 {
        out.extend(std::iter::repeat_n(0.0, vector.len()));
    } else {
        out.extend(vector.iter().map(|&v| (f64::from(v) / norm) as f32));
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Descending score, then ascending id.
fn rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

impl VectorStore for FlatVectorStore {
    fn insert(&self, vector: &[f32], document: Document) -> Result<usize, VectorStoreError> {
        self.validate(vector)?;
        let mut normalized = Vec::with_capacity(self.dimensions);
        normalize_into(vector, &mut normalized);

        let mut inner = self.inner.write();
        let id = inner.documents.len();
        inner.vectors.extend_from_slice(&normalized);
        inner.documents.push(document);
        log::debug!("inserted entry {id}");
        Ok(id)
    }

    fn insert_batch(
        &self,
        vectors: &[Vec<f32>],
        documents: Vec<Document>,
    ) -> Result<Vec<usize>, VectorStoreError> {
        if vectors.len() != documents.len() {
            return Err(VectorStoreError::LengthMismatch {
                vectors: vectors.len(),
                documents: documents.len(),
            });
        }
        for vector in vectors {
            self.validate(vector)?;
        }

        let mut normalized = Vec::with_capacity(vectors.len() * self.dimensions);
        for vector in vectors {
            normalize_into(vector, &mut normalized);
        }

        let mut inner = self.inner.write();
        let start = inner.documents.len();
        inner.vectors.extend_from_slice(&normalized);
        inner.documents.extend(documents);
        let end = inner.documents.len();
        log::debug!("inserted batch of {} entries ({start}..{end})", end - start);
        Ok((start..end).collect())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorStoreError> {
        self.validate(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut normalized = Vec::with_capacity(self.dimensions);
        normalize_into(query, &mut normalized);

        let inner = self.inner.read();
        if inner.documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = inner
            .vectors
            .chunks_exact(self.dimensions)
            .map(|stored| {
                // `+ 0.0` folds -0.0 into 0.0 so zero scores tie by id.
                dot(&normalized, stored).clamp(-1.0, 1.0) + 0.0
            })
            .enumerate()
            .collect();

        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank);

        log::debug!("search returned {k} of {} entries", inner.documents.len());
        Ok(scored
            .into_iter()
            .map(|(id, score)| SearchResult {
                id,
                score,
                metadata: inner.documents[id].clone(),
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.inner.read().documents.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn clear(&self) {
        let mut inner = self.inner.write();
        inner.vectors.clear();
        inner.documents.clear();
        log::debug!("cleared vector store");
    }
}

//! Movie corpus: immutable, index-addressable document collection
//!
//! Position in the collection is the internal document index shared by the
//! keyword index and the embedding matrix.

mod document;
mod loader;

pub use document::{Document, RawDocument};
pub use loader::{load_collection, read_documents};

use crate::error::{PlotError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Fixed-size collection of documents, addressable by position or identifier
#[derive(Debug, Clone, Default)]
pub struct Collection {
    documents: Vec<Arc<Document>>,
    positions: HashMap<String, usize>,
}

impl Collection {
    /// Build a collection; identifiers must be unique.
    pub fn new(documents: Vec<Document>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(documents.len());
        let mut undated = 0usize;

        for (idx, doc) in documents.iter().enumerate() {
            if let Some(first) = positions.insert(doc.id().to_string(), idx) {
                return Err(PlotError::Corpus(format!(
                    "duplicate document id '{}' at positions {} and {}",
                    doc.id(),
                    first,
                    idx
                )));
            }
            if doc.release_year().is_none() {
                undated += 1;
            }
        }

        if undated > 0 {
            tracing::warn!(
                "{} of {} documents have no parseable release year; year filters never match them",
                undated,
                documents.len()
            );
        }

        Ok(Self {
            documents: documents.into_iter().map(Arc::new).collect(),
            positions,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document at an internal index
    pub fn get(&self, index: usize) -> Option<&Arc<Document>> {
        self.documents.get(index)
    }

    /// Internal index of a document identifier
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Arc<Document>> {
        self.position(id).and_then(|idx| self.documents.get(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.iter()
    }
}

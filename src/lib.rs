//! plotfindr - movie search by plot description
//!
//! Ranks a fixed movie collection against a free-text query with a BM25
//! lexical scorer and a dense cosine scorer, fuses the two rankings with
//! weighted Reciprocal Rank Fusion, and optionally reranks the shortlist
//! with a cross-encoder. Metadata filters (year, genre, country) apply
//! inside both scorers.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod filtering;
pub mod index;
pub mod retrieval;

pub use error::{PlotError, Result};

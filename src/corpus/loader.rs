//! Corpus file loading
//!
//! Accepts a JSON array of movie records, a JSON object whose first
//! array-valued field holds the records, or JSON Lines.

use super::{Collection, Document, RawDocument};
use crate::error::{PlotError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Load and concatenate every corpus file, in order, into one collection
pub fn load_collection(paths: &[PathBuf]) -> Result<Collection> {
    let mut raw = Vec::new();
    for path in paths {
        let mut docs = read_documents(path)?;
        tracing::info!("Loaded {} documents from {}", docs.len(), path.display());
        raw.append(&mut docs);
    }

    let documents = raw
        .into_iter()
        .enumerate()
        .map(|(position, doc)| Document::from_raw(doc, position))
        .collect();

    Collection::new(documents)
}

/// Read raw records from a single corpus file
pub fn read_documents(path: &Path) -> Result<Vec<RawDocument>> {
    if !path.exists() {
        return Err(PlotError::Corpus(format!(
            "corpus file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| PlotError::Io {
        source: e,
        context: format!("Failed to read corpus file: {:?}", path),
    })?;

    match serde_json::from_str::<Value>(&content) {
        Ok(value) => records_from_value(value, path),
        Err(_) => read_json_lines(&content, path),
    }
}

fn records_from_value(value: Value, path: &Path) -> Result<Vec<RawDocument>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            // The first list of records wins, even an empty one; an object
            // holding no such list is a lone record (one-line JSON Lines)
            let position = map.values().position(is_record_list);
            match position {
                Some(position) => match map.into_iter().nth(position) {
                    Some((_, Value::Array(items))) => items,
                    _ => Vec::new(),
                },
                None => vec![Value::Object(map)],
            }
        }
        _ => {
            return Err(PlotError::Corpus(format!(
                "{} does not contain a list of documents",
                path.display()
            )))
        }
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|e| PlotError::Json {
                source: e,
                context: format!("Invalid document in {}", path.display()),
            })
        })
        .collect()
}

fn is_record_list(value: &Value) -> bool {
    matches!(value, Value::Array(items) if items.iter().all(Value::is_object))
}

fn read_json_lines(content: &str, path: &Path) -> Result<Vec<RawDocument>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(lineno, line)| {
            serde_json::from_str(line).map_err(|e| PlotError::Json {
                source: e,
                context: format!("{}:{}", path.display(), lineno + 1),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_array() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("movies.json");
        std::fs::write(
            &path,
            r#"[{"wiki_movie_id": "1", "movie_name": "A", "summary": "x"},
                {"wiki_movie_id": "2", "movie_name": "B", "summary": "y"}]"#,
        )
        .unwrap();

        let collection = load_collection(&[path]).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(1).unwrap().title(), "B");
    }

    #[test]
    fn test_load_wrapped_object() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("movies.json");
        std::fs::write(&path, r#"{"version": 2, "movies": [{"id": "9", "title": "Z"}]}"#)
            .unwrap();

        let docs = read_documents(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].wiki_movie_id.as_deref(), Some("9"));
    }

    #[test]
    fn test_empty_wrapped_list() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("movies.json");
        std::fs::write(&path, r#"{"version": 2, "movies": []}"#).unwrap();

        let collection = load_collection(&[path]).unwrap();
        assert_eq!(collection.len(), 0);
    }

    #[test]
    fn test_load_json_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("movies.jsonl");
        std::fs::write(
            &path,
            "{\"id\": \"1\", \"title\": \"A\"}\n\n{\"id\": \"2\", \"title\": \"B\"}\n",
        )
        .unwrap();

        let docs = read_documents(&path).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_single_record_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("one.jsonl");
        std::fs::write(&path, r#"{"id": "1", "genres": ["Drama"]}"#).unwrap();

        let docs = read_documents(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].genres, vec!["Drama".to_string()]);
    }

    #[test]
    fn test_concatenates_in_order() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("chunk0.json");
        let second = temp.path().join("chunk1.json");
        std::fs::write(&first, r#"[{"id": "1"}]"#).unwrap();
        std::fs::write(&second, r#"[{"id": "2"}, {"id": "3"}]"#).unwrap();

        let collection = load_collection(&[first, second]).unwrap();
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.position("3"), Some(2));
    }

    #[test]
    fn test_missing_file() {
        let result = read_documents(Path::new("/nonexistent/movies.json"));
        assert!(matches!(result, Err(PlotError::Corpus(_))));
    }
}

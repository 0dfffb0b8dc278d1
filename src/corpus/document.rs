//! Movie document records

use serde::{Deserialize, Deserializer, Serialize};

/// A movie record as it appears in the merged movie table.
///
/// Field names follow the table (`wiki_movie_id`, `movie_name`, ...); a few
/// common aliases are accepted so hand-written fixtures stay short.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    #[serde(
        default,
        alias = "id",
        alias = "doc_id",
        deserialize_with = "string_or_number"
    )]
    pub wiki_movie_id: Option<String>,

    #[serde(default, alias = "title", deserialize_with = "string_or_number")]
    pub movie_name: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub release_date: Option<String>,

    #[serde(default, alias = "plot_summary")]
    pub summary: Option<String>,

    #[serde(default, deserialize_with = "list_or_null")]
    pub genres: Vec<String>,

    #[serde(default, deserialize_with = "list_or_null")]
    pub countries: Vec<String>,
}

/// Immutable movie document.
///
/// `release_year` is derived once from the leading four digits of
/// `release_date`; a date that does not start with four digits leaves it
/// unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    id: String,
    title: String,
    summary: String,
    release_date: String,
    release_year: Option<i32>,
    genres: Vec<String>,
    countries: Vec<String>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
        release_date: impl Into<String>,
        genres: Vec<String>,
        countries: Vec<String>,
    ) -> Self {
        let title: String = title.into();
        let summary: String = summary.into();
        let release_date = release_date.into();
        let release_year = parse_release_year(&release_date);
        Self {
            id: id.into(),
            title: title.trim().to_string(),
            summary: summary.trim().to_string(),
            release_date,
            release_year,
            genres,
            countries,
        }
    }

    /// Build a document from a raw table row; `position` supplies the
    /// fallback identifier for rows without one.
    pub fn from_raw(raw: RawDocument, position: usize) -> Self {
        let id = raw
            .wiki_movie_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("doc_{:06}", position));

        Self::new(
            id,
            raw.movie_name.unwrap_or_default(),
            raw.summary.unwrap_or_default(),
            raw.release_date.unwrap_or_default(),
            raw.genres,
            raw.countries,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn release_date(&self) -> &str {
        &self.release_date
    }

    pub fn release_year(&self) -> Option<i32> {
        self.release_year
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    /// Title for display, with a placeholder for untitled records
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "UNKNOWN_TITLE"
        } else {
            &self.title
        }
    }

    /// Title and plot joined, falling back to whichever is non-empty.
    ///
    /// Used as the lexical indexing text and as the reranker passage.
    pub fn passage(&self) -> String {
        match (self.title.is_empty(), self.summary.is_empty()) {
            (false, false) => format!("{}. {}", self.title, self.summary),
            (true, false) => self.summary.clone(),
            _ => self.title.clone(),
        }
    }

    /// Text fed to the document encoder when the embedding matrix is built
    /// at startup.
    pub fn embedding_text(&self) -> String {
        format!(
            "{} [SEP] {} [SEP] {}",
            self.title,
            self.genres.join(" "),
            self.summary
        )
        .trim()
        .to_string()
    }

    /// Short preview of the plot (first N characters)
    pub fn preview(&self, max_chars: usize) -> String {
        if self.summary.chars().count() <= max_chars {
            self.summary.clone()
        } else {
            let cut: String = self.summary.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}

fn parse_release_year(date: &str) -> Option<i32> {
    let date = date.trim();
    let head = date.get(..4)?;
    if head.bytes().all(|b| b.is_ascii_digit()) {
        head.parse().ok()
    } else {
        None
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn list_or_null<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

//! Structured-metadata filtering shared by every scorer
//!
//! The same [`MetadataFilter`] is pushed down into the keyword and vector
//! scorers so fused results can never violate it.

use crate::corpus::Document;
use crate::error::{PlotError, Result};
use serde::{Deserialize, Serialize};

/// Optional constraints on release year, genre and country.
///
/// Every supplied constraint must hold; absent constraints impose nothing.
/// A document whose release year cannot be parsed fails any year-based
/// constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Exact release year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    /// Inclusive (min, max) release year range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_range: Option<(i32, i32)>,

    /// Required genre, matched case-insensitively
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    /// Required country, matched case-insensitively
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl MetadataFilter {
    /// Filter that accepts every document
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_year_range(mut self, min: i32, max: i32) -> Self {
        self.year_range = Some((min, max));
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// True when no constraint is set
    pub fn is_empty(&self) -> bool {
        self.year.is_none()
            && self.year_range.is_none()
            && self.genre.is_none()
            && self.country.is_none()
    }

    /// Reject malformed constraints instead of silently correcting them
    pub fn validate(&self) -> Result<()> {
        if let Some((min, max)) = self.year_range {
            if min > max {
                return Err(PlotError::InvalidFilter(format!(
                    "year_range min {} is greater than max {}",
                    min, max
                )));
            }
        }

        if matches!(&self.genre, Some(g) if g.trim().is_empty()) {
            return Err(PlotError::InvalidFilter("genre cannot be empty".to_string()));
        }

        if matches!(&self.country, Some(c) if c.trim().is_empty()) {
            return Err(PlotError::InvalidFilter(
                "country cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Check whether a document satisfies every supplied constraint
    pub fn matches(&self, doc: &Document) -> bool {
        let year = doc.release_year();

        if let Some(wanted) = self.year {
            if year != Some(wanted) {
                return false;
            }
        }

        if let Some((min, max)) = self.year_range {
            match year {
                Some(y) if (min..=max).contains(&y) => {}
                _ => return false,
            }
        }

        if let Some(genre) = &self.genre {
            if !contains_ignore_case(doc.genres(), genre) {
                return false;
            }
        }

        if let Some(country) = &self.country {
            if !contains_ignore_case(doc.countries(), country) {
                return false;
            }
        }

        true
    }
}

fn contains_ignore_case(values: &[String], wanted: &str) -> bool {
    let wanted = wanted.to_lowercase();
    values.iter().any(|v| v.to_lowercase() == wanted)
}

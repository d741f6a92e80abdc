use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A denormalized snapshot of catalog metadata, cached locally.
///
/// Created the first time a movie is fetched from the catalog or swiped on;
/// a fresher fetch with the same id overwrites the whole row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Movie {
    /// Catalog-assigned id, treated as an opaque string
    pub id: String,
    pub title: String,
    /// 4-digit release year, or "N/A" when the catalog has no date
    pub year: String,
    pub runtime: Option<String>,
    /// Comma-joined genre names, e.g. "Drama, Thriller"
    pub genre: Option<String>,
    pub director: Option<String>,
    /// Top 5 cast members by billing order, comma-joined
    pub actors: Option<String>,
    pub plot: Option<String>,
    pub poster: String,
    /// Numeric rating kept as a string; "N/A" and parse failures are
    /// defaulted at scoring time
    pub rating: Option<String>,
}

impl Movie {
    /// Genre names split on ", " for exact-match set comparisons
    pub fn genre_tokens(&self) -> Vec<&str> {
        split_tokens(self.genre.as_deref())
    }

    /// Leading-cast names split on ", "
    pub fn cast_names(&self) -> Vec<&str> {
        split_tokens(self.actors.as_deref())
    }

    pub fn director_name(&self) -> Option<&str> {
        self.director.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }

    /// Parsed rating, or `default` when missing or unparseable
    pub fn rating_or(&self, default: f64) -> f64 {
        self.rating
            .as_deref()
            .and_then(|r| r.trim().parse::<f64>().ok())
            .unwrap_or(default)
    }

    /// Release year as a number, `None` for "N/A" or malformed values
    pub fn release_year(&self) -> Option<i32> {
        self.year.trim().parse::<i32>().ok()
    }
}

fn split_tokens(joined: Option<&str>) -> Vec<&str> {
    joined
        .map(|s| {
            s.split(", ")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie() -> Movie {
        Movie {
            id: "603".to_string(),
            title: "The Matrix".to_string(),
            year: "1999".to_string(),
            runtime: Some("136 min".to_string()),
            genre: Some("Action, Science Fiction".to_string()),
            director: Some("Lana Wachowski".to_string()),
            actors: Some("Keanu Reeves, Laurence Fishburne".to_string()),
            plot: None,
            poster: String::new(),
            rating: Some("8.2".to_string()),
        }
    }

    #[test]
    fn test_genre_tokens_split() {
        assert_eq!(movie().genre_tokens(), vec!["Action", "Science Fiction"]);
    }

    #[test]
    fn test_genre_tokens_empty_when_missing() {
        let mut m = movie();
        m.genre = None;
        assert!(m.genre_tokens().is_empty());
    }

    #[test]
    fn test_rating_parse() {
        assert_eq!(movie().rating_or(6.0), 8.2);
    }

    #[test]
    fn test_rating_defaults_on_na() {
        let mut m = movie();
        m.rating = Some("N/A".to_string());
        assert_eq!(m.rating_or(6.0), 6.0);
        m.rating = None;
        assert_eq!(m.rating_or(6.0), 6.0);
    }

    #[test]
    fn test_release_year() {
        assert_eq!(movie().release_year(), Some(1999));
        let mut m = movie();
        m.year = "N/A".to_string();
        assert_eq!(m.release_year(), None);
    }
}

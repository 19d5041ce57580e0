use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::entities::{movie, review};

/// A film pulled off a popular-listing page. Metadata comes later from the
/// film's own page.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrapedMovie {
    pub title: String,
    pub letterboxd_url: String,
    pub average_rating: Option<f64>,
}

/// Detail fields scraped from a film page, overwriting whatever an earlier
/// refresh stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilmMetadata {
    pub original_title: Option<String>,
    pub synopsis: Option<String>,
    pub runtime: Option<i32>,
    pub actors: Vec<String>,
    pub genres: Vec<String>,
    pub studios: Vec<String>,
    pub release_year: Option<i16>,
    pub tmdb_id: Option<String>,
    pub imdb_id: Option<String>,
    pub tmdb_url: Option<String>,
    pub imdb_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScrapedReview {
    pub author: String,
    pub content: String,
    pub rating: Option<f64>,
    pub date: Date,
    pub likes: i32,
    pub comments: i32,
    pub letterboxd_url: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub original_title: Option<String>,
    pub letterboxd_url: String,
    pub average_rating: Option<f64>,
    pub genres: Vec<String>,
    pub release_date: Option<String>,
    pub synopsis: Option<String>,
    pub runtime: Option<i32>,
    pub actors: Vec<String>,
    pub studios: Vec<String>,
    pub tmdb_id: Option<String>,
    pub imdb_id: Option<String>,
    pub tmdb_url: Option<String>,
    pub imdb_url: Option<String>,
}

impl From<movie::Model> for Movie {
    fn from(m: movie::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            original_title: m.original_title,
            letterboxd_url: m.letterboxd_url,
            average_rating: m.average_rating,
            genres: decode_list(&m.genres),
            release_date: m.release_date,
            synopsis: m.synopsis,
            runtime: m.runtime,
            actors: decode_list(&m.actors),
            studios: decode_list(&m.studios),
            tmdb_id: m.tmdb_id,
            imdb_id: m.imdb_id,
            tmdb_url: m.tmdb_url,
            imdb_url: m.imdb_url,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Review {
    pub id: String,
    pub movie_id: String,
    pub author: String,
    pub content: String,
    pub rating: Option<f64>,
    pub date: String,
    pub likes: i32,
    pub comments: i32,
    pub letterboxd_url: String,
    pub sentiment_score: Option<f64>,
}

impl From<review::Model> for Review {
    fn from(r: review::Model) -> Self {
        Self {
            id: r.id,
            movie_id: r.movie_id,
            author: r.author,
            content: r.content,
            rating: r.rating,
            date: r.date,
            likes: r.likes,
            comments: r.comments,
            letterboxd_url: r.letterboxd_url,
            sentiment_score: r.sentiment_score,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CatalogReport {
    pub pages_scraped: u32,
    pub movies_found: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct MetadataReport {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReviewHarvestReport {
    pub total_movies: usize,
    pub total_reviews: usize,
    pub failed_movies: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalyzeReport {
    pub processed_reviews: usize,
}

#[derive(Debug, Deserialize)]
pub struct ScrapePagesRequest {
    pub start_page: Option<u32>,
    pub total_pages: Option<u32>,
}

/// List-valued movie fields are stored as JSON text columns.
pub fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

pub fn decode_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_codec_round_trips() {
        let items = vec!["Drama".to_string(), "Action".to_string()];
        assert_eq!(decode_list(&encode_list(&items)), items);
    }

    #[test]
    fn decode_list_tolerates_garbage() {
        assert!(decode_list("not json").is_empty());
        assert!(decode_list("").is_empty());
    }
}

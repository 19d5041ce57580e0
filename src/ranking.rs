use std::collections::HashMap;

use serde::Serialize;

use crate::entities::{movie, review};

pub const SENTIMENT_WEIGHT: f64 = 0.6;
pub const LIKES_WEIGHT: f64 = 0.25;
pub const COMMENTS_WEIGHT: f64 = 0.15;

/// Average sentiment assigned to a movie with no scored reviews.
pub const NEUTRAL_SENTIMENT: f64 = 0.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieRanking {
    pub rank: u32,
    pub id: String,
    pub title: String,
    pub review_count: usize,
    pub average_sentiment: f64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub ranking_score: f64,
}

/// Order movies by a weighted blend of average review sentiment and each
/// movie's share of all likes and comments. Every input movie appears in the
/// output exactly once; ties are broken ascending by id so repeated runs
/// produce the same order.
pub fn rank(movies: &[movie::Model], reviews: &[review::Model]) -> Vec<MovieRanking> {
    let grand_likes: i64 = reviews.iter().map(|r| i64::from(r.likes)).sum();
    let grand_comments: i64 = reviews.iter().map(|r| i64::from(r.comments)).sum();

    let mut by_movie: HashMap<&str, Vec<&review::Model>> = HashMap::new();
    for review in reviews {
        by_movie.entry(review.movie_id.as_str()).or_default().push(review);
    }

    let mut rankings: Vec<MovieRanking> = movies
        .iter()
        .map(|m| {
            let movie_reviews = by_movie.get(m.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);

            let scores: Vec<f64> =
                movie_reviews.iter().filter_map(|r| r.sentiment_score).collect();
            let average_sentiment = if scores.is_empty() {
                NEUTRAL_SENTIMENT
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };

            let total_likes: i64 = movie_reviews.iter().map(|r| i64::from(r.likes)).sum();
            let total_comments: i64 = movie_reviews.iter().map(|r| i64::from(r.comments)).sum();

            let ranking_score = average_sentiment * SENTIMENT_WEIGHT
                + total_likes as f64 / grand_likes.max(1) as f64 * LIKES_WEIGHT
                + total_comments as f64 / grand_comments.max(1) as f64 * COMMENTS_WEIGHT;

            MovieRanking {
                rank: 0,
                id: m.id.clone(),
                title: m.title.clone(),
                review_count: movie_reviews.len(),
                average_sentiment: round3(average_sentiment),
                total_likes,
                total_comments,
                ranking_score: round3(ranking_score),
            }
        })
        .collect();

    rankings.sort_by(|a, b| {
        b.ranking_score.total_cmp(&a.ranking_score).then_with(|| a.id.cmp(&b.id))
    });

    for (i, entry) in rankings.iter_mut().enumerate() {
        entry.rank = i as u32 + 1;
    }

    rankings
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn movie(id: &str, title: &str) -> movie::Model {
        movie::Model {
            id: id.to_string(),
            title: title.to_string(),
            original_title: None,
            letterboxd_url: format!("https://letterboxd.com/film/{id}/"),
            average_rating: None,
            genres: "[]".to_string(),
            release_date: None,
            synopsis: None,
            runtime: None,
            actors: "[]".to_string(),
            studios: "[]".to_string(),
            tmdb_id: None,
            imdb_id: None,
            tmdb_url: None,
            imdb_url: None,
            created_at: 0,
        }
    }

    fn review(
        id: &str,
        movie_id: &str,
        sentiment: Option<f64>,
        likes: i32,
        comments: i32,
    ) -> review::Model {
        review::Model {
            id: id.to_string(),
            movie_id: movie_id.to_string(),
            author: "someone".to_string(),
            content: "a review".to_string(),
            rating: None,
            date: "2024-01-01".to_string(),
            likes,
            comments,
            letterboxd_url: "https://letterboxd.com/".to_string(),
            sentiment_score: sentiment,
            created_at: 0,
        }
    }

    #[test]
    fn output_preserves_the_input_id_set() {
        let movies = vec![movie("a", "A"), movie("b", "B"), movie("c", "C")];
        let reviews = vec![
            review("r1", "a", Some(0.5), 3, 1),
            review("r2", "b", None, 0, 0),
        ];

        let ranked = rank(&movies, &reviews);

        let input_ids: HashSet<&str> = movies.iter().map(|m| m.id.as_str()).collect();
        let output_ids: HashSet<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ranked.len(), movies.len());
        assert_eq!(input_ids, output_ids);
    }

    #[test]
    fn pinned_weights_favor_sentiment_over_engagement() {
        // Movie A: one glowing review with little engagement.
        // Movie B: one lukewarm review hoarding nearly all likes and comments.
        let movies = vec![movie("a", "A"), movie("b", "B")];
        let reviews = vec![
            review("r1", "a", Some(0.8), 10, 2),
            review("r2", "b", Some(0.2), 100, 50),
        ];

        let ranked = rank(&movies, &reviews);

        assert_eq!(ranked[0].id, "a");
        assert_eq!(ranked[1].id, "b");
        // 0.8 * 0.6 + (10/110) * 0.25 + (2/52) * 0.15
        assert_eq!(ranked[0].ranking_score, 0.508);
        // 0.2 * 0.6 + (100/110) * 0.25 + (50/52) * 0.15
        assert_eq!(ranked[1].ranking_score, 0.492);
    }

    #[test]
    fn movie_without_reviews_gets_the_neutral_default() {
        let movies = vec![movie("a", "A"), movie("b", "B")];
        let reviews = vec![review("r1", "a", Some(0.9), 5, 1)];

        let ranked = rank(&movies, &reviews);

        let b = ranked.iter().find(|r| r.id == "b").unwrap();
        assert_eq!(b.review_count, 0);
        assert_eq!(b.average_sentiment, NEUTRAL_SENTIMENT);
        assert_eq!(b.ranking_score, 0.0);
        assert_eq!(ranked[0].id, "a");
    }

    #[test]
    fn unscored_reviews_still_count_toward_engagement() {
        let movies = vec![movie("a", "A")];
        let reviews = vec![
            review("r1", "a", Some(0.4), 1, 0),
            review("r2", "a", None, 9, 3),
        ];

        let ranked = rank(&movies, &reviews);

        assert_eq!(ranked[0].review_count, 2);
        assert_eq!(ranked[0].average_sentiment, 0.4);
        assert_eq!(ranked[0].total_likes, 10);
        assert_eq!(ranked[0].total_comments, 3);
    }

    #[test]
    fn negative_consensus_ranks_below_an_unreviewed_movie() {
        let movies = vec![movie("panned", "Panned"), movie("unseen", "Unseen")];
        let reviews = vec![review("r1", "panned", Some(-0.5), 0, 0)];

        let ranked = rank(&movies, &reviews);

        assert_eq!(ranked[0].id, "unseen");
        assert_eq!(ranked[1].id, "panned");
        assert!(ranked[1].ranking_score < 0.0);
    }

    #[test]
    fn ties_break_ascending_by_id() {
        let movies = vec![movie("zeta", "Z"), movie("alpha", "A"), movie("mid", "M")];

        let ranked = rank(&movies, &[]);

        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn ranking_is_idempotent() {
        let movies = vec![movie("a", "A"), movie("b", "B"), movie("c", "C")];
        let reviews = vec![
            review("r1", "a", Some(0.7), 12, 4),
            review("r2", "b", Some(-0.1), 40, 9),
            review("r3", "c", None, 7, 0),
        ];

        assert_eq!(rank(&movies, &reviews), rank(&movies, &reviews));
    }
}

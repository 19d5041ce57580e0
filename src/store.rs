use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};

use crate::{
    entities::{movie, review},
    error::AppResult,
    models::{FilmMetadata, ScrapedMovie, ScrapedReview, encode_list},
};

#[derive(Clone)]
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_movies(&self) -> AppResult<Vec<movie::Model>> {
        let movies =
            movie::Entity::find().order_by_asc(movie::Column::Id).all(&self.db).await?;
        Ok(movies)
    }

    pub async fn list_reviews(&self) -> AppResult<Vec<review::Model>> {
        let reviews =
            review::Entity::find().order_by_asc(review::Column::Id).all(&self.db).await?;
        Ok(reviews)
    }

    /// Insert listing results, keeping ids stable for films seen before.
    /// A refresh overwrites the title and average rating only.
    pub async fn upsert_movies(&self, movies: &[ScrapedMovie]) -> AppResult<usize> {
        let now = now_sec();
        let empty = encode_list(&[]);

        for m in movies {
            let model = movie::ActiveModel {
                id: Set(uuid::Uuid::new_v4().to_string()),
                title: Set(m.title.clone()),
                original_title: Set(None),
                letterboxd_url: Set(m.letterboxd_url.clone()),
                average_rating: Set(m.average_rating),
                genres: Set(empty.clone()),
                release_date: Set(None),
                synopsis: Set(None),
                runtime: Set(None),
                actors: Set(empty.clone()),
                studios: Set(empty.clone()),
                tmdb_id: Set(None),
                imdb_id: Set(None),
                tmdb_url: Set(None),
                imdb_url: Set(None),
                created_at: Set(now),
            };

            movie::Entity::insert(model)
                .on_conflict(
                    sea_orm::sea_query::OnConflict::column(movie::Column::LetterboxdUrl)
                        .update_columns([movie::Column::Title, movie::Column::AverageRating])
                        .to_owned(),
                )
                .exec(&self.db)
                .await?;
        }

        Ok(movies.len())
    }

    pub async fn update_metadata(&self, movie_id: &str, meta: &FilmMetadata) -> AppResult<()> {
        let model = movie::ActiveModel {
            id: Set(movie_id.to_string()),
            original_title: Set(meta.original_title.clone()),
            synopsis: Set(meta.synopsis.clone()),
            runtime: Set(meta.runtime),
            actors: Set(encode_list(&meta.actors)),
            genres: Set(encode_list(&meta.genres)),
            studios: Set(encode_list(&meta.studios)),
            release_date: Set(meta.release_year.map(|y| format!("{y}-01-01"))),
            tmdb_id: Set(meta.tmdb_id.clone()),
            imdb_id: Set(meta.imdb_id.clone()),
            tmdb_url: Set(meta.tmdb_url.clone()),
            imdb_url: Set(meta.imdb_url.clone()),
            ..Default::default()
        };

        movie::Entity::update(model).exec(&self.db).await?;
        Ok(())
    }

    /// Store one page of scraped reviews. Reviews are identified by
    /// (movie, author, date) so re-scraping the same pages is idempotent;
    /// an existing sentiment score is never touched.
    pub async fn upsert_reviews(
        &self,
        movie_id: &str,
        reviews: &[ScrapedReview],
    ) -> AppResult<usize> {
        let now = now_sec();

        let txn = self.db.begin().await?;

        for r in reviews {
            let model = review::ActiveModel {
                id: Set(uuid::Uuid::new_v4().to_string()),
                movie_id: Set(movie_id.to_string()),
                author: Set(r.author.clone()),
                content: Set(r.content.clone()),
                rating: Set(r.rating),
                date: Set(r.date.to_string()),
                likes: Set(r.likes),
                comments: Set(r.comments),
                letterboxd_url: Set(r.letterboxd_url.clone()),
                sentiment_score: Set(None),
                created_at: Set(now),
            };

            review::Entity::insert(model)
                .on_conflict(
                    sea_orm::sea_query::OnConflict::columns([
                        review::Column::MovieId,
                        review::Column::Author,
                        review::Column::Date,
                    ])
                    .update_columns([
                        review::Column::Content,
                        review::Column::Rating,
                        review::Column::Likes,
                        review::Column::Comments,
                        review::Column::LetterboxdUrl,
                    ])
                    .to_owned(),
                )
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        Ok(reviews.len())
    }

    /// Keyset page of reviews still waiting for a sentiment score.
    pub async fn unscored_reviews(
        &self,
        after: Option<&str>,
        limit: u64,
    ) -> AppResult<Vec<review::Model>> {
        let mut query = review::Entity::find()
            .filter(review::Column::SentimentScore.is_null())
            .order_by_asc(review::Column::Id)
            .limit(limit);

        if let Some(last_id) = after {
            query = query.filter(review::Column::Id.gt(last_id));
        }

        Ok(query.all(&self.db).await?)
    }

    pub async fn apply_scores(&self, updates: &[(String, f64)]) -> AppResult<()> {
        for (id, score) in updates {
            let model = review::ActiveModel {
                id: Set(id.clone()),
                sentiment_score: Set(Some(*score)),
                ..Default::default()
            };
            review::Entity::update(model).exec(&self.db).await?;
        }
        Ok(())
    }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::decode_list;

    async fn test_store() -> Store {
        let db = crate::db::connect_and_migrate("sqlite::memory:")
            .await
            .expect("in-memory database should migrate");
        Store::new(db)
    }

    fn scraped_movie(title: &str, url: &str) -> ScrapedMovie {
        ScrapedMovie {
            title: title.to_string(),
            letterboxd_url: url.to_string(),
            average_rating: Some(3.5),
        }
    }

    fn scraped_review(author: &str, date: &str, likes: i32) -> ScrapedReview {
        ScrapedReview {
            author: author.to_string(),
            content: format!("{author} on this film"),
            rating: Some(4.0),
            date: date.parse().unwrap(),
            likes,
            comments: 1,
            letterboxd_url: "https://letterboxd.com/film/vikram-2022/reviews/".to_string(),
        }
    }

    #[tokio::test]
    async fn movie_upsert_keeps_id_stable_across_rescrapes() {
        let store = test_store().await;
        let url = "https://letterboxd.com/film/vikram-2022/";

        store.upsert_movies(&[scraped_movie("Vikram", url)]).await.unwrap();
        let first = store.list_movies().await.unwrap();
        assert_eq!(first.len(), 1);

        store
            .upsert_movies(&[ScrapedMovie {
                title: "Vikram (2022)".to_string(),
                letterboxd_url: url.to_string(),
                average_rating: Some(4.1),
            }])
            .await
            .unwrap();

        let second = store.list_movies().await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, first[0].id);
        assert_eq!(second[0].title, "Vikram (2022)");
        assert_eq!(second[0].average_rating, Some(4.1));
    }

    #[tokio::test]
    async fn metadata_refresh_overwrites_detail_fields() {
        let store = test_store().await;
        store
            .upsert_movies(&[scraped_movie("Vikram", "https://letterboxd.com/film/vikram-2022/")])
            .await
            .unwrap();
        let movie = store.list_movies().await.unwrap().remove(0);

        let meta = FilmMetadata {
            original_title: Some("விக்ரம்".to_string()),
            synopsis: Some("An agent returns.".to_string()),
            runtime: Some(173),
            actors: vec!["Kamal Haasan".to_string()],
            genres: vec!["Action".to_string(), "Thriller".to_string()],
            studios: vec!["Raaj Kamal Films".to_string()],
            release_year: Some(2022),
            tmdb_id: Some("833339".to_string()),
            imdb_id: Some("tt9179430".to_string()),
            tmdb_url: Some("https://www.themoviedb.org/movie/833339/".to_string()),
            imdb_url: Some("http://www.imdb.com/title/tt9179430/".to_string()),
        };
        store.update_metadata(&movie.id, &meta).await.unwrap();

        let updated = store.list_movies().await.unwrap().remove(0);
        assert_eq!(updated.original_title.as_deref(), Some("விக்ரம்"));
        assert_eq!(updated.runtime, Some(173));
        assert_eq!(updated.release_date.as_deref(), Some("2022-01-01"));
        assert_eq!(decode_list(&updated.genres), vec!["Action", "Thriller"]);
        // listing fields survive the refresh
        assert_eq!(updated.title, "Vikram");
    }

    #[tokio::test]
    async fn review_upsert_is_idempotent_and_preserves_scores() {
        let store = test_store().await;
        store
            .upsert_movies(&[scraped_movie("Vikram", "https://letterboxd.com/film/vikram-2022/")])
            .await
            .unwrap();
        let movie = store.list_movies().await.unwrap().remove(0);

        store
            .upsert_reviews(&movie.id, &[scraped_review("cinephile42", "2024-03-18", 10)])
            .await
            .unwrap();
        let stored = store.list_reviews().await.unwrap().remove(0);
        store.apply_scores(&[(stored.id.clone(), 0.8)]).await.unwrap();

        // Same (movie, author, date) scraped again with fresher counts.
        store
            .upsert_reviews(&movie.id, &[scraped_review("cinephile42", "2024-03-18", 25)])
            .await
            .unwrap();

        let reviews = store.list_reviews().await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].id, stored.id);
        assert_eq!(reviews[0].likes, 25);
        assert_eq!(reviews[0].sentiment_score, Some(0.8));
    }

    #[tokio::test]
    async fn unscored_reviews_paginate_by_id() {
        let store = test_store().await;
        store
            .upsert_movies(&[scraped_movie("Vikram", "https://letterboxd.com/film/vikram-2022/")])
            .await
            .unwrap();
        let movie = store.list_movies().await.unwrap().remove(0);

        store
            .upsert_reviews(
                &movie.id,
                &[
                    scraped_review("one", "2024-03-01", 1),
                    scraped_review("two", "2024-03-02", 2),
                    scraped_review("three", "2024-03-03", 3),
                ],
            )
            .await
            .unwrap();

        let all = store.unscored_reviews(None, 100).await.unwrap();
        assert_eq!(all.len(), 3);

        // Scored reviews drop out of the pending set.
        store.apply_scores(&[(all[0].id.clone(), 0.5)]).await.unwrap();
        let remaining = store.unscored_reviews(None, 100).await.unwrap();
        assert_eq!(remaining.len(), 2);

        // Keyset pagination walks the rest in id order.
        let first_page = store.unscored_reviews(None, 1).await.unwrap();
        assert_eq!(first_page.len(), 1);
        let second_page =
            store.unscored_reviews(Some(&first_page[0].id), 100).await.unwrap();
        assert_eq!(second_page.len(), 1);
        assert!(second_page[0].id > first_page[0].id);
    }
}

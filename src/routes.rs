use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use serde_json::{Value, json};

use crate::{
    AppState,
    error::AppResult,
    models::{
        AnalyzeReport, CatalogReport, MetadataReport, Movie, Review, ReviewHarvestReport,
        ScrapePagesRequest,
    },
    processor,
    ranking::{self, MovieRanking},
};

pub async fn index() -> Json<Value> {
    Json(json!({ "message": "Welcome to the reelrank API!" }))
}

pub async fn list_movies(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Movie>>> {
    let movies = state.store.list_movies().await?;
    Ok(Json(movies.into_iter().map(Movie::from).collect()))
}

pub async fn list_reviews(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Review>>> {
    let reviews = state.store.list_reviews().await?;
    Ok(Json(reviews.into_iter().map(Review::from).collect()))
}

pub async fn movie_rankings(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<MovieRanking>>> {
    let movies = state.store.list_movies().await?;
    let reviews = state.store.list_reviews().await?;
    Ok(Json(ranking::rank(&movies, &reviews)))
}

pub async fn scrape_movies(
    State(state): State<Arc<AppState>>,
    Query(req): Query<ScrapePagesRequest>,
) -> AppResult<Json<CatalogReport>> {
    let start_page = req.start_page.unwrap_or(1).max(1);
    let total_pages = req.total_pages.unwrap_or(1).max(1);

    let report = processor::scrape_catalog(
        &state.http,
        &state.store,
        &state.config.letterboxd_base_url,
        &state.config.letterboxd_language,
        start_page,
        total_pages,
        state.config.letterboxd_delay_ms,
    )
    .await?;

    Ok(Json(report))
}

pub async fn refresh_metadata(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<MetadataReport>> {
    let report =
        processor::refresh_metadata(&state.http, &state.store, state.config.max_concurrent)
            .await?;
    Ok(Json(report))
}

pub async fn harvest_reviews(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ReviewHarvestReport>> {
    let report = processor::harvest_reviews(
        &state.http,
        &state.store,
        state.config.max_concurrent,
        state.config.letterboxd_delay_ms,
    )
    .await?;
    Ok(Json(report))
}

pub async fn analyze_reviews(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<AnalyzeReport>> {
    let report = processor::analyze_pending(
        &state.store,
        &state.sentiment,
        state.config.sentiment_batch_size,
        state.config.sentiment_fetch_size,
    )
    .await?;
    Ok(Json(report))
}

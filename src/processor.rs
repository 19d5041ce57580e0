use std::time::Duration;

use futures::{StreamExt, stream};
use jiff::civil::Date;
use tracing::{debug, info, warn};

use crate::{
    entities::movie,
    error::AppResult,
    models::{AnalyzeReport, CatalogReport, MetadataReport, ReviewHarvestReport},
    scraper,
    sentiment::SentimentClient,
    store::Store,
};

/// Walk the popular-films listing, storing every film found. A page that
/// fails to fetch is skipped so one bad page never aborts the run.
pub async fn scrape_catalog(
    http: &reqwest::Client,
    store: &Store,
    base_url: &str,
    language: &str,
    start_page: u32,
    total_pages: u32,
    delay_ms: u64,
) -> AppResult<CatalogReport> {
    let end_page = start_page + total_pages;

    let mut pages_scraped = 0;
    let mut movies_found = 0;

    for page in start_page..end_page {
        match scraper::fetch_popular_page(http, base_url, language, page).await {
            Ok(html) => {
                pages_scraped += 1;
                let movies = scraper::parse_popular_page(&html, base_url);
                if movies.is_empty() {
                    warn!(page = page, "no films found on page");
                } else {
                    let stored = store.upsert_movies(&movies).await?;
                    debug!(page = page, films = stored, "stored films from page");
                    movies_found += stored;
                }
            },
            Err(err) => {
                warn!(page = page, error = %err, "failed to fetch popular page, skipping");
            },
        }

        if page + 1 < end_page {
            let delay = delay_ms + scraper::jitter_ms(150);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    info!(pages = pages_scraped, films = movies_found, "completed catalog scrape");
    Ok(CatalogReport { pages_scraped, movies_found })
}

/// Re-scrape the film page of every stored movie and overwrite its detail
/// fields.
pub async fn refresh_metadata(
    http: &reqwest::Client,
    store: &Store,
    max_concurrent: usize,
) -> AppResult<MetadataReport> {
    let movies = store.list_movies().await?;
    let total = movies.len();

    if total == 0 {
        info!("no movies to process");
        return Ok(MetadataReport { total: 0, completed: 0, failed: 0 });
    }

    debug!(total = total, "refreshing film metadata");

    let outcomes: Vec<bool> = stream::iter(movies)
        .map(|movie| async move {
            let result: AppResult<()> = async {
                let meta = scraper::fetch_film_metadata(http, &movie.letterboxd_url).await?;
                store.update_metadata(&movie.id, &meta).await?;
                Ok(())
            }
            .await;

            match result {
                Ok(()) => {
                    debug!(title = %movie.title, "updated film metadata");
                    true
                },
                Err(err) => {
                    warn!(title = %movie.title, error = %err, "failed to refresh film metadata");
                    false
                },
            }
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let completed = outcomes.iter().filter(|ok| **ok).count();
    Ok(MetadataReport { total, completed, failed: total - completed })
}

/// Harvest reviews for every stored movie, walking each movie's review
/// pages until an empty one.
pub async fn harvest_reviews(
    http: &reqwest::Client,
    store: &Store,
    max_concurrent: usize,
    delay_ms: u64,
) -> AppResult<ReviewHarvestReport> {
    let movies = store.list_movies().await?;
    let total_movies = movies.len();

    if total_movies == 0 {
        info!("no movies to process");
        return Ok(ReviewHarvestReport { total_movies: 0, total_reviews: 0, failed_movies: 0 });
    }

    let outcomes: Vec<Option<usize>> = stream::iter(movies)
        .map(|movie| async move {
            match harvest_movie_reviews(http, store, &movie, delay_ms).await {
                Ok(count) => {
                    debug!(title = %movie.title, reviews = count, "stored reviews");
                    Some(count)
                },
                Err(err) => {
                    warn!(title = %movie.title, error = %err, "failed to harvest reviews");
                    None
                },
            }
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let total_reviews = outcomes.iter().flatten().sum();
    let failed_movies = outcomes.iter().filter(|o| o.is_none()).count();

    info!(
        movies = total_movies,
        reviews = total_reviews,
        failed = failed_movies,
        "completed review harvest"
    );
    Ok(ReviewHarvestReport { total_movies, total_reviews, failed_movies })
}

async fn harvest_movie_reviews(
    http: &reqwest::Client,
    store: &Store,
    movie: &movie::Model,
    delay_ms: u64,
) -> AppResult<usize> {
    let mut total = 0;
    let mut page = 1;

    loop {
        let html = scraper::fetch_review_page(http, &movie.letterboxd_url, page).await?;
        let today: Date = jiff::Zoned::now().into();
        let reviews = scraper::parse_review_page(&html, &movie.letterboxd_url, today);

        if reviews.is_empty() {
            break;
        }

        total += store.upsert_reviews(&movie.id, &reviews).await?;
        debug!(title = %movie.title, page = page, reviews = reviews.len(), "processed review page");

        page += 1;
        let delay = delay_ms + scraper::jitter_ms(150);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    Ok(total)
}

/// Score every review still missing a sentiment score. Reviews are pulled
/// in keyset pages and scored in batches; a failed batch is skipped and its
/// reviews stay pending for the next run.
pub async fn analyze_pending(
    store: &Store,
    sentiment: &SentimentClient,
    batch_size: usize,
    fetch_size: u64,
) -> AppResult<AnalyzeReport> {
    let mut processed = 0;
    let mut last_id: Option<String> = None;

    loop {
        let pending = store.unscored_reviews(last_id.as_deref(), fetch_size).await?;
        if pending.is_empty() {
            break;
        }

        debug!(fetched = pending.len(), "fetched reviews pending sentiment");
        last_id = pending.last().map(|r| r.id.clone());

        for batch in pending.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|r| r.content.clone()).collect();

            match sentiment.score_batch(&texts).await {
                Ok(scores) => {
                    let updates: Vec<(String, f64)> =
                        batch.iter().map(|r| r.id.clone()).zip(scores).collect();
                    store.apply_scores(&updates).await?;
                    processed += updates.len();
                },
                Err(err) => {
                    warn!(error = %err, batch = batch.len(), "failed to score review batch, skipping");
                },
            }
        }

        if (pending.len() as u64) < fetch_size {
            break;
        }
    }

    info!(processed = processed, "sentiment analysis complete");
    Ok(AnalyzeReport { processed_reviews: processed })
}

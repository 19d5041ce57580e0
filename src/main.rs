mod config;
mod db;
mod entities;
mod error;
mod models;
mod processor;
mod ranking;
mod routes;
mod scraper;
mod sentiment;
mod store;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::Config, sentiment::SentimentClient, store::Store};

// Letterboxd serves empty pages to obvious bot agents.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub store: Store,
    pub sentiment: Arc<SentimentClient>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,reelrank=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let store = Store::new(db);

    let sentiment = SentimentClient::new(
        http.clone(),
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        config.openai_model.clone(),
        config.openai_rps,
        Duration::from_secs(60),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        http,
        store,
        sentiment: Arc::new(sentiment),
    });

    let app = Router::new()
        .route("/", get(routes::index))
        .route("/movies", get(routes::list_movies))
        .route("/movies/rankings", get(routes::movie_rankings))
        .route("/reviews", get(routes::list_reviews))
        .route("/scraping/movies", post(routes::scrape_movies))
        .route("/scraping/metadata", post(routes::refresh_metadata))
        .route("/scraping/reviews", post(routes::harvest_reviews))
        .route("/scraping/analyze", post(routes::analyze_reviews))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

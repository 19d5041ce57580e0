use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub letterboxd_base_url: String,
    pub letterboxd_language: String,
    pub letterboxd_delay_ms: u64,
    pub max_concurrent: usize,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_rps: u32,
    pub sentiment_batch_size: usize,
    pub sentiment_fetch_size: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://reelrank.db?mode=rwc".to_string());

        let letterboxd_base_url = std::env::var("LETTERBOXD_BASE_URL")
            .unwrap_or_else(|_| "https://letterboxd.com".to_string());

        let letterboxd_language =
            std::env::var("LETTERBOXD_LANGUAGE").unwrap_or_else(|_| "tamil".to_string());

        let letterboxd_delay_ms: u64 =
            std::env::var("LETTERBOXD_DELAY_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(2000);

        let max_concurrent: usize =
            std::env::var("MAX_CONCURRENT_REQUESTS").ok().and_then(|s| s.parse().ok()).unwrap_or(5);

        let openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| "".to_string());
        let openai_base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let openai_model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());

        let openai_rps: u32 =
            std::env::var("OPENAI_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(2);

        let sentiment_batch_size: usize =
            std::env::var("SENTIMENT_BATCH_SIZE").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let sentiment_fetch_size: u64 =
            std::env::var("SENTIMENT_FETCH_SIZE").ok().and_then(|s| s.parse().ok()).unwrap_or(5000);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            letterboxd_base_url,
            letterboxd_language,
            letterboxd_delay_ms,
            max_concurrent,
            openai_api_key,
            openai_base_url,
            openai_model,
            openai_rps,
            sentiment_batch_size,
            sentiment_fetch_size,
        })
    }
}

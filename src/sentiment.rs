use std::{num::NonZeroU32, sync::Arc, time::Duration};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

const MAX_RETRIES: u32 = 3;

const SYSTEM_PROMPT: &str = "You are a film review sentiment analysis expert. \
    Respond only with a JSON object containing an array of sentiment scores, \
    in the format {\"scores\": [0.37, -0.73, 0.9]}.";

#[derive(Debug, thiserror::Error)]
pub enum SentimentError {
    #[error("sentiment request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed sentiment response: {0}")]
    Malformed(String),
    #[error("expected {expected} sentiment scores, got {got}")]
    CountMismatch { expected: usize, got: usize },
}

pub struct SentimentClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    retry_base: Duration,
}

impl SentimentClient {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        base_url: String,
        model: String,
        rps: u32,
        retry_base: Duration,
    ) -> Self {
        // Warn once on app load if using mock scores
        if api_key.trim().is_empty() {
            warn!("Using neutral mock sentiment scores - no OPENAI_API_KEY provided");
        }

        let limiter =
            Arc::new(RateLimiter::direct(Quota::per_second(NonZeroU32::new(rps.max(1)).unwrap())));
        Self { client, api_key, base_url, model, limiter, retry_base }
    }

    /// Score a batch of review texts, one score in [-1.0, 1.0] per text.
    pub async fn score_batch(&self, texts: &[String]) -> Result<Vec<f64>, SentimentError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Use mock scores if the API key is not provided
        if self.api_key.trim().is_empty() {
            return Ok(vec![0.0; texts.len()]);
        }

        let mut attempt = 0;

        loop {
            match self.request_scores(texts).await {
                Ok(scores) => return Ok(scores),
                Err(err) if attempt < MAX_RETRIES => {
                    let wait = self.retry_base * 2u32.pow(attempt);
                    warn!(
                        error = %err,
                        attempt = attempt,
                        wait_secs = wait.as_secs(),
                        "sentiment request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                },
                Err(err) => return Err(err),
            }
        }
    }

    async fn request_scores(&self, texts: &[String]) -> Result<Vec<f64>, SentimentError> {
        self.limiter.until_ready().await;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT.to_string() },
                ChatMessage { role: "user", content: build_prompt(texts) },
            ],
            temperature: 0.7,
            max_tokens: 4096,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let resp: ChatResponse = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SentimentError::Malformed("response has no choices".to_string()))?;

        parse_scores(&content, texts.len())
    }
}

fn build_prompt(texts: &[String]) -> String {
    let mut reviews = String::new();
    for (i, text) in texts.iter().enumerate() {
        reviews.push_str(&format!("Review {i}: {text}\n\n"));
    }

    format!(
        "Analyze the following movie reviews, considering narrative, technical \
         aspects (direction, acting, music), emotional impact, and commercial \
         and artistic merit.\n\n\
         For each review, provide a sentiment score between -1 and 1, where:\n\
         - -1 represents extremely negative/disappointing\n\
         - -0.5 represents moderately negative\n\
         - 0 represents neutral/mixed feelings\n\
         - 0.5 represents moderately positive\n\
         - 1 represents extremely positive/exceptional\n\n\
         Reviews to analyze:\n{reviews}\
         Return ONLY a JSON object with a \"scores\" array of numbers in the \
         same order as the reviews."
    )
}

fn parse_scores(content: &str, expected: usize) -> Result<Vec<f64>, SentimentError> {
    let payload: ScorePayload = serde_json::from_str(content)
        .map_err(|e| SentimentError::Malformed(e.to_string()))?;

    if payload.scores.len() != expected {
        return Err(SentimentError::CountMismatch { expected, got: payload.scores.len() });
    }

    Ok(payload.scores.into_iter().map(|s| s.clamp(-1.0, 1.0)).collect())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ScorePayload {
    scores: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn prompt_numbers_each_review() {
        let texts = vec!["Loved it.".to_string(), "Hated it.".to_string()];
        let prompt = build_prompt(&texts);
        assert!(prompt.contains("Review 0: Loved it."));
        assert!(prompt.contains("Review 1: Hated it."));
    }

    #[test]
    fn scores_parse_in_order() {
        let scores = parse_scores(r#"{"scores": [0.8, -0.3, 0.0]}"#, 3).unwrap();
        assert_eq!(scores, vec![0.8, -0.3, 0.0]);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let scores = parse_scores(r#"{"scores": [2.5, -3.0]}"#, 2).unwrap();
        assert_eq!(scores, vec![1.0, -1.0]);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let err = parse_scores(r#"{"scores": [0.5]}"#, 2).unwrap_err();
        assert!(matches!(err, SentimentError::CountMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let err = parse_scores("not json", 1).unwrap_err();
        assert!(matches!(err, SentimentError::Malformed(_)));
    }

    fn test_client(base_url: &str, api_key: &str) -> SentimentClient {
        SentimentClient::new(
            reqwest::Client::new(),
            api_key.to_string(),
            base_url.to_string(),
            "gpt-3.5-turbo".to_string(),
            100,
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn score_batch_parses_chat_completion() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "choices": [
                { "message": { "content": "{\"scores\": [0.8, -0.2]}" } }
            ]
        });

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), "test-key");
        let scores = client
            .score_batch(&["Loved it.".to_string(), "Hated it.".to_string()])
            .await
            .unwrap();

        assert_eq!(scores, vec![0.8, -0.2]);
    }

    #[tokio::test]
    async fn missing_api_key_yields_neutral_scores() {
        let client = test_client("http://unused.invalid", "");
        let scores =
            client.score_batch(&["One.".to_string(), "Two.".to_string()]).await.unwrap();
        assert_eq!(scores, vec![0.0, 0.0]);

        let empty = client.score_batch(&[]).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn server_errors_surface_after_retries() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .expect(u64::from(MAX_RETRIES) + 1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), "test-key");
        let err = client.score_batch(&["Fine.".to_string()]).await.unwrap_err();
        assert!(matches!(err, SentimentError::Http(_)));
    }
}

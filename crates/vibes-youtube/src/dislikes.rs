//! Client for the Return YouTube Dislike aggregation service.
//!
//! One client per worker process with a keep-alive pool; failures are soft
//! (`DislikeData::default()`), never fatal for the video row.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::BackendResult;
use crate::types::ProcessingCounters;

pub const DEFAULT_DISLIKE_API_URL: &str = "https://returnyoutubedislikeapi.com";

/// Dislike service configuration.
#[derive(Debug, Clone)]
pub struct DislikeConfig {
    /// Service base URL
    pub base_url: String,
    pub max_retries: u32,
    /// Base delay for exponential backoff on 429s
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for DislikeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DISLIKE_API_URL.to_string(),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl DislikeConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("DISLIKE_API_URL").unwrap_or(defaults.base_url),
            max_retries: std::env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_delay: std::env::var("RETRY_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .map(Duration::from_secs_f64)
                .unwrap_or(defaults.retry_delay),
            ..defaults
        }
    }
}

/// Vote data for one video. `None` fields mean the service had nothing or
/// the call failed; the merge step falls back to scraped values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DislikeData {
    pub likes: Option<i64>,
    pub dislikes: Option<i64>,
    pub rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct VotesResponse {
    #[serde(default)]
    likes: Option<i64>,
    #[serde(default)]
    dislikes: Option<i64>,
    #[serde(default)]
    rating: Option<f64>,
}

/// HTTP client for the votes endpoint.
pub struct DislikeClient {
    http: reqwest::Client,
    config: DislikeConfig,
    counters: ProcessingCounters,
}

impl DislikeClient {
    pub fn new(config: DislikeConfig, counters: ProcessingCounters) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(5)
            .build()?;
        Ok(Self {
            http,
            config,
            counters,
        })
    }

    /// Fetch vote data for one video.
    ///
    /// 429 responses back off exponentially (`retry_delay * 2^attempt`) up to
    /// `max_retries`; timeouts retry with the flat delay; anything else is a
    /// soft failure returning empty data.
    pub async fn votes(&self, video_id: &str) -> DislikeData {
        let url = format!("{}/votes?videoId={}", self.config.base_url, video_id);
        let mut attempt: u32 = 0;

        loop {
            // Small jitter so a batch of lookups does not land at once.
            let jitter_ms = rand::thread_rng().gen_range(100..=300);
            tokio::time::sleep(Duration::from_millis(jitter_ms)).await;

            match self.http.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => match resp.json::<VotesResponse>().await
                {
                    Ok(body) => {
                        return DislikeData {
                            likes: body.likes,
                            dislikes: body.dislikes,
                            rating: body.rating,
                        }
                    }
                    Err(e) => {
                        warn!(video_id, error = %e, "Dislike response body unreadable");
                        return DislikeData::default();
                    }
                },
                Ok(resp) if resp.status().as_u16() == 429 => {
                    if attempt < self.config.max_retries {
                        self.counters.record_rate_limit();
                        let wait = self.config.retry_delay * 2u32.pow(attempt);
                        warn!(
                            video_id,
                            wait_secs = wait.as_secs(),
                            attempt = attempt + 1,
                            max = self.config.max_retries,
                            "Rate limited on dislike service, backing off"
                        );
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                        continue;
                    }
                    warn!(video_id, "Dislike service rate limit persisted, giving up");
                    return DislikeData::default();
                }
                Ok(resp) => {
                    warn!(video_id, status = %resp.status(), "Dislike fetch failed");
                    return DislikeData::default();
                }
                Err(e) if e.is_timeout() && attempt < self.config.max_retries => {
                    self.counters.record_retry();
                    debug!(video_id, attempt = attempt + 1, "Dislike fetch timeout, retrying");
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(video_id, error = %e, "Dislike fetch failed");
                    return DislikeData::default();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> DislikeConfig {
        DislikeConfig {
            base_url,
            max_retries: 2,
            retry_delay: Duration::from_millis(10),
            connect_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn votes_parses_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/votes"))
            .and(query_param("videoId", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "likes": 120, "dislikes": 4, "rating": 4.8
            })))
            .mount(&server)
            .await;

        let client =
            DislikeClient::new(test_config(server.uri()), ProcessingCounters::new()).unwrap();
        let data = client.votes("abc").await;
        assert_eq!(data.likes, Some(120));
        assert_eq!(data.dislikes, Some(4));
        assert_eq!(data.rating, Some(4.8));
    }

    #[tokio::test]
    async fn votes_retries_through_rate_limits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/votes"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/votes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "likes": 7, "dislikes": 1
            })))
            .mount(&server)
            .await;

        let counters = ProcessingCounters::new();
        let client = DislikeClient::new(test_config(server.uri()), counters.clone()).unwrap();
        let data = client.votes("xyz").await;

        assert_eq!(data.likes, Some(7));
        assert_eq!(counters.snapshot().rate_limits, 1);
    }

    #[tokio::test]
    async fn votes_soft_fails_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/votes"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client =
            DislikeClient::new(test_config(server.uri()), ProcessingCounters::new()).unwrap();
        assert_eq!(client.votes("gone").await, DislikeData::default());
    }

    #[tokio::test]
    async fn votes_exhausts_rate_limit_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/votes"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let counters = ProcessingCounters::new();
        let client = DislikeClient::new(test_config(server.uri()), counters.clone()).unwrap();
        assert_eq!(client.votes("hot").await, DislikeData::default());
        assert_eq!(counters.snapshot().rate_limits, 2);
    }
}

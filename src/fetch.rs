use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::FetchSettings;
use crate::error::{Error, Result};

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 500;

/// HTTP client for retrieving the pages to extract.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    backoff: Duration,
}

impl Fetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(Error::Client)?;
        Ok(Self {
            client,
            backoff: Duration::from_millis(BASE_BACKOFF_MS),
        })
    }

    /// Shorten the retry delay; tests use this to avoid sleeping.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Download the body of `url`, retrying rate limits, server errors and transport failures.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            let outcome = self.client.get(url).send().await;
            let retryable = match &outcome {
                Ok(resp) => should_retry(resp.status()),
                Err(e) => !e.is_builder(),
            };

            if retryable && attempt < MAX_RETRIES {
                let backoff = self.backoff * 2u32.pow(attempt);
                warn!(
                    "Fetching {} failed (attempt {}/{}), backing off {:.1}s",
                    url,
                    attempt + 1,
                    MAX_RETRIES,
                    backoff.as_secs_f64()
                );
                attempt += 1;
                tokio::time::sleep(backoff).await;
                continue;
            }

            let resp = outcome.map_err(|source| Error::Fetch {
                url: url.to_string(),
                source,
            })?;
            let status = resp.status();
            if !status.is_success() {
                return Err(Error::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = resp.bytes().await.map_err(|source| Error::Fetch {
                url: url.to_string(),
                source,
            })?;
            debug!(url, bytes = body.len(), "fetched page");
            return Ok(body.to_vec());
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        let settings = FetchSettings {
            timeout_secs: 5,
            user_agent: "montaigne-test".into(),
        };
        Fetcher::new(&settings).unwrap().with_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/essay"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch_bytes(&format!("{}/essay", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, b"<p>hi</p>");
    }

    #[tokio::test]
    async fn missing_page_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch_bytes(&format!("{}/gone", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(u64::from(MAX_RETRIES) + 1)
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch_bytes(&format!("{}/busy", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_fetch_error() {
        let err = fetcher().fetch_bytes("http://127.0.0.1:9/").await.unwrap_err();
        assert!(err.is_fetch());
    }

    #[test]
    fn invalid_user_agent_is_a_client_error() {
        let settings = FetchSettings {
            timeout_secs: 5,
            user_agent: "montaigne\nbroken".into(),
        };
        let result = Fetcher::new(&settings);
        assert!(matches!(result, Err(Error::Client(_))));
        if let Err(err) = result {
            assert!(!err.is_fetch());
            assert!(err.to_string().starts_with("failed to build http client"));
        }
    }
}

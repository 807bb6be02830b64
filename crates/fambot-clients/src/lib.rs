//! HTTP clients for the external collaborators.
//!
//! Thin JSON wrappers with a shared retry discipline: up to 3 attempts with
//! a 5 second pause on transport errors and non-2xx responses.

use std::time::Duration;

use fambot_core::{Error, Result};
use tracing::info;

pub mod audio;
pub mod currency;
pub mod deepl;
pub mod miniflux;
pub mod openai;
pub mod weather;

pub(crate) const MAX_RETRY: u32 = 3;
pub(crate) const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Build the shared HTTP client all API wrappers use.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| Error::Api(format!("http client build failed: {e}")))
}

/// GET `url` and return the body, retrying failed attempts.
pub(crate) async fn get_with_retry(http: &reqwest::Client, url: &str) -> Result<String> {
    let mut last_err = Error::Api("max retries reached".to_string());

    for attempt in 1..=MAX_RETRY {
        let result = async {
            let resp = http
                .get(url)
                .send()
                .await
                .map_err(|e| Error::Api(format!("request error: {e}")))?;
            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| Error::Api(format!("body read error: {e}")))?;
            if !status.is_success() {
                return Err(Error::Api(format!(
                    "got error response from api: {status} - {}",
                    body.chars().take(200).collect::<String>()
                )));
            }
            Ok(body)
        }
        .await;

        match result {
            Ok(body) => return Ok(body),
            Err(e) => {
                if attempt < MAX_RETRY {
                    info!(attempt, err = %e, "api request failed, retrying in 5 seconds");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                last_err = e;
            }
        }
    }

    Err(last_err)
}

//! DeepL translation client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use fambot_core::{ports::TranslationApi, Error, Result};

use crate::{MAX_RETRY, RETRY_DELAY};

pub struct DeeplClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl DeeplClient {
    pub fn new(api_key: String, base_url: String, http: reqwest::Client) -> Self {
        Self {
            api_key,
            base_url,
            http,
        }
    }
}

#[derive(Debug, Serialize)]
struct TranslationIn<'a> {
    text: &'a [String],
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslationOut {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

#[async_trait]
impl TranslationApi for DeeplClient {
    async fn translate(&self, texts: &[String], target_lang: &str) -> Result<String> {
        let url = format!("{}/v2/translate", self.base_url);
        let payload = TranslationIn {
            text: texts,
            target_lang,
        };

        let mut last_err = Error::Api("max retries reached".to_string());
        for attempt in 1..=MAX_RETRY {
            let result = async {
                let resp = self
                    .http
                    .post(&url)
                    .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|e| Error::Api(format!("deepl request error: {e}")))?;

                let status = resp.status();
                if !status.is_success() {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(Error::Api(format!(
                        "deepl error response: {status} - {}",
                        body.chars().take(200).collect::<String>()
                    )));
                }

                let out: TranslationOut = resp
                    .json()
                    .await
                    .map_err(|e| Error::Api(format!("deepl json error: {e}")))?;
                Ok(out
                    .translations
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            .await;

            match result {
                Ok(text) => return Ok(text),
                Err(e) => {
                    if attempt < MAX_RETRY {
                        info!(attempt, err = %e, "deepl request failed, retrying in 5 seconds");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_translation_payload() {
        let body = r#"{"translations": [
            {"detected_source_language": "EN", "text": "Привет"},
            {"detected_source_language": "EN", "text": "Мир"}
        ]}"#;
        let out: TranslationOut = serde_json::from_str(body).unwrap();
        let joined = out
            .translations
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(joined, "Привет\nМир");
    }
}

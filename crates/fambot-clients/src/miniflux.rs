//! Miniflux news-feed client.

use async_trait::async_trait;
use serde::Deserialize;

use fambot_core::{
    ports::{Headline, NewsApi},
    Error, Result,
};

pub struct MinifluxClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl MinifluxClient {
    pub fn new(base_url: String, api_key: String, http: reqwest::Client) -> Self {
        Self {
            base_url,
            api_key,
            http,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("X-Auth-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Api(format!("miniflux request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api(format!(
                "miniflux error response: {status} - {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        resp.json()
            .await
            .map_err(|e| Error::Api(format!("miniflux json error: {e}")))
    }
}

#[async_trait]
impl NewsApi for MinifluxClient {
    async fn latest(&self, site_url: &str, limit: usize) -> Result<Vec<Headline>> {
        let feeds: Vec<Feed> = self.get_json("/v1/feeds").await?;
        let feed = feeds
            .iter()
            .find(|f| f.site_url.starts_with(site_url))
            .ok_or_else(|| Error::Api(format!("no feed configured for {site_url}")))?;

        let entries: EntriesResponse = self
            .get_json(&format!(
                "/v1/feeds/{}/entries?limit={limit}&order=published_at&direction=desc",
                feed.id
            ))
            .await?;

        Ok(entries
            .entries
            .into_iter()
            .map(|e| Headline {
                title: e.title,
                url: e.url,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct Feed {
    id: i64,
    site_url: String,
}

#[derive(Debug, Deserialize)]
struct EntriesResponse {
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: String,
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feeds_and_entries() {
        let feeds: Vec<Feed> = serde_json::from_str(
            r#"[{"id": 3, "site_url": "https://www.nytimes.com/section/world", "title": "NYT"}]"#,
        )
        .unwrap();
        assert_eq!(feeds[0].id, 3);
        assert!(feeds[0].site_url.starts_with("https://www.nytimes.com"));

        let entries: EntriesResponse = serde_json::from_str(
            r#"{"total": 1, "entries": [{"title": "Big news", "url": "https://example.com/a"}]}"#,
        )
        .unwrap();
        assert_eq!(entries.entries[0].title, "Big news");
    }
}

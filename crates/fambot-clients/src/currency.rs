//! currencyapi.com exchange-rate client.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;

use fambot_core::{
    ports::{ExchangeRateApi, ExchangeRates},
    Result,
};

use crate::get_with_retry;

const LATEST_URL: &str = "https://api.currencyapi.com/v3/latest";
const HISTORICAL_URL: &str = "https://api.currencyapi.com/v3/historical";

pub struct CurrencyApiClient {
    api_key: String,
    http: reqwest::Client,
}

impl CurrencyApiClient {
    pub fn new(api_key: String, http: reqwest::Client) -> Self {
        Self { api_key, http }
    }
}

#[async_trait]
impl ExchangeRateApi for CurrencyApiClient {
    async fn rates_at(&self, at: DateTime<Utc>) -> Result<ExchangeRates> {
        // The latest endpoint only covers the last day; anything older goes
        // through the historical one.
        let url = if at < Utc::now() - ChronoDuration::hours(24) {
            format!(
                "{HISTORICAL_URL}?apikey={}&date={}",
                self.api_key,
                at.format("%Y-%m-%d")
            )
        } else {
            format!("{LATEST_URL}?apikey={}", self.api_key)
        };

        let body = get_with_retry(&self.http, &url).await?;
        let resp: RatesResponse = serde_json::from_str(&body)?;
        Ok(ExchangeRates {
            rub: resp.data.rub.value,
            eur: resp.data.eur.value,
            btc: resp.data.btc.value,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    data: RatesData,
}

#[derive(Debug, Deserialize)]
struct RatesData {
    #[serde(rename = "BTC")]
    btc: RateValue,
    #[serde(rename = "EUR")]
    eur: RateValue,
    #[serde(rename = "RUB")]
    rub: RateValue,
}

#[derive(Debug, Deserialize)]
struct RateValue {
    value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rates_payload() {
        let body = r#"{
            "meta": {"last_updated_at": "2026-02-01T23:59:59Z"},
            "data": {
                "BTC": {"value": 0.000025},
                "EUR": {"value": 0.92},
                "RUB": {"value": 101.5}
            }
        }"#;
        let resp: RatesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.data.rub.value, 101.5);
        assert_eq!(resp.data.eur.value, 0.92);
        assert_eq!(resp.data.btc.value, 0.000025);
    }
}

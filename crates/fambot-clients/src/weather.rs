//! OpenWeatherMap 5-day forecast client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use fambot_core::{
    config::CityLocation,
    ports::{CityForecast, WeatherApi},
    Error, Result,
};

use crate::get_with_retry;

const FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

pub struct OpenWeatherClient {
    api_key: String,
    cities: Vec<CityLocation>,
    http: reqwest::Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String, cities: Vec<CityLocation>, http: reqwest::Client) -> Self {
        Self {
            api_key,
            cities,
            http,
        }
    }

    async fn forecast(&self, city: &CityLocation) -> Result<CityForecast> {
        let url = format!(
            "{FORECAST_URL}?lat={}&lon={}&appid={}&units=metric",
            city.lat, city.lon, self.api_key
        );
        let body = get_with_retry(&self.http, &url).await?;
        let resp: ForecastResponse = serde_json::from_str(&body)?;
        to_city_forecast(&city.name, resp)
    }
}

#[async_trait]
impl WeatherApi for OpenWeatherClient {
    async fn forecasts(&self) -> Vec<CityForecast> {
        let mut out = Vec::new();
        for city in &self.cities {
            match self.forecast(city).await {
                Ok(f) => out.push(f),
                Err(e) => warn!(city = %city.name, err = %e, "could not get weather"),
            }
        }
        out
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastItem>,
    city: CityInfo,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    main: MainInfo,
    #[serde(default)]
    weather: Vec<WeatherInfo>,
    #[serde(default)]
    dt_txt: String,
}

#[derive(Debug, Deserialize)]
struct MainInfo {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherInfo {
    description: String,
}

#[derive(Debug, Deserialize)]
struct CityInfo {
    timezone: i32,
    sunrise: i64,
    sunset: i64,
}

fn to_city_forecast(name: &str, resp: ForecastResponse) -> Result<CityForecast> {
    let first = resp
        .list
        .first()
        .ok_or_else(|| Error::Api("empty forecast list".to_string()))?;

    let (min_temp, max_temp) = min_max_first_day(&resp.list);

    Ok(CityForecast {
        city: name.to_string(),
        current_temp: first.main.temp,
        min_temp,
        max_temp,
        description: first
            .weather
            .first()
            .map(|w| w.description.clone())
            .unwrap_or_default(),
        sunrise_unix: resp.city.sunrise,
        sunset_unix: resp.city.sunset,
        utc_offset_secs: resp.city.timezone,
    })
}

/// Min/max over the entries that share the first entry's calendar day.
///
/// `dt_txt` is `YYYY-MM-DD HH:MM:SS`, so the date is a 10-byte prefix.
fn min_max_first_day(items: &[ForecastItem]) -> (f64, f64) {
    let Some(first) = items.first() else {
        return (0.0, 0.0);
    };
    let first_day = day_of(&first.dt_txt);

    let mut min = first.main.temp;
    let mut max = first.main.temp;
    for item in items {
        if day_of(&item.dt_txt) != first_day {
            break;
        }
        min = min.min(item.main.temp);
        max = max.max(item.main.temp);
    }
    (min, max)
}

fn day_of(dt_txt: &str) -> &str {
    dt_txt.get(..10).unwrap_or(dt_txt)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "list": [
            {"dt": 1, "main": {"temp": 4.0}, "weather": [{"description": "light rain"}], "dt_txt": "2026-02-01 09:00:00"},
            {"dt": 2, "main": {"temp": 8.5}, "weather": [{"description": "clear sky"}], "dt_txt": "2026-02-01 12:00:00"},
            {"dt": 3, "main": {"temp": 1.0}, "weather": [{"description": "snow"}], "dt_txt": "2026-02-02 09:00:00"}
        ],
        "city": {"name": "Somewhere", "timezone": 3600, "sunrise": 1767250000, "sunset": 1767280000}
    }"#;

    #[test]
    fn parses_forecast_and_limits_min_max_to_the_first_day() {
        let resp: ForecastResponse = serde_json::from_str(SAMPLE).unwrap();
        let f = to_city_forecast("Lisbon", resp).unwrap();

        assert_eq!(f.city, "Lisbon");
        assert_eq!(f.current_temp, 4.0);
        // The 1.0°C entry is on the next day and must not count.
        assert_eq!(f.min_temp, 4.0);
        assert_eq!(f.max_temp, 8.5);
        assert_eq!(f.description, "light rain");
        assert_eq!(f.utc_offset_secs, 3600);
    }

    #[test]
    fn empty_list_is_an_error() {
        let resp: ForecastResponse = serde_json::from_str(
            r#"{"list": [], "city": {"timezone": 0, "sunrise": 0, "sunset": 0}}"#,
        )
        .unwrap();
        assert!(to_city_forecast("X", resp).is_err());
    }
}

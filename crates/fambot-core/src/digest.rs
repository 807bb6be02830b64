//! The daily morning digest: composition and scheduling.

use std::{cmp::Ordering, sync::Arc};

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Local, Offset, TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    delivery::Delivery,
    domain::ChatId,
    formatting::escape_markdown,
    metrics,
    outbound::{OutboundMessage, ParseMode},
    ports::{CityForecast, ExchangeRateApi, NewsApi, TranslationApi, WeatherApi},
};

/// A trigger closer than this is treated as already fired, so a process
/// restart right at the boundary cannot double-send.
const TRIGGER_GUARD_SECS: i64 = 5;

/// The next wall-clock occurrence of `hour:00` local time after `now`.
pub fn next_trigger(now: DateTime<Local>, hour: u32) -> DateTime<Local> {
    let today = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest());
    let Some(today) = today else {
        return now + ChronoDuration::days(1);
    };

    if today - now <= ChronoDuration::seconds(TRIGGER_GUARD_SECS) {
        today + ChronoDuration::days(1)
    } else {
        today
    }
}

/// Coldest city first.
pub fn sort_forecasts(forecasts: &mut [CityForecast]) {
    forecasts.sort_by(|a, b| {
        a.current_temp
            .partial_cmp(&b.current_temp)
            .unwrap_or(Ordering::Equal)
    });
}

/// One city rendered for MarkdownV2 output, bold name plus escaped body.
pub fn format_city(f: &CityForecast) -> String {
    let offset = FixedOffset::east_opt(f.utc_offset_secs).unwrap_or_else(|| Utc.fix());
    let local_time = |unix: i64| -> String {
        match Utc.timestamp_opt(unix, 0).single() {
            Some(t) => t.with_timezone(&offset).format("%H:%M").to_string(),
            None => "--:--".to_string(),
        }
    };

    let body = format!(
        "  {}°C (min: {}°C, max: {}°C), {}\n  sunrise: {} sunset: {}\n",
        f.current_temp as i64,
        f.min_temp as i64,
        f.max_temp as i64,
        f.description,
        local_time(f.sunrise_unix),
        local_time(f.sunset_unix),
    );

    format!("*{}:*\n{}", escape_markdown(&f.city), escape_markdown(&body))
}

/// Gathers the digest sections from the external collaborators.
///
/// Every section is independently fallible: a failing collaborator skips
/// its section and never aborts the digest.
#[derive(Clone)]
pub struct Composer {
    exchange: Arc<dyn ExchangeRateApi>,
    weather: Arc<dyn WeatherApi>,
    news: Arc<dyn NewsApi>,
    translator: Arc<dyn TranslationApi>,
    news_site_urls: Vec<String>,
    news_per_source: usize,
    news_target_lang: String,
}

impl Composer {
    pub fn new(
        exchange: Arc<dyn ExchangeRateApi>,
        weather: Arc<dyn WeatherApi>,
        news: Arc<dyn NewsApi>,
        translator: Arc<dyn TranslationApi>,
        news_site_urls: Vec<String>,
        news_per_source: usize,
        news_target_lang: String,
    ) -> Self {
        Self {
            exchange,
            weather,
            news,
            translator,
            news_site_urls,
            news_per_source,
            news_target_lang,
        }
    }

    /// The digest text, MarkdownV2-ready.
    pub async fn compose(&self) -> String {
        let mut text = String::from("Good morning\\! 🌅\n");

        if let Some(s) = self.currency_section().await {
            text.push_str(&s);
        }
        if let Some(s) = self.weather_section().await {
            text.push_str(&s);
        }
        if let Some(s) = self.news_section().await {
            text.push_str(&s);
        }

        text
    }

    async fn currency_section(&self) -> Option<String> {
        let now = Utc::now();
        let today = match self.exchange.rates_at(now).await {
            Ok(v) => v,
            Err(e) => {
                error!(err = %e, "could not get exchange rates");
                return None;
            }
        };
        let prior = match self.exchange.rates_at(now - ChronoDuration::hours(48)).await {
            Ok(v) => v,
            Err(e) => {
                error!(err = %e, "could not get historical exchange rates");
                return None;
            }
        };

        let usd_rub_today = today.rub;
        let eur_rub_today = today.rub / today.eur;
        let btc_usd_today = 1.0 / today.btc;
        let usd_rub_prior = prior.rub;
        let eur_rub_prior = prior.rub / prior.eur;
        let btc_usd_prior = 1.0 / prior.btc;

        let body = format!(
            "USD {:.2}₽ ({:+.2}%)\nEUR {:.2}₽ ({:+.2}%)\nBTC {:.2}$ ({:+.2}%)\n",
            usd_rub_today,
            (usd_rub_today / usd_rub_prior - 1.0) * 100.0,
            eur_rub_today,
            (eur_rub_today / eur_rub_prior - 1.0) * 100.0,
            btc_usd_today,
            (btc_usd_today / btc_usd_prior - 1.0) * 100.0,
        );

        Some(format!("\n_Exchange rates:_\n{}", escape_markdown(&body)))
    }

    async fn weather_section(&self) -> Option<String> {
        let mut forecasts = self.weather.forecasts().await;
        if forecasts.is_empty() {
            return None;
        }
        sort_forecasts(&mut forecasts);

        let mut out = String::from("\n_Weather forecast:_\n");
        for f in &forecasts {
            out.push_str(&format_city(f));
        }
        Some(out)
    }

    async fn news_section(&self) -> Option<String> {
        let mut out = String::new();
        let mut idx = 1usize;

        for site in &self.news_site_urls {
            let headlines = match self.news.latest(site, self.news_per_source).await {
                Ok(h) if !h.is_empty() => h,
                Ok(_) => {
                    warn!(site, "news source returned no entries");
                    continue;
                }
                Err(e) => {
                    error!(site, err = %e, "news lookup failed");
                    continue;
                }
            };

            out.push_str(&escape_markdown(site_label(site)));
            out.push('\n');
            for h in headlines {
                let title = match self
                    .translator
                    .translate(std::slice::from_ref(&h.title), &self.news_target_lang)
                    .await
                {
                    Ok(t) if !t.trim().is_empty() => t,
                    Ok(_) => h.title.clone(),
                    Err(e) => {
                        warn!(err = %e, "headline translation failed, keeping original");
                        h.title.clone()
                    }
                };
                out.push_str(&format!(
                    "{idx}\\. [{}]({})\n",
                    escape_markdown(&title),
                    escape_markdown(&h.url)
                ));
                idx += 1;
            }
        }

        if out.is_empty() {
            None
        } else {
            Some(format!("\n_Latest news:_\n{out}"))
        }
    }
}

/// `https://www.example.com/path` -> `example.com`.
fn site_label(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    rest.split('/').next().unwrap_or(rest)
}

/// Long-lived loop: sleep until the next trigger, compose, deliver to the
/// home group. Section failures are non-fatal; only cancellation exits.
pub struct DigestScheduler {
    composer: Composer,
    delivery: Delivery,
    home_group: ChatId,
    hour: u32,
}

impl DigestScheduler {
    pub fn new(composer: Composer, delivery: Delivery, home_group: ChatId, hour: u32) -> Self {
        Self {
            composer,
            delivery,
            home_group,
            hour,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!("starting digest scheduler");
        loop {
            let next = next_trigger(Local::now(), self.hour);
            let wait = (next - Local::now()).to_std().unwrap_or_default();
            info!(wait_secs = wait.as_secs(), "sleeping until next digest");

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("digest scheduler stopped");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            metrics::inc_digest_run();
            let text = self.composer.compose().await;
            self.delivery
                .send(
                    OutboundMessage::plain(self.home_group, text)
                        .parse_mode(ParseMode::MarkdownV2)
                        .no_link_preview(),
                )
                .await;
        }
    }
}

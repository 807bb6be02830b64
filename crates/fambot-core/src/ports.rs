//! Ports (traits) for the transport and the external collaborators.
//!
//! Telegram and the HTTP APIs are adapter concerns; the core only sees
//! these shapes.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    conversation::ConversationHistory,
    domain::{ChatId, MessageId},
    outbound::{OutboundPhoto, SendOptions},
    Result,
};

/// The chat transport, as narrow as the delivery engine needs it.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn bot_username(&self) -> &str;

    async fn send_text(&self, chat: ChatId, text: &str, opts: &SendOptions)
        -> Result<MessageId>;

    async fn send_photo(&self, chat: ChatId, photo: &OutboundPhoto) -> Result<MessageId>;
}

/// Currency values quoted against USD.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExchangeRates {
    pub rub: f64,
    pub eur: f64,
    pub btc: f64,
}

#[async_trait]
pub trait ExchangeRateApi: Send + Sync {
    /// Rates as of `at`; implementations pick the latest or a historical
    /// endpoint depending on how far back `at` lies.
    async fn rates_at(&self, at: DateTime<Utc>) -> Result<ExchangeRates>;
}

/// One city's forecast summary.
#[derive(Clone, Debug)]
pub struct CityForecast {
    pub city: String,
    pub current_temp: f64,
    pub min_temp: f64,
    pub max_temp: f64,
    pub description: String,
    pub sunrise_unix: i64,
    pub sunset_unix: i64,
    /// The city's UTC offset, for rendering sunrise/sunset in local time.
    pub utc_offset_secs: i32,
}

#[async_trait]
pub trait WeatherApi: Send + Sync {
    /// Forecasts for every configured city. Cities whose lookup failed are
    /// skipped (and logged) inside the implementation.
    async fn forecasts(&self) -> Vec<CityForecast>;
}

#[async_trait]
pub trait ChatCompletionApi: Send + Sync {
    async fn complete(&self, question: &str, history: &ConversationHistory) -> Result<String>;

    async fn correct_grammar(&self, text: &str) -> Result<String>;

    async fn transcribe(&self, audio: &Path) -> Result<String>;
}

#[async_trait]
pub trait TranslationApi: Send + Sync {
    /// Translate `texts` into `target_lang`, returning the joined result.
    async fn translate(&self, texts: &[String], target_lang: &str) -> Result<String>;
}

#[derive(Clone, Debug)]
pub struct Headline {
    pub title: String,
    pub url: String,
}

#[async_trait]
pub trait NewsApi: Send + Sync {
    async fn latest(&self, site_url: &str, limit: usize) -> Result<Vec<Headline>>;
}

/// Voice-note transcription: transport download + transcoding + speech-to-text,
/// composed behind one port so the handler stays transport-agnostic.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe_voice(&self, file_id: &str) -> Result<String>;
}

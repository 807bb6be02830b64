//! Shared test doubles for the core crate's unit tests.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    auth::AuthGate,
    config::Config,
    conversation::{ConversationHistory, Conversations},
    delivery::Delivery,
    digest::Composer,
    dispatcher::BotCtx,
    domain::{ChatId, ChatKind, InboundMessage, MessageId, UserId},
    errors::Error,
    outbound::{OutboundPhoto, ParseMode, SendOptions},
    ports::{
        ChatCompletionApi, CityForecast, ExchangeRateApi, ExchangeRates, Headline,
        MessagingPort, NewsApi, Transcriber, TranslationApi, WeatherApi,
    },
    store::AuthStore,
    Result,
};

pub const HOME_GROUP: i64 = -100;
pub const ADMIN_USER: i64 = 1;
pub const PLAIN_USER: i64 = 500;

#[derive(Clone, Debug)]
pub struct SentMessage {
    pub chat: ChatId,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub reply_to: Option<MessageId>,
    pub disable_link_preview: bool,
}

#[derive(Default)]
pub struct RecordingPort {
    sends: Mutex<Vec<SentMessage>>,
    photos: Mutex<Vec<OutboundPhoto>>,
}

impl RecordingPort {
    pub fn sends(&self) -> Vec<SentMessage> {
        self.sends.lock().unwrap().clone()
    }

    pub fn photos(&self) -> Vec<OutboundPhoto> {
        self.photos.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sends.lock().unwrap().clear();
        self.photos.lock().unwrap().clear();
    }
}

#[async_trait]
impl MessagingPort for RecordingPort {
    fn bot_username(&self) -> &str {
        "testbot"
    }

    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<MessageId> {
        self.sends.lock().unwrap().push(SentMessage {
            chat,
            text: text.to_string(),
            parse_mode: opts.parse_mode,
            reply_to: opts.reply_to,
            disable_link_preview: opts.disable_link_preview,
        });
        Ok(MessageId(1))
    }

    async fn send_photo(&self, _chat: ChatId, photo: &OutboundPhoto) -> Result<MessageId> {
        self.photos.lock().unwrap().push(photo.clone());
        Ok(MessageId(1))
    }
}

/// In-memory [`AuthStore`].
#[derive(Default)]
pub struct MemStore {
    allowed: Mutex<BTreeSet<i64>>,
    invites: Mutex<BTreeSet<String>>,
}

impl MemStore {
    pub fn is_allowed_sync(&self, chat_id: i64) -> bool {
        self.allowed.lock().unwrap().contains(&chat_id)
    }
}

#[async_trait]
impl AuthStore for MemStore {
    async fn add_chat(&self, chat_id: i64) -> Result<()> {
        self.allowed.lock().unwrap().insert(chat_id);
        Ok(())
    }

    async fn remove_chat(&self, chat_id: i64) -> Result<()> {
        self.allowed.lock().unwrap().remove(&chat_id);
        Ok(())
    }

    async fn is_chat_allowed(&self, chat_id: i64) -> Result<bool> {
        Ok(self.allowed.lock().unwrap().contains(&chat_id))
    }

    async fn list_chats(&self) -> Result<Vec<i64>> {
        Ok(self.allowed.lock().unwrap().iter().copied().collect())
    }

    async fn create_invite(&self, token: &str) -> Result<()> {
        self.invites.lock().unwrap().insert(token.to_string());
        Ok(())
    }

    async fn consume_invite(&self, token: &str) -> Result<bool> {
        Ok(self.invites.lock().unwrap().remove(token))
    }
}

#[derive(Default)]
pub struct StubCompletion {
    fail: AtomicBool,
}

impl StubCompletion {
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(Error::Api("stub failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChatCompletionApi for StubCompletion {
    async fn complete(&self, _question: &str, _history: &ConversationHistory) -> Result<String> {
        self.check()?;
        Ok("stub answer".to_string())
    }

    async fn correct_grammar(&self, text: &str) -> Result<String> {
        self.check()?;
        Ok(format!("corrected: {text}"))
    }

    async fn transcribe(&self, _audio: &Path) -> Result<String> {
        self.check()?;
        Ok("stub file transcript".to_string())
    }
}

pub struct StubWeather;

#[async_trait]
impl WeatherApi for StubWeather {
    async fn forecasts(&self) -> Vec<CityForecast> {
        Vec::new()
    }
}

pub struct StubExchange;

#[async_trait]
impl ExchangeRateApi for StubExchange {
    async fn rates_at(&self, _at: DateTime<Utc>) -> Result<ExchangeRates> {
        Err(Error::Api("no exchange data in tests".to_string()))
    }
}

pub struct StubNews;

#[async_trait]
impl NewsApi for StubNews {
    async fn latest(&self, _site_url: &str, _limit: usize) -> Result<Vec<Headline>> {
        Ok(Vec::new())
    }
}

pub struct StubTranslator;

#[async_trait]
impl TranslationApi for StubTranslator {
    async fn translate(&self, texts: &[String], _target_lang: &str) -> Result<String> {
        Ok(texts.join(" "))
    }
}

#[derive(Default)]
pub struct StubTranscriber {
    fail: AtomicBool,
}

impl StubTranscriber {
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe_voice(&self, _file_id: &str) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Api("stub failure".to_string()));
        }
        Ok("stub transcript".to_string())
    }
}

pub struct TestCtx {
    pub ctx: Arc<BotCtx>,
    pub port: Arc<RecordingPort>,
    pub store: Arc<MemStore>,
    pub completion: Arc<StubCompletion>,
    pub transcriber: Arc<StubTranscriber>,
}

impl TestCtx {
    fn msg(&self, chat: i64, kind: ChatKind, sender: i64, text: &str) -> InboundMessage {
        InboundMessage {
            chat: ChatId(chat),
            kind,
            sender: UserId(sender),
            message_id: MessageId(7),
            text: text.to_string(),
            voice: None,
            location: None,
        }
    }

    /// A non-admin user in a private chat.
    pub fn private_msg(&self, chat: i64, text: &str) -> InboundMessage {
        self.msg(chat, ChatKind::Private, PLAIN_USER, text)
    }

    /// The admin in their private chat.
    pub fn admin_private_msg(&self, text: &str) -> InboundMessage {
        self.msg(10, ChatKind::Private, ADMIN_USER, text)
    }

    /// A non-admin user in the home group.
    pub fn home_msg(&self, text: &str) -> InboundMessage {
        self.msg(HOME_GROUP, ChatKind::Group, PLAIN_USER, text)
    }

    /// A non-admin user in some other group.
    pub fn group_msg(&self, chat: i64, text: &str) -> InboundMessage {
        self.msg(chat, ChatKind::Group, PLAIN_USER, text)
    }
}

pub fn test_config() -> Config {
    Config {
        telegram_bot_token: "test-token".to_string(),
        home_group_id: HOME_GROUP,
        admin_user_ids: vec![ADMIN_USER],
        http_host: "127.0.0.1".to_string(),
        http_port: 0,
        debug: false,
        log_json: false,
        revision: None,
        cache_capacity: 10,
        cache_ttl: Duration::from_secs(600),
        context_window: None,
        store_path: PathBuf::from("/tmp/fambot-test-store.json"),
        invite_ttl: Duration::from_secs(24 * 3600),
        digest_hour: 7,
        news_site_urls: Vec::new(),
        news_per_source: 3,
        news_target_lang: "EN".to_string(),
        openweather_api_key: String::new(),
        weather_cities: Vec::new(),
        currency_api_key: String::new(),
        openai_api_key: String::new(),
        gpt_model: "test-model".to_string(),
        deepl_api_key: String::new(),
        deepl_base_url: String::new(),
        miniflux_base_url: String::new(),
        miniflux_api_key: String::new(),
    }
}

pub fn test_ctx() -> TestCtx {
    let cfg = Arc::new(test_config());
    let port = Arc::new(RecordingPort::default());
    let store = Arc::new(MemStore::default());
    let completion = Arc::new(StubCompletion::default());
    let transcriber = Arc::new(StubTranscriber::default());

    let delivery = Delivery::new(Arc::clone(&port) as Arc<dyn MessagingPort>);
    let gate = AuthGate::new(
        ChatId(cfg.home_group_id),
        cfg.admin_user_ids.clone(),
        Arc::clone(&store) as Arc<dyn AuthStore>,
    );
    let composer = Composer::new(
        Arc::new(StubExchange),
        Arc::new(StubWeather),
        Arc::new(StubNews),
        Arc::new(StubTranslator),
        cfg.news_site_urls.clone(),
        cfg.news_per_source,
        "EN".to_string(),
    );

    let ctx = Arc::new(BotCtx {
        cfg: Arc::clone(&cfg),
        delivery,
        gate,
        store: Arc::clone(&store) as Arc<dyn AuthStore>,
        conversations: Conversations::new(cfg.cache_capacity, cfg.cache_ttl),
        completion: Arc::clone(&completion) as Arc<dyn ChatCompletionApi>,
        weather: Arc::new(StubWeather),
        news: Arc::new(StubNews),
        transcriber: Arc::clone(&transcriber) as Arc<dyn Transcriber>,
        composer,
    });

    TestCtx {
        ctx,
        port,
        store,
        completion,
        transcriber,
    }
}

/// Poll until the port has seen at least `n` sends; panics after a (paused
/// clock) timeout.
pub async fn wait_for_sends(port: &Arc<RecordingPort>, n: usize) -> Vec<SentMessage> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    loop {
        let sends = port.sends();
        if sends.len() >= n {
            return sends;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {n} sends, saw {}", sends.len());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

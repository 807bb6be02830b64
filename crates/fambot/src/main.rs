use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use teloxide::Bot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use fambot_clients::{
    currency::CurrencyApiClient, deepl::DeeplClient, http_client, miniflux::MinifluxClient,
    openai::OpenAiClient, weather::OpenWeatherClient,
};
use fambot_core::{
    auth::AuthGate,
    config::Config,
    conversation::Conversations,
    delivery::Delivery,
    digest::{Composer, DigestScheduler},
    dispatcher::BotCtx,
    domain::ChatId,
    metrics,
    ports::{ChatCompletionApi, MessagingPort, NewsApi, Transcriber, WeatherApi},
    store::{AuthStore, FileStore},
};
use fambot_telegram::{router, TelegramMessenger, TelegramTranscriber};

mod web;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Arc::new(Config::load()?);
    fambot_core::logging::init(cfg.debug, cfg.log_json);

    let recorder = PrometheusBuilder::new().install_recorder()?;
    metrics::describe();

    // Bind before going async-background so a bad host/port is fatal at
    // startup.
    let listener =
        tokio::net::TcpListener::bind((cfg.http_host.as_str(), cfg.http_port)).await?;
    let web_task = tokio::spawn(web::serve(listener, recorder));

    let http = http_client()?;

    let store: Arc<dyn AuthStore> =
        Arc::new(FileStore::open(cfg.store_path.clone(), cfg.invite_ttl)?);
    let weather: Arc<dyn WeatherApi> = Arc::new(OpenWeatherClient::new(
        cfg.openweather_api_key.clone(),
        cfg.weather_cities.clone(),
        http.clone(),
    ));
    let exchange = Arc::new(CurrencyApiClient::new(
        cfg.currency_api_key.clone(),
        http.clone(),
    ));
    let completion: Arc<dyn ChatCompletionApi> = Arc::new(OpenAiClient::new(
        cfg.openai_api_key.clone(),
        cfg.gpt_model.clone(),
        http.clone(),
    ));
    let translator = Arc::new(DeeplClient::new(
        cfg.deepl_api_key.clone(),
        cfg.deepl_base_url.clone(),
        http.clone(),
    ));
    let news: Arc<dyn NewsApi> = Arc::new(MinifluxClient::new(
        cfg.miniflux_base_url.clone(),
        cfg.miniflux_api_key.clone(),
        http,
    ));

    let bot = Bot::new(cfg.telegram_bot_token.clone());
    let messenger = Arc::new(TelegramMessenger::connect(bot.clone()).await?);
    info!(username = messenger.bot_username(), "bot authorized");

    let delivery = Delivery::new(Arc::clone(&messenger) as Arc<dyn MessagingPort>);
    let transcriber: Arc<dyn Transcriber> =
        Arc::new(TelegramTranscriber::new(bot.clone(), Arc::clone(&completion)));

    let composer = Composer::new(
        exchange,
        Arc::clone(&weather),
        Arc::clone(&news),
        translator,
        cfg.news_site_urls.clone(),
        cfg.news_per_source,
        cfg.news_target_lang.clone(),
    );

    let ctx = Arc::new(BotCtx {
        cfg: Arc::clone(&cfg),
        delivery: delivery.clone(),
        gate: AuthGate::new(
            ChatId(cfg.home_group_id),
            cfg.admin_user_ids.clone(),
            Arc::clone(&store),
        ),
        store,
        conversations: Conversations::new(cfg.cache_capacity, cfg.cache_ttl),
        completion,
        weather,
        news,
        transcriber,
        composer: composer.clone(),
    });

    let cancel = CancellationToken::new();
    let scheduler = DigestScheduler::new(
        composer,
        delivery,
        ChatId(cfg.home_group_id),
        cfg.digest_hour,
    );
    let digest_task = tokio::spawn(scheduler.run(cancel.clone()));

    let result = router::run_polling(bot, ctx).await;
    if let Err(e) = &result {
        error!(err = %e, "update loop exited with error");
    }

    cancel.cancel();
    let _ = digest_task.await;
    web_task.abort();

    result
}

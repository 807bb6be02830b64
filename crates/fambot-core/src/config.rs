use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

/// One city the weather client reports on.
#[derive(Clone, Debug, PartialEq)]
pub struct CityLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Typed configuration, loaded from the environment (with optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub home_group_id: i64,
    pub admin_user_ids: Vec<i64>,

    // Liveness / metrics endpoint
    pub http_host: String,
    pub http_port: u16,

    // Behavior
    pub debug: bool,
    pub log_json: bool,
    pub revision: Option<String>,

    // Conversation cache
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    /// Optional read-side pruning window for completion history. `None`
    /// sends stored histories whole.
    pub context_window: Option<Duration>,

    // Persistent allow-set / invite tokens
    pub store_path: PathBuf,
    pub invite_ttl: Duration,

    // Digest
    pub digest_hour: u32,
    pub news_site_urls: Vec<String>,
    pub news_per_source: usize,
    pub news_target_lang: String,

    // External APIs
    pub openweather_api_key: String,
    pub weather_cities: Vec<CityLocation>,
    pub currency_api_key: String,
    pub openai_api_key: String,
    pub gpt_model: String,
    pub deepl_api_key: String,
    pub deepl_base_url: String,
    pub miniflux_base_url: String,
    pub miniflux_api_key: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let home_group_id = env_i64("HOME_GROUP_ID").ok_or_else(|| {
            Error::Config("HOME_GROUP_ID environment variable is required".to_string())
        })?;

        let admin_user_ids = parse_csv_i64(env_str("ADMIN_USER_IDS"));
        if admin_user_ids.is_empty() {
            return Err(Error::Config(
                "ADMIN_USER_IDS environment variable is required".to_string(),
            ));
        }

        let http_host = env_str("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let http_port = env_u16("HTTP_PORT").unwrap_or(8080);

        let debug = env_bool("DEBUG").unwrap_or(false);
        let log_json = env_bool("LOG_JSON").unwrap_or(false);
        let revision = env_str("REVISION").and_then(non_empty);

        let cache_capacity = env_usize("CACHE_CAPACITY").unwrap_or(1000);
        let cache_ttl = Duration::from_secs(60 * env_u64("CACHE_TTL_MIN").unwrap_or(30));
        let context_window = env_u64("CONTEXT_WINDOW_MIN")
            .filter(|m| *m > 0)
            .map(|m| Duration::from_secs(60 * m));

        let store_path = env_path("STORE_PATH")
            .unwrap_or_else(|| PathBuf::from("./data/fambot-store.json"));
        if let Some(parent) = store_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let invite_ttl = Duration::from_secs(3600 * env_u64("INVITE_TTL_HOURS").unwrap_or(24));

        let digest_hour = env_u32("DIGEST_HOUR").unwrap_or(7);
        if digest_hour > 23 {
            return Err(Error::Config(format!(
                "DIGEST_HOUR must be 0..=23, got {digest_hour}"
            )));
        }
        let news_site_urls = parse_csv(env_str("NEWS_SITE_URLS"));
        let news_per_source = env_usize("NEWS_PER_SOURCE").unwrap_or(3);
        let news_target_lang = env_str("NEWS_TARGET_LANG").unwrap_or_else(|| "EN".to_string());

        let openweather_api_key = env_str("OPENWEATHER_API_KEY").unwrap_or_default();
        let weather_cities = parse_cities(env_str("WEATHER_CITIES"))?;
        let currency_api_key = env_str("CURRENCY_API_KEY").unwrap_or_default();
        let openai_api_key = env_str("OPENAI_API_KEY").unwrap_or_default();
        let gpt_model = env_str("GPT_MODEL").unwrap_or_else(|| "gpt-5-mini".to_string());
        let deepl_api_key = env_str("DEEPL_API_KEY").unwrap_or_default();
        let deepl_base_url =
            env_str("DEEPL_BASE_URL").unwrap_or_else(|| "https://api-free.deepl.com".to_string());
        let miniflux_base_url = env_str("MINIFLUX_BASE_URL").unwrap_or_default();
        let miniflux_api_key = env_str("MINIFLUX_API_KEY").unwrap_or_default();

        Ok(Self {
            telegram_bot_token,
            home_group_id,
            admin_user_ids,
            http_host,
            http_port,
            debug,
            log_json,
            revision,
            cache_capacity,
            cache_ttl,
            context_window,
            store_path,
            invite_ttl,
            digest_hour,
            news_site_urls,
            news_per_source,
            news_target_lang,
            openweather_api_key,
            weather_cities,
            currency_api_key,
            openai_api_key,
            gpt_model,
            deepl_api_key,
            deepl_base_url,
            miniflux_base_url,
            miniflux_api_key,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

/// `WEATHER_CITIES` format: `Name=lat,lon;Other Name=lat,lon`.
fn parse_cities(v: Option<String>) -> Result<Vec<CityLocation>> {
    let Some(v) = v else {
        return Ok(Vec::new());
    };

    let mut cities = Vec::new();
    for part in v.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, coords) = part.split_once('=').ok_or_else(|| {
            Error::Config(format!("WEATHER_CITIES entry missing '=': {part}"))
        })?;
        let (lat, lon) = coords.split_once(',').ok_or_else(|| {
            Error::Config(format!("WEATHER_CITIES entry missing ',': {part}"))
        })?;
        let lat = lat.trim().parse::<f64>().map_err(|_| {
            Error::Config(format!("WEATHER_CITIES bad latitude in: {part}"))
        })?;
        let lon = lon.trim().parse::<f64>().map_err(|_| {
            Error::Config(format!("WEATHER_CITIES bad longitude in: {part}"))
        })?;
        cities.push(CityLocation {
            name: name.trim().to_string(),
            lat,
            lon,
        });
    }
    Ok(cities)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse::<i64>().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_u16(key: &str) -> Option<u16> {
    env_str(key).and_then(|s| s.trim().parse::<u16>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

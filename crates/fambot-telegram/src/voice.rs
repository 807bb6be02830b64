//! Voice-note pipeline: download from Telegram, transcode, transcribe.

use std::{
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
    sync::Arc,
};

use async_trait::async_trait;
use teloxide::{net::Download, prelude::*};

use fambot_clients::audio::convert_oga_to_mp3;
use fambot_core::{
    errors::Error,
    ports::{ChatCompletionApi, Transcriber},
    Result,
};

static VOICE_COUNTER: AtomicUsize = AtomicUsize::new(1);

pub struct TelegramTranscriber {
    bot: Bot,
    completion: Arc<dyn ChatCompletionApi>,
    temp_dir: PathBuf,
}

impl TelegramTranscriber {
    pub fn new(bot: Bot, completion: Arc<dyn ChatCompletionApi>) -> Self {
        Self {
            bot,
            completion,
            temp_dir: std::env::temp_dir(),
        }
    }

    async fn download_voice(&self, file_id: &str) -> Result<PathBuf> {
        let file = self
            .bot
            .get_file(file_id.to_string())
            .await
            .map_err(|e| Error::Telegram(format!("get_file failed: {e}")))?;

        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let n = VOICE_COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = self.temp_dir.join(format!("voice_{ts}_{n}.ogg"));

        let mut dst = tokio::fs::File::create(&path).await?;
        self.bot
            .download_file(&file.path, &mut dst)
            .await
            .map_err(|e| Error::Telegram(format!("voice download failed: {e}")))?;
        Ok(path)
    }
}

#[async_trait]
impl Transcriber for TelegramTranscriber {
    async fn transcribe_voice(&self, file_id: &str) -> Result<String> {
        let ogg = self.download_voice(file_id).await?;
        let mp3 = ogg.with_extension("mp3");

        let result = async {
            convert_oga_to_mp3(&ogg, &mp3).await?;
            self.completion.transcribe(&mp3).await
        }
        .await;

        let _ = tokio::fs::remove_file(&ogg).await;
        let _ = tokio::fs::remove_file(&mp3).await;

        result
    }
}

//! Voice-note transcoding (Telegram sends OGG/Opus, Whisper wants MP3).

use std::path::Path;

use fambot_core::{Error, Result};
use tracing::debug;

/// Convert `input` to MP3 at `output` by shelling out to ffmpeg.
pub async fn convert_oga_to_mp3(input: &Path, output: &Path) -> Result<()> {
    if !input.exists() {
        return Err(Error::Api(format!(
            "input file does not exist: {}",
            input.display()
        )));
    }

    let out = tokio::process::Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-acodec", "libmp3lame", "-q:a", "2"])
        .arg(output)
        .output()
        .await
        .map_err(|e| Error::Api(format!("ffmpeg spawn failed: {e}")))?;

    if !out.status.success() {
        return Err(Error::Api(format!(
            "audio conversion failed: {}",
            String::from_utf8_lossy(&out.stderr)
                .chars()
                .take(300)
                .collect::<String>()
        )));
    }

    debug!(input = %input.display(), output = %output.display(), "converted voice note");
    Ok(())
}

//! OpenAI client: chat completion, grammar correction, transcription.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use fambot_core::{
    conversation::ConversationHistory,
    ports::ChatCompletionApi,
    Error, Result,
};

use crate::{MAX_RETRY, RETRY_DELAY};

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Prompts longer than this are rejected before spending tokens.
const MAX_PROMPT_LEN: usize = 4096;

const GRAMMAR_PROMPT: &str = "You are an English teacher. Correct the grammar and style \
of the text the user sends. Reply with the corrected text only.";

pub struct OpenAiClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String, http: reqwest::Client) -> Self {
        Self {
            api_key,
            model,
            http,
        }
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let payload = ChatRequest {
            model: &self.model,
            messages,
        };

        let mut last_err = Error::Api("max retries reached".to_string());
        for attempt in 1..=MAX_RETRY {
            let result = async {
                let resp = self
                    .http
                    .post(CHAT_URL)
                    .bearer_auth(&self.api_key)
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|e| Error::Api(format!("openai request error: {e}")))?;

                let status = resp.status();
                if !status.is_success() {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(Error::Api(format!(
                        "openai error response: {status} - {}",
                        body.chars().take(200).collect::<String>()
                    )));
                }

                let out: ChatResponse = resp
                    .json()
                    .await
                    .map_err(|e| Error::Api(format!("openai json error: {e}")))?;
                out.choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .ok_or_else(|| Error::Api("openai returned no choices".to_string()))
            }
            .await;

            match result {
                Ok(text) => return Ok(text),
                Err(e) => {
                    if attempt < MAX_RETRY {
                        info!(attempt, err = %e, "openai request failed, retrying in 5 seconds");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }
}

#[async_trait]
impl ChatCompletionApi for OpenAiClient {
    async fn complete(&self, question: &str, history: &ConversationHistory) -> Result<String> {
        if question.len() > MAX_PROMPT_LEN {
            return Ok("The question is too long, please try a shorter one.".to_string());
        }

        let mut messages = messages_from_history(history);
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: question.to_string(),
        });

        self.chat(messages).await
    }

    async fn correct_grammar(&self, text: &str) -> Result<String> {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: GRAMMAR_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: text.to_string(),
            },
        ];
        self.chat(messages).await
    }

    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio).await.map_err(Error::Io)?;
        let file_name = audio
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let form = reqwest::multipart::Form::new()
            .text("model", "whisper-1")
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")
                    .map_err(|e| Error::Api(format!("openai multipart error: {e}")))?,
            );

        let resp = self
            .http
            .post(TRANSCRIPTION_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Api(format!("openai request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api(format!(
                "openai transcription failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Api(format!("openai json error: {e}")))?;

        let text = v
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string();
        if text.trim().is_empty() {
            return Err(Error::Api(
                "openai transcription returned empty text".to_string(),
            ));
        }
        Ok(text)
    }
}

/// History turns in stored order, mapped to the wire roles.
fn messages_from_history(history: &ConversationHistory) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|turn| ChatMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

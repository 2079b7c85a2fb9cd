//! OpenAI adapter: chat completions, image generation, voice transcription.
//!
//! A thin gateway with fixed sampling parameters. Every call logs the
//! outgoing request and the incoming response; failures surface to the
//! caller, there is no retry or backoff here.

use serde::{Deserialize, Serialize};
use tracing::info;

use gtb_core::routing::Turn;
use gtb_core::{Error, Result};

const API_BASE: &str = "https://api.openai.com/v1";
const CHAT_MODEL: &str = "gpt-3.5-turbo";
const CHAT_TEMPERATURE: f32 = 0.9;
const CHAT_MAX_TOKENS: u32 = 512;
const TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Default size for generated images.
pub const DEFAULT_IMAGE_SIZE: &str = "512x512";

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    api_key: String,
    system_prompt: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            system_prompt: system_prompt.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Sends `[system prompt, optional previous turn, user turn]` and returns
    /// the content of the last choice. An answer with no usable content is an
    /// [`Error::EmptyCompletion`]; it is surfaced, not retried.
    pub async fn chat_completion(&self, user_text: &str, prev_turn: Option<&Turn>) -> Result<String> {
        let request = ChatRequest {
            model: CHAT_MODEL,
            temperature: CHAT_TEMPERATURE,
            max_tokens: CHAT_MAX_TOKENS,
            messages: build_messages(&self.system_prompt, prev_turn, user_text),
        };

        info!(
            request = %serde_json::to_string(&request)?,
            "chat completion request"
        );

        let resp = self
            .http
            .post(format!("{API_BASE}/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::External(format!("openai request error: {e}")))?;

        let body = check_status("chat completion", resp).await?;
        info!(response = %body, "chat completion response");

        extract_completion(serde_json::from_str(&body)?)
    }

    /// Requests a single generated image and returns its URL.
    pub async fn generate_image(&self, prompt: &str, size: Option<&str>) -> Result<String> {
        let request = ImageRequest {
            prompt,
            n: 1,
            size: size.unwrap_or(DEFAULT_IMAGE_SIZE),
        };

        info!(request = %serde_json::to_string(&request)?, "image generation request");

        let resp = self
            .http
            .post(format!("{API_BASE}/images/generations"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::External(format!("openai request error: {e}")))?;

        let body = check_status("image generation", resp).await?;
        info!(response = %body, "image generation response");

        extract_image_url(serde_json::from_str(&body)?)
    }

    /// Uploads an mp3 byte buffer and returns the recognized text verbatim.
    pub async fn transcribe(&self, audio: Vec<u8>) -> Result<String> {
        info!(bytes = audio.len(), "transcription request");

        let form = reqwest::multipart::Form::new()
            .text("model", TRANSCRIPTION_MODEL)
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio)
                    .file_name("voice.mp3")
                    .mime_str("audio/mpeg")
                    .map_err(|e| Error::External(format!("openai multipart error: {e}")))?,
            );

        let resp = self
            .http
            .post(format!("{API_BASE}/audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::External(format!("openai request error: {e}")))?;

        let body = check_status("transcription", resp).await?;
        let parsed: TranscriptionResponse = serde_json::from_str(&body)?;
        info!(text = %parsed.text, "transcription response");

        Ok(parsed.text)
    }
}

fn build_messages<'a>(
    system_prompt: &'a str,
    prev_turn: Option<&'a Turn>,
    user_text: &'a str,
) -> Vec<ChatMessage<'a>> {
    let mut messages = vec![ChatMessage {
        role: "system",
        content: system_prompt,
    }];

    if let Some(prev) = prev_turn {
        messages.push(ChatMessage {
            role: prev.role.as_str(),
            content: &prev.content,
        });
    }

    messages.push(ChatMessage {
        role: "user",
        content: user_text,
    });

    messages
}

fn extract_completion(resp: ChatResponse) -> Result<String> {
    resp.choices
        .last()
        .and_then(|c| c.message.content.clone())
        .filter(|c| !c.is_empty())
        .ok_or(Error::EmptyCompletion)
}

fn extract_image_url(resp: ImageResponse) -> Result<String> {
    resp.data
        .first()
        .and_then(|d| d.url.clone())
        .ok_or(Error::EmptyImageResult)
}

async fn check_status(op: &str, resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| Error::External(format!("openai body error: {e}")))?;

    if !status.is_success() {
        return Err(Error::External(format!(
            "openai {op} failed: {status} {}",
            body.chars().take(200).collect::<String>()
        )));
    }

    Ok(body)
}

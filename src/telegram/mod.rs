use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Best effort. Never fails; delivery problems are logged.
    async fn notify(&self, message: &str);
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("telegram API error {code}: {description}")]
    Api { code: i64, description: String },
}

impl NotifyError {
    fn is_markdown_rejection(&self) -> bool {
        matches!(self, NotifyError::Api { description, .. } if description.contains("can't parse entities"))
    }
}

/// Public handles and `-100…` supergroup ids pass through, bare names get an `@`.
pub fn normalize_destination(destination: &str) -> String {
    let destination = destination.trim();
    if destination.is_empty() || destination.starts_with('@') || destination.starts_with("-100") {
        destination.to_string()
    } else {
        format!("@{}", destination)
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

/// Send-only Bot API client for a single chat.
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, destination: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url: TELEGRAM_API_URL.to_string(),
            token: token.into(),
            chat_id: normalize_destination(destination),
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Sends as Markdown; if Telegram cannot parse the markup the text is resent plain.
    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        match self.post(text, Some("Markdown")).await {
            Err(e) if e.is_markdown_rejection() => {
                warn!("Telegram rejected markdown, resending as plain text: {}", e);
                self.post(text, None).await
            }
            other => other,
        }
    }

    async fn post(&self, text: &str, parse_mode: Option<&str>) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url.trim_end_matches('/'), self.token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode,
            disable_web_page_preview: true,
        };
        let res = self.http.post(&url).json(&body).send().await?;
        let status = res.status();
        let text = res.text().await?;
        check_api_response(status.as_u16(), &text)
    }
}

fn check_api_response(status: u16, body: &str) -> Result<(), NotifyError> {
    match serde_json::from_str::<ApiResponse>(body) {
        Ok(r) if r.ok => Ok(()),
        Ok(r) => Err(NotifyError::Api {
            code: r.error_code.unwrap_or(i64::from(status)),
            description: r.description.unwrap_or_default(),
        }),
        Err(_) => Err(NotifyError::Api {
            code: i64::from(status),
            description: body.to_string(),
        }),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) {
        info!("notify: {}", message);
        if let Err(e) = self.send_message(message).await {
            error!("Telegram error: {}", e);
        }
    }
}

//! # Telegram Bot API Integration
//!
//! This module sends the engine's outbound messages to a Telegram chat
//! using the plain Bot API over HTTPS (`sendMessage` / `sendPhoto`).
//!
//! ## Behavior
//!
//! - **HTML parse mode**: deal lines carry `<b>` and `<a>` markup, so
//!   every call sets `parse_mode=HTML`
//! - **Optional integration**: without credentials the notifier logs a
//!   warning once and every send becomes a no-op
//! - **Best-effort delivery**: callers swallow [`TransportError`]; a
//!   failed send never rolls back the dedup set, so a deal can be marked
//!   notified without the chat ever seeing it. That gap is deliberate.
//! - **Photo alerts**: messages carrying an image URL are sent with
//!   `sendPhoto`, the rendered text becoming the caption
//!
//! ## Environment Configuration
//!
//! Set `TELEGRAM_BOT_TOKEN` (from BotFather) and `TELEGRAM_CHAT_ID`.
//! If either is missing, chat delivery is disabled but logged.

pub mod commands;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::TelegramConfig;
use crate::error::TransportError;
use crate::models::OutboundMessage;

/// Telegram notification client for deal messages.
///
/// Wraps a reusable HTTP client plus optional credentials. Cloneable and
/// safe to share across async tasks; the underlying `reqwest::Client`
/// pools connections internally.
pub struct TelegramNotifier {
    client: Client,
    config: Option<TelegramConfig>,
}

impl TelegramNotifier {
    pub fn new(client: Client, config: Option<TelegramConfig>) -> Self {
        if config.is_none() {
            warn!("TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set - chat delivery will be disabled");
        }

        Self { client, config }
    }

    /// Send an outbound message to the configured chat, picking
    /// `sendPhoto` when the message carries an image.
    pub async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        match &message.image_url {
            Some(image_url) => self.send_photo(&message.text, image_url).await,
            None => self.send_text(&message.text).await,
        }
    }

    pub async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        let Some(config) = &self.config else {
            return Ok(());
        };
        self.send_text_to(config.chat_id, text).await
    }

    /// Send to an explicit chat, used for command replies.
    pub async fn send_text_to(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        self.call(
            "sendMessage",
            &json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }),
        )
        .await
    }

    pub async fn send_photo(&self, caption: &str, image_url: &str) -> Result<(), TransportError> {
        let Some(config) = &self.config else {
            return Ok(());
        };
        self.call(
            "sendPhoto",
            &json!({
                "chat_id": config.chat_id,
                "photo": image_url,
                "caption": caption,
                "parse_mode": "HTML",
            }),
        )
        .await
    }

    async fn call(&self, method: &str, payload: &serde_json::Value) -> Result<(), TransportError> {
        let Some(config) = &self.config else {
            return Ok(());
        };

        let url = format!("https://api.telegram.org/bot{}/{method}", config.bot_token);
        let response = self.client.post(&url).json(payload).send().await?;

        if response.status().is_success() {
            debug!("Telegram {method} delivered");
            Ok(())
        } else {
            Err(TransportError::HttpStatus(response.status().as_u16()))
        }
    }
}

impl Clone for TelegramNotifier {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
        }
    }
}

//! Runtime configuration, assembled once from the environment and passed
//! into each component at construction

use crate::engine::WatchScope;

/// Telegram credentials; absent when the bot should run without a chat
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
}

impl TelegramConfig {
    /// Reads `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`. Returns `None`
    /// when either is missing or invalid.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .ok()
            .and_then(|raw| raw.parse().ok())?;

        Some(Self { bot_token, chat_id })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub poll_cron: String,
    pub discount_threshold: u8,
    pub watch_scope: WatchScope,
    pub top_discounts: usize,
    pub digest_hour: u32,
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:database/deals.db".to_string()),
            poll_cron: std::env::var("POLL_CRON")
                .unwrap_or_else(|_| "0 */30 * * * *".to_string()),
            discount_threshold: std::env::var("DISCOUNT_THRESHOLD")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(30),
            watch_scope: std::env::var("WATCH_SCOPE")
                .map(|raw| parse_watch_scope(&raw))
                .unwrap_or(WatchScope::EveryFetch),
            top_discounts: std::env::var("TOP_DISCOUNTS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(10),
            digest_hour: std::env::var("DIGEST_HOUR")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(21),
            telegram: TelegramConfig::from_env(),
        }
    }
}

fn parse_watch_scope(raw: &str) -> WatchScope {
    match raw.trim().to_lowercase().as_str() {
        "new-only" | "new_only" => WatchScope::NewOnly,
        _ => WatchScope::EveryFetch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_scope_defaults_to_every_fetch() {
        assert_eq!(parse_watch_scope("every-fetch"), WatchScope::EveryFetch);
        assert_eq!(parse_watch_scope("garbage"), WatchScope::EveryFetch);
        assert_eq!(parse_watch_scope("new-only"), WatchScope::NewOnly);
        assert_eq!(parse_watch_scope("NEW_ONLY"), WatchScope::NewOnly);
    }
}

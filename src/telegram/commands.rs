//! Inbound chat command routing over getUpdates long-polling

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::database::{Database, WatchAdd, WatchRemove};
use crate::deal_finder::DealFinder;
use crate::models::escape_html;
use crate::telegram::TelegramNotifier;

const HELP_TEXT: &str = "🤖 <b>Deal finder commands</b>\n\
• /watch &lt;keyword&gt; - alert when a deal mentions the keyword\n\
• /unwatch &lt;keyword&gt; - stop watching a keyword\n\
• /watchlist - show watched keywords\n\
• /clearwatch - drop the whole watchlist\n\
• /deals - current deals snapshot\n\
• /help - this menu";

/// A parsed `(command, argument)` pair from a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Watch(String),
    Unwatch(String),
    WatchList,
    ClearWatch,
    Deals,
    Help,
}

/// Parse a message text into a command. Tolerates the `@BotName` suffix
/// Telegram appends in group chats; anything unrecognized is ignored.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let (head, argument) = match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    };
    let head = head.split('@').next().unwrap_or(head);

    match head {
        "/watch" => Some(Command::Watch(argument.to_string())),
        "/unwatch" => Some(Command::Unwatch(argument.to_string())),
        "/watchlist" => Some(Command::WatchList),
        "/clearwatch" => Some(Command::ClearWatch),
        "/deals" => Some(Command::Deals),
        "/start" | "/help" => Some(Command::Help),
        _ => None,
    }
}

/// Long-polls getUpdates and dispatches watchlist commands.
///
/// Keeps its own update-id bookmark so a command is processed once per
/// run; replies go back to whichever chat the command came from.
pub struct CommandRouter {
    client: Client,
    bot_token: Option<String>,
    database: Database,
    notifier: TelegramNotifier,
    finder: DealFinder,
}

impl CommandRouter {
    pub fn new(config: &Config, finder: DealFinder) -> Self {
        Self {
            client: Client::new(),
            bot_token: config
                .telegram
                .as_ref()
                .map(|telegram| telegram.bot_token.clone()),
            database: finder.database().clone(),
            notifier: finder.notifier().clone(),
            finder,
        }
    }

    pub async fn run(self) {
        let Some(bot_token) = self.bot_token.clone() else {
            info!("Telegram not configured - command handling disabled");
            return;
        };

        info!("Command router started");
        let mut offset: i64 = 0;

        loop {
            match self.poll(&bot_token, offset).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);

                        let Some(message) = update.message else {
                            continue;
                        };
                        let Some(text) = message.text.as_deref() else {
                            continue;
                        };
                        let Some(command) = parse_command(text) else {
                            continue;
                        };

                        self.handle(message.chat.id, command).await;
                    }
                }
                Err(e) => {
                    warn!("getUpdates failed, backing off: {e}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn poll(&self, bot_token: &str, offset: i64) -> Result<Vec<Update>, reqwest::Error> {
        let url = format!("https://api.telegram.org/bot{bot_token}/getUpdates");
        let response = self
            .client
            .get(&url)
            .query(&[("timeout", "25"), ("offset", &offset.to_string())])
            .send()
            .await?;

        let payload: UpdatesResponse = response.json().await?;
        Ok(payload.result)
    }

    async fn handle(&self, chat_id: i64, command: Command) {
        let reply = match command {
            Command::Watch(argument) => self.watch(&argument).await,
            Command::Unwatch(argument) => self.unwatch(&argument).await,
            Command::WatchList => self.list().await,
            Command::ClearWatch => self.clear().await,
            Command::Deals => self.deals().await,
            Command::Help => HELP_TEXT.to_string(),
        };

        if let Err(e) = self.notifier.send_text_to(chat_id, &reply).await {
            warn!("Failed to deliver command reply: {e}");
        }
    }

    async fn watch(&self, argument: &str) -> String {
        let keyword = argument.trim();
        if keyword.is_empty() {
            return "Usage: /watch &lt;keyword&gt;".to_string();
        }

        let shown = escape_html(&keyword.to_lowercase());
        match self.database.watch_add(keyword).await {
            Ok(WatchAdd::Added) => format!("✅ Watching for \"{shown}\""),
            Ok(WatchAdd::AlreadyPresent) => format!("ℹ️ Already watching \"{shown}\""),
            Err(e) => {
                warn!("watch_add failed: {e}");
                "⚠️ Could not update the watchlist, try again later.".to_string()
            }
        }
    }

    async fn unwatch(&self, argument: &str) -> String {
        let keyword = argument.trim();
        if keyword.is_empty() {
            return "Usage: /unwatch &lt;keyword&gt;".to_string();
        }

        let shown = escape_html(&keyword.to_lowercase());
        match self.database.watch_remove(keyword).await {
            Ok(WatchRemove::Removed) => format!("🗑 Stopped watching \"{shown}\""),
            Ok(WatchRemove::NotFound) => format!("ℹ️ \"{shown}\" was not on the watchlist"),
            Err(e) => {
                warn!("watch_remove failed: {e}");
                "⚠️ Could not update the watchlist, try again later.".to_string()
            }
        }
    }

    async fn list(&self) -> String {
        let entries = self.database.watch_list().await;
        if entries.is_empty() {
            return "Watchlist is empty. Add keywords with /watch &lt;keyword&gt;.".to_string();
        }

        let lines: Vec<String> = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| format!("{}. {}", index + 1, escape_html(entry)))
            .collect();
        format!("👀 <b>Watchlist</b>\n{}", lines.join("\n"))
    }

    async fn clear(&self) -> String {
        match self.database.watch_clear().await {
            Ok(()) => "🗑 Watchlist cleared".to_string(),
            Err(e) => {
                warn!("watch_clear failed: {e}");
                "⚠️ Could not update the watchlist, try again later.".to_string()
            }
        }
    }

    async fn deals(&self) -> String {
        match self.finder.on_demand_summary().await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("On-demand summary failed: {e}");
                "⚠️ Could not reach the storefronts, try again later.".to_string()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            parse_command("/watch Hollow Knight"),
            Some(Command::Watch("Hollow Knight".to_string()))
        );
        assert_eq!(
            parse_command("/unwatch hades"),
            Some(Command::Unwatch("hades".to_string()))
        );
        assert_eq!(parse_command("/watchlist"), Some(Command::WatchList));
        assert_eq!(parse_command("/clearwatch"), Some(Command::ClearWatch));
        assert_eq!(parse_command("/deals"), Some(Command::Deals));
    }

    #[test]
    fn strips_bot_name_suffix() {
        assert_eq!(
            parse_command("/watch@DealFinderBot celeste"),
            Some(Command::Watch("celeste".to_string()))
        );
        assert_eq!(parse_command("/deals@DealFinderBot"), Some(Command::Deals));
    }

    #[test]
    fn start_and_help_share_the_menu() {
        assert_eq!(parse_command("/start"), Some(Command::Help));
        assert_eq!(parse_command("/help"), Some(Command::Help));
    }

    #[test]
    fn ignores_plain_text_and_unknown_commands() {
        assert_eq!(parse_command("hello there"), None);
        assert_eq!(parse_command("/frobnicate"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn watch_without_argument_parses_to_empty_keyword() {
        assert_eq!(parse_command("/watch"), Some(Command::Watch(String::new())));
    }
}

//! Data models for storefront offers, classified deals and price history

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Storefront a catalog offer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storefront {
    Epic,
    Steam,
}

impl Storefront {
    /// Short tag used in deal identifiers
    pub fn tag(self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Steam => "steam",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Epic => "Epic Games",
            Self::Steam => "Steam",
        }
    }

    pub fn currency_symbol(self) -> &'static str {
        match self {
            Self::Epic => "$",
            Self::Steam => "₹",
        }
    }
}

/// A raw catalog entry as returned by a storefront adapter.
///
/// Offers are rebuilt on every fetch cycle and discarded afterwards; only
/// the deals derived from them leave a persistent trace. Prices stay
/// `None` when the storefront payload omitted or mangled them, and the
/// classifier drops such offers instead of guessing.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub storefront: Storefront,
    pub title: String,
    pub original_price: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub discount_percent: u8,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub ends_at: Option<DateTime<Utc>>,
    pub native_id: Option<u64>,
}

/// What makes an offer actionable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealKind {
    Free,
    Discount,
}

impl DealKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Discount => "discount",
        }
    }
}

/// A classified, notifiable deal derived from an [`Offer`].
///
/// The `id` is deterministic across fetches of the same live offer:
/// storefront tag, kind tag, then the storefront-native id where the
/// storefront provides one, otherwise the title. Re-fetching a still
/// active offer therefore always yields the same id, which is what the
/// dedup set keys on.
#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    pub id: String,
    pub kind: DealKind,
    pub storefront: Storefront,
    pub discount_percent: u8,
    pub current_price: Decimal,
    pub display: String,
    pub image_url: Option<String>,
}

impl Deal {
    pub fn free(offer: &Offer) -> Self {
        Self::build(DealKind::Free, offer, Decimal::ZERO)
    }

    pub fn discount(offer: &Offer, current_price: Decimal) -> Self {
        Self::build(DealKind::Discount, offer, current_price)
    }

    fn build(kind: DealKind, offer: &Offer, current_price: Decimal) -> Self {
        let subject = match offer.native_id {
            Some(native_id) => native_id.to_string(),
            None => offer.title.clone(),
        };
        let id = format!("{}_{}_{}", offer.storefront.tag(), kind.tag(), subject);

        Self {
            id,
            kind,
            storefront: offer.storefront,
            discount_percent: offer.discount_percent,
            current_price,
            display: render_display(kind, offer, current_price),
            image_url: offer.image_url.clone(),
        }
    }
}

fn render_display(kind: DealKind, offer: &Offer, current_price: Decimal) -> String {
    let symbol = offer.storefront.currency_symbol();
    let title = match &offer.url {
        Some(url) => format!(
            "<a href=\"{}\"><b>{}</b></a>",
            escape_html(url),
            escape_html(&offer.title)
        ),
        None => format!("<b>{}</b>", escape_html(&offer.title)),
    };

    let mut line = match kind {
        DealKind::Free => match offer.original_price {
            Some(original) if !original.is_zero() => {
                format!("🆓 {title} (FREE, was {symbol}{original})")
            }
            _ => format!("🆓 {title} (FREE)"),
        },
        DealKind::Discount => match offer.original_price {
            Some(original) => format!(
                "💸 {title} -{}% at {symbol}{current_price} (was {symbol}{original})",
                offer.discount_percent
            ),
            None => format!(
                "💸 {title} -{}% at {symbol}{current_price}",
                offer.discount_percent
            ),
        },
    };

    if let Some(ends_at) = offer.ends_at {
        line.push_str(&format!(" · until {}", ends_at.format("%d %b")));
    }

    line
}

/// Minimal HTML escaping for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Observed prices per deal id, loaded from the store at cycle start.
///
/// Append-only; the running minimum is derived, never stored.
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    prices: BTreeMap<String, Vec<Decimal>>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<(String, Decimal)>) -> Self {
        let mut prices: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
        for (deal_id, price) in rows {
            prices.entry(deal_id).or_default().push(price);
        }
        Self { prices }
    }

    /// Appends an observation and returns the new running minimum in one
    /// operation.
    pub fn record(&mut self, deal_id: &str, price: Decimal) -> Decimal {
        let observed = self.prices.entry(deal_id.to_string()).or_default();
        observed.push(price);
        observed.iter().copied().min().unwrap_or(price)
    }

    pub fn minimum(&self, deal_id: &str) -> Option<Decimal> {
        self.prices
            .get(deal_id)
            .and_then(|observed| observed.iter().copied().min())
    }
}

/// How urgent an outbound message is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePriority {
    WatchAlert,
    NewDeals,
    Digest,
}

/// A rendered message the engine wants delivered to the chat
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub priority: MessagePriority,
    pub text: String,
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn offer(title: &str) -> Offer {
        Offer {
            storefront: Storefront::Epic,
            title: title.to_string(),
            original_price: Some(dec!(499.00)),
            current_price: Some(Decimal::ZERO),
            discount_percent: 100,
            url: None,
            image_url: None,
            ends_at: None,
            native_id: None,
        }
    }

    #[test]
    fn deal_id_is_stable_across_rebuilds() {
        let first = Deal::free(&offer("Alpha"));
        let second = Deal::free(&offer("Alpha"));
        assert_eq!(first.id, "epic_free_Alpha");
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn native_id_wins_over_title_in_deal_id() {
        let mut with_native = offer("Renamed Weekly");
        with_native.storefront = Storefront::Steam;
        with_native.native_id = Some(570);
        with_native.current_price = Some(dec!(249.00));
        let deal = Deal::discount(&with_native, dec!(249.00));
        assert_eq!(deal.id, "steam_discount_570");
    }

    #[test]
    fn display_escapes_html_in_titles() {
        let deal = Deal::free(&offer("Tricky <Title> & Co"));
        assert!(deal.display.contains("Tricky &lt;Title&gt; &amp; Co"));
        assert!(!deal.display.contains("<Title>"));
    }

    #[test]
    fn running_minimum_ignores_observation_order() {
        let mut history = PriceHistory::new();
        assert_eq!(history.record("steam_discount_1", dec!(499)), dec!(499));
        assert_eq!(history.record("steam_discount_1", dec!(299)), dec!(299));
        assert_eq!(history.record("steam_discount_1", dec!(399)), dec!(299));
        assert_eq!(history.minimum("steam_discount_1"), Some(dec!(299)));
    }

    #[test]
    fn minimum_is_none_for_unseen_ids() {
        let history = PriceHistory::new();
        assert_eq!(history.minimum("epic_free_Alpha"), None);
    }
}

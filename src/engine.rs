//! Deduplicated-notification engine.
//!
//! Takes one cycle's classified deals, diffs them against the persisted
//! dedup set, matches the watchlist and renders the outbound messages.
//! Pure with respect to I/O: persistence happens in the orchestrator,
//! before anything is sent.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::models::{
    Deal, DealKind, MessagePriority, OutboundMessage, PriceHistory, Storefront,
};

/// One storefront's classified deals for the current cycle
#[derive(Debug, Clone)]
pub struct CatalogBatch {
    pub storefront: Storefront,
    pub deals: Vec<Deal>,
    pub rank_top_discounts: Option<usize>,
}

/// Which deals watchlist matching runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchScope {
    /// Match the full current fetch; a hit fires every cycle the item
    /// stays listed.
    EveryFetch,
    /// Match only deals that were not yet in the dedup set.
    NewOnly,
}

/// What one cycle decided: messages to send, ids to mark notified and
/// price observations to persist.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub messages: Vec<OutboundMessage>,
    pub newly_notified: Vec<String>,
    pub price_observations: Vec<(String, Decimal)>,
}

#[derive(Debug, Clone)]
pub struct NotificationEngine {
    watch_scope: WatchScope,
}

impl NotificationEngine {
    pub fn new(watch_scope: WatchScope) -> Self {
        Self { watch_scope }
    }

    /// Process one cycle's batches.
    ///
    /// Deal ids absent from `dedup` land in `newly_notified` whether or
    /// not their message is later delivered; recording wins over
    /// delivery. With no new deals anywhere the composite message is
    /// omitted entirely. Watch alerts are independent of the dedup set
    /// and come first in the returned message list.
    pub fn process(
        &self,
        batches: &[CatalogBatch],
        dedup: &HashSet<String>,
        watchlist: &[String],
        prices: &mut PriceHistory,
    ) -> CycleOutcome {
        let mut newly_notified = Vec::new();
        let mut price_observations = Vec::new();
        let mut alerts = Vec::new();
        let mut sections = Vec::new();

        for batch in batches {
            let mut minima: HashMap<String, Decimal> = HashMap::new();
            for deal in &batch.deals {
                if deal.kind == DealKind::Discount {
                    let minimum = prices.record(&deal.id, deal.current_price);
                    price_observations.push((deal.id.clone(), deal.current_price));
                    minima.insert(deal.id.clone(), minimum);
                }
            }

            let new_deals: Vec<&Deal> = batch
                .deals
                .iter()
                .filter(|deal| !dedup.contains(&deal.id))
                .collect();
            newly_notified.extend(new_deals.iter().map(|deal| deal.id.clone()));

            let watch_candidates: Vec<&Deal> = match self.watch_scope {
                WatchScope::EveryFetch => batch.deals.iter().collect(),
                WatchScope::NewOnly => new_deals.clone(),
            };
            for deal in watch_candidates {
                if let Some(entry) = matched_entry(deal, watchlist) {
                    alerts.push(OutboundMessage {
                        priority: MessagePriority::WatchAlert,
                        text: format!(
                            "🔔 <b>Watchlist hit</b> ({entry})\n{}",
                            deal_line(deal, minima.get(&deal.id).copied())
                        ),
                        image_url: deal.image_url.clone(),
                    });
                }
            }

            sections.push(render_section(batch, DealKind::Free, &new_deals, &minima));
            sections.push(render_section(batch, DealKind::Discount, &new_deals, &minima));
        }

        let mut messages = alerts;
        if !newly_notified.is_empty() {
            messages.push(OutboundMessage {
                priority: MessagePriority::NewDeals,
                text: format!("🛒 <b>New deals</b>\n\n{}", sections.join("\n\n")),
                image_url: None,
            });
        }

        CycleOutcome {
            messages,
            newly_notified,
            price_observations,
        }
    }

    /// Full non-incremental snapshot of the current catalogs, used by
    /// the daily digest and the /deals command.
    pub fn render_digest(&self, batches: &[CatalogBatch], prices: &PriceHistory) -> String {
        let mut sections = Vec::new();
        let mut total = 0usize;

        for batch in batches {
            for kind in [DealKind::Free, DealKind::Discount] {
                let deals = ranked(batch, kind, batch.deals.iter().collect());
                total += deals.len();
                sections.push(render_lines(batch.storefront, kind, &deals, |deal| {
                    deal_line(deal, prices.minimum(&deal.id))
                }));
            }
        }

        if total == 0 {
            return "📰 <b>Daily deals digest</b>\n\n❌ No deals right now.".to_string();
        }

        format!("📰 <b>Daily deals digest</b>\n\n{}", sections.join("\n\n"))
    }
}

/// Applies the batch's top-N ranking to discount sections; all other
/// sections keep catalog order.
fn ranked<'a>(batch: &CatalogBatch, kind: DealKind, deals: Vec<&'a Deal>) -> Vec<&'a Deal> {
    let mut deals: Vec<&Deal> = deals.into_iter().filter(|deal| deal.kind == kind).collect();

    if kind == DealKind::Discount {
        if let Some(limit) = batch.rank_top_discounts {
            deals.sort_by(|a, b| b.discount_percent.cmp(&a.discount_percent));
            deals.truncate(limit);
        }
    }

    deals
}

fn render_section(
    batch: &CatalogBatch,
    kind: DealKind,
    new_deals: &[&Deal],
    minima: &HashMap<String, Decimal>,
) -> String {
    let deals = ranked(batch, kind, new_deals.to_vec());
    render_lines(batch.storefront, kind, &deals, |deal| {
        deal_line(deal, minima.get(&deal.id).copied())
    })
}

fn render_lines(
    storefront: Storefront,
    kind: DealKind,
    deals: &[&Deal],
    line: impl Fn(&Deal) -> String,
) -> String {
    let label = match kind {
        DealKind::Free => "freebies",
        DealKind::Discount => "discounts",
    };
    let mut section = format!("🎮 <b>{} {label}</b>", storefront.display_name());

    if deals.is_empty() {
        section.push_str("\n• none");
    } else {
        for deal in deals.iter().copied() {
            section.push_str(&format!("\n• {}", line(deal)));
        }
    }

    section
}

fn deal_line(deal: &Deal, minimum: Option<Decimal>) -> String {
    let mut line = deal.display.clone();
    if let Some(minimum) = minimum {
        if minimum < deal.current_price {
            line.push_str(&format!(
                " · 🔽 lowest seen {}{minimum}",
                deal.storefront.currency_symbol()
            ));
        }
    }
    line
}

fn matched_entry<'a>(deal: &Deal, watchlist: &'a [String]) -> Option<&'a str> {
    let haystack = deal.display.to_lowercase();
    watchlist
        .iter()
        .find(|entry| haystack.contains(&entry.to_lowercase()))
        .map(String::as_str)
}

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use reqwest::Client;
use tracing::{info, warn};

use crate::catalogs::{EpicCatalog, SteamCatalog};
use crate::classifier::classify;
use crate::config::Config;
use crate::database::Database;
use crate::digest::DigestScheduler;
use crate::engine::{CatalogBatch, CycleOutcome, NotificationEngine};
use crate::error::FetchError;
use crate::models::{MessagePriority, OutboundMessage};
use crate::telegram::TelegramNotifier;
use crate::traits::CatalogAdapter;

#[derive(Clone)]
pub struct DealFinder {
    adapters: Arc<Vec<Box<dyn CatalogAdapter>>>,
    database: Database,
    notifier: TelegramNotifier,
    engine: NotificationEngine,
    digest: DigestScheduler,
    discount_threshold: u8,
}

impl DealFinder {
    pub async fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().user_agent("deal-finder/0.1").build()?;

        let adapters: Vec<Box<dyn CatalogAdapter>> = vec![
            Box::new(EpicCatalog::new(client.clone())),
            Box::new(SteamCatalog::new(client.clone(), config.top_discounts)),
        ];

        let database = Database::new(&config.database_url).await?;
        let notifier = TelegramNotifier::new(client, config.telegram.clone());

        Ok(Self {
            adapters: Arc::new(adapters),
            database,
            notifier,
            engine: NotificationEngine::new(config.watch_scope),
            digest: DigestScheduler::new(config.digest_hour),
            discount_threshold: config.discount_threshold,
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn notifier(&self) -> &TelegramNotifier {
        &self.notifier
    }

    /// One full poll cycle: fetch, classify, diff, persist, send.
    ///
    /// A fetch failure aborts before any state is read or written; the
    /// next cycle starts clean. State is persisted before anything is
    /// sent, so delivery failures cannot cause re-notification.
    pub async fn run_cycle(&self) -> Result<()> {
        let batches = self.fetch_batches().await?;

        let dedup = self.database.notified_ids().await;
        let watchlist = self.database.watch_list().await;
        let mut prices = self.database.price_history().await;

        let CycleOutcome {
            mut messages,
            newly_notified,
            price_observations,
        } = self
            .engine
            .process(&batches, &dedup, &watchlist, &mut prices);

        self.database.mark_notified(&newly_notified).await?;
        self.database.record_prices(&price_observations).await?;

        if let Some(date) = self
            .digest
            .due(Utc::now(), self.database.digest_last_fired().await)
        {
            messages.push(OutboundMessage {
                priority: MessagePriority::Digest,
                text: self.engine.render_digest(&batches, &prices),
                image_url: None,
            });
            if let Err(e) = self.database.set_digest_last_fired(date).await {
                warn!("Could not persist digest date, digest may repeat: {e}");
            }
        }

        for message in &messages {
            if let Err(e) = self.notifier.send(message).await {
                warn!("Chat delivery failed (deal stays marked notified): {e}");
            }
        }

        if newly_notified.is_empty() {
            info!("No new deals found");
        } else {
            info!("Found {} new deals", newly_notified.len());
        }

        Ok(())
    }

    /// Full snapshot for the /deals command, bypassing the dedup set.
    pub async fn on_demand_summary(&self) -> Result<String, FetchError> {
        let batches = self.fetch_batches().await?;
        let prices = self.database.price_history().await;
        Ok(self.engine.render_digest(&batches, &prices))
    }

    async fn fetch_batches(&self) -> Result<Vec<CatalogBatch>, FetchError> {
        let mut batches = Vec::with_capacity(self.adapters.len());

        for adapter in self.adapters.iter() {
            let offers = adapter.fetch().await?;

            let unpriced = offers
                .iter()
                .filter(|offer| offer.current_price.is_none())
                .count();
            if unpriced > 0 {
                warn!(
                    "Dropping {} {} offers without usable prices",
                    unpriced,
                    adapter.storefront().tag()
                );
            }

            batches.push(CatalogBatch {
                storefront: adapter.storefront(),
                deals: classify(&offers, self.discount_threshold),
                rank_top_discounts: adapter.rank_top_discounts(),
            });
        }

        Ok(batches)
    }
}

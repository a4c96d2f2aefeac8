//! Traits and interfaces for storefront-agnostic catalog polling

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::{Offer, Storefront};

/// Trait for storefront-specific catalog adapters
#[async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// Which storefront this adapter polls
    fn storefront(&self) -> Storefront;

    /// When set, the discounted section for this storefront is ranked by
    /// descending discount percent and truncated to N instead of keeping
    /// catalog order.
    fn rank_top_discounts(&self) -> Option<usize> {
        None
    }

    /// Fetch the current catalog snapshot as normalized offers.
    ///
    /// # Returns
    /// * `Result<Vec<Offer>, FetchError>` - Normalized offers or a fetch
    ///   failure that aborts the whole cycle
    async fn fetch(&self) -> Result<Vec<Offer>, FetchError>;

    /// Build a storefront search URL for an offer title, used as a link
    /// target when the catalog payload carries no product page.
    fn search_url(&self, title: &str) -> String {
        let encoded = urlencoding::encode(title);
        match self.storefront() {
            Storefront::Epic => format!("https://store.epicgames.com/browse?q={encoded}"),
            Storefront::Steam => {
                format!("https://store.steampowered.com/search/?term={encoded}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(Storefront);

    #[async_trait]
    impl CatalogAdapter for Dummy {
        fn storefront(&self) -> Storefront {
            self.0
        }

        async fn fetch(&self) -> Result<Vec<Offer>, FetchError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn search_urls_encode_titles() {
        let epic = Dummy(Storefront::Epic);
        assert_eq!(
            epic.search_url("Death Stranding"),
            "https://store.epicgames.com/browse?q=Death%20Stranding"
        );
        let steam = Dummy(Storefront::Steam);
        assert!(
            steam
                .search_url("Slay the Spire")
                .starts_with("https://store.steampowered.com/search/?term=Slay%20the")
        );
    }
}

//! Steam featured-specials feed adapter

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::error::FetchError;
use crate::models::{Offer, Storefront};
use crate::traits::CatalogAdapter;

const FEATURED_CATEGORIES_URL: &str =
    "https://store.steampowered.com/api/featuredcategories?cc=IN&l=en";

pub struct SteamCatalog {
    client: Client,
    top_discounts: usize,
}

impl SteamCatalog {
    pub fn new(client: Client, top_discounts: usize) -> Self {
        Self {
            client,
            top_discounts,
        }
    }

    fn normalize(&self, payload: FeaturedCategories) -> Result<Vec<Offer>, FetchError> {
        let specials = payload.specials.ok_or(FetchError::Shape("specials"))?;

        let offers = specials
            .items
            .into_iter()
            .map(|item| {
                let original_price = item.original_price.map(|cents| Decimal::new(cents, 2));
                let current_price = item.final_price.map(|cents| Decimal::new(cents, 2));
                let ends_at = item
                    .discount_expiration
                    .and_then(|secs| DateTime::from_timestamp(secs, 0));

                Offer {
                    storefront: Storefront::Steam,
                    url: Some(format!("https://store.steampowered.com/app/{}/", item.id)),
                    title: item.name,
                    original_price,
                    current_price,
                    discount_percent: item.discount_percent.min(100) as u8,
                    image_url: item.large_capsule_image,
                    ends_at,
                    native_id: Some(item.id),
                }
            })
            .collect();

        Ok(offers)
    }
}

#[async_trait]
impl CatalogAdapter for SteamCatalog {
    fn storefront(&self) -> Storefront {
        Storefront::Steam
    }

    fn rank_top_discounts(&self) -> Option<usize> {
        Some(self.top_discounts)
    }

    async fn fetch(&self) -> Result<Vec<Offer>, FetchError> {
        info!("Fetching Steam featured specials");

        let response = self.client.get(FEATURED_CATEGORIES_URL).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status().as_u16(),
                url: FEATURED_CATEGORIES_URL.to_string(),
            });
        }

        let payload: FeaturedCategories = response.json().await?;
        let offers = self.normalize(payload)?;
        info!("Steam specials yielded {} offers", offers.len());
        Ok(offers)
    }
}

#[derive(Debug, Deserialize)]
struct FeaturedCategories {
    #[serde(default)]
    specials: Option<Specials>,
}

#[derive(Debug, Deserialize)]
struct Specials {
    #[serde(default)]
    items: Vec<SpecialItem>,
}

#[derive(Debug, Deserialize)]
struct SpecialItem {
    id: u64,
    name: String,
    #[serde(default)]
    discount_percent: u64,
    #[serde(default)]
    original_price: Option<i64>,
    #[serde(default)]
    final_price: Option<i64>,
    #[serde(default)]
    large_capsule_image: Option<String>,
    #[serde(default)]
    discount_expiration: Option<i64>,
}

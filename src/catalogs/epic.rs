//! Epic Games Store free-promotions feed adapter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::error::FetchError;
use crate::models::{Offer, Storefront};
use crate::traits::CatalogAdapter;

const FREE_PROMOTIONS_URL: &str =
    "https://store-site-backend-static.ak.epicgames.com/freeGamesPromotions?locale=en-US&country=US";

pub struct EpicCatalog {
    client: Client,
}

impl EpicCatalog {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Keep only elements carrying an active promotion; the feed also
    /// lists upcoming promotions and plain catalog entries.
    fn normalize(&self, payload: FreeGamesResponse) -> Vec<Offer> {
        let elements = payload.data.catalog.search_store.elements;
        let mut offers = Vec::new();

        for element in elements {
            let Some(promotions) = &element.promotions else {
                continue;
            };
            let Some(active) = promotions
                .promotional_offers
                .iter()
                .flat_map(|group| group.promotional_offers.iter())
                .next()
            else {
                continue;
            };

            let total = element.price.as_ref().map(|price| &price.total_price);
            let original_price = total
                .and_then(|total| total.original_price)
                .map(|cents| Decimal::new(cents, 2));
            let current_price = total
                .and_then(|total| total.discount_price)
                .map(|cents| Decimal::new(cents, 2));

            let url = element
                .product_slug
                .as_deref()
                .filter(|slug| !slug.is_empty())
                .map(|slug| format!("https://store.epicgames.com/en-US/p/{slug}"))
                .unwrap_or_else(|| self.search_url(&element.title));

            let image_url = pick_image(&element.key_images);
            let discount_percent = derived_discount_percent(
                total.and_then(|t| t.original_price),
                total.and_then(|t| t.discount_price),
            );

            offers.push(Offer {
                storefront: Storefront::Epic,
                title: element.title,
                original_price,
                current_price,
                discount_percent,
                url: Some(url),
                image_url,
                ends_at: active.end_date,
                native_id: None,
            });
        }

        offers
    }
}

#[async_trait]
impl CatalogAdapter for EpicCatalog {
    fn storefront(&self) -> Storefront {
        Storefront::Epic
    }

    async fn fetch(&self) -> Result<Vec<Offer>, FetchError> {
        info!("Fetching Epic free promotions feed");

        let response = self.client.get(FREE_PROMOTIONS_URL).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status().as_u16(),
                url: FREE_PROMOTIONS_URL.to_string(),
            });
        }

        let payload: FreeGamesResponse = response.json().await?;
        let offers = self.normalize(payload);
        info!("Epic feed yielded {} promoted offers", offers.len());
        Ok(offers)
    }
}

fn pick_image(images: &[KeyImage]) -> Option<String> {
    images
        .iter()
        .find(|image| image.kind == "OfferImageWide")
        .or_else(|| images.iter().find(|image| image.kind == "Thumbnail"))
        .or_else(|| images.first())
        .map(|image| image.url.clone())
}

fn derived_discount_percent(original_cents: Option<i64>, current_cents: Option<i64>) -> u8 {
    match (original_cents, current_cents) {
        (Some(original), Some(current)) if original > 0 && current <= original => {
            (((original - current) * 100) / original) as u8
        }
        _ => 0,
    }
}

#[derive(Debug, Deserialize)]
struct FreeGamesResponse {
    data: CatalogData,
}

#[derive(Debug, Deserialize)]
struct CatalogData {
    #[serde(rename = "Catalog")]
    catalog: Catalog,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Catalog {
    search_store: SearchStore,
}

#[derive(Debug, Deserialize)]
struct SearchStore {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Element {
    title: String,
    #[serde(default)]
    product_slug: Option<String>,
    #[serde(default)]
    key_images: Vec<KeyImage>,
    #[serde(default)]
    price: Option<PriceBlock>,
    #[serde(default)]
    promotions: Option<Promotions>,
}

#[derive(Debug, Deserialize)]
struct KeyImage {
    #[serde(rename = "type")]
    kind: String,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceBlock {
    total_price: TotalPrice,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalPrice {
    #[serde(default)]
    discount_price: Option<i64>,
    #[serde(default)]
    original_price: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Promotions {
    #[serde(default)]
    promotional_offers: Vec<PromotionalOfferGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromotionalOfferGroup {
    #[serde(default)]
    promotional_offers: Vec<PromotionalOffer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromotionalOffer {
    #[serde(default)]
    end_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const FIXTURE: &str = r#"{
        "data": {
            "Catalog": {
                "searchStore": {
                    "elements": [
                        {
                            "title": "Alpha",
                            "productSlug": "alpha",
                            "keyImages": [
                                {"type": "OfferImageWide", "url": "https://cdn.example/alpha-wide.jpg"},
                                {"type": "Thumbnail", "url": "https://cdn.example/alpha-thumb.jpg"}
                            ],
                            "price": {"totalPrice": {"discountPrice": 0, "originalPrice": 49900}},
                            "promotions": {
                                "promotionalOffers": [
                                    {"promotionalOffers": [{"endDate": "2026-08-14T15:00:00.000Z"}]}
                                ]
                            }
                        },
                        {
                            "title": "Not Promoted",
                            "price": {"totalPrice": {"discountPrice": 49900, "originalPrice": 49900}},
                            "promotions": null
                        },
                        {
                            "title": "Half Off",
                            "productSlug": "half-off",
                            "price": {"totalPrice": {"discountPrice": 24950, "originalPrice": 49900}},
                            "promotions": {
                                "promotionalOffers": [
                                    {"promotionalOffers": [{"endDate": "2026-08-20T15:00:00.000Z"}]}
                                ]
                            }
                        }
                    ]
                }
            }
        }
    }"#;

    #[test]
    fn normalizes_promoted_elements_only() {
        let payload: FreeGamesResponse = serde_json::from_str(FIXTURE).expect("fixture parses");
        let adapter = EpicCatalog::new(Client::new());
        let offers = adapter.normalize(payload);

        assert_eq!(offers.len(), 2);

        let alpha = &offers[0];
        assert_eq!(alpha.title, "Alpha");
        assert_eq!(alpha.current_price, Some(dec!(0.00)));
        assert_eq!(alpha.original_price, Some(dec!(499.00)));
        assert_eq!(alpha.discount_percent, 100);
        assert_eq!(
            alpha.url.as_deref(),
            Some("https://store.epicgames.com/en-US/p/alpha")
        );
        assert_eq!(
            alpha.image_url.as_deref(),
            Some("https://cdn.example/alpha-wide.jpg")
        );
        assert!(alpha.ends_at.is_some());

        let half = &offers[1];
        assert_eq!(half.discount_percent, 50);
        assert_eq!(half.current_price, Some(dec!(249.50)));
    }

    #[test]
    fn missing_price_block_yields_unpriced_offer() {
        let payload: FreeGamesResponse = serde_json::from_str(
            r#"{"data": {"Catalog": {"searchStore": {"elements": [
                {"title": "Mystery", "promotions": {"promotionalOffers": [{"promotionalOffers": [{}]}]}}
            ]}}}}"#,
        )
        .expect("fixture parses");
        let adapter = EpicCatalog::new(Client::new());
        let offers = adapter.normalize(payload);

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].current_price, None);
        assert!(offers[0].url.as_deref().unwrap_or("").contains("browse?q=Mystery"));
    }
}

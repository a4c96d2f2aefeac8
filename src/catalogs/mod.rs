//! Storefront catalog adapters

mod epic;
mod steam;

pub use epic::EpicCatalog;
pub use steam::SteamCatalog;

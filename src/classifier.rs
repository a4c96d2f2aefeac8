//! Turns raw offers into zero-or-one deal each

use crate::models::{Deal, Offer};

/// Classify a fetch cycle's offers against the configured discount
/// threshold.
///
/// Pure: no I/O, no logging. An offer with a current price of zero is
/// always a free deal, even when its discount percent would also clear
/// the threshold. Offers without a usable current price produce nothing;
/// the orchestrator counts and logs them.
pub fn classify(offers: &[Offer], discount_threshold: u8) -> Vec<Deal> {
    let mut deals = Vec::new();

    for offer in offers {
        let Some(current_price) = offer.current_price else {
            continue;
        };

        if current_price.is_zero() {
            deals.push(Deal::free(offer));
        } else if offer.discount_percent >= discount_threshold {
            deals.push(Deal::discount(offer, current_price));
        }
    }

    deals
}

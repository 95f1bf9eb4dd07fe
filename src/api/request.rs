//! Models for making requests.

use crate::time::ServerTime;

/// Options for getting trade offers.
#[derive(Debug, Clone)]
pub struct GetTradeOffersOptions {
    /// Whether to get only active trade offers.
    pub active_only: bool,
    /// Whether to get only historical trade offers.
    pub historical_only: bool,
    /// Whether to get sent trade offers.
    pub get_sent_offers: bool,
    /// Whether to get received trade offers.
    pub get_received_offers: bool,
    /// Whether to get descriptions for items in the trade offers.
    pub get_descriptions: bool,
    /// The time to get trade offers from.
    pub historical_cutoff: Option<ServerTime>,
}

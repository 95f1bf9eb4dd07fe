//! Response envelopes and models returned by the adapter.

use crate::enums::TradeStatus;
use crate::offer::TradeOffer;
use crate::serialize;
use crate::time::ServerTime;
use crate::types::{TradeId, TradeOfferId};
use super::raw::{RawDescription, RawTradeOffer};
use serde::Deserialize;

/// The result returned after sending a new trade offer.
#[derive(Deserialize, Debug, Clone)]
pub struct SentOffer {
    /// The ID of the created offer.
    #[serde(with = "serialize::string")]
    pub tradeofferid: TradeOfferId,
    /// Whether the offer requires mobile confirmation before it becomes active.
    #[serde(default)]
    pub needs_mobile_confirmation: bool,
    /// Whether the offer requires email confirmation before it becomes active.
    #[serde(default)]
    pub needs_email_confirmation: bool,
    /// The domain of the email address the confirmation was sent to.
    pub email_domain: Option<String>,
}

/// The result returned after accepting a trade offer.
#[derive(Deserialize, Debug, Clone)]
pub struct AcceptedOffer {
    /// The ID of the trade created by accepting the offer.
    #[serde(default)]
    #[serde(with = "serialize::option_string")]
    pub tradeid: Option<TradeId>,
    #[serde(default)]
    pub needs_mobile_confirmation: bool,
    #[serde(default)]
    pub needs_email_confirmation: bool,
    pub email_domain: Option<String>,
}

/// A trade as reported by the trade status endpoint.
#[derive(Deserialize, Debug, Clone)]
pub struct Trade {
    /// The ID of the trade.
    #[serde(with = "serialize::string")]
    pub tradeid: TradeId,
    /// The status of the trade.
    pub status: TradeStatus,
    /// The time the trade was initiated.
    #[serde(default)]
    #[serde(with = "serialize::ts_seconds_option_none_when_zero")]
    pub time_init: Option<ServerTime>,
}

/// The offers returned by a listing call, split by direction.
#[derive(Debug, Clone, Default)]
pub struct TradeOffers {
    /// Offers we sent.
    pub sent: Vec<TradeOffer>,
    /// Offers sent to us.
    pub received: Vec<TradeOffer>,
    /// The earliest `time_updated` in seconds among returned offers whose state may still
    /// change. Used to pull the next poll's cutoff back so pending transitions stay in view.
    pub oldest_nonterminal: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct GetTradeOffersResponseBody {
    #[serde(default)]
    pub trade_offers_sent: Vec<RawTradeOffer>,
    #[serde(default)]
    pub trade_offers_received: Vec<RawTradeOffer>,
    #[serde(default)]
    pub descriptions: Vec<RawDescription>,
    #[serde(default)]
    pub next_cursor: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct GetTradeOffersResponse {
    pub response: GetTradeOffersResponseBody,
}

#[derive(Deserialize, Debug)]
pub(crate) struct GetTradeOfferResponseBody {
    pub offer: Option<RawTradeOffer>,
    #[serde(default)]
    pub descriptions: Vec<RawDescription>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct GetTradeOfferResponse {
    pub response: GetTradeOfferResponseBody,
}

#[derive(Deserialize, Debug)]
pub(crate) struct GetTradeStatusResponseBody {
    #[serde(default)]
    pub trades: Vec<Trade>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct GetTradeStatusResponse {
    pub response: GetTradeStatusResponseBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_sent_offer() {
        let json = r#"{"tradeofferid":"4000000000","needs_mobile_confirmation":true}"#;
        let sent: SentOffer = serde_json::from_str(json).unwrap();

        assert_eq!(sent.tradeofferid, 4000000000);
        assert!(sent.needs_mobile_confirmation);
        assert!(!sent.needs_email_confirmation);
    }

    #[test]
    fn deserializes_an_accepted_offer() {
        let json = r#"{"tradeid":"438321960019618212"}"#;
        let accepted: AcceptedOffer = serde_json::from_str(json).unwrap();

        assert_eq!(accepted.tradeid, Some(438321960019618212));
    }
}

//! Raw response models for API responses.

use std::collections::HashMap;
use crate::enums::{ConfirmationMethod, TradeOfferState};
use crate::offer::{OfferItem, TradeOffer};
use crate::serialize;
use crate::time::ServerTime;
use crate::types::{Amount, AppId, AssetId, ClassId, ContextId, InstanceId, TradeId, TradeOfferId};
use chrono::serde::ts_seconds;
use serde::Deserialize;
use steamid_ng::{AccountType, Instance, SteamID, Universe};

/// Display names keyed by class.
pub type DescriptionMap = HashMap<(AppId, ClassId, InstanceId), String>;

/// A trade offer as returned by the listing endpoints.
#[derive(Deserialize, Debug, Clone)]
pub struct RawTradeOffer {
    /// The ID for this offer.
    #[serde(with = "serialize::string")]
    pub tradeofferid: TradeOfferId,
    /// The trade ID for this offer. Usually present once the offer has been accepted.
    #[serde(default)]
    #[serde(with = "serialize::option_string")]
    pub tradeid: Option<TradeId>,
    /// The account ID of our partner.
    pub accountid_other: u32,
    /// The message included in the offer.
    #[serde(default)]
    #[serde(deserialize_with = "serialize::empty_string_is_none")]
    pub message: Option<String>,
    /// The items we're receiving in this offer.
    #[serde(default)]
    pub items_to_receive: Vec<RawAsset>,
    /// The items we're giving in this offer.
    #[serde(default)]
    pub items_to_give: Vec<RawAsset>,
    /// Whether this offer was created by us or not.
    #[serde(default)]
    pub is_our_offer: bool,
    /// Whether this offer originated from a real time trade.
    #[serde(default)]
    pub from_real_time_trade: bool,
    /// The time before the offer expires if it has not been acted on.
    #[serde(with = "ts_seconds")]
    pub expiration_time: ServerTime,
    /// The time this offer was created.
    #[serde(with = "ts_seconds")]
    pub time_created: ServerTime,
    /// The time this offer last had an action e.g. accepting or declining the offer.
    #[serde(with = "ts_seconds")]
    pub time_updated: ServerTime,
    /// The state of this offer.
    pub trade_offer_state: TradeOfferState,
    /// The end date if this trade is in escrow. `None` when this offer is not in escrow.
    #[serde(default)]
    #[serde(with = "serialize::ts_seconds_option_none_when_zero")]
    pub escrow_end_date: Option<ServerTime>,
    /// The confirmation method for this offer.
    #[serde(default)]
    pub confirmation_method: ConfirmationMethod,
}

impl RawTradeOffer {
    /// Converts into a [`TradeOffer`], attaching display names from `descriptions` when
    /// present.
    pub fn into_offer(self, descriptions: Option<&DescriptionMap>) -> TradeOffer {
        fn collect_items(
            assets: Vec<RawAsset>,
            descriptions: Option<&DescriptionMap>,
        ) -> Vec<OfferItem> {
            assets
                .into_iter()
                .map(|asset| OfferItem {
                    name: descriptions
                        .and_then(|map| map.get(&(asset.appid, asset.classid, asset.instanceid)))
                        .cloned(),
                    appid: asset.appid,
                    contextid: asset.contextid,
                    assetid: asset.assetid,
                    amount: asset.amount,
                })
                .collect()
        }

        TradeOffer {
            id: Some(self.tradeofferid),
            partner: steamid_from_accountid(self.accountid_other),
            trade_offer_state: self.trade_offer_state,
            is_our_offer: Some(self.is_our_offer),
            from_real_time_trade: self.from_real_time_trade,
            confirmation_method: self.confirmation_method,
            tradeid: self.tradeid,
            time_created: Some(self.time_created),
            time_updated: Some(self.time_updated),
            expiration_time: Some(self.expiration_time),
            escrow_end_date: self.escrow_end_date,
            cancel_after: None,
            pending_cancel_after: None,
            message: self.message,
            token: None,
            countering: None,
            items_to_give: collect_items(self.items_to_give, descriptions),
            items_to_receive: collect_items(self.items_to_receive, descriptions),
            with_descriptions: descriptions.is_some(),
        }
    }
}

/// An asset belonging to a raw trade offer.
#[derive(Deserialize, Debug, Clone)]
pub struct RawAsset {
    pub appid: AppId,
    #[serde(with = "serialize::string")]
    pub contextid: ContextId,
    #[serde(with = "serialize::string")]
    pub assetid: AssetId,
    #[serde(with = "serialize::string")]
    pub classid: ClassId,
    #[serde(default)]
    #[serde(with = "serialize::option_string_0_as_none")]
    pub instanceid: InstanceId,
    #[serde(with = "serialize::string")]
    pub amount: Amount,
}

/// A class description rider included when descriptions are requested.
#[derive(Deserialize, Debug, Clone)]
pub struct RawDescription {
    pub appid: AppId,
    #[serde(with = "serialize::string")]
    pub classid: ClassId,
    #[serde(default)]
    #[serde(with = "serialize::option_string_0_as_none")]
    pub instanceid: InstanceId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub market_hash_name: Option<String>,
}

impl RawDescription {
    pub fn class(&self) -> (AppId, ClassId, InstanceId) {
        (self.appid, self.classid, self.instanceid)
    }

    pub fn display_name(&self) -> Option<String> {
        self.name.clone().or_else(|| self.market_hash_name.clone())
    }
}

fn steamid_from_accountid(accountid: u32) -> SteamID {
    SteamID::new(
        accountid,
        Instance::Desktop,
        AccountType::Individual,
        Universe::Public,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::TradeOfferState;

    fn offer_json() -> &'static str {
        r#"{
            "tradeofferid": "4000000000",
            "accountid_other": 1234,
            "message": "one key",
            "expiration_time": 1641859200,
            "trade_offer_state": 2,
            "items_to_give": [{
                "appid": 440,
                "contextid": "2",
                "assetid": "11112222",
                "classid": "101785959",
                "instanceid": "11040578",
                "amount": "1"
            }],
            "is_our_offer": true,
            "time_created": 1640649600,
            "time_updated": 1640649600,
            "from_real_time_trade": false,
            "escrow_end_date": 0,
            "confirmation_method": 2
        }"#
    }

    #[test]
    fn deserializes_a_raw_offer() {
        let raw: RawTradeOffer = serde_json::from_str(offer_json()).unwrap();

        assert_eq!(raw.tradeofferid, 4000000000);
        assert_eq!(raw.trade_offer_state, TradeOfferState::Active);
        assert!(raw.tradeid.is_none());
        assert!(raw.escrow_end_date.is_none());
        assert_eq!(raw.items_to_give[0].instanceid, Some(11040578));
    }

    #[test]
    fn converts_into_an_offer_with_names() {
        let raw: RawTradeOffer = serde_json::from_str(offer_json()).unwrap();
        let mut descriptions = DescriptionMap::new();

        descriptions.insert(
            (440, 101785959, Some(11040578)),
            "Mann Co. Supply Crate Key".into(),
        );

        let offer = raw.into_offer(Some(&descriptions));

        assert_eq!(offer.id, Some(4000000000));
        assert_eq!(offer.partner.account_id(), 1234);
        assert_eq!(
            offer.items_to_give()[0].name.as_deref(),
            Some("Mann Co. Supply Crate Key"),
        );
        assert!(!offer.is_glitched());
    }

    #[test]
    fn missing_names_glitch_described_offers() {
        let raw: RawTradeOffer = serde_json::from_str(offer_json()).unwrap();
        let descriptions = DescriptionMap::new();
        let offer = raw.into_offer(Some(&descriptions));

        assert!(offer.is_glitched());
    }
}

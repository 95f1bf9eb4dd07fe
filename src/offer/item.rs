use crate::serialize;
use crate::types::{Amount, AppId, AssetId, ContextId};
use serde::{Deserialize, Serialize};

/// An item included in a trade offer.
#[derive(Deserialize, Serialize, Debug, Clone, Default, Eq, PartialEq)]
pub struct OfferItem {
    /// The app ID e.g. `440` for Team Fortress 2 or `730` for Counter-Strike Global Offensive.
    pub appid: AppId,
    /// The context ID.
    #[serde(with = "serialize::string")]
    pub contextid: ContextId,
    /// The unique asset ID. This value is unique to the item's `appid` and `contextid`.
    #[serde(with = "serialize::string")]
    pub assetid: AssetId,
    /// The amount. If this item is not stackable the amount will be `1`.
    pub amount: Amount,
    /// The item's display name. Filled in from descriptions when description loading is enabled;
    /// never sent in requests.
    #[serde(skip)]
    pub name: Option<String>,
}

impl OfferItem {
    /// Creates a new item reference.
    pub fn new(appid: AppId, contextid: ContextId, assetid: AssetId, amount: Amount) -> Self {
        Self {
            appid,
            contextid,
            assetid,
            amount,
            name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_ids_as_strings() {
        let item = OfferItem::new(440, 2, 11112222, 1);
        let json = serde_json::to_string(&item).unwrap();

        assert_eq!(json, r#"{"appid":440,"contextid":"2","assetid":"11112222","amount":1}"#);
    }
}

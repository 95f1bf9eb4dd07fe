use crate::error::ParameterError;
use super::{OfferItem, TradeOffer};
use chrono::Duration;
use steamid_ng::SteamID;

/// Builder for constructing new trade offers.
pub struct TradeOfferBuilder {
    /// The partner's [`SteamID`] for this offer.
    pub partner: SteamID,
    /// The items to give in this offer.
    pub items_to_give: Vec<OfferItem>,
    /// The items to receive in this offer.
    pub items_to_receive: Vec<OfferItem>,
    /// The message to send in this offer.
    pub message: Option<String>,
    /// The access token for sending an offer if you are not friends with the partner.
    pub token: Option<String>,
    /// Per-offer override for the active auto-cancel duration.
    pub cancel_after: Option<Duration>,
    /// Per-offer override for the unconfirmed auto-cancel duration.
    pub pending_cancel_after: Option<Duration>,
}

impl TradeOfferBuilder {
    /// Creates a new [`TradeOfferBuilder`] with the given partner.
    pub fn new(partner: SteamID) -> Self {
        Self {
            partner,
            items_to_give: Vec::new(),
            items_to_receive: Vec::new(),
            message: None,
            token: None,
            cancel_after: None,
            pending_cancel_after: None,
        }
    }

    /// The items to give in this offer.
    pub fn items_to_give<T>(mut self, items: T) -> Self
    where
        T: IntoIterator,
        T::Item: Into<OfferItem>,
    {
        self.items_to_give = items.into_iter().map(|i| i.into()).collect();
        self
    }

    /// The items to receive in this offer.
    pub fn items_to_receive<T>(mut self, items: T) -> Self
    where
        T: IntoIterator,
        T::Item: Into<OfferItem>,
    {
        self.items_to_receive = items.into_iter().map(|i| i.into()).collect();
        self
    }

    /// The trade offer URL for sending an offer if you are not friends with the partner.
    /// Silently fails if the URL does not contain a token. If you want to check if the token
    /// was parsed successfully check if the `token` of the builder is `Some`.
    pub fn trade_offer_url(mut self, trade_offer_url: &str) -> Self {
        self.token = parse_offer_access_token(trade_offer_url);
        self
    }

    /// The token for sending an offer if you are not friends with the partner.
    pub fn token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    /// The message to send in this offer.
    pub fn message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }

    /// Cancels this offer during polls once it has been active for the given duration,
    /// overriding the manager-wide setting.
    pub fn cancel_after(mut self, duration: Duration) -> Self {
        self.cancel_after = Some(duration);
        self
    }

    /// Cancels this offer during polls once it has awaited confirmation for the given duration,
    /// overriding the manager-wide setting.
    pub fn pending_cancel_after(mut self, duration: Duration) -> Self {
        self.pending_cancel_after = Some(duration);
        self
    }

    /// Builds into [`TradeOffer`].
    pub fn build(self) -> Result<TradeOffer, ParameterError> {
        let mut offer = TradeOffer::new(self.partner, self.token)?;

        offer.set_message(self.message)?;
        offer.items_to_give = self.items_to_give;
        offer.items_to_receive = self.items_to_receive;
        offer.cancel_after = self.cancel_after;
        offer.pending_cancel_after = self.pending_cancel_after;

        Ok(offer)
    }
}

fn parse_offer_access_token(trade_offer_url: &str) -> Option<String> {
    if let Ok(url) = url::Url::parse(trade_offer_url) {
        let pairs = url.query_pairs();
        let hostname = url.host_str();

        if hostname != Some("steamcommunity.com") {
            return None;
        }

        for (key, value) in pairs {
            if key == std::borrow::Cow::Borrowed("token") {
                if value.len() == 8 {
                    return Some(value.to_string());
                } else {
                    // not a valid token
                    return None;
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use steamid_ng::{AccountType, Instance, Universe};

    #[test]
    fn parses_trade_offer_url() {
        let url = "https://steamcommunity.com/tradeoffer/new/?partner=0&token=TkA5KFkh";
        let token = parse_offer_access_token(url).unwrap();

        assert_eq!(token, "TkA5KFkh");
    }

    #[test]
    fn rejects_other_hosts() {
        let url = "https://example.com/tradeoffer/new/?partner=0&token=TkA5KFkh";

        assert!(parse_offer_access_token(url).is_none());
    }

    #[test]
    fn builds_an_offer() {
        let partner = SteamID::new(100, Instance::Desktop, AccountType::Individual, Universe::Public);
        let offer = TradeOffer::builder(partner)
            .items_to_give(vec![OfferItem::new(440, 2, 1, 1)])
            .message("one key".into())
            .build()
            .unwrap();

        assert_eq!(offer.items_to_give().len(), 1);
        assert_eq!(offer.message(), Some("one key"));
        assert!(offer.id.is_none());
    }
}

use std::fmt;
use crate::enums::{ConfirmationMethod, TradeOfferState};
use crate::error::ParameterError;
use crate::time::ServerTime;
use crate::types::{TradeId, TradeOfferId};
use super::{OfferItem, TradeOfferBuilder};
use chrono::Duration;
use steamid_ng::{AccountType, SteamID};

const MESSAGE_MAX_LENGTH: usize = 128;

/// A trade offer. Before a successful send `id` is `None` and the item sides and message may
/// still be modified; once the remote has acknowledged the offer it becomes read-only and is
/// updated from polls.
#[derive(Debug, Clone)]
pub struct TradeOffer {
    /// The ID for this offer. `None` until the offer has been accepted by the server.
    pub id: Option<TradeOfferId>,
    /// The [`SteamID`] of our partner.
    pub partner: SteamID,
    /// The state of this offer.
    pub trade_offer_state: TradeOfferState,
    /// Whether this offer was created by us or not. `None` before the offer is sent.
    pub is_our_offer: Option<bool>,
    /// Whether this offer originated from a real time trade.
    pub from_real_time_trade: bool,
    /// The confirmation method for this offer.
    pub confirmation_method: ConfirmationMethod,
    /// The trade ID for this offer. Present once the offer has been accepted.
    pub tradeid: Option<TradeId>,
    /// The time this offer was created.
    pub time_created: Option<ServerTime>,
    /// The time this offer last had an action e.g. accepting or declining the offer.
    pub time_updated: Option<ServerTime>,
    /// The time before the offer expires if it has not been acted on.
    pub expiration_time: Option<ServerTime>,
    /// The end date if this trade is in escrow. `None` when this offer is not in escrow.
    pub escrow_end_date: Option<ServerTime>,
    /// Overrides the manager-wide duration after which this active offer is auto-canceled.
    pub cancel_after: Option<Duration>,
    /// Overrides the manager-wide duration after which this unconfirmed offer is auto-canceled.
    pub pending_cancel_after: Option<Duration>,
    pub(crate) message: Option<String>,
    pub(crate) token: Option<String>,
    pub(crate) countering: Option<TradeOfferId>,
    pub(crate) items_to_give: Vec<OfferItem>,
    pub(crate) items_to_receive: Vec<OfferItem>,
    pub(crate) with_descriptions: bool,
}

impl TradeOffer {
    /// Creates a new offer for the given partner. The partner must be an individual account.
    pub fn new(partner: SteamID, token: Option<String>) -> Result<Self, ParameterError> {
        if partner.account_type() != AccountType::Individual {
            return Err(ParameterError::PartnerNotIndividual);
        }

        Ok(Self {
            id: None,
            partner,
            trade_offer_state: TradeOfferState::Invalid,
            is_our_offer: None,
            from_real_time_trade: false,
            confirmation_method: ConfirmationMethod::None,
            tradeid: None,
            time_created: None,
            time_updated: None,
            expiration_time: None,
            escrow_end_date: None,
            cancel_after: None,
            pending_cancel_after: None,
            message: None,
            token,
            countering: None,
            items_to_give: Vec::new(),
            items_to_receive: Vec::new(),
            with_descriptions: false,
        })
    }

    /// Builder for constructing a new offer.
    pub fn builder(partner: SteamID) -> TradeOfferBuilder {
        TradeOfferBuilder::new(partner)
    }

    fn ensure_unsent(&self) -> Result<(), ParameterError> {
        if self.id.is_some() {
            return Err(ParameterError::OfferAlreadySent);
        }

        Ok(())
    }

    /// The message included in the offer.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The trade invite token used at send time.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The ID of the offer this offer counters, if any.
    pub fn countering(&self) -> Option<TradeOfferId> {
        self.countering
    }

    /// The items we're giving in this offer.
    pub fn items_to_give(&self) -> &[OfferItem] {
        &self.items_to_give
    }

    /// The items we're receiving in this offer.
    pub fn items_to_receive(&self) -> &[OfferItem] {
        &self.items_to_receive
    }

    /// Sets the offer message. Limited to 128 characters. Fails once the offer has been sent.
    pub fn set_message(&mut self, message: Option<String>) -> Result<(), ParameterError> {
        self.ensure_unsent()?;

        if let Some(message) = &message {
            let length = message.chars().count();

            if length > MESSAGE_MAX_LENGTH {
                return Err(ParameterError::MessageTooLong(length));
            }
        }

        self.message = message;
        Ok(())
    }

    /// Sets the trade invite token. Fails once the offer has been sent.
    pub fn set_token(&mut self, token: Option<String>) -> Result<(), ParameterError> {
        self.ensure_unsent()?;
        self.token = token;
        Ok(())
    }

    /// Adds an item to our side of the offer. Fails once the offer has been sent.
    pub fn add_item_to_give(&mut self, item: OfferItem) -> Result<(), ParameterError> {
        self.ensure_unsent()?;
        self.items_to_give.push(item);
        Ok(())
    }

    /// Adds an item to their side of the offer. Fails once the offer has been sent.
    pub fn add_item_to_receive(&mut self, item: OfferItem) -> Result<(), ParameterError> {
        self.ensure_unsent()?;
        self.items_to_receive.push(item);
        Ok(())
    }

    /// Removes an item from our side of the offer. Returns whether the item was present. Fails
    /// once the offer has been sent.
    pub fn remove_item_to_give(&mut self, item: &OfferItem) -> Result<bool, ParameterError> {
        self.ensure_unsent()?;
        Ok(remove_item(&mut self.items_to_give, item))
    }

    /// Removes an item from their side of the offer. Returns whether the item was present. Fails
    /// once the offer has been sent.
    pub fn remove_item_to_receive(&mut self, item: &OfferItem) -> Result<bool, ParameterError> {
        self.ensure_unsent()?;
        Ok(remove_item(&mut self.items_to_receive, item))
    }

    /// Whether both item sides are empty.
    pub fn is_empty(&self) -> bool {
        self.items_to_give.is_empty() &&
        self.items_to_receive.is_empty()
    }

    /// Whether this offer was created by us.
    pub fn is_ours(&self) -> bool {
        self.is_our_offer.unwrap_or(false)
    }

    /// Whether the remote served a partial view of this offer. Glitched offers must be ignored
    /// until a later poll returns them intact.
    pub fn is_glitched(&self) -> bool {
        if self.id.is_none() {
            return false;
        }

        if self.is_empty() {
            return true;
        }

        self.with_descriptions &&
        self.items_to_give.iter()
            .chain(self.items_to_receive.iter())
            .any(|item| item.name.is_none())
    }

    /// String tag for the offer state, for logging.
    pub fn state_name(&self) -> String {
        self.trade_offer_state.to_string()
    }

    /// String tag for the confirmation method, for logging.
    pub fn confirmation_method_name(&self) -> String {
        self.confirmation_method.to_string()
    }
}

fn remove_item(items: &mut Vec<OfferItem>, item: &OfferItem) -> bool {
    let length = items.len();

    items.retain(|i| {
        i.appid != item.appid ||
        i.contextid != item.contextid ||
        i.assetid != item.assetid
    });

    items.len() != length
}

impl fmt::Display for TradeOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "[{}:{}]", u64::from(self.partner), id),
            None => write!(f, "[{}:new]", u64::from(self.partner)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steamid_ng::{Instance, Universe};

    fn partner() -> SteamID {
        SteamID::new(1234, Instance::Desktop, AccountType::Individual, Universe::Public)
    }

    fn item() -> OfferItem {
        OfferItem::new(440, 2, 101, 1)
    }

    #[test]
    fn rejects_non_individual_partner() {
        let clan = SteamID::new(1234, Instance::All, AccountType::Clan, Universe::Public);
        let offer = TradeOffer::new(clan, None);

        assert!(matches!(offer, Err(ParameterError::PartnerNotIndividual)));
    }

    #[test]
    fn mutators_fail_after_send() {
        let mut offer = TradeOffer::new(partner(), None).unwrap();

        offer.add_item_to_give(item()).unwrap();
        offer.id = Some(1);

        assert!(matches!(
            offer.add_item_to_give(item()),
            Err(ParameterError::OfferAlreadySent)
        ));
        assert!(matches!(
            offer.set_message(Some("hi".into())),
            Err(ParameterError::OfferAlreadySent)
        ));
        assert!(matches!(
            offer.remove_item_to_give(&item()),
            Err(ParameterError::OfferAlreadySent)
        ));
    }

    #[test]
    fn rejects_long_messages() {
        let mut offer = TradeOffer::new(partner(), None).unwrap();
        let message = "a".repeat(129);

        assert!(matches!(
            offer.set_message(Some(message)),
            Err(ParameterError::MessageTooLong(129))
        ));
        assert!(offer.set_message(Some("a".repeat(128))).is_ok());
    }

    #[test]
    fn removes_items() {
        let mut offer = TradeOffer::new(partner(), None).unwrap();

        offer.add_item_to_give(item()).unwrap();

        assert!(offer.remove_item_to_give(&item()).unwrap());
        assert!(!offer.remove_item_to_give(&item()).unwrap());
        assert!(offer.is_empty());
    }

    #[test]
    fn unsent_offers_are_not_glitched() {
        let offer = TradeOffer::new(partner(), None).unwrap();

        assert!(!offer.is_glitched());
    }

    #[test]
    fn sent_offers_with_no_items_are_glitched() {
        let mut offer = TradeOffer::new(partner(), None).unwrap();

        offer.id = Some(1);

        assert!(offer.is_glitched());
    }

    #[test]
    fn nameless_items_are_glitched_with_descriptions() {
        let mut offer = TradeOffer::new(partner(), None).unwrap();

        offer.add_item_to_give(item()).unwrap();
        offer.id = Some(1);

        assert!(!offer.is_glitched());

        offer.with_descriptions = true;

        assert!(offer.is_glitched());

        offer.items_to_give[0].name = Some("Mann Co. Supply Crate Key".into());

        assert!(!offer.is_glitched());
    }
}

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde_repr::{Deserialize_repr, Serialize_repr};
use strum_macros::{Display, EnumString};

/// The state of a trade offer.
#[derive(Debug, Serialize_repr, Deserialize_repr, Display, EnumString, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum TradeOfferState {
    /// Invalid.
    Invalid = 1,
    /// This trade offer has been sent, neither party has acted on it yet.
    Active = 2,
    /// The trade offer was accepted by the recipient and items were exchanged.
    Accepted = 3,
    /// The recipient made a counter offer.
    Countered = 4,
    /// The trade offer was not accepted before the expiration date.
    Expired = 5,
    /// The sender canceled the offer.
    Canceled = 6,
    /// The recipient declined the offer.
    Declined = 7,
    /// Some of the items in the offer are no longer available.
    InvalidItems = 8,
    /// The offer hasn't been sent yet and is awaiting confirmation.
    CreatedNeedsConfirmation = 9,
    /// Either party canceled the offer via email or mobile confirmation.
    CanceledBySecondFactor = 10,
    /// The trade has been placed on hold.
    InEscrow = 11,
    /// A trade that was in escrow was rolled back.
    EscrowRollback = 12,
}

impl TradeOfferState {
    /// Whether no further state transitions are expected for an offer in this state.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::Active |
            Self::Accepted |
            Self::CreatedNeedsConfirmation |
            Self::InEscrow
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_states_are_not_terminal() {
        assert!(!TradeOfferState::Active.is_terminal());
        assert!(!TradeOfferState::Accepted.is_terminal());
        assert!(!TradeOfferState::CreatedNeedsConfirmation.is_terminal());
        assert!(!TradeOfferState::InEscrow.is_terminal());
    }

    #[test]
    fn closed_states_are_terminal() {
        assert!(TradeOfferState::Invalid.is_terminal());
        assert!(TradeOfferState::Countered.is_terminal());
        assert!(TradeOfferState::Expired.is_terminal());
        assert!(TradeOfferState::Canceled.is_terminal());
        assert!(TradeOfferState::Declined.is_terminal());
        assert!(TradeOfferState::InvalidItems.is_terminal());
        assert!(TradeOfferState::CanceledBySecondFactor.is_terminal());
        assert!(TradeOfferState::EscrowRollback.is_terminal());
    }

    #[test]
    fn deserializes_from_number() {
        let state: TradeOfferState = serde_json::from_str("2").unwrap();

        assert_eq!(state, TradeOfferState::Active);
    }
}

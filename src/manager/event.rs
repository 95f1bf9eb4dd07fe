use std::fmt;
use crate::enums::TradeOfferState;
use crate::error::Error;
use crate::offer::TradeOffer;

/// Why a sent offer was automatically canceled during a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The offer had been active longer than the configured duration.
    CancelTime,
    /// The offer was trimmed to stay under the outstanding offer cap.
    CancelOfferCount,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CancelTime => write!(f, "cancelTime"),
            Self::CancelOfferCount => write!(f, "cancelOfferCount"),
        }
    }
}

/// Lifecycle notifications published by the manager. Delivered over the channel returned by
/// [`crate::TradeOfferManager::start_polling`]; consumers match exhaustively.
#[derive(Debug)]
pub enum TradeOfferEvent {
    /// A poll completed.
    PollSuccess,
    /// A poll failed. The next scheduled poll will retry.
    PollFailure(Error),
    /// A new offer was sent to us.
    NewOffer(TradeOffer),
    /// An offer we sent changed state.
    SentOfferChanged {
        offer: TradeOffer,
        old_state: TradeOfferState,
    },
    /// An offer sent to us changed state.
    ReceivedOfferChanged {
        offer: TradeOffer,
        old_state: TradeOfferState,
    },
    /// An offer we have no record of sending appeared in our sent offers. Offers sent through
    /// this manager do not produce this event.
    UnknownOfferSent(TradeOffer),
    /// A sent offer was automatically canceled.
    SentOfferCanceled {
        offer: TradeOffer,
        reason: CancelReason,
    },
    /// A sent offer awaiting confirmation was automatically canceled.
    SentPendingOfferCanceled(TradeOffer),
    /// A real time trade requires a second-factor confirmation to proceed.
    RealTimeTradeConfirmationRequired(TradeOffer),
    /// A real time trade completed.
    RealTimeTradeCompleted(TradeOffer),
    /// The web session backing requests is no longer valid.
    SessionExpired(String),
    /// The account is under family view restrictions.
    FamilyViewRestricted(String),
    /// Diagnostic message.
    Debug(String),
}

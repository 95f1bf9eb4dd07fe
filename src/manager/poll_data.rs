use std::collections::{HashMap, HashSet};
use crate::enums::TradeOfferState;
use crate::types::TradeOfferId;
use serde::{Deserialize, Serialize};

/// Offer update times reported by the server are occasionally backdated. Cutoff comparisons are
/// biased this many seconds earlier to absorb it.
pub const OFFERS_SINCE_BUFFER_SECONDS: i64 = 60 * 30;

/// Which listing an offer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferSide {
    /// Offers authored by us.
    Sent,
    /// Offers sent to us.
    Received,
}

/// The manager's persistent record of known offers: the last state seen for each offer, when it
/// last changed, per-offer auto-cancel overrides, and the cutoff for the next delta fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollData {
    /// Last known state of offers authored by us.
    #[serde(default)]
    pub sent: HashMap<TradeOfferId, TradeOfferState>,
    /// Last known state of offers sent to us.
    #[serde(default)]
    pub received: HashMap<TradeOfferId, TradeOfferState>,
    /// The last seen update time for each offer, in unix seconds.
    #[serde(default)]
    pub timestamps: HashMap<TradeOfferId, i64>,
    /// Per-offer overrides for the active auto-cancel duration, in milliseconds.
    #[serde(default)]
    pub cancel_times: HashMap<TradeOfferId, i64>,
    /// Per-offer overrides for the unconfirmed auto-cancel duration, in milliseconds.
    #[serde(default)]
    pub pending_cancel_times: HashMap<TradeOfferId, i64>,
    /// Unix seconds used as the historical cutoff for the next delta fetch.
    #[serde(default)]
    pub offers_since: i64,
    /// Whether the data has changed. Used for reducing file writes.
    #[serde(default, skip_serializing)]
    pub(crate) changed: bool,
}

impl PollData {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded state for an offer on the given side.
    pub fn state_of(&self, side: OfferSide, tradeofferid: TradeOfferId) -> Option<TradeOfferState> {
        self.side(side).get(&tradeofferid).copied()
    }

    fn side(&self, side: OfferSide) -> &HashMap<TradeOfferId, TradeOfferState> {
        match side {
            OfferSide::Sent => &self.sent,
            OfferSide::Received => &self.received,
        }
    }

    fn side_mut(&mut self, side: OfferSide) -> &mut HashMap<TradeOfferId, TradeOfferState> {
        match side {
            OfferSide::Sent => &mut self.sent,
            OfferSide::Received => &mut self.received,
        }
    }

    /// Records the state and update time of an offer.
    pub fn record(
        &mut self,
        side: OfferSide,
        tradeofferid: TradeOfferId,
        state: TradeOfferState,
        time_updated: i64,
    ) {
        let states = self.side_mut(side);

        if states.get(&tradeofferid) != Some(&state) {
            states.insert(tradeofferid, state);
            self.changed = true;
        }

        if self.timestamps.get(&tradeofferid) != Some(&time_updated) {
            self.timestamps.insert(tradeofferid, time_updated);
            self.changed = true;
        }
    }

    /// Sets the per-offer active auto-cancel override in milliseconds.
    pub fn set_cancel_time(&mut self, tradeofferid: TradeOfferId, milliseconds: i64) {
        self.cancel_times.insert(tradeofferid, milliseconds);
        self.changed = true;
    }

    /// Sets the per-offer unconfirmed auto-cancel override in milliseconds.
    pub fn set_pending_cancel_time(&mut self, tradeofferid: TradeOfferId, milliseconds: i64) {
        self.pending_cancel_times.insert(tradeofferid, milliseconds);
        self.changed = true;
    }

    /// Removes the auto-cancel overrides for an offer.
    pub fn delete_time_props(&mut self, tradeofferid: TradeOfferId) {
        let removed = self.cancel_times.remove(&tradeofferid).is_some();
        let removed = self.pending_cancel_times.remove(&tradeofferid).is_some() || removed;

        self.changed = self.changed || removed;
    }

    /// Removes every record of an offer.
    pub fn delete_all(&mut self, tradeofferid: TradeOfferId) {
        let mut removed = self.sent.remove(&tradeofferid).is_some();

        removed = self.received.remove(&tradeofferid).is_some() || removed;
        removed = self.timestamps.remove(&tradeofferid).is_some() || removed;
        removed = self.cancel_times.remove(&tradeofferid).is_some() || removed;
        removed = self.pending_cancel_times.remove(&tradeofferid).is_some() || removed;

        self.changed = self.changed || removed;
    }

    /// Advances the delta cutoff. The cutoff never moves backwards.
    pub fn set_offers_since(&mut self, seconds: i64) {
        if seconds > self.offers_since {
            self.offers_since = seconds;
            self.changed = true;
        }
    }

    /// Drops offers which reached a terminal state before the current cutoff window. Keeps the
    /// state maps from growing indefinitely.
    pub fn prune(&mut self) {
        let cutoff = self.offers_since - OFFERS_SINCE_BUFFER_SECONDS;
        let expired = self.sent.iter()
            .chain(self.received.iter())
            .filter(|(tradeofferid, state)| {
                state.is_terminal() &&
                self.timestamps.get(tradeofferid).copied().unwrap_or(0) < cutoff
            })
            .map(|(tradeofferid, _state)| *tradeofferid)
            .collect::<HashSet<_>>();

        for tradeofferid in expired {
            self.delete_all(tradeofferid);
        }
    }

    /// Folds previously persisted data underneath the current in-memory data. Entries recorded
    /// in memory win over their loaded counterparts.
    pub fn merge_loaded(&mut self, loaded: PollData) {
        for (tradeofferid, state) in loaded.sent {
            self.sent.entry(tradeofferid).or_insert(state);
        }

        for (tradeofferid, state) in loaded.received {
            self.received.entry(tradeofferid).or_insert(state);
        }

        for (tradeofferid, timestamp) in loaded.timestamps {
            self.timestamps.entry(tradeofferid).or_insert(timestamp);
        }

        for (tradeofferid, milliseconds) in loaded.cancel_times {
            self.cancel_times.entry(tradeofferid).or_insert(milliseconds);
        }

        for (tradeofferid, milliseconds) in loaded.pending_cancel_times {
            self.pending_cancel_times.entry(tradeofferid).or_insert(milliseconds);
        }

        self.set_offers_since(loaded.offers_since);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_states_and_timestamps() {
        let mut poll_data = PollData::new();

        poll_data.record(OfferSide::Sent, 1, TradeOfferState::Active, 100);

        assert_eq!(poll_data.state_of(OfferSide::Sent, 1), Some(TradeOfferState::Active));
        assert_eq!(poll_data.timestamps.get(&1), Some(&100));
        assert!(poll_data.changed);
    }

    #[test]
    fn offers_since_never_moves_backwards() {
        let mut poll_data = PollData::new();

        poll_data.set_offers_since(1000);
        poll_data.set_offers_since(500);

        assert_eq!(poll_data.offers_since, 1000);

        poll_data.set_offers_since(2000);

        assert_eq!(poll_data.offers_since, 2000);
    }

    #[test]
    fn prunes_stale_terminal_offers() {
        let mut poll_data = PollData::new();

        poll_data.record(OfferSide::Sent, 1, TradeOfferState::Declined, 100);
        poll_data.record(OfferSide::Sent, 2, TradeOfferState::Active, 100);
        poll_data.record(OfferSide::Received, 3, TradeOfferState::Canceled, 100);
        poll_data.set_cancel_time(1, 60_000);
        poll_data.set_offers_since(100 + OFFERS_SINCE_BUFFER_SECONDS + 1);
        poll_data.prune();

        // terminal and stale
        assert!(!poll_data.sent.contains_key(&1));
        assert!(!poll_data.timestamps.contains_key(&1));
        assert!(!poll_data.cancel_times.contains_key(&1));
        // still open
        assert!(poll_data.sent.contains_key(&2));
        // terminal and stale on the received side
        assert!(!poll_data.received.contains_key(&3));
    }

    #[test]
    fn keeps_recent_terminal_offers() {
        let mut poll_data = PollData::new();

        poll_data.record(OfferSide::Sent, 1, TradeOfferState::Declined, 100);
        poll_data.set_offers_since(100 + OFFERS_SINCE_BUFFER_SECONDS);
        poll_data.prune();

        assert!(poll_data.sent.contains_key(&1));
    }

    #[test]
    fn in_memory_entries_win_over_loaded() {
        let mut current = PollData::new();
        let mut loaded = PollData::new();

        current.record(OfferSide::Sent, 1, TradeOfferState::Accepted, 200);
        loaded.record(OfferSide::Sent, 1, TradeOfferState::Active, 100);
        loaded.record(OfferSide::Sent, 2, TradeOfferState::Active, 150);
        loaded.set_offers_since(5000);
        current.merge_loaded(loaded);

        assert_eq!(current.state_of(OfferSide::Sent, 1), Some(TradeOfferState::Accepted));
        assert_eq!(current.timestamps.get(&1), Some(&200));
        assert_eq!(current.state_of(OfferSide::Sent, 2), Some(TradeOfferState::Active));
        assert_eq!(current.offers_since, 5000);
    }

    #[test]
    fn serializes_round_trip() {
        let mut poll_data = PollData::new();

        poll_data.record(OfferSide::Sent, 1, TradeOfferState::Active, 100);
        poll_data.set_pending_cancel_time(1, 30_000);
        poll_data.set_offers_since(1234);

        let json = serde_json::to_string(&poll_data).unwrap();
        let loaded: PollData = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.state_of(OfferSide::Sent, 1), Some(TradeOfferState::Active));
        assert_eq!(loaded.pending_cancel_times.get(&1), Some(&30_000));
        assert_eq!(loaded.offers_since, 1234);
        assert!(!loaded.changed);
    }
}

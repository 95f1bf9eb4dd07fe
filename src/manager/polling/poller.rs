use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration as StdDuration, Instant};
use crate::api::{GetTradeOffersOptions, SteamTradeOfferAPI};
use crate::enums::{ConfirmationMethod, TradeOfferState};
use crate::error::Error;
use crate::manager::event::{CancelReason, TradeOfferEvent};
use crate::manager::poll_data::{OfferSide, PollData, OFFERS_SINCE_BUFFER_SECONDS};
use crate::manager::storage::PollDataStorage;
use crate::offer::TradeOffer;
use crate::time::{self, ServerTime};
use super::{policies, PollOptions, PollType};
use futures::future::join_all;
use steamid_ng::SteamID;
use tokio::sync::mpsc;

/// Two polls may not start within this span of one another.
pub(crate) const MIN_POLL_INTERVAL: StdDuration = StdDuration::from_millis(1000);

/// How far back a full update reaches.
const FULL_UPDATE_LOOKBACK_SECONDS: i64 = 60 * 60 * 24 * 180;

pub(crate) struct Poller {
    pub steamid: SteamID,
    pub api: Arc<SteamTradeOfferAPI>,
    pub poll_data: Arc<RwLock<PollData>>,
    pub storage: Option<Arc<dyn PollDataStorage>>,
    pub event_tx: mpsc::UnboundedSender<TradeOfferEvent>,
    pub pending_sends: Arc<AtomicUsize>,
    pub options: PollOptions,
    pub loaded: bool,
    pub last_poll_started: Option<Instant>,
}

impl Poller {
    /// How long until the rate floor admits another poll, if the last one started too recently.
    pub fn rate_floor_remaining(&self) -> Option<StdDuration> {
        let elapsed = self.last_poll_started?.elapsed();

        if elapsed < MIN_POLL_INTERVAL {
            Some(MIN_POLL_INTERVAL - elapsed)
        } else {
            None
        }
    }

    fn send_event(&self, event: TradeOfferEvent) {
        let _ = self.event_tx.send(event);
    }

    fn send_events(&self, events: Vec<TradeOfferEvent>) {
        for event in events {
            self.send_event(event);
        }
    }

    fn emit_debug(&self, message: String) {
        log::debug!("{message}");
        self.send_event(TradeOfferEvent::Debug(message));
    }

    /// Reconciles remote offer state with the recorded poll data, publishing events for every
    /// observed transition. Returns whether a poll was actually performed; polls are skipped
    /// while the API key or session is missing.
    pub async fn do_poll(&mut self, poll_type: PollType) -> Result<bool, Error> {
        let authenticated = self.api.sessionid.read()
            .map(|sessionid| sessionid.is_some())
            .unwrap_or(false);

        if self.api.key.is_none() || !authenticated {
            log::debug!("poll skipped; API key or session is missing");
            return Ok(false);
        }

        self.last_poll_started = Some(Instant::now());

        // One-shot load of persisted state. Anything recorded before the load wins over what
        // was on disk.
        if !self.loaded {
            if let Some(storage) = &self.storage {
                match storage.load(self.steamid).await {
                    Ok(Some(loaded)) => {
                        let mut poll_data = self.poll_data.write().unwrap();

                        poll_data.merge_loaded(loaded);
                    },
                    Ok(None) => {},
                    Err(error) => {
                        self.emit_debug(format!("failed to load poll data: {error}"));
                    },
                }
            }

            self.loaded = true;
        }

        let now = time::get_server_time_now();
        // Recorded before the fetch so that anything updated mid-flight falls after the next
        // cutoff. Biased early to absorb server-side backdating.
        let requested_at = now.timestamp() - OFFERS_SINCE_BUFFER_SECONDS;
        let offers_since = self.poll_data.read().unwrap().offers_since;
        let (active_only, cutoff) = if offers_since > 0 && !poll_type.is_full_update() {
            (true, offers_since - OFFERS_SINCE_BUFFER_SECONDS)
        } else {
            (false, now.timestamp() - FULL_UPDATE_LOOKBACK_SECONDS)
        };
        let offers = self.api.get_raw_trade_offers(&GetTradeOffersOptions {
            active_only,
            historical_only: false,
            get_sent_offers: true,
            get_received_offers: true,
            get_descriptions: self.api.get_descriptions,
            historical_cutoff: Some(time::timestamp_to_server_time(cutoff)),
        }).await?;

        let pending_sends = self.pending_sends.load(Ordering::SeqCst);
        let mut has_glitched = false;

        let events = {
            let mut poll_data = self.poll_data.write().unwrap();

            walk_sent_offers(&mut poll_data, &offers.sent, pending_sends, &mut has_glitched)
        };
        self.send_events(events);

        self.apply_auto_cancel(&offers.sent, now).await;

        #[cfg(feature = "cancel-offer-count")]
        self.apply_quota_trim(&offers.sent, now).await;

        let events = {
            let mut poll_data = self.poll_data.write().unwrap();

            walk_received_offers(&mut poll_data, &offers.received, &mut has_glitched)
        };
        self.send_events(events);

        {
            let mut poll_data = self.poll_data.write().unwrap();

            // A glitched payload leaves the cutoff untouched so the next poll sees the same
            // window again.
            if !has_glitched {
                let next = match offers.oldest_nonterminal {
                    Some(oldest) if oldest < requested_at => oldest,
                    _ => requested_at,
                };

                poll_data.set_offers_since(next);
            }

            poll_data.prune();
        }

        self.persist().await;

        Ok(true)
    }

    /// Cancels returned sent offers that have outlived their allowed age.
    async fn apply_auto_cancel(&self, sent: &[TradeOffer], now: ServerTime) {
        let mut active_targets: Vec<&TradeOffer> = Vec::new();
        let mut pending_targets: Vec<&TradeOffer> = Vec::new();

        {
            let poll_data = self.poll_data.read().unwrap();

            for offer in sent {
                if policies::should_cancel_active(offer, &poll_data, self.options.cancel_time, now) {
                    active_targets.push(offer);
                } else if policies::should_cancel_pending(offer, &poll_data, self.options.pending_cancel_time, now) {
                    pending_targets.push(offer);
                }
            }
        }

        for (targets, pending) in [(active_targets, false), (pending_targets, true)] {
            let api = &self.api;
            let results = join_all(targets.into_iter().filter_map(|offer| {
                let tradeofferid = offer.id?;

                Some(async move {
                    (offer, api.cancel_offer(tradeofferid).await)
                })
            })).await;

            for (offer, result) in results {
                match result {
                    Ok(()) => {
                        if let Some(tradeofferid) = offer.id {
                            self.poll_data.write().unwrap().delete_time_props(tradeofferid);
                        }

                        if pending {
                            self.send_event(TradeOfferEvent::SentPendingOfferCanceled(offer.clone()));
                        } else {
                            self.send_event(TradeOfferEvent::SentOfferCanceled {
                                offer: offer.clone(),
                                reason: CancelReason::CancelTime,
                            });
                        }
                    },
                    Err(error) => {
                        // leave the recorded state alone; the next poll takes another swing
                        self.emit_debug(format!("failed to cancel offer {offer}: {error}"));
                    },
                }
            }
        }
    }

    /// Trims the oldest outstanding sent offers once the configured cap is reached.
    #[cfg(feature = "cancel-offer-count")]
    async fn apply_quota_trim(&self, sent: &[TradeOffer], now: ServerTime) {
        let Some(cancel_offer_count) = self.options.cancel_offer_count else {
            return;
        };
        let returned_active = sent
            .iter()
            .filter(|offer| offer.trade_offer_state == TradeOfferState::Active)
            .filter_map(|offer| offer.id)
            .collect::<Vec<_>>();
        let targets = {
            let poll_data = self.poll_data.read().unwrap();

            policies::quota_trim_targets(
                &returned_active,
                &poll_data,
                cancel_offer_count,
                self.options.cancel_offer_count_min_age,
                now,
            )
        };

        if targets.is_empty() {
            return;
        }

        let offers_by_id = sent
            .iter()
            .filter_map(|offer| offer.id.map(|tradeofferid| (tradeofferid, offer)))
            .collect::<std::collections::HashMap<_, _>>();
        let api = &self.api;
        let results = join_all(targets.into_iter().map(|tradeofferid| async move {
            (tradeofferid, api.cancel_offer(tradeofferid).await)
        })).await;

        for (tradeofferid, result) in results {
            match result {
                Ok(()) => {
                    if let Some(offer) = offers_by_id.get(&tradeofferid) {
                        self.send_event(TradeOfferEvent::SentOfferCanceled {
                            offer: (*offer).clone(),
                            reason: CancelReason::CancelOfferCount,
                        });
                    } else {
                        self.emit_debug(format!(
                            "canceled offer {tradeofferid} over the outstanding offer cap"
                        ));
                    }
                },
                Err(error) => {
                    self.emit_debug(format!(
                        "failed to cancel offer {tradeofferid} over the outstanding offer cap: {error}"
                    ));
                },
            }
        }
    }

    /// Saves the poll data when it changed this poll. Failures are reported but never fail the
    /// poll.
    async fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        let poll_data = {
            let mut poll_data = self.poll_data.write().unwrap();

            if !poll_data.changed {
                return;
            }

            poll_data.changed = false;
            poll_data.clone()
        };

        if let Err(error) = storage.save(self.steamid, &poll_data).await {
            self.emit_debug(format!("failed to save poll data: {error}"));
        }
    }
}

fn offer_updated_seconds(offer: &TradeOffer) -> i64 {
    offer.time_updated
        .map(|time_updated| time_updated.timestamp())
        .unwrap_or_default()
}

/// Diffs returned sent offers against the recorded states, producing events for new and changed
/// offers and recording what was seen.
fn walk_sent_offers(
    poll_data: &mut PollData,
    offers: &[TradeOffer],
    pending_sends: usize,
    has_glitched: &mut bool,
) -> Vec<TradeOfferEvent> {
    let mut events = Vec::new();

    for offer in offers {
        let Some(tradeofferid) = offer.id else {
            continue;
        };
        let state = offer.trade_offer_state;

        match poll_data.state_of(OfferSide::Sent, tradeofferid) {
            None => {
                // An offer we did not know about. While one of our own sends is in flight this
                // is almost certainly it, so stay quiet about it.
                if pending_sends == 0 {
                    events.push(TradeOfferEvent::UnknownOfferSent(offer.clone()));
                }

                if offer.from_real_time_trade {
                    if requires_confirmation(offer) {
                        events.push(TradeOfferEvent::RealTimeTradeConfirmationRequired(offer.clone()));
                    } else if state == TradeOfferState::Accepted {
                        events.push(TradeOfferEvent::RealTimeTradeCompleted(offer.clone()));
                    }
                }

                poll_data.record(OfferSide::Sent, tradeofferid, state, offer_updated_seconds(offer));
            },
            Some(old_state) if old_state != state => {
                if offer.is_glitched() {
                    *has_glitched = true;
                    events.push(TradeOfferEvent::Debug(format!(
                        "Not emitting sentOfferChanged for {offer} because the offer is glitched \
                        (items to give: {}, items to receive: {})",
                        offer.items_to_give().len(),
                        offer.items_to_receive().len(),
                    )));
                } else {
                    events.push(TradeOfferEvent::SentOfferChanged {
                        offer: offer.clone(),
                        old_state,
                    });

                    if offer.from_real_time_trade && state == TradeOfferState::Accepted {
                        events.push(TradeOfferEvent::RealTimeTradeCompleted(offer.clone()));
                    }

                    poll_data.record(OfferSide::Sent, tradeofferid, state, offer_updated_seconds(offer));
                }
            },
            Some(_unchanged) => {},
        }
    }

    events
}

/// Diffs returned received offers against the recorded states.
fn walk_received_offers(
    poll_data: &mut PollData,
    offers: &[TradeOffer],
    has_glitched: &mut bool,
) -> Vec<TradeOfferEvent> {
    let mut events = Vec::new();

    for offer in offers {
        let Some(tradeofferid) = offer.id else {
            continue;
        };

        if offer.is_glitched() {
            *has_glitched = true;
            continue;
        }

        let state = offer.trade_offer_state;
        let old_state = poll_data.state_of(OfferSide::Received, tradeofferid);

        if offer.from_real_time_trade {
            if old_state.is_none() && requires_confirmation(offer) {
                events.push(TradeOfferEvent::RealTimeTradeConfirmationRequired(offer.clone()));
            } else if state == TradeOfferState::Accepted && old_state != Some(state) {
                events.push(TradeOfferEvent::RealTimeTradeCompleted(offer.clone()));
            }
        }

        if old_state.is_none() && state == TradeOfferState::Active {
            events.push(TradeOfferEvent::NewOffer(offer.clone()));
        } else if let Some(old_state) = old_state {
            if old_state != state {
                events.push(TradeOfferEvent::ReceivedOfferChanged {
                    offer: offer.clone(),
                    old_state,
                });
            }
        }

        poll_data.record(OfferSide::Received, tradeofferid, state, offer_updated_seconds(offer));
    }

    events
}

fn requires_confirmation(offer: &TradeOffer) -> bool {
    offer.trade_offer_state == TradeOfferState::CreatedNeedsConfirmation || (
        offer.trade_offer_state == TradeOfferState::Active &&
        offer.confirmation_method != ConfirmationMethod::None
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::OfferItem;
    use crate::time::timestamp_to_server_time;
    use steamid_ng::{AccountType, Instance, Universe};

    const NOW: i64 = 1_700_000_000;

    fn offer(tradeofferid: u64, state: TradeOfferState, ours: bool) -> TradeOffer {
        let partner = SteamID::new(100, Instance::Desktop, AccountType::Individual, Universe::Public);
        let mut offer = TradeOffer::new(partner, None).unwrap();

        offer.add_item_to_give(OfferItem::new(440, 2, tradeofferid, 1)).unwrap();
        offer.id = Some(tradeofferid);
        offer.trade_offer_state = state;
        offer.is_our_offer = Some(ours);
        offer.time_created = Some(timestamp_to_server_time(NOW - 60));
        offer.time_updated = Some(timestamp_to_server_time(NOW - 5));
        offer
    }

    fn glitched_offer(tradeofferid: u64, state: TradeOfferState) -> TradeOffer {
        let mut offer = offer(tradeofferid, state, true);

        offer.items_to_give.clear();
        offer
    }

    #[test]
    fn emits_a_change_once_and_records_it() {
        let mut poll_data = PollData::new();
        let mut has_glitched = false;

        poll_data.record(OfferSide::Sent, 1, TradeOfferState::Active, NOW - 10);

        let offers = vec![offer(1, TradeOfferState::Accepted, true)];
        let events = walk_sent_offers(&mut poll_data, &offers, 0, &mut has_glitched);

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            TradeOfferEvent::SentOfferChanged { old_state: TradeOfferState::Active, .. }
        ));
        assert_eq!(
            poll_data.state_of(OfferSide::Sent, 1),
            Some(TradeOfferState::Accepted),
        );

        // the same payload again produces nothing
        let events = walk_sent_offers(&mut poll_data, &offers, 0, &mut has_glitched);

        assert!(events.is_empty());
        assert!(!has_glitched);
    }

    #[test]
    fn unknown_sent_offers_are_announced() {
        let mut poll_data = PollData::new();
        let mut has_glitched = false;
        let offers = vec![offer(1, TradeOfferState::Active, true)];
        let events = walk_sent_offers(&mut poll_data, &offers, 0, &mut has_glitched);

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], TradeOfferEvent::UnknownOfferSent(_)));
        assert_eq!(poll_data.state_of(OfferSide::Sent, 1), Some(TradeOfferState::Active));
    }

    #[test]
    fn in_flight_sends_suppress_unknown_offer_events() {
        let mut poll_data = PollData::new();
        let mut has_glitched = false;
        let offers = vec![offer(1, TradeOfferState::Active, true)];
        let events = walk_sent_offers(&mut poll_data, &offers, 1, &mut has_glitched);

        assert!(events.is_empty());
        // the offer is still recorded, so it will not be announced later either
        assert_eq!(poll_data.state_of(OfferSide::Sent, 1), Some(TradeOfferState::Active));
    }

    #[test]
    fn glitched_changes_are_deferred() {
        let mut poll_data = PollData::new();
        let mut has_glitched = false;

        poll_data.record(OfferSide::Sent, 1, TradeOfferState::Active, NOW - 10);
        poll_data.changed = false;

        let offers = vec![glitched_offer(1, TradeOfferState::Accepted)];
        let events = walk_sent_offers(&mut poll_data, &offers, 0, &mut has_glitched);

        assert!(has_glitched);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            TradeOfferEvent::Debug(message) if message.contains("glitched")
        ));
        // the recorded state is left alone so the change fires once the offer comes back intact
        assert_eq!(poll_data.state_of(OfferSide::Sent, 1), Some(TradeOfferState::Active));
        assert!(!poll_data.changed);
    }

    #[test]
    fn new_received_offers_are_announced() {
        let mut poll_data = PollData::new();
        let mut has_glitched = false;
        let offers = vec![offer(1, TradeOfferState::Active, false)];
        let events = walk_received_offers(&mut poll_data, &offers, &mut has_glitched);

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], TradeOfferEvent::NewOffer(_)));
        assert_eq!(poll_data.state_of(OfferSide::Received, 1), Some(TradeOfferState::Active));
    }

    #[test]
    fn received_state_changes_are_announced_once() {
        let mut poll_data = PollData::new();
        let mut has_glitched = false;

        poll_data.record(OfferSide::Received, 1, TradeOfferState::Active, NOW - 10);

        let offers = vec![offer(1, TradeOfferState::Declined, false)];
        let events = walk_received_offers(&mut poll_data, &offers, &mut has_glitched);

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            TradeOfferEvent::ReceivedOfferChanged { old_state: TradeOfferState::Active, .. }
        ));

        let events = walk_received_offers(&mut poll_data, &offers, &mut has_glitched);

        assert!(events.is_empty());
    }

    #[test]
    fn glitched_received_offers_are_skipped() {
        let mut poll_data = PollData::new();
        let mut has_glitched = false;
        let offers = vec![glitched_offer(1, TradeOfferState::Active)];
        let events = walk_received_offers(&mut poll_data, &offers, &mut has_glitched);

        assert!(has_glitched);
        assert!(events.is_empty());
        assert!(poll_data.received.is_empty());
    }

    #[test]
    fn real_time_trades_request_confirmation() {
        let mut poll_data = PollData::new();
        let mut has_glitched = false;
        let mut unconfirmed = offer(1, TradeOfferState::CreatedNeedsConfirmation, false);

        unconfirmed.from_real_time_trade = true;

        let events = walk_received_offers(&mut poll_data, &[unconfirmed], &mut has_glitched);

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            TradeOfferEvent::RealTimeTradeConfirmationRequired(_)
        ));
    }

    #[test]
    fn real_time_trades_report_completion() {
        let mut poll_data = PollData::new();
        let mut has_glitched = false;

        poll_data.record(OfferSide::Sent, 1, TradeOfferState::Active, NOW - 10);

        let mut accepted = offer(1, TradeOfferState::Accepted, true);

        accepted.from_real_time_trade = true;

        let events = walk_sent_offers(&mut poll_data, &[accepted], 0, &mut has_glitched);

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], TradeOfferEvent::SentOfferChanged { .. }));
        assert!(matches!(&events[1], TradeOfferEvent::RealTimeTradeCompleted(_)));
    }
}

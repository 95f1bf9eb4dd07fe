//! Decides which sent offers a poll should cancel. Everything here is a pure function of the
//! returned offers, the recorded poll data and the clock; acting on the decisions is the
//! poller's job.

use crate::enums::TradeOfferState;
use crate::manager::PollData;
use crate::offer::TradeOffer;
use crate::time::ServerTime;
use chrono::Duration;

#[cfg(feature = "cancel-offer-count")]
use crate::types::TradeOfferId;
#[cfg(feature = "cancel-offer-count")]
use std::collections::HashSet;

/// Resolves the duration that applies to an offer: its stored override when one exists,
/// otherwise the manager-wide default. Non-positive durations disable the policy.
fn effective_duration(
    override_milliseconds: Option<i64>,
    default: Option<Duration>,
) -> Option<Duration> {
    override_milliseconds
        .map(Duration::milliseconds)
        .or(default)
        .filter(|duration| duration.num_milliseconds() > 0)
}

/// Whether an active sent offer has outlived its allowed age.
pub(crate) fn should_cancel_active(
    offer: &TradeOffer,
    poll_data: &PollData,
    cancel_time: Option<Duration>,
    now: ServerTime,
) -> bool {
    if offer.trade_offer_state != TradeOfferState::Active {
        return false;
    }

    let (Some(tradeofferid), Some(time_updated)) = (offer.id, offer.time_updated) else {
        return false;
    };
    let Some(limit) = effective_duration(
        poll_data.cancel_times.get(&tradeofferid).copied(),
        cancel_time,
    ) else {
        return false;
    };

    now.signed_duration_since(time_updated) >= limit
}

/// Whether a sent offer still awaiting confirmation has outlived its allowed age.
pub(crate) fn should_cancel_pending(
    offer: &TradeOffer,
    poll_data: &PollData,
    pending_cancel_time: Option<Duration>,
    now: ServerTime,
) -> bool {
    if offer.trade_offer_state != TradeOfferState::CreatedNeedsConfirmation {
        return false;
    }

    let (Some(tradeofferid), Some(time_created)) = (offer.id, offer.time_created) else {
        return false;
    };
    let Some(limit) = effective_duration(
        poll_data.pending_cancel_times.get(&tradeofferid).copied(),
        pending_cancel_time,
    ) else {
        return false;
    };

    now.signed_duration_since(time_created) >= limit
}

/// Selects offers to cancel so that at most `cancel_offer_count` active sent offers remain
/// outstanding. Considers both the offers returned by this poll and active offers the poll data
/// still remembers; the oldest are trimmed first, and offers younger than `min_age` are spared
/// without substitution.
#[cfg(feature = "cancel-offer-count")]
pub(crate) fn quota_trim_targets(
    returned_active: &[TradeOfferId],
    poll_data: &PollData,
    cancel_offer_count: u32,
    min_age: Duration,
    now: ServerTime,
) -> Vec<TradeOfferId> {
    let mut outstanding = returned_active
        .iter()
        .copied()
        .collect::<HashSet<_>>();

    outstanding.extend(
        poll_data.sent
            .iter()
            .filter(|(_tradeofferid, state)| **state == TradeOfferState::Active)
            .map(|(tradeofferid, _state)| *tradeofferid),
    );

    let excess = outstanding.len().saturating_sub(cancel_offer_count as usize);

    if excess == 0 {
        return Vec::new();
    }

    let recorded_time = |tradeofferid: &TradeOfferId| {
        poll_data.timestamps.get(tradeofferid).copied().unwrap_or(0)
    };
    let mut targets = outstanding.into_iter().collect::<Vec<_>>();

    targets.sort_by_key(recorded_time);
    targets.truncate(excess);
    targets.retain(|tradeofferid| {
        now.timestamp() - recorded_time(tradeofferid) >= min_age.num_seconds()
    });

    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::poll_data::OfferSide;
    use crate::offer::OfferItem;
    use crate::time::timestamp_to_server_time;
    use steamid_ng::{AccountType, Instance, SteamID, Universe};

    const NOW: i64 = 1_700_000_000;

    fn sent_offer(tradeofferid: u64, state: TradeOfferState, updated: i64) -> TradeOffer {
        let partner = SteamID::new(100, Instance::Desktop, AccountType::Individual, Universe::Public);
        let mut offer = TradeOffer::new(partner, None).unwrap();

        offer.add_item_to_give(OfferItem::new(440, 2, tradeofferid, 1)).unwrap();
        offer.id = Some(tradeofferid);
        offer.trade_offer_state = state;
        offer.is_our_offer = Some(true);
        offer.time_created = Some(timestamp_to_server_time(updated));
        offer.time_updated = Some(timestamp_to_server_time(updated));
        offer
    }

    #[test]
    fn cancels_active_offers_past_the_limit() {
        let offer = sent_offer(1, TradeOfferState::Active, NOW - 90);
        let poll_data = PollData::new();
        let now = timestamp_to_server_time(NOW);

        assert!(should_cancel_active(&offer, &poll_data, Some(Duration::seconds(60)), now));
        assert!(!should_cancel_active(&offer, &poll_data, Some(Duration::seconds(120)), now));
        assert!(!should_cancel_active(&offer, &poll_data, None, now));
    }

    #[test]
    fn per_offer_overrides_beat_the_default() {
        let offer = sent_offer(1, TradeOfferState::Active, NOW - 90);
        let mut poll_data = PollData::new();
        let now = timestamp_to_server_time(NOW);

        poll_data.set_cancel_time(1, 120_000);

        assert!(!should_cancel_active(&offer, &poll_data, Some(Duration::seconds(60)), now));

        poll_data.set_cancel_time(1, 30_000);

        assert!(should_cancel_active(&offer, &poll_data, None, now));
    }

    #[test]
    fn pending_cancel_uses_creation_time() {
        let offer = sent_offer(1, TradeOfferState::CreatedNeedsConfirmation, NOW - 90);
        let poll_data = PollData::new();
        let now = timestamp_to_server_time(NOW);

        assert!(should_cancel_pending(&offer, &poll_data, Some(Duration::seconds(60)), now));
        assert!(!should_cancel_active(&offer, &poll_data, Some(Duration::seconds(60)), now));
    }

    #[cfg(feature = "cancel-offer-count")]
    #[test]
    fn trims_the_oldest_offers_past_the_cap() {
        let mut poll_data = PollData::new();
        let now = timestamp_to_server_time(NOW);

        poll_data.record(OfferSide::Sent, 1, TradeOfferState::Active, NOW - 20);
        poll_data.record(OfferSide::Sent, 2, TradeOfferState::Active, NOW - 50);

        let targets = quota_trim_targets(&[1, 2], &poll_data, 1, Duration::seconds(30), now);

        // only the older offer is past the minimum age
        assert_eq!(targets, vec![2]);
    }

    #[cfg(feature = "cancel-offer-count")]
    #[test]
    fn young_offers_are_spared_without_substitution() {
        let mut poll_data = PollData::new();
        let now = timestamp_to_server_time(NOW);

        poll_data.record(OfferSide::Sent, 1, TradeOfferState::Active, NOW - 10);
        poll_data.record(OfferSide::Sent, 2, TradeOfferState::Active, NOW - 20);

        let targets = quota_trim_targets(&[1, 2], &poll_data, 1, Duration::seconds(30), now);

        assert!(targets.is_empty());
    }

    #[cfg(feature = "cancel-offer-count")]
    #[test]
    fn includes_remembered_offers_missing_from_the_poll() {
        let mut poll_data = PollData::new();
        let now = timestamp_to_server_time(NOW);

        poll_data.record(OfferSide::Sent, 1, TradeOfferState::Active, NOW - 100);
        poll_data.record(OfferSide::Sent, 2, TradeOfferState::Active, NOW - 300);
        poll_data.record(OfferSide::Sent, 3, TradeOfferState::Declined, NOW - 500);

        let targets = quota_trim_targets(&[1], &poll_data, 1, Duration::zero(), now);

        // the remembered active offer is trimmed; the declined one never qualifies
        assert_eq!(targets, vec![2]);
    }

    #[cfg(feature = "cancel-offer-count")]
    #[test]
    fn under_the_cap_nothing_is_trimmed() {
        let mut poll_data = PollData::new();
        let now = timestamp_to_server_time(NOW);

        poll_data.record(OfferSide::Sent, 1, TradeOfferState::Active, NOW - 100);

        let targets = quota_trim_targets(&[1], &poll_data, 1, Duration::zero(), now);

        assert!(targets.is_empty());
    }
}

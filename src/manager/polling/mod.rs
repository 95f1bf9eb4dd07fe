//! The reconciliation loop: a single task that periodically fetches remote offer state, diffs it
//! against [`crate::PollData`] and publishes events.

mod policies;
mod poll_type;
mod poller;

pub use poll_type::PollType;

pub(crate) use poller::Poller;

use crate::manager::event::TradeOfferEvent;
use chrono::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Options for polling.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Interval between automatic polls. `None` disables automatic polling; polls then only run
    /// when requested. Default is 30 seconds.
    pub poll_interval: Option<Duration>,
    /// Active sent offers older than this are canceled during polls. Offers will not be
    /// canceled if this is not set.
    pub cancel_time: Option<Duration>,
    /// Sent offers awaiting confirmation for longer than this are canceled during polls. Offers
    /// will not be canceled if this is not set.
    pub pending_cancel_time: Option<Duration>,
    /// The maximum number of outstanding active sent offers before the oldest are canceled
    /// during polls.
    #[cfg(feature = "cancel-offer-count")]
    pub cancel_offer_count: Option<u32>,
    /// Offers younger than this never count towards trimming under `cancel_offer_count`.
    #[cfg(feature = "cancel-offer-count")]
    pub cancel_offer_count_min_age: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            poll_interval: Some(Duration::seconds(30)),
            cancel_time: None,
            pending_cancel_time: None,
            #[cfg(feature = "cancel-offer-count")]
            cancel_offer_count: None,
            #[cfg(feature = "cancel-offer-count")]
            cancel_offer_count_min_age: Duration::zero(),
        }
    }
}

pub(crate) enum PollAction {
    DoPoll(PollType),
    Stop,
}

/// Spawns the poller task. The task owns the poll timeline: actions run one at a time in the
/// order they arrive, the timer enqueues an automatic poll whenever the channel stays quiet for
/// a full interval, and `Stop` exits after the in-progress poll completes.
pub(crate) fn create_poller(
    mut poller: Poller,
) -> (mpsc::UnboundedSender<PollAction>, JoinHandle<()>) {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<PollAction>();
    let interval = poller.options.poll_interval
        .and_then(|duration| duration.to_std().ok());
    let handle = tokio::spawn(async move {
        let mut next_delay = interval;

        loop {
            let action = if let Some(delay) = next_delay {
                match tokio::time::timeout(delay, action_rx.recv()).await {
                    Ok(Some(action)) => action,
                    Ok(None) => break,
                    Err(_elapsed) => PollAction::DoPoll(PollType::Auto),
                }
            } else {
                match action_rx.recv().await {
                    Some(action) => action,
                    None => break,
                }
            };

            match action {
                PollAction::Stop => break,
                PollAction::DoPoll(poll_type) => {
                    if let Some(remaining) = poller.rate_floor_remaining() {
                        // called too soon; hold off until the floor clears
                        next_delay = Some(remaining);
                        continue;
                    }

                    match poller.do_poll(poll_type).await {
                        Ok(true) => {
                            if poller.event_tx.send(TradeOfferEvent::PollSuccess).is_err() {
                                break;
                            }
                        },
                        Ok(false) => {},
                        Err(error) => {
                            if poller.event_tx.send(TradeOfferEvent::PollFailure(error)).is_err() {
                                break;
                            }
                        },
                    }

                    next_delay = interval;
                },
            }
        }
    });

    (action_tx, handle)
}

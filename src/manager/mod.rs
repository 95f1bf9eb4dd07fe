//! The trade offer manager.

mod builder;
mod event;
mod polling;
mod storage;

pub(crate) mod poll_data;

pub use builder::TradeOfferManagerBuilder;
pub use event::{CancelReason, TradeOfferEvent};
pub use poll_data::{OfferSide, PollData};
pub use polling::{PollOptions, PollType};
pub use storage::{FilePollDataStorage, PollDataStorage};

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use crate::api::{SteamTradeOfferAPI, Trade};
use crate::enums::TradeOfferState;
use crate::error::{Error, ParameterError};
use crate::mobile_api::{Confirmation, MobileAPI, Operation};
use crate::offer::TradeOffer;
use crate::time;
use crate::types::{TradeId, TradeOfferId};
use chrono::Duration;
use polling::{create_poller, PollAction, Poller};
use steamid_ng::SteamID;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::ParseError;

/// The result of accepting an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The trade went through.
    Accepted,
    /// The trade awaits a second-factor confirmation.
    Pending,
    /// The trade is being held in escrow.
    Escrow,
}

impl fmt::Display for AcceptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::Pending => write!(f, "pending"),
            Self::Escrow => write!(f, "escrow"),
        }
    }
}

struct PollingHandle {
    action_tx: mpsc::UnboundedSender<PollAction>,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

/// Manager which includes functionality for sending, tracking and confirming trade offers.
///
/// Polling runs on a dedicated task started by [`start_polling`][Self::start_polling]; lifecycle
/// changes arrive as [`TradeOfferEvent`]s on the returned channel.
pub struct TradeOfferManager {
    /// The SteamID of the account.
    pub steamid: SteamID,
    api: Arc<SteamTradeOfferAPI>,
    mobile_api: MobileAPI,
    poll_data: Arc<RwLock<PollData>>,
    storage: Arc<dyn PollDataStorage>,
    pending_sends: Arc<AtomicUsize>,
    options: PollOptions,
    event_tx: RwLock<Option<mpsc::UnboundedSender<TradeOfferEvent>>>,
    polling: Mutex<Option<PollingHandle>>,
}

impl fmt::Debug for TradeOfferManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradeOfferManager")
            .field("steamid", &self.steamid)
            .finish_non_exhaustive()
    }
}

impl TradeOfferManager {
    /// Builder for a new manager.
    pub fn builder(steamid: SteamID) -> TradeOfferManagerBuilder {
        TradeOfferManagerBuilder::new(steamid)
    }

    /// Sets the session and cookies on both the web API and mobile clients.
    pub fn set_session(&self, sessionid: &str, cookies: &[String]) -> Result<(), ParseError> {
        self.api.set_session(sessionid, cookies)?;
        self.mobile_api.set_session(sessionid, cookies)?;

        Ok(())
    }

    fn emit(&self, event: TradeOfferEvent) {
        if let Ok(event_tx) = self.event_tx.read() {
            if let Some(event_tx) = event_tx.as_ref() {
                let _ = event_tx.send(event);
            }
        }
    }

    /// Announces session and family-view failures before handing the error back to the caller.
    fn check_error<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(error) = &result {
            match error {
                Error::NotLoggedIn => {
                    self.emit(TradeOfferEvent::SessionExpired(error.to_string()));
                },
                Error::FamilyViewRestricted => {
                    self.emit(TradeOfferEvent::FamilyViewRestricted(error.to_string()));
                },
                _ => {},
            }
        }

        result
    }

    /// Starts the polling task and returns the channel events are delivered on.
    pub fn start_polling(&self) -> Result<mpsc::UnboundedReceiver<TradeOfferEvent>, Error> {
        let mut polling = self.polling.lock()
            .map_err(|_poisoned| Error::Parameter(ParameterError::PollingAlreadyStarted))?;

        if polling.is_some() {
            return Err(Error::Parameter(ParameterError::PollingAlreadyStarted));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        if let Ok(mut stored_tx) = self.event_tx.write() {
            *stored_tx = Some(event_tx.clone());
        }

        let poller = Poller {
            steamid: self.steamid,
            api: Arc::clone(&self.api),
            poll_data: Arc::clone(&self.poll_data),
            storage: Some(Arc::clone(&self.storage)),
            event_tx,
            pending_sends: Arc::clone(&self.pending_sends),
            options: self.options.clone(),
            loaded: false,
            last_poll_started: None,
        };
        let (action_tx, handle) = create_poller(poller);

        *polling = Some(PollingHandle { action_tx, handle });

        Ok(event_rx)
    }

    /// Stops the polling task. An in-progress poll runs to completion first.
    pub fn stop_polling(&self) {
        if let Ok(mut polling) = self.polling.lock() {
            if let Some(polling) = polling.take() {
                let _ = polling.action_tx.send(PollAction::Stop);
            }
        }
    }

    /// Requests a poll outside the regular schedule. Polls requested within a second of the
    /// previous one are deferred.
    pub fn do_poll(&self, poll_type: PollType) -> Result<(), Error> {
        let polling = self.polling.lock()
            .map_err(|_poisoned| Error::Parameter(ParameterError::PollingNotStarted))?;
        let handle = polling.as_ref()
            .ok_or(Error::Parameter(ParameterError::PollingNotStarted))?;

        handle.action_tx.send(PollAction::DoPoll(poll_type))
            .map_err(|_closed| Error::Parameter(ParameterError::PollingNotStarted))
    }

    /// Best-effort poll request used after operations that change remote state.
    fn trigger_poll(&self) {
        let _ = self.do_poll(PollType::Auto);
    }

    /// Sends an offer. On success the offer is assigned its ID and recorded, and the returned
    /// state is either [`TradeOfferState::Active`] or
    /// [`TradeOfferState::CreatedNeedsConfirmation`].
    pub async fn send_offer(&self, offer: &mut TradeOffer) -> Result<TradeOfferState, Error> {
        if offer.id.is_some() {
            return Err(Error::Parameter(ParameterError::OfferAlreadySent));
        }

        if offer.is_empty() {
            return Err(Error::Parameter(ParameterError::EmptyOffer));
        }

        // Suppresses the unknown-offer announcement for this offer until it lands in the
        // recorded poll data below.
        self.pending_sends.fetch_add(1, Ordering::SeqCst);

        let result = self.send_offer_inner(offer).await;

        self.pending_sends.fetch_sub(1, Ordering::SeqCst);
        self.check_error(result)
    }

    async fn send_offer_inner(&self, offer: &mut TradeOffer) -> Result<TradeOfferState, Error> {
        let response = self.api.send_offer(offer).await?;
        let now = time::get_server_time_now();
        let state = if response.needs_mobile_confirmation {
            offer.confirmation_method = crate::enums::ConfirmationMethod::MobileApp;
            TradeOfferState::CreatedNeedsConfirmation
        } else if response.needs_email_confirmation {
            offer.confirmation_method = crate::enums::ConfirmationMethod::Email;
            TradeOfferState::CreatedNeedsConfirmation
        } else {
            TradeOfferState::Active
        };

        offer.id = Some(response.tradeofferid);
        offer.trade_offer_state = state;
        offer.is_our_offer = Some(true);
        offer.time_created = Some(now);
        offer.time_updated = Some(now);
        offer.expiration_time = Some(now + Duration::days(14));

        {
            let mut poll_data = self.poll_data.write().unwrap();

            poll_data.record(
                OfferSide::Sent,
                response.tradeofferid,
                state,
                now.timestamp(),
            );

            if let Some(cancel_after) = offer.cancel_after {
                poll_data.set_cancel_time(response.tradeofferid, cancel_after.num_milliseconds());
            }

            if let Some(pending_cancel_after) = offer.pending_cancel_after {
                poll_data.set_pending_cancel_time(
                    response.tradeofferid,
                    pending_cancel_after.num_milliseconds(),
                );
            }
        }

        Ok(state)
    }

    /// Counters an existing offer.
    pub async fn counter_offer(
        &self,
        offer: &mut TradeOffer,
        counter: &mut TradeOffer,
    ) -> Result<TradeOfferState, Error> {
        counter.countering = Some(offer.id
            .ok_or(Error::Parameter(ParameterError::OfferNotSent))?);

        let state = self.send_offer(counter).await?;

        offer.trade_offer_state = TradeOfferState::Countered;

        Ok(state)
    }

    /// Accepts an offer sent to us. With `skip_refresh` the outcome is judged from the accept
    /// response alone; otherwise the offer is refreshed and the outcome reflects its state.
    pub async fn accept_offer(
        &self,
        offer: &mut TradeOffer,
        skip_refresh: bool,
    ) -> Result<AcceptOutcome, Error> {
        if offer.is_ours() {
            return Err(Error::Parameter(ParameterError::CannotAcceptOfferThatIsOurs));
        }

        if offer.trade_offer_state != TradeOfferState::Active {
            return Err(Error::Parameter(
                ParameterError::CannotAcceptOfferThatIsNotActive(offer.trade_offer_state),
            ));
        }

        let tradeofferid = offer.id
            .ok_or(Error::Parameter(ParameterError::OfferNotSent))?;
        let result = self.api.accept_offer(tradeofferid, &offer.partner).await;
        let accepted = self.check_error(result)?;
        let needs_confirmation = accepted.needs_mobile_confirmation ||
            accepted.needs_email_confirmation;

        if accepted.tradeid.is_some() {
            offer.tradeid = accepted.tradeid;
        }

        if accepted.needs_mobile_confirmation {
            offer.confirmation_method = crate::enums::ConfirmationMethod::MobileApp;
        } else if accepted.needs_email_confirmation {
            offer.confirmation_method = crate::enums::ConfirmationMethod::Email;
        }

        self.trigger_poll();

        if skip_refresh {
            return Ok(if needs_confirmation {
                AcceptOutcome::Pending
            } else {
                AcceptOutcome::Accepted
            });
        }

        let refreshed = self.api.update_offer(offer).await;

        self.check_error(refreshed)?;

        Ok(match offer.trade_offer_state {
            TradeOfferState::InEscrow => AcceptOutcome::Escrow,
            TradeOfferState::Accepted => AcceptOutcome::Accepted,
            _ => AcceptOutcome::Pending,
        })
    }

    async fn close_offer(&self, offer: &mut TradeOffer) -> Result<(), Error> {
        if !matches!(
            offer.trade_offer_state,
            TradeOfferState::Active | TradeOfferState::CreatedNeedsConfirmation,
        ) {
            return Err(Error::Parameter(
                ParameterError::CannotCancelOfferInState(offer.trade_offer_state),
            ));
        }

        let tradeofferid = offer.id
            .ok_or(Error::Parameter(ParameterError::OfferNotSent))?;
        let result = if offer.is_ours() {
            self.api.cancel_offer(tradeofferid).await
        } else {
            self.api.decline_offer(tradeofferid).await
        };

        self.check_error(result)?;

        offer.trade_offer_state = if offer.is_ours() {
            TradeOfferState::Canceled
        } else {
            TradeOfferState::Declined
        };
        offer.time_updated = Some(time::get_server_time_now());

        self.trigger_poll();

        Ok(())
    }

    /// Cancels an offer. Offers we created are canceled, offers sent to us are declined.
    pub async fn cancel_offer(&self, offer: &mut TradeOffer) -> Result<(), Error> {
        self.close_offer(offer).await
    }

    /// Declines an offer. Offers we created are canceled, offers sent to us are declined.
    pub async fn decline_offer(&self, offer: &mut TradeOffer) -> Result<(), Error> {
        self.close_offer(offer).await
    }

    /// Refreshes an offer in place from the remote.
    pub async fn update_offer(&self, offer: &mut TradeOffer) -> Result<(), Error> {
        let result = self.api.update_offer(offer).await;

        self.check_error(result)
    }

    /// Gets our active trade offers.
    pub async fn get_trade_offers(&self) -> Result<Vec<TradeOffer>, Error> {
        let result = self.api
            .get_trade_offers(crate::enums::OfferFilter::ActiveOnly, None)
            .await;

        self.check_error(result)
    }

    /// Gets the status of a trade.
    pub async fn get_trade_status(&self, tradeid: TradeId) -> Result<Trade, Error> {
        let result = self.api.get_trade_status(tradeid).await;

        self.check_error(result)
    }

    /// Gets the account's outstanding confirmations.
    pub async fn get_trade_confirmations(&self) -> Result<Vec<Confirmation>, Error> {
        let result = self.mobile_api.get_trade_confirmations().await;

        self.check_error(result)
    }

    /// Confirms a trade offer.
    pub async fn confirm_offer(&self, offer: &TradeOffer) -> Result<(), Error> {
        let tradeofferid = offer.id
            .ok_or(Error::Parameter(ParameterError::OfferNotSent))?;

        self.confirm_offer_id(tradeofferid).await
    }

    /// Confirms a trade offer using its ID.
    pub async fn confirm_offer_id(&self, tradeofferid: TradeOfferId) -> Result<(), Error> {
        let result = self.mobile_api
            .respond_to_offer(tradeofferid, Operation::Allow)
            .await;

        self.check_error(result)
    }

    /// Cancels the confirmation of a trade offer using its ID.
    pub async fn cancel_offer_confirmation(&self, tradeofferid: TradeOfferId) -> Result<(), Error> {
        let result = self.mobile_api
            .respond_to_offer(tradeofferid, Operation::Cancel)
            .await;

        self.check_error(result)
    }

    /// Accepts a confirmation.
    pub async fn accept_confirmation(&self, confirmation: &Confirmation) -> Result<(), Error> {
        let result = self.mobile_api.accept_confirmation(confirmation).await;

        self.check_error(result)
    }

    /// Declines a confirmation.
    pub async fn decline_confirmation(&self, confirmation: &Confirmation) -> Result<(), Error> {
        let result = self.mobile_api.deny_confirmation(confirmation).await;

        self.check_error(result)
    }

    /// Cancels every outstanding confirmation.
    pub async fn cancel_all_confirmations(&self) -> Result<(), Error> {
        let result = self.mobile_api.cancel_all_confirmations().await;

        self.check_error(result)
    }
}

impl From<TradeOfferManagerBuilder> for TradeOfferManager {
    fn from(builder: TradeOfferManagerBuilder) -> Self {
        let cookies = Arc::new(reqwest::cookie::Jar::default());
        let steamid = builder.steamid;
        let api = SteamTradeOfferAPI::new(
            Arc::clone(&cookies),
            steamid,
            builder.api_key,
            builder.language,
            builder.get_descriptions,
        );
        let mobile_api = {
            let mut mobile_builder = MobileAPI::builder(steamid)
                .cookies(cookies)
                .time_offset(builder.time_offset);

            if let Some(identity_secret) = builder.identity_secret {
                mobile_builder = mobile_builder.identity_secret(identity_secret);
            }

            if let Some(conf_key_fn) = builder.conf_key_fn {
                mobile_builder = mobile_builder.conf_key_fn(conf_key_fn);
            }

            mobile_builder.build()
        };
        let storage = builder.poll_data_storage
            .unwrap_or_else(|| Arc::new(FilePollDataStorage::new(builder.data_directory)));

        Self {
            steamid,
            api: Arc::new(api),
            mobile_api,
            poll_data: Arc::new(RwLock::new(PollData::new())),
            storage,
            pending_sends: Arc::new(AtomicUsize::new(0)),
            options: builder.poll_options,
            event_tx: RwLock::new(None),
            polling: Mutex::new(None),
        }
    }
}

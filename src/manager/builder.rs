use std::path::PathBuf;
use std::sync::Arc;
use crate::enums::Language;
use crate::helpers::default_data_directory;
use crate::mobile_api::ConfirmationKeyFn;
use super::storage::PollDataStorage;
use super::{PollOptions, TradeOfferManager};
use chrono::Duration;
use steamid_ng::SteamID;

/// Builder for constructing a [`TradeOfferManager`].
///
/// An API key is required for the Web API requests behind polling and offer lookups; sending and
/// responding to offers works with cookies alone. You can get an API key from
/// <https://steamcommunity.com/dev/apikey>.
#[derive(Clone)]
pub struct TradeOfferManagerBuilder {
    /// The SteamID of the account.
    pub(crate) steamid: SteamID,
    /// Your account's API key from <https://steamcommunity.com/dev/apikey>.
    pub(crate) api_key: Option<String>,
    /// The identity secret for the account (optional). Required for mobile confirmations unless
    /// a key function is supplied.
    pub(crate) identity_secret: Option<String>,
    /// Custom confirmation key derivation.
    pub(crate) conf_key_fn: Option<Arc<ConfirmationKeyFn>>,
    /// The language for API responses.
    pub(crate) language: Language,
    /// Whether to load item descriptions with offers. Adds display names to items and lets
    /// polls detect offers served without their descriptions.
    pub(crate) get_descriptions: bool,
    /// The location poll data is saved to when no custom storage is supplied.
    pub(crate) data_directory: PathBuf,
    /// Where poll data lives between runs.
    pub(crate) poll_data_storage: Option<Arc<dyn PollDataStorage>>,
    /// How many seconds your computer is behind Steam's servers. Used in mobile confirmations.
    pub(crate) time_offset: i64,
    /// Polling behavior.
    pub(crate) poll_options: PollOptions,
}

impl TradeOfferManagerBuilder {
    /// Creates a new [`TradeOfferManagerBuilder`].
    pub fn new(steamid: SteamID) -> Self {
        Self {
            steamid,
            api_key: None,
            identity_secret: None,
            conf_key_fn: None,
            language: Language::English,
            get_descriptions: false,
            data_directory: default_data_directory(),
            poll_data_storage: None,
            time_offset: 0,
            poll_options: PollOptions::default(),
        }
    }

    /// The API key. Required for polling and any other Web API request.
    pub fn api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// The identity secret for the account. Required for mobile confirmations.
    pub fn identity_secret(mut self, identity_secret: String) -> Self {
        self.identity_secret = Some(identity_secret);
        self
    }

    /// Derives confirmation keys with the given function instead of an identity secret.
    pub fn conf_key_fn(mut self, conf_key_fn: Arc<ConfirmationKeyFn>) -> Self {
        self.conf_key_fn = Some(conf_key_fn);
        self
    }

    /// The language for API responses.
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Loads item descriptions with offers. Adds display names to items and lets polls detect
    /// offers served without their descriptions.
    pub fn get_descriptions(mut self, get_descriptions: bool) -> Self {
        self.get_descriptions = get_descriptions;
        self
    }

    /// The directory used to store poll data when no custom storage is supplied.
    pub fn data_directory<T>(mut self, data_directory: T) -> Self
    where
        T: Into<PathBuf>,
    {
        self.data_directory = data_directory.into();
        self
    }

    /// Stores poll data behind the given storage instead of the data directory.
    pub fn poll_data_storage(mut self, storage: Arc<dyn PollDataStorage>) -> Self {
        self.poll_data_storage = Some(storage);
        self
    }

    /// How many seconds your computer is behind Steam's servers. Used in mobile confirmations.
    pub fn time_offset(mut self, time_offset: i64) -> Self {
        self.time_offset = time_offset;
        self
    }

    /// Polling behavior.
    pub fn poll_options(mut self, poll_options: PollOptions) -> Self {
        self.poll_options = poll_options;
        self
    }

    /// Interval between automatic polls. `None` disables automatic polling.
    pub fn poll_interval(mut self, poll_interval: Option<Duration>) -> Self {
        self.poll_options.poll_interval = poll_interval;
        self
    }

    /// Cancels active sent offers older than the given duration during polls.
    pub fn cancel_time(mut self, cancel_time: Duration) -> Self {
        self.poll_options.cancel_time = Some(cancel_time);
        self
    }

    /// Cancels sent offers awaiting confirmation for longer than the given duration during
    /// polls.
    pub fn pending_cancel_time(mut self, pending_cancel_time: Duration) -> Self {
        self.poll_options.pending_cancel_time = Some(pending_cancel_time);
        self
    }

    /// The maximum number of outstanding active sent offers before the oldest are canceled
    /// during polls.
    #[cfg(feature = "cancel-offer-count")]
    pub fn cancel_offer_count(mut self, cancel_offer_count: u32) -> Self {
        self.poll_options.cancel_offer_count = Some(cancel_offer_count);
        self
    }

    /// Offers younger than this never count towards trimming under the outstanding offer cap.
    #[cfg(feature = "cancel-offer-count")]
    pub fn cancel_offer_count_min_age(mut self, min_age: Duration) -> Self {
        self.poll_options.cancel_offer_count_min_age = min_age;
        self
    }

    /// Builds the [`TradeOfferManager`].
    pub fn build(self) -> TradeOfferManager {
        self.into()
    }
}

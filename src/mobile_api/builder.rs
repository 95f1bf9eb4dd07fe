use std::sync::Arc;
use super::mobile_api::ConfirmationKeyFn;
use super::MobileAPI;
use reqwest::cookie::Jar;
use steamid_ng::SteamID;

const MOBILE_USER_AGENT_STRING: &str = "Mozilla/5.0 (Linux; U; Android 4.1.1; en-us; Google Nexus 4 - 4.1.1 - API 16 - 768x1280 Build/JRO03S) AppleWebKit/534.30 (KHTML, like Gecko) Version/4.0 Mobile Safari/534.30";

/// Builder for constructing a [`MobileAPI`].
#[derive(Clone)]
pub struct MobileAPIBuilder {
    /// The SteamID of the account.
    pub(crate) steamid: SteamID,
    /// The identity secret for the account (optional). Required for mobile confirmations unless
    /// a key function is supplied.
    pub(crate) identity_secret: Option<String>,
    /// Custom confirmation key derivation.
    pub(crate) conf_key_fn: Option<Arc<ConfirmationKeyFn>>,
    /// Request cookies.
    pub(crate) cookies: Option<Arc<Jar>>,
    /// User agent for requests.
    pub(crate) user_agent: &'static str,
    /// How many seconds your computer is behind Steam's servers. Used in mobile confirmations.
    pub(crate) time_offset: i64,
}

impl MobileAPIBuilder {
    /// Creates a new [`MobileAPIBuilder`].
    pub fn new(steamid: SteamID) -> Self {
        Self {
            steamid,
            identity_secret: None,
            conf_key_fn: None,
            cookies: None,
            user_agent: MOBILE_USER_AGENT_STRING,
            time_offset: 0,
        }
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

    /// The cookie jar shared with other clients of the same account.
    pub fn cookies(mut self, cookies: Arc<Jar>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    /// How many seconds your computer is behind Steam's servers. Used in mobile confirmations.
    pub fn time_offset(mut self, time_offset: i64) -> Self {
        self.time_offset = time_offset;
        self
    }

    /// Builds the [`MobileAPI`].
    pub fn build(self) -> MobileAPI {
        MobileAPI::from_builder(self)
    }
}

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};
use crate::error::{Error, ParameterError};
use crate::helpers::check_response;
use crate::types::TradeOfferId;
use crate::time::get_system_time;
use super::builder::MobileAPIBuilder;
use super::helpers::{generate_confirmation_hash_for_time, get_device_id, parse_confirmations};
use super::{Confirmation, Operation};
use reqwest::cookie::Jar;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use steamid_ng::SteamID;
use tokio::sync::Mutex;
use url::{ParseError, Url};

/// Caller-supplied confirmation key derivation. Receives the time the key is derived for and
/// the tag naming the action.
pub type ConfirmationKeyFn = dyn Fn(i64, &str) -> Result<String, Error> + Send + Sync;

const REQUESTED_WITH: &str = "com.valvesoftware.android.steam.community";

/// The clock offset wraps back to zero once it has drifted this far from the wall clock.
const CLOCK_OFFSET_MAX_SECONDS: i64 = 500;

/// API for mobile confirmations.
pub struct MobileAPI {
    client: ClientWithMiddleware,
    /// Request cookies.
    pub cookies: Arc<Jar>,
    /// The SteamID of the account.
    pub steamid: SteamID,
    /// The identity secret for the account. Required for mobile confirmations unless a key
    /// function is supplied.
    pub identity_secret: Option<String>,
    /// The session ID, set when logging in.
    pub sessionid: Arc<RwLock<Option<String>>>,
    pub(crate) conf_key_fn: Option<Arc<ConfirmationKeyFn>>,
    pub(crate) time_offset: i64,
    // The key scheme is bucketed at one-second granularity, so back-to-back derivations within
    // the same second must borrow from future seconds to stay distinct on the wire.
    clock_offset: AtomicI64,
    // Forbids two in-flight list retrievals.
    fetch_latch: Mutex<()>,
    last_list: RwLock<Vec<Confirmation>>,
}

impl std::fmt::Debug for MobileAPI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MobileAPI")
            .field("steamid", &self.steamid)
            .finish_non_exhaustive()
    }
}

impl MobileAPI {
    pub const HOSTNAME: &'static str = "https://steamcommunity.com";

    /// Creates a new [`MobileAPIBuilder`].
    pub fn builder(steamid: SteamID) -> MobileAPIBuilder {
        MobileAPIBuilder::new(steamid)
    }

    pub(crate) fn from_builder(builder: MobileAPIBuilder) -> Self {
        let cookies = builder.cookies
            .unwrap_or_else(|| Arc::new(Jar::default()));

        if let Ok(url) = Self::HOSTNAME.parse::<Url>() {
            cookies.add_cookie_str("mobileClientVersion=0 (2.1.3)", &url);
            cookies.add_cookie_str("mobileClient=android", &url);
            cookies.add_cookie_str("Steam_Language=english", &url);
            cookies.add_cookie_str("dob=", &url);
            cookies.add_cookie_str(
                format!("steamid={}", u64::from(builder.steamid)).as_str(),
                &url,
            );
        }

        Self {
            client: crate::helpers::get_default_middleware(
                Arc::clone(&cookies),
                builder.user_agent,
            ),
            cookies,
            steamid: builder.steamid,
            identity_secret: builder.identity_secret,
            sessionid: Arc::new(RwLock::new(None)),
            conf_key_fn: builder.conf_key_fn,
            time_offset: builder.time_offset,
            clock_offset: AtomicI64::new(0),
            fetch_latch: Mutex::new(()),
            last_list: RwLock::new(Vec::new()),
        }
    }

    fn get_uri(&self, pathname: &str) -> String {
        format!("{}{}", Self::HOSTNAME, pathname)
    }

    fn set_cookies(&self, cookies: &[String]) -> Result<(), ParseError> {
        let url = Self::HOSTNAME.parse::<Url>()?;

        for cookie_str in cookies {
            self.cookies.add_cookie_str(cookie_str, &url);
        }

        Ok(())
    }

    /// Sets the session ID and cookies for requests.
    pub fn set_session(&self, sessionid: &str, cookies: &[String]) -> Result<(), ParseError> {
        if let Ok(mut sessionid_write) = self.sessionid.write() {
            *sessionid_write = Some(sessionid.to_string());
        }

        self.set_cookies(cookies)?;

        Ok(())
    }

    /// The time used for the next key derivation. Consumes one unit of clock drift so that no
    /// two derivations share a second.
    fn confirmation_time(&self) -> i64 {
        let drift = self.clock_offset
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |offset| {
                Some(if offset >= CLOCK_OFFSET_MAX_SECONDS { 0 } else { offset + 1 })
            })
            .unwrap_or(0);

        get_system_time() + self.time_offset + drift
    }

    fn derive_confirmation_key(&self, tag: &str) -> Result<(String, i64), Error> {
        let time = self.confirmation_time();

        if let Some(conf_key_fn) = &self.conf_key_fn {
            let key = conf_key_fn(time, tag)?;

            return Ok((key, time));
        }

        let identity_secret = self.identity_secret.as_deref()
            .ok_or(Error::Parameter(ParameterError::NoIdentitySecret))?;
        let key = generate_confirmation_hash_for_time(time, tag, identity_secret)?;

        Ok((key, time))
    }

    fn get_confirmation_query_params(
        &self,
        tag: &'static str,
    ) -> Result<Vec<(&'static str, String)>, Error> {
        let (key, time) = self.derive_confirmation_key(tag)?;

        Ok(vec![
            ("p", get_device_id(self.steamid)),
            ("a", u64::from(self.steamid).to_string()),
            ("k", key),
            ("t", time.to_string()),
            ("m", "android".into()),
            ("tag", tag.into()),
        ])
    }

    async fn fetch_confirmations(&self) -> Result<Vec<Confirmation>, Error> {
        let uri = self.get_uri("/mobileconf/conf");
        let query = self.get_confirmation_query_params("conf")?;
        let response = self.client.get(&uri)
            .header("X-Requested-With", REQUESTED_WITH)
            .query(&query)
            .send()
            .await?;
        let body = response.text().await?;

        // The mobile scheme redirect appears when the session backing these cookies is gone.
        if body.contains("steammobile://lostauth") {
            return Err(Error::NotLoggedIn);
        }

        Ok(parse_confirmations(&body)?)
    }

    /// Gets the account's outstanding confirmations. Concurrent callers share a single request;
    /// late arrivals wait for the in-flight fetch and observe its result.
    pub async fn get_trade_confirmations(&self) -> Result<Vec<Confirmation>, Error> {
        match self.fetch_latch.try_lock() {
            Ok(_guard) => {
                let confirmations = self.fetch_confirmations().await?;

                if let Ok(mut last_list) = self.last_list.write() {
                    *last_list = confirmations.clone();
                }

                Ok(confirmations)
            },
            Err(_busy) => {
                let _guard = self.fetch_latch.lock().await;

                Ok(self.last_list.read()
                    .map(|list| list.clone())
                    .unwrap_or_default())
            },
        }
    }

    async fn parse_operation_response(
        &self,
        response: reqwest::Response,
    ) -> Result<(), Error> {
        #[derive(Debug, Deserialize)]
        struct OperationResponse {
            success: bool,
            message: Option<String>,
        }

        let body = check_response(response).await?;

        match serde_json::from_slice::<OperationResponse>(&body) {
            Ok(body) if body.success => Ok(()),
            Ok(body) => Err(Error::ConfirmationUnsuccessful(body.message)),
            Err(_error) => Err(Error::MalformedResponse),
        }
    }

    async fn send_confirmation_ajax(
        &self,
        confirmation: &Confirmation,
        operation: Operation,
    ) -> Result<(), Error> {
        let mut query = self.get_confirmation_query_params(operation.tag())?;

        query.push(("op", operation.to_string()));
        query.push(("cid", confirmation.id.to_string()));
        query.push(("ck", confirmation.key.to_string()));

        let uri = self.get_uri("/mobileconf/ajaxop");
        let response = self.client.get(&uri)
            .header("X-Requested-With", REQUESTED_WITH)
            .query(&query)
            .send()
            .await?;

        self.parse_operation_response(response).await
    }

    async fn send_multi_confirmation_ajax(
        &self,
        confirmations: &[Confirmation],
        operation: Operation,
    ) -> Result<(), Error> {
        let mut form = self.get_confirmation_query_params(operation.tag())?;

        form.push(("op", operation.to_string()));

        for confirmation in confirmations {
            form.push(("cid[]", confirmation.id.to_string()));
            form.push(("ck[]", confirmation.key.to_string()));
        }

        let uri = self.get_uri("/mobileconf/multiajaxop");
        let response = self.client.post(&uri)
            .header("X-Requested-With", REQUESTED_WITH)
            .form(&form)
            .send()
            .await?;

        self.parse_operation_response(response).await
    }

    /// Acts on the given confirmations. A single confirmation uses the lighter single-operation
    /// endpoint, more than one are batched.
    pub async fn respond_to_confirmations(
        &self,
        confirmations: &[Confirmation],
        operation: Operation,
    ) -> Result<(), Error> {
        match confirmations {
            [] => Ok(()),
            [confirmation] => self.send_confirmation_ajax(confirmation, operation).await,
            confirmations => self.send_multi_confirmation_ajax(confirmations, operation).await,
        }
    }

    /// Acts on the confirmation belonging to the given trade offer. The most recently fetched
    /// list is consulted first; if the offer is not found there, the list is fetched once more
    /// before giving up.
    pub async fn respond_to_offer(
        &self,
        tradeofferid: TradeOfferId,
        operation: Operation,
    ) -> Result<(), Error> {
        let find = |confirmations: &[Confirmation]| {
            confirmations
                .iter()
                .find(|confirmation| confirmation.creator == tradeofferid)
                .cloned()
        };
        let mut confirmation = self.last_list.read()
            .ok()
            .and_then(|list| find(&list));

        if confirmation.is_none() {
            confirmation = find(&self.get_trade_confirmations().await?);
        }

        if let Some(confirmation) = confirmation {
            self.send_confirmation_ajax(&confirmation, operation).await
        } else {
            Err(Error::NoConfirmationForOffer(tradeofferid))
        }
    }

    /// Accepts a confirmation.
    pub async fn accept_confirmation(&self, confirmation: &Confirmation) -> Result<(), Error> {
        self.send_confirmation_ajax(confirmation, Operation::Allow).await
    }

    /// Declines a confirmation.
    pub async fn deny_confirmation(&self, confirmation: &Confirmation) -> Result<(), Error> {
        self.send_confirmation_ajax(confirmation, Operation::Cancel).await
    }

    /// Fetches the outstanding confirmations and cancels all of them.
    pub async fn cancel_all_confirmations(&self) -> Result<(), Error> {
        let confirmations = self.get_trade_confirmations().await?;

        self.respond_to_confirmations(&confirmations, Operation::Cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn api() -> MobileAPI {
        MobileAPI::builder(SteamID::from(76561198000000000))
            .identity_secret("YWJjZGVmZ2hpamtsbW5vcHFyc3Q=".into())
            .build()
    }

    #[test]
    fn confirmation_times_are_unique_within_a_second() {
        let api = api();
        let times = (0..10)
            .map(|_| api.confirmation_time())
            .collect::<HashSet<_>>();

        assert_eq!(times.len(), 10);
    }

    #[test]
    fn clock_offset_wraps() {
        let api = api();
        let start = api.confirmation_time();

        for _ in 0..CLOCK_OFFSET_MAX_SECONDS {
            api.confirmation_time();
        }

        // drifted through the whole window and wrapped back around
        let wrapped = api.confirmation_time();

        assert!(wrapped <= start + 1);
    }

    #[test]
    fn derives_keys_with_custom_fn() {
        let api = MobileAPI::builder(SteamID::from(76561198000000000))
            .conf_key_fn(Arc::new(|time, tag| Ok(format!("{tag}:{time}"))))
            .build();
        let (first, _) = api.derive_confirmation_key("conf").unwrap();
        let (second, _) = api.derive_confirmation_key("conf").unwrap();

        assert!(first.starts_with("conf:"));
        assert_ne!(first, second);
    }

    #[test]
    fn requires_a_secret_or_key_fn() {
        let api = MobileAPI::builder(SteamID::from(76561198000000000)).build();
        let result = api.derive_confirmation_key("conf");

        assert!(matches!(
            result,
            Err(Error::Parameter(ParameterError::NoIdentitySecret))
        ));
    }
}

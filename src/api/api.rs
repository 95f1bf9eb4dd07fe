use std::sync::{Arc, RwLock};
use crate::enums::{Language, OfferFilter};
use crate::error::{Error, ParameterError};
use crate::helpers::{
    check_response,
    check_response_body_text,
    get_default_middleware,
    parses_response,
    USER_AGENT_STRING,
};
use crate::offer::TradeOffer;
use crate::serialize::steamid_as_string;
use crate::time::{get_system_time, ServerTime};
use crate::types::{TradeId, TradeOfferId};
use super::raw::{DescriptionMap, RawTradeOffer};
use super::request::GetTradeOffersOptions;
use super::response::{
    AcceptedOffer,
    GetTradeOfferResponse,
    GetTradeOffersResponse,
    GetTradeStatusResponse,
    SentOffer,
    Trade,
    TradeOffers,
};
use reqwest::cookie::Jar;
use reqwest::header::REFERER;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use steamid_ng::SteamID;
use url::{ParseError, Url};

/// Adapter over the Steam Web API and the community trade endpoints.
#[derive(Debug)]
pub struct SteamTradeOfferAPI {
    client: ClientWithMiddleware,
    /// Request cookies.
    pub cookies: Arc<Jar>,
    /// The API key used for Web API requests.
    pub key: Option<String>,
    /// The language for descriptions.
    pub language: Language,
    /// The SteamID of the account.
    pub steamid: SteamID,
    /// Whether to request item descriptions with offer listings.
    pub get_descriptions: bool,
    /// The session ID, set when logging in.
    pub sessionid: Arc<RwLock<Option<String>>>,
}

impl SteamTradeOfferAPI {
    pub const HOSTNAME: &'static str = "https://steamcommunity.com";
    pub const API_HOSTNAME: &'static str = "https://api.steampowered.com";

    pub fn new(
        cookies: Arc<Jar>,
        steamid: SteamID,
        key: Option<String>,
        language: Language,
        get_descriptions: bool,
    ) -> Self {
        Self {
            client: get_default_middleware(Arc::clone(&cookies), USER_AGENT_STRING),
            cookies,
            key,
            language,
            steamid,
            get_descriptions,
            sessionid: Arc::new(RwLock::new(None)),
        }
    }

    fn get_uri(&self, pathname: &str) -> String {
        format!("{}{}", Self::HOSTNAME, pathname)
    }

    fn get_api_url(&self, interface: &str, method: &str, version: usize) -> String {
        format!("{}/{}/{}/v{}", Self::API_HOSTNAME, interface, method, version)
    }

    fn api_key(&self) -> Result<&str, Error> {
        self.key.as_deref()
            .ok_or(Error::Parameter(ParameterError::MissingApiKey))
    }

    fn session_id(&self) -> Result<String, Error> {
        self.sessionid.read()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or(Error::NotLoggedIn)
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

    /// Sends an offer through the community endpoint. The offer must not have been sent before
    /// unless it counters another offer.
    pub async fn send_offer(&self, offer: &TradeOffer) -> Result<SentOffer, Error> {
        #[derive(Serialize, Debug)]
        struct OfferFormUser<'b> {
            assets: &'b [crate::offer::OfferItem],
            currency: [u8; 0],
            ready: bool,
        }

        #[derive(Serialize, Debug)]
        struct OfferForm<'b> {
            newversion: bool,
            version: u32,
            me: OfferFormUser<'b>,
            them: OfferFormUser<'b>,
        }

        #[derive(Serialize, Debug)]
        struct TradeOfferCreateParams<'b> {
            #[serde(skip_serializing_if = "Option::is_none")]
            trade_offer_access_token: &'b Option<String>,
        }

        #[derive(Serialize, Debug)]
        struct SendOfferParams<'a, 'b> {
            sessionid: &'a String,
            serverid: u32,
            json_tradeoffer: String,
            tradeoffermessage: &'b Option<String>,
            captcha: &'static str,
            trade_offer_create_params: String,
            tradeofferid_countered: &'b Option<TradeOfferId>,
            #[serde(serialize_with = "steamid_as_string")]
            partner: &'b SteamID,
        }

        #[derive(Serialize, Debug)]
        struct RefererParams<'b> {
            partner: u32,
            token: &'b Option<String>,
        }

        #[derive(Deserialize, Debug)]
        struct SendOfferResponseBody {
            #[serde(rename = "strError")]
            str_error: Option<String>,
            #[serde(default)]
            #[serde(with = "crate::serialize::option_string")]
            tradeofferid: Option<TradeOfferId>,
            #[serde(default)]
            needs_mobile_confirmation: bool,
            #[serde(default)]
            needs_email_confirmation: bool,
            email_domain: Option<String>,
        }

        let num_items = offer.items_to_give().len() + offer.items_to_receive().len();

        if num_items == 0 {
            return Err(Error::Parameter(ParameterError::EmptyOffer));
        }

        let sessionid = self.session_id()?;
        let token = offer.token().map(|token| token.to_string());
        let message = offer.message().map(|message| message.to_string());
        let countering = offer.countering();
        let referer = {
            let pathname: String = match countering {
                Some(id) => id.to_string(),
                None => String::from("new"),
            };
            let qs_params = serde_qs::to_string(&RefererParams {
                partner: offer.partner.account_id(),
                token: &token,
            }).map_err(ParameterError::SerdeQS)?;

            self.get_uri(&format!("/tradeoffer/{pathname}?{qs_params}"))
        };
        let params = {
            let json_tradeoffer = serde_json::to_string(&OfferForm {
                newversion: true,
                // this is hopefully safe enough
                version: num_items as u32 + 1,
                me: OfferFormUser {
                    assets: offer.items_to_give(),
                    currency: [],
                    ready: false,
                },
                them: OfferFormUser {
                    assets: offer.items_to_receive(),
                    currency: [],
                    ready: false,
                },
            })?;
            let trade_offer_create_params = serde_json::to_string(&TradeOfferCreateParams {
                trade_offer_access_token: &token,
            })?;

            SendOfferParams {
                sessionid: &sessionid,
                serverid: 1,
                captcha: "",
                tradeoffermessage: &message,
                partner: &offer.partner,
                json_tradeoffer,
                trade_offer_create_params,
                tradeofferid_countered: &countering,
            }
        };
        let uri = self.get_uri("/tradeoffer/new/send");
        let response = self.client.post(&uri)
            .header(REFERER, referer)
            .form(&params)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::NotLoggedIn);
        }

        let body = response.text().await?;

        match serde_json::from_str::<SendOfferResponseBody>(&body) {
            Ok(body) => {
                if let Some(message) = body.str_error {
                    return Err(Error::TradeOffer(message.as_str().into()));
                }

                if !status.is_success() {
                    return Err(Error::Http(status));
                }

                let tradeofferid = body.tradeofferid
                    .ok_or(Error::MalformedResponse)?;

                Ok(SentOffer {
                    tradeofferid,
                    needs_mobile_confirmation: body.needs_mobile_confirmation,
                    needs_email_confirmation: body.needs_email_confirmation,
                    email_domain: body.email_domain,
                })
            },
            Err(parse_error) => {
                if let Some(error) = check_response_body_text(&body) {
                    Err(error)
                } else if !status.is_success() {
                    Err(Error::Http(status))
                } else {
                    Err(Error::Parse(parse_error))
                }
            },
        }
    }

    /// Accepts an offer sent to us.
    pub async fn accept_offer(
        &self,
        tradeofferid: TradeOfferId,
        partner: &SteamID,
    ) -> Result<AcceptedOffer, Error> {
        #[derive(Serialize, Debug)]
        struct AcceptOfferParams<'a, 'b> {
            sessionid: &'a String,
            serverid: u32,
            #[serde(with = "crate::serialize::string")]
            tradeofferid: TradeOfferId,
            captcha: &'static str,
            #[serde(serialize_with = "steamid_as_string")]
            partner: &'b SteamID,
        }

        #[derive(Deserialize, Debug)]
        struct AcceptOfferResponseBody {
            #[serde(rename = "strError")]
            str_error: Option<String>,
            #[serde(default)]
            #[serde(with = "crate::serialize::option_string")]
            tradeid: Option<TradeId>,
            #[serde(default)]
            needs_mobile_confirmation: bool,
            #[serde(default)]
            needs_email_confirmation: bool,
            email_domain: Option<String>,
        }

        let sessionid = self.session_id()?;
        let referer = self.get_uri(&format!("/tradeoffer/{tradeofferid}"));
        let params = AcceptOfferParams {
            sessionid: &sessionid,
            tradeofferid,
            partner,
            serverid: 1,
            captcha: "",
        };
        let uri = self.get_uri(&format!("/tradeoffer/{tradeofferid}/accept"));
        let response = self.client.post(&uri)
            .header(REFERER, referer)
            .form(&params)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN {
            return Err(Error::NotLoggedIn);
        }

        let body = response.text().await?;

        match serde_json::from_str::<AcceptOfferResponseBody>(&body) {
            Ok(body) => {
                if let Some(message) = body.str_error {
                    return Err(Error::TradeOffer(message.as_str().into()));
                }

                if !status.is_success() {
                    return Err(Error::Http(status));
                }

                Ok(AcceptedOffer {
                    tradeid: body.tradeid,
                    needs_mobile_confirmation: body.needs_mobile_confirmation,
                    needs_email_confirmation: body.needs_email_confirmation,
                    email_domain: body.email_domain,
                })
            },
            Err(parse_error) => {
                if let Some(error) = check_response_body_text(&body) {
                    Err(error)
                } else if !status.is_success() {
                    Err(Error::Http(status))
                } else {
                    Err(Error::Parse(parse_error))
                }
            },
        }
    }

    /// Cancels an offer we created.
    pub async fn cancel_offer(&self, tradeofferid: TradeOfferId) -> Result<(), Error> {
        #[derive(Serialize, Debug)]
        struct Form<'a> {
            key: &'a str,
            tradeofferid: TradeOfferId,
        }

        let uri = self.get_api_url("IEconService", "CancelTradeOffer", 1);
        let response = self.client.post(&uri)
            .form(&Form {
                key: self.api_key()?,
                tradeofferid,
            })
            .send()
            .await?;
        let _ = check_response(response).await?;

        Ok(())
    }

    /// Declines an offer sent to us.
    pub async fn decline_offer(&self, tradeofferid: TradeOfferId) -> Result<(), Error> {
        #[derive(Serialize, Debug)]
        struct Form<'a> {
            key: &'a str,
            tradeofferid: TradeOfferId,
        }

        let uri = self.get_api_url("IEconService", "DeclineTradeOffer", 1);
        let response = self.client.post(&uri)
            .form(&Form {
                key: self.api_key()?,
                tradeofferid,
            })
            .send()
            .await?;
        let _ = check_response(response).await?;

        Ok(())
    }

    /// Gets a single offer by its ID.
    pub async fn get_trade_offer(&self, tradeofferid: TradeOfferId) -> Result<TradeOffer, Error> {
        #[derive(Serialize, Debug)]
        struct Form<'a> {
            key: &'a str,
            tradeofferid: TradeOfferId,
            language: &'a str,
            get_descriptions: bool,
        }

        let uri = self.get_api_url("IEconService", "GetTradeOffer", 1);
        let response = self.client.get(&uri)
            .query(&Form {
                key: self.api_key()?,
                tradeofferid,
                language: self.language.api_language_code(),
                get_descriptions: self.get_descriptions,
            })
            .send()
            .await?;
        let body: GetTradeOfferResponse = parses_response(response).await?;
        let raw = body.response.offer
            .ok_or(Error::MalformedResponse)?;
        let descriptions = if self.get_descriptions {
            Some(collect_descriptions(body.response.descriptions))
        } else {
            None
        };

        Ok(raw.into_offer(descriptions.as_ref()))
    }

    /// Gets the status of a trade.
    pub async fn get_trade_status(&self, tradeid: TradeId) -> Result<Trade, Error> {
        #[derive(Serialize, Debug)]
        struct Form<'a> {
            key: &'a str,
            #[serde(with = "crate::serialize::string")]
            tradeid: TradeId,
            language: &'a str,
            get_descriptions: bool,
        }

        let uri = self.get_api_url("IEconService", "GetTradeStatus", 1);
        let response = self.client.get(&uri)
            .query(&Form {
                key: self.api_key()?,
                tradeid,
                language: self.language.api_language_code(),
                get_descriptions: false,
            })
            .send()
            .await?;
        let body: GetTradeStatusResponse = parses_response(response).await?;

        body.response.trades
            .into_iter()
            .next()
            .ok_or(Error::MalformedResponse)
    }

    /// Fetches offers without validating item sides. Used by the poller, which has its own
    /// handling for partially served offers.
    pub async fn get_raw_trade_offers(
        &self,
        options: &GetTradeOffersOptions,
    ) -> Result<TradeOffers, Error> {
        #[derive(Serialize, Debug)]
        struct Form<'a> {
            key: &'a str,
            language: &'a str,
            active_only: bool,
            historical_only: bool,
            get_sent_offers: bool,
            get_received_offers: bool,
            get_descriptions: bool,
            time_historical_cutoff: u64,
            cursor: Option<u32>,
        }

        let time_historical_cutoff: u64 = match &options.historical_cutoff {
            Some(cutoff) => cutoff.timestamp() as u64,
            None => get_system_time() as u64,
        };
        let uri = self.get_api_url("IEconService", "GetTradeOffers", 1);
        let mut sent: Vec<RawTradeOffer> = Vec::new();
        let mut received: Vec<RawTradeOffer> = Vec::new();
        let mut descriptions = DescriptionMap::new();
        let mut cursor: Option<u32> = None;

        loop {
            let response = self.client.get(&uri)
                .query(&Form {
                    key: self.api_key()?,
                    language: self.language.api_language_code(),
                    active_only: options.active_only,
                    historical_only: options.historical_only,
                    get_sent_offers: options.get_sent_offers,
                    get_received_offers: options.get_received_offers,
                    get_descriptions: options.get_descriptions,
                    time_historical_cutoff,
                    cursor,
                })
                .send()
                .await?;
            let body: GetTradeOffersResponse = parses_response(response).await?;

            sent.append(&mut { body.response.trade_offers_sent });
            received.append(&mut { body.response.trade_offers_received });

            for description in body.response.descriptions {
                if let Some(name) = description.display_name() {
                    descriptions.insert(description.class(), name);
                }
            }

            cursor = body.response.next_cursor;

            if !matches!(cursor, Some(next) if next > 0) {
                break;
            }
        }

        let oldest_nonterminal = sent.iter()
            .chain(received.iter())
            .filter(|offer| !offer.trade_offer_state.is_terminal())
            .map(|offer| offer.time_updated.timestamp())
            .min();
        let descriptions = if options.get_descriptions {
            Some(descriptions)
        } else {
            None
        };

        Ok(TradeOffers {
            sent: sent
                .into_iter()
                .map(|raw| raw.into_offer(descriptions.as_ref()))
                .collect(),
            received: received
                .into_iter()
                .map(|raw| raw.into_offer(descriptions.as_ref()))
                .collect(),
            oldest_nonterminal,
        })
    }

    /// Gets trade offers, validating that the remote served a usable view. An answer where every
    /// offer has empty item sides indicates the backing data store is briefly unavailable.
    pub async fn get_trade_offers(
        &self,
        filter: OfferFilter,
        historical_cutoff: Option<ServerTime>,
    ) -> Result<Vec<TradeOffer>, Error> {
        let offers = self.get_raw_trade_offers(&GetTradeOffersOptions {
            active_only: filter == OfferFilter::ActiveOnly,
            historical_only: filter == OfferFilter::HistoricalOnly,
            get_sent_offers: true,
            get_received_offers: true,
            get_descriptions: self.get_descriptions,
            historical_cutoff,
        }).await?;
        let offers: Vec<TradeOffer> = offers.sent
            .into_iter()
            .chain(offers.received)
            .collect();

        if !offers.is_empty() && offers.iter().all(|offer| offer.is_empty()) {
            return Err(Error::DataTemporarilyUnavailable);
        }

        Ok(offers)
    }

    /// Refreshes an offer in place from the remote.
    pub async fn update_offer(&self, offer: &mut TradeOffer) -> Result<(), Error> {
        let tradeofferid = offer.id
            .ok_or(Error::Parameter(ParameterError::OfferNotSent))?;
        let updated = self.get_trade_offer(tradeofferid).await
            .map_err(|error| Error::CannotLoadTradeData(Box::new(error)))?;

        offer.trade_offer_state = updated.trade_offer_state;
        offer.confirmation_method = updated.confirmation_method;
        offer.tradeid = updated.tradeid;
        offer.time_created = updated.time_created;
        offer.time_updated = updated.time_updated;
        offer.expiration_time = updated.expiration_time;
        offer.escrow_end_date = updated.escrow_end_date;
        offer.is_our_offer = updated.is_our_offer;
        offer.items_to_give = updated.items_to_give;
        offer.items_to_receive = updated.items_to_receive;
        offer.with_descriptions = updated.with_descriptions;

        Ok(())
    }
}

fn collect_descriptions(
    descriptions: Vec<super::raw::RawDescription>,
) -> DescriptionMap {
    descriptions
        .into_iter()
        .filter_map(|description| {
            let name = description.display_name()?;

            Some((description.class(), name))
        })
        .collect()
}

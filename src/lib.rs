//! # steam-trade-agent
//!
//! A headless agent for sending, tracking and mobile-confirming Steam trade offers. Embed a
//! [`TradeOfferManager`] in a long-running bot, start polling, and react to
//! [`TradeOfferEvent`]s as the account's sent and received offers move through their
//! lifecycles.
//!
//! ```no_run
//! use steam_trade_agent::{TradeOfferManager, TradeOfferEvent, SteamID};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cookies: Vec<String> = Vec::new(); // from your login flow
//! let manager = TradeOfferManager::builder(SteamID::from(76561198000000000))
//!     .api_key("key".into())
//!     .identity_secret("secret".into())
//!     .build();
//!
//! manager.set_session("sessionid", &cookies)?;
//!
//! let mut events = manager.start_polling()?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         TradeOfferEvent::NewOffer(offer) => println!("new offer: {offer}"),
//!         TradeOfferEvent::SentOfferChanged { offer, old_state } => {
//!             println!("{offer}: {old_state} -> {}", offer.state_name());
//!         },
//!         _ => {},
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod api;
mod helpers;
mod manager;
mod mobile_api;
mod offer;
mod serialize;

pub mod enums;
pub mod error;
pub mod time;
pub mod types;

pub use api::{
    AcceptedOffer,
    GetTradeOffersOptions,
    SentOffer,
    SteamTradeOfferAPI,
    Trade,
    TradeOffers,
};
pub use helpers::generate_sessionid;
pub use manager::{
    AcceptOutcome,
    CancelReason,
    FilePollDataStorage,
    OfferSide,
    PollData,
    PollDataStorage,
    PollOptions,
    PollType,
    TradeOfferEvent,
    TradeOfferManager,
    TradeOfferManagerBuilder,
};
pub use mobile_api::{Confirmation, ConfirmationKeyFn, MobileAPI, MobileAPIBuilder, Operation};
pub use offer::{OfferItem, TradeOffer, TradeOfferBuilder};
pub use time::ServerTime;

pub use steamid_ng::SteamID;

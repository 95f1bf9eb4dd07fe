//! Error types.

use crate::enums::TradeOfferState;
use crate::types::TradeOfferId;
use lazy_regex::regex_is_match;

/// Any range of errors encountered when making requests.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An input parameter is missing or invalid.
    #[error("Invalid parameter: {}", .0)]
    Parameter(#[from] ParameterError),
    /// An unexpected response containing a message was received. Check the message for more
    /// details.
    #[error("Unexpected response: {}", .0)]
    UnexpectedResponse(String),
    /// An error was encountered making a request.
    #[error("reqwest error: {}", .0)]
    Reqwest(#[from] reqwest::Error),
    /// An error was encountered within the request middleware.
    #[error("reqwest middleware error: {}", .0)]
    ReqwestMiddleware(anyhow::Error),
    /// An error was encountered parsing a JSON response body.
    #[error("Error parsing response: {}", .0)]
    Parse(#[from] serde_json::Error),
    /// A response with an HTTP code other than 200 was received.
    #[error("Error {}", .0)]
    Http(reqwest::StatusCode),
    /// You are not logged in.
    #[error("Not logged in")]
    NotLoggedIn,
    /// The account is under family view restrictions and must be unlocked before trading.
    #[error("Family view restricted")]
    FamilyViewRestricted,
    /// An HTML document could not be parsed from the response.
    #[error("Error parsing HTML document: {}", .0)]
    ParseHtml(#[from] ParseHtmlError),
    /// An error was encountered when sending or acting on trade offers.
    #[error("Trade error: {}", .0)]
    TradeOffer(TradeOfferError),
    /// This trade offer has no confirmations.
    #[error("No confirmation for offer {}", .0)]
    NoConfirmationForOffer(TradeOfferId),
    /// A confirmation could not be confirmed. If a message was contained in the response body it
    /// will be included.
    #[error("Confirmation unsuccessful. {}", .0.as_deref().unwrap_or("The confirmation may no longer exist or another trade may be going through. Check confirmations again to verify."))]
    ConfirmationUnsuccessful(Option<String>),
    /// The response is not in the expected format.
    #[error("Malformed response")]
    MalformedResponse,
    /// The remote returned a structurally valid but empty view of the data. Retrying later
    /// usually resolves this.
    #[error("Data temporarily unavailable")]
    DataTemporarilyUnavailable,
    /// Updated details for a trade offer could not be fetched.
    #[error("Cannot load trade data: {}", .0)]
    CannotLoadTradeData(#[source] Box<Error>),
}

/// Any number of issues with a provided parameter.
#[derive(thiserror::Error, Debug)]
pub enum ParameterError {
    /// Offer contains no items on either side.
    #[error("Offer is empty.")]
    EmptyOffer,
    /// Offer has already been sent and can no longer be modified.
    #[error("Offer has already been sent.")]
    OfferAlreadySent,
    /// Offer has not been sent yet.
    #[error("Offer has not been sent.")]
    OfferNotSent,
    /// Offer messages are limited to 128 characters.
    #[error("Message is too long: {} characters.", .0)]
    MessageTooLong(usize),
    /// The partner is not an individual account.
    #[error("Partner is not an individual account.")]
    PartnerNotIndividual,
    /// Cannot accept an offer that is ours.
    #[error("Cannot accept an offer that is ours.")]
    CannotAcceptOfferThatIsOurs,
    /// Cannot accept an offer that is not active.
    #[error("Cannot accept an offer that is not active. Offer state: {}", .0)]
    CannotAcceptOfferThatIsNotActive(TradeOfferState),
    /// Only active or unconfirmed offers can be canceled.
    #[error("Cannot cancel an offer in this state. Offer state: {}", .0)]
    CannotCancelOfferInState(TradeOfferState),
    /// No identity secret.
    #[error("No identity secret.")]
    NoIdentitySecret,
    /// The identity secret could not be decoded as base64.
    #[error("Identity secret is not valid base64.")]
    InvalidIdentitySecret,
    /// No API key is configured.
    #[error("No API key.")]
    MissingApiKey,
    /// Polling was already started for this manager.
    #[error("Polling has already been started.")]
    PollingAlreadyStarted,
    /// Polling has not been started.
    #[error("Polling has not been started.")]
    PollingNotStarted,
    /// An error was encountered converting parameters to a valid URL string.
    #[error("Unable to convert to query parameters: {}", .0)]
    SerdeQS(#[from] serde_qs::Error),
}

/// An error occurred when working with the file system.
#[derive(thiserror::Error, Debug)]
pub enum FileError {
    /// A generic error.
    #[error("Filesystem error: {}", .0)]
    FileSystem(#[from] std::io::Error),
    /// File contents could not be parsed as JSON.
    #[error("Error parsing file contents: {}", .0)]
    Parse(#[from] serde_json::Error),
    /// A path could not be converted to a string.
    #[error("Path conversion to string failed")]
    PathError,
}

/// An error received from a response when sending or acting on trade offers.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TradeOfferError {
    /// An unknown error occurred. The contained string will contain additional information.
    #[error("{}", .0)]
    Unknown(String),
    /// An unknown error occurred with a numeric EResult code.
    #[error("{}", .0)]
    UnknownEResult(u32),
    /// The partner has an active trade ban.
    #[error("TradeBan{}", eresult_suffix(.0))]
    TradeBan(Option<u32>),
    /// The account recently logged in from a new device and trading is on cooldown.
    #[error("NewDevice{}", eresult_suffix(.0))]
    NewDevice(Option<u32>),
    /// The partner cannot trade. They may need to set up their account or are otherwise
    /// restricted from trading.
    #[error("TargetCannotTrade{}", eresult_suffix(.0))]
    TargetCannotTrade(Option<u32>),
    /// Sending this trade offer would put you over your limit of outstanding offers.
    #[error("OfferLimitExceeded{}", eresult_suffix(.0))]
    OfferLimitExceeded(Option<u32>),
    /// The item server could not be reached. The offer may still have been created.
    #[error("ItemServerUnavailable{}", eresult_suffix(.0))]
    ItemServerUnavailable(Option<u32>),
    /// # Code 2
    /// Returned when a more specific error code couldn't be determined.
    #[error("Fail")]
    Fail,
    /// # Code 11
    /// This trade offer is in an invalid state, and cannot be acted upon. Usually you'll need to
    /// send a new trade offer.
    #[error("InvalidState")]
    InvalidState,
    /// # Code 15
    /// You can't send or accept this trade offer because either you can't trade with the other
    /// user, or one of the parties in this trade can't send or receive one of the items in the
    /// trade.
    #[error("AccessDenied")]
    AccessDenied,
    /// # Code 16
    /// The Steam Community web server did not receive a timely reply from the trade offers
    /// server. It is possible (and not unlikely) that the operation actually succeeded.
    #[error("Timeout")]
    Timeout,
    /// # Code 20
    /// As the name suggests, the trade offers service is currently unavailable.
    #[error("ServiceUnavailable")]
    ServiceUnavailable,
    /// # Code 25
    /// Sending this trade offer would put you over your limit. You are limited to 5 Active
    /// offers (including those requiring confirmation, but excluding those in escrow) to a
    /// single recipient, or 30 Active offers total.
    #[error("LimitExceeded")]
    LimitExceeded,
    /// # Code 26
    /// One or more of the items in this trade offer does not exist in the inventory from which
    /// it was requested.
    #[error("Revoked")]
    Revoked,
    /// # Code 28
    /// When accepting a trade offer, this response code suggests that it has already been
    /// accepted.
    #[error("AlreadyRedeemed")]
    AlreadyRedeemed,
}

fn eresult_suffix(code: &Option<u32>) -> String {
    match code {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}

impl TradeOfferError {
    /// Transforms the code number into the corresponding error.
    pub fn from_code(code: u32) -> Self {
        match code {
            2 => Self::Fail,
            11 => Self::InvalidState,
            15 => Self::AccessDenied,
            16 => Self::Timeout,
            20 => Self::ServiceUnavailable,
            25 => Self::LimitExceeded,
            26 => Self::Revoked,
            28 => Self::AlreadyRedeemed,
            _ => Self::UnknownEResult(code),
        }
    }

    /// Gets the code number for this error.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Fail => Some(2),
            Self::InvalidState => Some(11),
            Self::AccessDenied => Some(15),
            Self::Timeout => Some(16),
            Self::ServiceUnavailable => Some(20),
            Self::LimitExceeded => Some(25),
            Self::Revoked => Some(26),
            Self::AlreadyRedeemed => Some(28),
            Self::UnknownEResult(code) => Some(*code),
            Self::TradeBan(code) |
            Self::NewDevice(code) |
            Self::TargetCannotTrade(code) |
            Self::OfferLimitExceeded(code) |
            Self::ItemServerUnavailable(code) => *code,
            Self::Unknown(_) => None,
        }
    }
}

/// Extracts a numeric EResult code from a trailing `(N)` in a server message.
fn parse_eresult(message: &str) -> Option<u32> {
    let code = message.trim().split(' ').next_back()?;
    let mut chars = code.chars();

    if chars.next() != Some('(') {
        return None;
    }

    if chars.next_back() != Some(')') {
        return None;
    }

    chars.as_str().parse::<u32>().ok()
}

impl From<&str> for TradeOfferError {
    fn from(message: &str) -> Self {
        let code = parse_eresult(message);

        if regex_is_match!(r"they have a trade ban", message) {
            Self::TradeBan(code)
        } else if regex_is_match!(r"logged in from a new device", message) {
            Self::NewDevice(code)
        } else if regex_is_match!(r"is not available to trade", message) {
            Self::TargetCannotTrade(code)
        } else if regex_is_match!(r"too many .*trade offers", message) {
            Self::OfferLimitExceeded(code)
        } else if regex_is_match!(r"items? server", message) {
            Self::ItemServerUnavailable(code)
        } else if let Some(code) = code {
            Self::from_code(code)
        } else {
            Self::Unknown(message.into())
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(error: reqwest_middleware::Error) -> Error {
        match error {
            reqwest_middleware::Error::Reqwest(e) => Error::Reqwest(e),
            reqwest_middleware::Error::Middleware(e) => Error::ReqwestMiddleware(e),
        }
    }
}

/// An error occurred when parsing HTML.
#[derive(thiserror::Error, Debug)]
pub enum ParseHtmlError {
    /// The HTML is not what is expected.
    #[error("{}", .0)]
    Malformed(&'static str),
    /// There was an error in the response.
    #[error("{}", .0)]
    Response(String),
    /// An error occurred parsing an integer in the response.
    #[error("{}", .0)]
    ParseInt(#[from] std::num::ParseIntError),
    /// A selector could not be parsed.
    #[error("Invalid selector")]
    ParseSelector,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trade_offer_error() {
        let message = "There was an error accepting this trade offer. Please try again later. (28)";
        let error = TradeOfferError::from(message);

        assert_eq!(error, TradeOfferError::AlreadyRedeemed);
    }

    #[test]
    fn parses_trade_ban_with_code() {
        let message = "You cannot trade with this user because they have a trade ban. (15)";
        let error = TradeOfferError::from(message);

        assert_eq!(error, TradeOfferError::TradeBan(Some(15)));
        assert_eq!(error.code(), Some(15));
    }

    #[test]
    fn parses_new_device_without_code() {
        let message = "You have logged in from a new device. You must wait before trading.";
        let error = TradeOfferError::from(message);

        assert_eq!(error, TradeOfferError::NewDevice(None));
    }

    #[test]
    fn parses_offer_limit() {
        let message = "You have sent too many trade offers, or have too many outstanding trade offers with this user. (25)";
        let error = TradeOfferError::from(message);

        assert_eq!(error, TradeOfferError::OfferLimitExceeded(Some(25)));
    }

    #[test]
    fn unmatched_messages_are_unknown() {
        let message = "Something strange happened.";
        let error = TradeOfferError::from(message);

        assert_eq!(error, TradeOfferError::Unknown(message.into()));
    }
}

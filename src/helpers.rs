use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::error::{Error, FileError};
use async_fs::File;
use futures_lite::io::AsyncWriteExt;
use lazy_regex::{regex_captures, regex_is_match};
use reqwest::{header, cookie::CookieStore};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;

pub const USER_AGENT_STRING: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/97.0.4692.71 Safari/537.36";

pub fn get_default_middleware<T>(
    cookie_store: Arc<T>,
    user_agent_string: &'static str,
) -> ClientWithMiddleware
where
    T: CookieStore + 'static,
{
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
    let mut headers = header::HeaderMap::new();

    headers.insert(header::USER_AGENT, header::HeaderValue::from_static(user_agent_string));

    let client = reqwest::ClientBuilder::new()
        .cookie_provider(cookie_store)
        .default_headers(headers)
        .build()
        .expect("reqwest client is buildable with static configuration");

    ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

fn is_login(location_option: Option<&header::HeaderValue>) -> bool {
    match location_option {
        Some(location) => {
            if let Ok(location_str) = location.to_str() {
                regex_is_match!("/login", location_str)
            } else {
                false
            }
        },
        None => false,
    }
}

/// Classifies degraded responses before their bodies are handed to a deserializer.
pub async fn check_response(response: reqwest::Response) -> Result<bytes::Bytes, Error> {
    let status = response.status();

    match status.as_u16() {
        300..=399 if is_login(response.headers().get("location")) => {
            Err(Error::NotLoggedIn)
        },
        403 => {
            let body = response.bytes().await?;
            let html = String::from_utf8_lossy(&body);

            if regex_is_match!(r#"<div id="parental_notice""#, &html) {
                Err(Error::FamilyViewRestricted)
            } else {
                Err(Error::Http(status))
            }
        },
        400..=599 => {
            Err(Error::Http(status))
        },
        _ => {
            Ok(response.bytes().await?)
        },
    }
}

/// Inspects an unparsable body for the known Steam HTML error shapes.
pub fn check_response_body_text(html: &str) -> Option<Error> {
    if regex_is_match!(r#"<h1>Sorry!</h1>"#, html) {
        if let Some((_, message)) = regex_captures!("<h3>(.+)</h3>", html) {
            Some(Error::UnexpectedResponse(message.into()))
        } else {
            Some(Error::UnexpectedResponse("Unexpected error".into()))
        }
    } else if regex_is_match!(r#"<h1>Sign In</h1>"#, html) && regex_is_match!(r#"g_steamID = false;"#, html) {
        Some(Error::NotLoggedIn)
    } else if let Some((_, message)) = regex_captures!(r#"<div id="error_msg">\s*([^<]+)\s*</div>"#, html) {
        Some(Error::TradeOffer(message.trim().into()))
    } else {
        None
    }
}

pub async fn parses_response<D>(response: reqwest::Response) -> Result<D, Error>
where
    D: DeserializeOwned,
{
    let body = check_response(response).await?;

    match serde_json::from_slice::<D>(&body) {
        Ok(body) => Ok(body),
        Err(parse_error) => {
            // unexpected response
            let html = String::from_utf8_lossy(&body);

            if let Some(error) = check_response_body_text(&html) {
                Err(error)
            } else {
                Err(Error::Parse(parse_error))
            }
        },
    }
}

/// Writes using a temporary file to avoid partial writes.
pub async fn write_file_atomic<P>(filepath: P, bytes: &[u8]) -> Result<(), FileError>
where
    P: AsRef<Path>,
{
    let filepath = filepath.as_ref();
    let temp_filepath = filepath.with_extension("tmp");
    let mut temp_file = File::create(&temp_filepath).await?;

    match temp_file.write_all(bytes).await {
        Ok(_) => {
            temp_file.flush().await?;
            async_fs::rename(&temp_filepath, filepath).await?;

            Ok(())
        },
        Err(error) => {
            // something went wrong writing to this file...
            async_fs::remove_file(&temp_filepath).await?;

            Err(error.into())
        },
    }
}

/// The directory used for storing poll data when no other location is configured.
pub fn default_data_directory() -> PathBuf {
    directories::BaseDirs::new()
        .map(|base_dirs| base_dirs.config_dir().join("steam-trade-agent"))
        .unwrap_or_else(|| PathBuf::from("steam-trade-agent"))
}

/// Generates a random sessionid.
pub fn generate_sessionid() -> String {
    // Should look like "37bf523a24034ec06c60ec61"
    (0..12)
        .map(|_| {
            let b = rand::random::<u8>();

            format!("{b:02x}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_session() {
        let sessionid = generate_sessionid();

        assert_eq!(sessionid.len(), 24);
    }

    #[test]
    fn detects_error_msg_div() {
        let html = r#"<html><div id="error_msg">
            There was an error sending your trade offer. Please try again later. (26)
        </div></html>"#;
        let error = check_response_body_text(html);

        assert!(matches!(
            error,
            Some(Error::TradeOffer(crate::error::TradeOfferError::Revoked))
        ));
    }

    #[test]
    fn detects_sorry_page() {
        let html = "<html><h1>Sorry!</h1><h3>Something went wrong</h3></html>";
        let error = check_response_body_text(html);

        assert!(matches!(error, Some(Error::UnexpectedResponse(message)) if message == "Something went wrong"));
    }

    #[test]
    fn detects_signed_out_page() {
        let html = r#"<html><h1>Sign In</h1><script>var g_steamID = false;</script></html>"#;
        let error = check_response_body_text(html);

        assert!(matches!(error, Some(Error::NotLoggedIn)));
    }
}

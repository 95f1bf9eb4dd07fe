use crate::enums::ConfirmationType;
use crate::error::{ParameterError, ParseHtmlError};
use super::Confirmation;
use hmac_sha1::hmac_sha1;
use lazy_regex::regex_replace_all;
use scraper::{element_ref::ElementRef, Html, Selector};
use sha1::{Digest, Sha1};
use steamid_ng::SteamID;

/// Derives the key authorizing a confirmation request at `time` for the action named by `tag`.
pub fn generate_confirmation_hash_for_time(
    time: i64,
    tag: &str,
    identity_secret: &str,
) -> Result<String, ParameterError> {
    let secret = base64::decode(identity_secret)
        .map_err(|_error| ParameterError::InvalidIdentitySecret)?;
    let time_bytes = time.to_be_bytes();
    let buffer = [&time_bytes[..], tag.as_bytes()].concat();
    let hash = hmac_sha1(&secret, &buffer);

    Ok(base64::encode(hash))
}

/// Generates the device ID the confirmation endpoints expect for the given account.
pub fn get_device_id(steamid: SteamID) -> String {
    let mut hasher = Sha1::new();

    hasher.update(u64::from(steamid).to_string().as_bytes());

    let result = hasher.finalize();
    let hash = result.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>();
    let device_id = regex_replace_all!(
        r#"^([0-9a-f]{8})([0-9a-f]{4})([0-9a-f]{4})([0-9a-f]{4})([0-9a-f]{12}).*$"#i,
        &hash,
        |_, a, b, c, d, e| format!("{a}-{b}-{c}-{d}-{e}"),
    );

    format!("android:{device_id}")
}

pub fn parse_confirmations(text: &str) -> Result<Vec<Confirmation>, ParseHtmlError> {
    fn text_of(element: ElementRef) -> String {
        element
            .text()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn parse_entry(
        element: ElementRef,
        description_selector: &Selector,
        div_selector: &Selector,
        icon_selector: &Selector,
    ) -> Result<Confirmation, ParseHtmlError> {
        let id = element.value().attr("data-confid")
            .ok_or(ParseHtmlError::Malformed("Entry is missing data-confid attribute"))?;
        let key = element.value().attr("data-key")
            .ok_or(ParseHtmlError::Malformed("Entry is missing data-key attribute"))?;
        let creator = element.value().attr("data-creator")
            .ok_or(ParseHtmlError::Malformed("Entry is missing data-creator attribute"))?;
        let data_type = element.value().attr("data-type")
            .ok_or(ParseHtmlError::Malformed("Entry is missing data-type attribute"))?;
        let description = element.select(description_selector).next()
            .ok_or(ParseHtmlError::Malformed("Entry is missing description"))?;
        let mut lines = description.select(div_selector);
        let title = lines.next().map(text_of).unwrap_or_default();
        let receiving = lines.next().map(text_of).unwrap_or_default();
        let time = lines.next().map(text_of).unwrap_or_default();
        let icon_url = element.select(icon_selector)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(|src| src.to_string());

        Ok(Confirmation {
            id: id.parse::<u64>()?,
            key: key.parse::<u64>()?,
            creator: creator.parse::<u64>()?,
            conf_type: ConfirmationType::from(data_type),
            title,
            receiving,
            time,
            icon_url,
        })
    }

    let fragment = Html::parse_fragment(text);
    // these should probably never fail
    let empty_selector = Selector::parse("#mobileconf_empty")
        .map_err(|_e| ParseHtmlError::ParseSelector)?;
    let done_selector = Selector::parse(".mobileconf_done")
        .map_err(|_e| ParseHtmlError::ParseSelector)?;
    let div_selector = Selector::parse("div")
        .map_err(|_e| ParseHtmlError::ParseSelector)?;

    if let Some(element) = fragment.select(&empty_selector).next() {
        if done_selector.matches(&element) {
            if let Some(element) = element.select(&div_selector).nth(1) {
                let error_message = element
                    .text()
                    .collect::<String>();

                return Err(ParseHtmlError::Response(error_message));
            } else {
                return Ok(Vec::new());
            }
        } else {
            return Ok(Vec::new());
        }
    }

    let entry_selector = Selector::parse(".mobileconf_list_entry")
        .map_err(|_e| ParseHtmlError::ParseSelector)?;
    let description_selector = Selector::parse(".mobileconf_list_entry_description")
        .map_err(|_e| ParseHtmlError::ParseSelector)?;
    let icon_selector = Selector::parse(".mobileconf_list_entry_icon img")
        .map_err(|_e| ParseHtmlError::ParseSelector)?;
    let confirmations = fragment.select(&entry_selector)
        .map(|entry| parse_entry(entry, &description_selector, &div_selector, &icon_selector))
        .collect::<Result<Vec<Confirmation>, ParseHtmlError>>()?;

    Ok(confirmations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_regex::regex_is_match;

    const IDENTITY_SECRET: &str = "YWJjZGVmZ2hpamtsbW5vcHFyc3Q=";

    fn entry_html() -> &'static str {
        r#"<div class="mobileconf_list_entry" id="conf1111" data-confid="1111" data-key="2222" data-type="2" data-creator="3333">
            <div class="mobileconf_list_entry_content">
                <div class="mobileconf_list_entry_icon">
                    <img src="https://community.akamai.steamstatic.com/economy/image/abc/32fx32f">
                </div>
                <div class="mobileconf_list_entry_description">
                    <div>Trade with Rosie</div>
                    <div>You will receive 2 items</div>
                    <div>Just now</div>
                </div>
            </div>
        </div>"#
    }

    #[test]
    fn parses_a_list_entry() {
        let confirmations = parse_confirmations(entry_html()).unwrap();

        assert_eq!(confirmations.len(), 1);

        let confirmation = &confirmations[0];

        assert_eq!(confirmation.id, 1111);
        assert_eq!(confirmation.key, 2222);
        assert_eq!(confirmation.creator, 3333);
        assert_eq!(confirmation.conf_type, ConfirmationType::Trade);
        assert_eq!(confirmation.title, "Trade with Rosie");
        assert_eq!(confirmation.receiving, "You will receive 2 items");
        assert_eq!(confirmation.time, "Just now");
        assert!(confirmation.icon_url.is_some());
    }

    #[test]
    fn missing_attributes_are_malformed() {
        let html = r#"<div class="mobileconf_list_entry" data-confid="1111" data-type="2" data-creator="3333">
            <div class="mobileconf_list_entry_description"><div>Trade</div></div>
        </div>"#;
        let result = parse_confirmations(html);

        assert!(matches!(result, Err(ParseHtmlError::Malformed(_))));
    }

    #[test]
    fn parses_an_empty_list() {
        let html = r#"<div id="mobileconf_empty" class="mobileconf_header">
            <div>Nothing to confirm</div>
        </div>"#;
        let confirmations = parse_confirmations(html).unwrap();

        assert!(confirmations.is_empty());
    }

    #[test]
    fn done_lists_carry_an_error() {
        let html = r#"<div id="mobileconf_empty" class="mobileconf_header mobileconf_done">
            <div>All done</div>
            <div>There is nothing left to confirm</div>
        </div>"#;
        let result = parse_confirmations(html);

        assert!(matches!(
            result,
            Err(ParseHtmlError::Response(message)) if message.contains("nothing left")
        ));
    }

    #[test]
    fn derives_distinct_keys_per_tag() {
        let conf = generate_confirmation_hash_for_time(1634603498, "conf", IDENTITY_SECRET).unwrap();
        let allow = generate_confirmation_hash_for_time(1634603498, "allow", IDENTITY_SECRET).unwrap();

        assert_ne!(conf, allow);
    }

    #[test]
    fn derives_distinct_keys_per_second() {
        let first = generate_confirmation_hash_for_time(1634603498, "conf", IDENTITY_SECRET).unwrap();
        let second = generate_confirmation_hash_for_time(1634603499, "conf", IDENTITY_SECRET).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn derivation_is_deterministic() {
        let first = generate_confirmation_hash_for_time(1634603498, "conf", IDENTITY_SECRET).unwrap();
        let second = generate_confirmation_hash_for_time(1634603498, "conf", IDENTITY_SECRET).unwrap();

        // an HMAC-SHA1 digest is 20 bytes, which is 28 characters encoded
        assert_eq!(first, second);
        assert_eq!(first.len(), 28);
    }

    #[test]
    fn rejects_invalid_secrets() {
        let result = generate_confirmation_hash_for_time(1634603498, "conf", "not base64!!");

        assert!(matches!(result, Err(ParameterError::InvalidIdentitySecret)));
    }

    #[test]
    fn generates_device_id() {
        let device_id = get_device_id(SteamID::from(76561198000000000));

        assert!(regex_is_match!(
            r"^android:[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
            &device_id
        ));
    }
}

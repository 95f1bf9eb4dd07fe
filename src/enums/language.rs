use std::fmt;
use serde::{Deserialize, Serialize};

/// Languages used in API calls.
///
/// See <https://partner.steamgames.com/doc/store/localization/languages> for more information.
#[derive(Default, Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum Language {
    /// Chinese (Simplified) language.
    ChineseSimplified,
    /// Chinese (Traditional) language.
    ChineseTraditional,
    /// Danish language.
    Danish,
    /// Dutch language.
    Dutch,
    /// English language. This is the default language.
    #[default]
    English,
    /// French language.
    French,
    /// German language.
    German,
    /// Italian language.
    Italian,
    /// Japanese language.
    Japanese,
    /// Korean language.
    Korean,
    /// Polish language.
    Polish,
    /// Portuguese language.
    Portuguese,
    /// Portuguese (Brazil) language.
    PortugueseBrazil,
    /// Russian language.
    Russian,
    /// Spanish (Spain) language.
    SpanishSpain,
    /// Swedish language.
    Swedish,
    /// Turkish language.
    Turkish,
    /// Ukrainian language.
    Ukrainian,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_language_code())
    }
}

impl Language {
    /// Web API language codes are used with the
    /// [Steamworks Web API](https://partner.steamgames.com/doc/webapi).
    pub fn api_language_code(&self) -> &'static str {
        match self {
            Self::ChineseSimplified => "schinese",
            Self::ChineseTraditional => "tchinese",
            Self::Danish => "danish",
            Self::Dutch => "dutch",
            Self::English => "english",
            Self::French => "french",
            Self::German => "german",
            Self::Italian => "italian",
            Self::Japanese => "japanese",
            Self::Korean => "koreana",
            Self::Polish => "polish",
            Self::Portuguese => "portuguese",
            Self::PortugueseBrazil => "brazilian",
            Self::Russian => "russian",
            Self::SpanishSpain => "spanish",
            Self::Swedish => "swedish",
            Self::Turkish => "turkish",
            Self::Ukrainian => "ukrainian",
        }
    }
}

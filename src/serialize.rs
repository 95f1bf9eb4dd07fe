//! Contains custom serialization and deserialization functions.

use serde::{Deserialize, Deserializer, Serializer};
use steamid_ng::SteamID;

pub mod string {
    use std::fmt::Display;
    use std::str::FromStr;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?.parse().map_err(de::Error::custom)
    }
}

pub mod option_string {
    use std::fmt::Display;
    use std::str::FromStr;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        match value {
            Some(string) => serializer.collect_str(string),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::<String>::deserialize(deserializer)?;

        if let Some(v) = s {
            return Ok(Some(v.parse::<T>().map_err(serde::de::Error::custom)?));
        }

        Ok(None)
    }
}

pub mod option_string_0_as_none {
    use std::fmt::Display;
    use std::str::FromStr;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        match value {
            Some(string) => serializer.collect_str(string),
            None => serializer.serialize_str("0"),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::<String>::deserialize(deserializer)?;

        match s.as_deref() {
            None | Some("0") => Ok(None),
            Some(v) => Ok(Some(v.parse::<T>().map_err(serde::de::Error::custom)?)),
        }
    }
}

pub fn empty_string_is_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;

    match s {
        Some(s) if s.is_empty() => Ok(None),
        s => Ok(s),
    }
}

pub mod ts_seconds_option_none_when_zero {
    use core::fmt;
    use serde::{de, ser};
    use chrono::{DateTime, Utc, serde::SecondsTimestampVisitor};

    pub fn serialize<S>(opt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match *opt {
            Some(ref dt) => serializer.serialize_some(&dt.timestamp()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        d.deserialize_option(OptionSecondsTimestampVisitor)
    }

    struct OptionSecondsTimestampVisitor;

    impl<'de> de::Visitor<'de> for OptionSecondsTimestampVisitor {
        type Value = Option<DateTime<Utc>>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a unix timestamp in seconds or none")
        }

        fn visit_some<D>(self, d: D) -> Result<Self::Value, D::Error>
        where
            D: de::Deserializer<'de>,
        {
            match d.deserialize_i64(SecondsTimestampVisitor) {
                Ok(date) if date.timestamp() == 0 => Ok(None),
                Ok(date) => Ok(Some(date)),
                Err(error) => Err(error),
            }
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }
}

pub fn steamid_as_string<S>(steamid: &SteamID, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&u64::from(*steamid).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct MessageBody {
        #[serde(default)]
        #[serde(deserialize_with = "empty_string_is_none")]
        message: Option<String>,
    }

    #[test]
    fn empty_strings_are_none() {
        let body: MessageBody = serde_json::from_str(r#"{"message":""}"#).unwrap();

        assert!(body.message.is_none());
    }

    #[test]
    fn non_empty_strings_are_some() {
        let body: MessageBody = serde_json::from_str(r#"{"message":"hello"}"#).unwrap();

        assert_eq!(body.message.as_deref(), Some("hello"));
    }
}

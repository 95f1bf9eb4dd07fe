use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde_repr::{Deserialize_repr, Serialize_repr};
use strum_macros::{Display, EnumString};

/// Which offers to request from the remote listing.
#[derive(Debug, Serialize_repr, Deserialize_repr, Display, EnumString, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum OfferFilter {
    ActiveOnly = 1,
    HistoricalOnly = 2,
    All = 3,
}

use crate::enums::ConfirmationType;

/// A mobile confirmation. Used primarily for confirming trade offers or listing items on the
/// market.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Confirmation {
    /// The ID of the confirmation.
    pub id: u64,
    /// The key of the confirmation.
    pub key: u64,
    /// Trade offer ID or market transaction ID.
    pub creator: u64,
    /// The confirmation type.
    pub conf_type: ConfirmationType,
    /// What the confirmation authorizes e.g. "Trade with Rosie".
    pub title: String,
    /// What is received as part of the confirmed action.
    pub receiving: String,
    /// Human readable creation time e.g. "Just now".
    pub time: String,
    /// URL to the icon shown beside the entry, if one is present.
    pub icon_url: Option<String>,
}

impl Confirmation {
    /// Human readable representation of this confirmation.
    pub fn description(&self) -> String {
        format!("{:?} - {}", self.conf_type, self.title)
    }
}

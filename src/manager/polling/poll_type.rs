/// The type of poll to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollType {
    /// Fetch changes since the last poll. Falls back to a full update when no previous poll has
    /// established a cutoff.
    Auto,
    /// Fetch all offers regardless of the established cutoff.
    FullUpdate,
}

impl PollType {
    /// The poll is a full update.
    pub(crate) fn is_full_update(&self) -> bool {
        matches!(self, Self::FullUpdate)
    }
}

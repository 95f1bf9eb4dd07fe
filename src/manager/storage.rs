use std::io::ErrorKind;
use std::path::PathBuf;
use crate::error::FileError;
use crate::helpers::write_file_atomic;
use super::PollData;
use async_trait::async_trait;
use steamid_ng::SteamID;

/// Where poll data lives between runs. The encoding behind the seam is opaque to the manager;
/// implementations may encrypt, compress or store it remotely.
#[async_trait]
pub trait PollDataStorage: Send + Sync {
    /// Loads poll data for the account. Missing data is not an error.
    async fn load(&self, steamid: SteamID) -> Result<Option<PollData>, FileError>;

    /// Saves poll data for the account.
    async fn save(&self, steamid: SteamID, poll_data: &PollData) -> Result<(), FileError>;
}

/// Stores poll data as JSON files in a directory, one file per account.
#[derive(Debug, Clone)]
pub struct FilePollDataStorage {
    directory: PathBuf,
}

impl FilePollDataStorage {
    pub fn new<T>(directory: T) -> Self
    where
        T: Into<PathBuf>,
    {
        Self {
            directory: directory.into(),
        }
    }

    fn filepath(&self, steamid: SteamID) -> PathBuf {
        self.directory.join(format!("poll_data_{}.json", u64::from(steamid)))
    }
}

#[async_trait]
impl PollDataStorage for FilePollDataStorage {
    async fn load(&self, steamid: SteamID) -> Result<Option<PollData>, FileError> {
        match async_fs::read_to_string(self.filepath(steamid)).await {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn save(&self, steamid: SteamID, poll_data: &PollData) -> Result<(), FileError> {
        let data = serde_json::to_string(poll_data)?;

        async_fs::create_dir_all(&self.directory).await?;
        write_file_atomic(self.filepath(steamid), data.as_bytes()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::TradeOfferState;
    use crate::manager::poll_data::OfferSide;

    fn temp_directory() -> PathBuf {
        std::env::temp_dir().join(format!("steam-trade-agent-test-{}", std::process::id()))
    }

    #[tokio::test]
    async fn saves_and_loads_poll_data() {
        let storage = FilePollDataStorage::new(temp_directory());
        let steamid = SteamID::from(76561198000000000);
        let mut poll_data = PollData::new();

        poll_data.record(OfferSide::Sent, 1, TradeOfferState::Active, 100);
        poll_data.set_offers_since(1234);

        storage.save(steamid, &poll_data).await.unwrap();

        let loaded = storage.load(steamid).await.unwrap().unwrap();

        assert_eq!(loaded.state_of(OfferSide::Sent, 1), Some(TradeOfferState::Active));
        assert_eq!(loaded.offers_since, 1234);

        let _ = async_fs::remove_file(storage.filepath(steamid)).await;
    }

    #[tokio::test]
    async fn missing_data_is_not_an_error() {
        let storage = FilePollDataStorage::new(temp_directory());
        let loaded = storage.load(SteamID::from(76561198999999999)).await.unwrap();

        assert!(loaded.is_none());
    }
}

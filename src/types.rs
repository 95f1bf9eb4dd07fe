//! Contains types for common values in Steam responses.

pub type AppId = u32;
pub type ContextId = u64;
pub type AssetId = u64;
pub type Amount = u32;
pub type ClassId = u64;
pub type InstanceId = Option<u64>;
pub type TradeOfferId = u64;
pub type TradeId = u128;

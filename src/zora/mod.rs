pub mod client;
pub mod profile;
pub mod trade;

pub use client::ZoraClient;
pub use profile::{CreatorCoin, Profile, ProfileError, ProfileSource};
pub use trade::{TradeAsset, TradeError, TradeParameters, TradeReceipt, Trader, ZoraTrader};

pub mod balance;
pub mod bot;
pub mod chain;
pub mod config;
pub mod telegram;
pub mod zora;

pub use bot::{log_panics, AutoBuyer, BotError, BuySettings, PassOutcome, Purchase};
pub use chain::{build_signer_client, explorer_tx_url, parse_native_amount};
pub use config::{Config, ConfigError};
pub use telegram::{normalize_destination, Notifier, TelegramNotifier};
pub use zora::{CreatorCoin, Profile, ProfileError, ProfileSource, TradeError, TradeReceipt, Trader, ZoraClient, ZoraTrader};

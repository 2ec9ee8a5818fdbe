use ethers::types::{TxHash, U256};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{error, info, warn};
use url::Url;

use crate::chain::explorer_tx_url;
use crate::config::Config;
use crate::telegram::Notifier;
use crate::zora::{CreatorCoin, ProfileSource, Trader};

/// Everything a pass needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct BuySettings {
    /// Address or name passed to the profile lookup.
    pub target: String,
    /// Spend amount as configured, for messages.
    pub amount_label: String,
    pub amount_in: U256,
    pub explorer_url: Url,
    pub poll_interval: Duration,
    pub exit_on_fault: bool,
}

impl BuySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target: config.target_wallet.clone(),
            amount_label: config.autobuy_eth.clone(),
            amount_in: config.autobuy_wei,
            explorer_url: config.explorer_url.clone(),
            poll_interval: config.poll_interval,
            exit_on_fault: config.exit_on_fault,
        }
    }
}

/// The one buy this process makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub coin: CreatorCoin,
    pub tx_hash: TxHash,
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    NoProfile,
    NoCreatorCoin,
    LookupFailed,
    TradeFailed,
    Bought(Purchase),
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("unexpected fault in poll pass: {0}")]
    Fault(String),
}

pub struct AutoBuyer<P, T, N> {
    profiles: P,
    trader: T,
    notifier: N,
    settings: BuySettings,
}

impl<P, T, N> AutoBuyer<P, T, N>
where
    P: ProfileSource + 'static,
    T: Trader + 'static,
    N: Notifier + 'static,
{
    pub fn new(profiles: P, trader: T, notifier: N, settings: BuySettings) -> Self {
        Self {
            profiles,
            trader,
            notifier,
            settings,
        }
    }

    /// Polls until a buy goes through. The first pass runs immediately; later
    /// passes start on `poll_interval` boundaries. A pass is awaited before the
    /// next one is scheduled and boundaries it overran are skipped, never
    /// queued, so passes never overlap.
    pub async fn run(self: Arc<Self>) -> Result<Purchase, BotError> {
        if let Err(reason) = self.notify_guarded("🧠 Bot started… checking for a creator coin").await {
            self.on_fault(reason).await?;
        }

        let period = self.settings.poll_interval;
        let mut next_pass = Instant::now();
        loop {
            tokio::time::sleep_until(next_pass).await;
            let this = Arc::clone(&self);
            match tokio::spawn(async move { this.run_pass().await }).await {
                Ok(PassOutcome::Bought(purchase)) => {
                    // The purchase stands even if this last notice cannot go out.
                    if let Err(reason) = self.notify_guarded("🎉 Token bought, bot shutting down.").await {
                        error!("Shutdown notice failed: {}", reason);
                    }
                    return Ok(purchase);
                }
                Ok(outcome) => info!("Pass finished: {:?}", outcome),
                Err(e) => self.on_fault(fault_reason(e)).await?,
            }

            let (next, skipped) = next_boundary(next_pass, period, Instant::now());
            if skipped > 0 {
                warn!("Pass overran the poll interval, skipped {} tick(s)", skipped);
            }
            next_pass = next;
        }
    }

    /// Delivers `message` on its own task so a panicking notifier cannot take
    /// the loop down with it.
    async fn notify_guarded(self: &Arc<Self>, message: &str) -> Result<(), String> {
        let this = Arc::clone(self);
        let message = message.to_string();
        tokio::spawn(async move { this.notifier.notify(&message).await })
            .await
            .map_err(fault_reason)
    }

    async fn on_fault(self: &Arc<Self>, reason: String) -> Result<(), BotError> {
        error!("Unexpected fault: {}", reason);
        if let Err(again) = self.notify_guarded(&format!("❌ Unexpected fault: {}", reason)).await {
            error!("Fault notice failed: {}", again);
        }
        if self.settings.exit_on_fault {
            Err(BotError::Fault(reason))
        } else {
            Ok(())
        }
    }

    /// One lookup and, if a creator coin exists, one buy attempt. Lookup and
    /// trade errors are reported here and never escape.
    pub async fn run_pass(&self) -> PassOutcome {
        let target = self.settings.target.as_str();
        let profile = match self.profiles.get_profile(target).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                self.notifier
                    .notify(&format!("👤 No profile found for {}.", target))
                    .await;
                return PassOutcome::NoProfile;
            }
            Err(e) => {
                error!("Profile lookup failed: {}", e);
                self.notifier.notify(&format!("❌ Profile error: {}", e)).await;
                return PassOutcome::LookupFailed;
            }
        };

        self.notifier
            .notify(&format!("📄 Profile: {}", profile.label().unwrap_or(target)))
            .await;

        let coin = match profile.creator_coin {
            Some(coin) => coin,
            None => {
                self.notifier
                    .notify(&format!("👤 No creator coin found for {}.", target))
                    .await;
                return PassOutcome::NoCreatorCoin;
            }
        };

        self.notifier
            .notify(&format!(
                "🚀 Creator coin found!\n• Coin: {}\n• Name: {}\n• Symbol: {}\n• Market Cap: {}",
                coin.address, coin.name, coin.symbol, coin.market_cap
            ))
            .await;
        self.buy(coin).await
    }

    async fn buy(&self, coin: CreatorCoin) -> PassOutcome {
        self.notifier
            .notify(&format!(
                "🤖 Autobuy: {} ETH → {}",
                self.settings.amount_label, coin.symbol
            ))
            .await;

        match self.trader.buy(&coin, self.settings.amount_in).await {
            Ok(receipt) => {
                let link = explorer_tx_url(&self.settings.explorer_url, &receipt.tx_hash);
                if receipt.confirmed {
                    self.notifier.notify(&format!("✅ Buy tx: {}", link)).await;
                } else {
                    warn!("Buy tx {:?} unconfirmed, treating it as the purchase", receipt.tx_hash);
                    self.notifier
                        .notify(&format!("⏳ Buy tx sent, confirmation pending: {}", link))
                        .await;
                }
                PassOutcome::Bought(Purchase {
                    coin,
                    tx_hash: receipt.tx_hash,
                    confirmed: receipt.confirmed,
                })
            }
            Err(e) => {
                error!("Buy failed: {}", e);
                self.notifier.notify(&format!("❌ Buy error: {}", e)).await;
                PassOutcome::TradeFailed
            }
        }
    }
}

/// First `period` boundary after `now`, counted from `last`, and how many
/// boundaries were passed over on the way.
fn next_boundary(last: Instant, period: Duration, now: Instant) -> (Instant, u32) {
    let mut next = last + period;
    let mut skipped = 0;
    while next <= now {
        next += period;
        skipped += 1;
    }
    (next, skipped)
}

/// Routes panic reports through `tracing` instead of bare stderr.
pub fn log_panics() {
    std::panic::set_hook(Box::new(|info| error!("panic: {}", info)));
}

fn fault_reason(e: JoinError) -> String {
    if e.is_panic() {
        panic_message(e.into_panic())
    } else {
        e.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zora_autobuy::{
    build_signer_client, log_panics, AutoBuyer, BuySettings, Config, TelegramNotifier, ZoraClient, ZoraTrader,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::from_default_env().add_directive("zora_autobuy=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();
    log_panics();

    // Nothing touches the network before the config is known to be complete.
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting the bot...");
    info!("Target: {}", config.target_wallet);
    info!("Autobuy: {} ETH, slippage {}", config.autobuy_eth, config.slippage);
    info!("Poll interval: {:?}", config.poll_interval);

    let notifier = TelegramNotifier::new(
        config.telegram_bot_token.clone(),
        &config.telegram_destination,
        config.request_timeout,
    )
    .context("build telegram client")?;
    info!("Notifying {}", notifier.chat_id());

    let zora = ZoraClient::new(
        config.zora_api_url.clone(),
        Some(config.zora_api_key.clone()),
        config.request_timeout,
    )
    .context("build zora client")?;

    let signer = build_signer_client(
        &config.rpc_url,
        &config.private_key,
        config.chain_id,
        config.request_timeout,
    )?;
    let trader = ZoraTrader::new(
        zora.clone(),
        signer,
        config.chain_id,
        config.slippage,
        config.confirmation_timeout,
    );
    info!("Trading wallet: {:?}", trader.sender());

    let bot = Arc::new(AutoBuyer::new(zora, trader, notifier, BuySettings::from_config(&config)));

    tokio::select! {
        result = bot.run() => {
            let purchase = result?;
            info!(
                "Bought {} ({}) in {:?}, exiting",
                purchase.coin.symbol, purchase.coin.address, purchase.tx_hash
            );
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }
    Ok(())
}

use anyhow::{Context, Result};
use ethers::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Signing middleware over any JSON-RPC transport; HTTP in production.
pub type SignerClient<P = Http> = SignerMiddleware<Provider<P>, LocalWallet>;

/// Receipt polling cadence; Base produces a block every two seconds.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub fn wallet_from_key(private_key: &str) -> Result<LocalWallet> {
    let key = private_key.trim_start_matches("0x");
    let bytes = hex::decode(key).context("invalid private key hex")?;
    LocalWallet::from_bytes(&bytes).context("wallet from bytes")
}

/// Signing client over an HTTP provider whose every request is bounded by `timeout`.
pub fn build_signer_client(
    rpc_url: &Url,
    private_key: &str,
    chain_id: u64,
    timeout: Duration,
) -> Result<Arc<SignerClient>> {
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("build RPC http client")?;
    let provider = Provider::new(Http::new_with_client(rpc_url.clone(), http)).interval(RECEIPT_POLL_INTERVAL);
    let wallet = wallet_from_key(private_key)?.with_chain_id(chain_id);
    Ok(Arc::new(SignerMiddleware::new(provider, wallet)))
}

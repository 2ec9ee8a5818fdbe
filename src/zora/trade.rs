use async_trait::async_trait;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::utils::format_ether;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::{CreatorCoin, ZoraClient};
use crate::balance::{get_native_balance, validate_buy_balance, BalanceCheck};
use crate::chain::{address_from_hex, hex_string, AddressError, SignerClient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TradeAsset {
    /// The chain's native currency; the quote API calls it `eth`.
    #[serde(rename = "eth")]
    Native,
    Erc20 { address: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeParameters {
    pub sell: TradeAsset,
    pub buy: TradeAsset,
    pub amount_in: U256,
    /// Fraction in (0, 1).
    pub slippage: f64,
    pub sender: Address,
}

impl TradeParameters {
    pub fn native_for_erc20(token: Address, amount_in: U256, slippage: f64, sender: Address) -> Self {
        Self {
            sell: TradeAsset::Native,
            buy: TradeAsset::Erc20 { address: hex_string(&token) },
            amount_in,
            slippage,
            sender,
        }
    }

    pub fn quote_request(&self, chain_id: u64) -> QuoteRequest {
        let sender = hex_string(&self.sender);
        QuoteRequest {
            token_in: self.sell.clone(),
            token_out: self.buy.clone(),
            amount_in: self.amount_in.to_string(),
            slippage: self.slippage,
            recipient: sender.clone(),
            sender,
            chain_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub token_in: TradeAsset,
    pub token_out: TradeAsset,
    /// Base units, decimal.
    pub amount_in: String,
    pub slippage: f64,
    pub sender: String,
    pub recipient: String,
    pub chain_id: u64,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    call: Option<QuoteCall>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteCall {
    pub target: String,
    pub data: String,
    pub value: String,
}

/// A ready-to-sign transaction derived from a quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl QuoteCall {
    pub fn into_swap_call(self) -> Result<SwapCall, TradeError> {
        let to = address_from_hex(&self.target).map_err(|e| TradeError::Quote(format!("call target: {}", e)))?;
        let data: Bytes = self
            .data
            .parse()
            .map_err(|e| TradeError::Quote(format!("call data: {}", e)))?;
        let value = parse_quantity(&self.value).ok_or_else(|| TradeError::Quote(format!("call value: {}", self.value)))?;
        Ok(SwapCall { to, data, value })
    }
}

/// Accepts decimal or `0x` hex quantities.
fn parse_quantity(s: &str) -> Option<U256> {
    let s = s.trim();
    if s.is_empty() {
        return Some(U256::zero());
    }
    match s.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_dec_str(s).ok(),
    }
}

pub fn decode_quote_response(status: StatusCode, body: &str) -> Result<SwapCall, TradeError> {
    if !status.is_success() {
        return Err(TradeError::QuoteStatus {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }
    let parsed: QuoteResponse =
        serde_json::from_str(body).map_err(|e| TradeError::Quote(format!("decode: {}", e)))?;
    match (parsed.success, parsed.call) {
        (Some(false), _) | (_, None) => Err(TradeError::QuoteRejected(
            parsed
                .error
                .or(parsed.message)
                .unwrap_or_else(|| "no swap call returned".to_string()),
        )),
        (_, Some(call)) => call.into_swap_call(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReceipt {
    pub tx_hash: TxHash,
    /// False when the transaction was broadcast but no receipt arrived in time.
    pub confirmed: bool,
}

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("invalid coin address: {0}")]
    InvalidAddress(#[from] AddressError),
    #[error("quote request failed: {0}")]
    QuoteTransport(#[from] reqwest::Error),
    #[error("quote API error: {status} {body}")]
    QuoteStatus { status: u16, body: String },
    #[error("bad quote: {0}")]
    Quote(String),
    #[error("quote rejected: {0}")]
    QuoteRejected(String),
    #[error("insufficient ETH: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("transaction submission failed: {0}")]
    Submit(String),
    #[error("transaction {0:?} reverted")]
    Reverted(TxHash),
    #[error("transaction {0:?} dropped from mempool")]
    Dropped(TxHash),
}

#[async_trait]
pub trait Trader: Send + Sync {
    /// Spends `amount_in` wei of native currency on `coin`.
    async fn buy(&self, coin: &CreatorCoin, amount_in: U256) -> Result<TradeReceipt, TradeError>;
}

/// Head room on top of the node's gas estimate, in percent.
const GAS_LIMIT_MARGIN_PERCENT: u64 = 120;

/// Buys through the Zora quote API and broadcasts with the configured signer.
pub struct ZoraTrader<P = Http>
where
    P: JsonRpcClient,
{
    api: ZoraClient,
    client: Arc<SignerClient<P>>,
    chain_id: u64,
    slippage: f64,
    confirmation_timeout: Duration,
}

impl<P: JsonRpcClient + 'static> ZoraTrader<P> {
    pub fn new(
        api: ZoraClient,
        client: Arc<SignerClient<P>>,
        chain_id: u64,
        slippage: f64,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            api,
            client,
            chain_id,
            slippage,
            confirmation_timeout,
        }
    }

    pub fn sender(&self) -> Address {
        self.client.address()
    }

    async fn quote(&self, params: &TradeParameters) -> Result<SwapCall, TradeError> {
        let (status, body) = self.api.post_quote(&params.quote_request(self.chain_id)).await?;
        decode_quote_response(status, &body)
    }

    /// Fills gas price, gas limit and nonce so signing needs no further RPC
    /// round trips, refusing when the wallet cannot pay value plus gas.
    async fn prepare(&self, call: SwapCall) -> Result<TypedTransaction, TradeError> {
        let sender = self.sender();
        let available = get_native_balance(self.client.as_ref(), sender).await.map_err(rpc_error)?;
        ensure_funds(BalanceCheck::new(available, call.value, U256::zero()))?;

        let gas_price = self.client.get_gas_price().await.map_err(rpc_error)?;
        let mut tx: TypedTransaction = TransactionRequest::new()
            .from(sender)
            .to(call.to)
            .data(call.data)
            .value(call.value)
            .gas_price(gas_price)
            .into();
        let estimate = self.client.estimate_gas(&tx, None).await.map_err(rpc_error)?;
        let gas = estimate * GAS_LIMIT_MARGIN_PERCENT / 100;
        tx.set_gas(gas);
        ensure_funds(validate_buy_balance(available, call.value, gas * gas_price))?;

        let nonce = self
            .client
            .get_transaction_count(sender, None)
            .await
            .map_err(rpc_error)?;
        tx.set_nonce(nonce);
        Ok(tx)
    }
}

fn rpc_error<E: std::fmt::Display>(e: E) -> TradeError {
    TradeError::Rpc(e.to_string())
}

fn ensure_funds(check: BalanceCheck) -> Result<(), TradeError> {
    if check.valid {
        Ok(())
    } else {
        Err(TradeError::InsufficientBalance {
            required: format_ether(check.required()),
            available: format_ether(check.available),
        })
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> Trader for ZoraTrader<P> {
    async fn buy(&self, coin: &CreatorCoin, amount_in: U256) -> Result<TradeReceipt, TradeError> {
        let token = address_from_hex(&coin.address)?;
        let params = TradeParameters::native_for_erc20(token, amount_in, self.slippage, self.sender());
        let call = self.quote(&params).await?;
        info!(
            "Quote ok: {} ETH -> {:?} via {:?} (slippage {})",
            format_ether(amount_in),
            token,
            call.to,
            self.slippage
        );

        let tx = self.prepare(call).await?;
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| TradeError::Submit(e.to_string()))?;
        let tx_hash = *pending;
        info!("Buy tx sent: {:?}", tx_hash);

        // From here on the buy may land, so only a definite revert or drop is an error.
        match tokio::time::timeout(self.confirmation_timeout, pending).await {
            Ok(Ok(Some(receipt))) => {
                if receipt.status == Some(U64::from(1)) {
                    info!("Buy tx confirmed in block {:?}", receipt.block_number);
                    Ok(TradeReceipt { tx_hash, confirmed: true })
                } else {
                    Err(TradeError::Reverted(tx_hash))
                }
            }
            Ok(Ok(None)) => Err(TradeError::Dropped(tx_hash)),
            Ok(Err(e)) => {
                warn!("Receipt lookup failed for {:?}: {}", tx_hash, e);
                Ok(TradeReceipt { tx_hash, confirmed: false })
            }
            Err(_) => {
                warn!("No receipt for {:?} after {:?}", tx_hash, self.confirmation_timeout);
                Ok(TradeReceipt { tx_hash, confirmed: false })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COIN: &str = "0x9b8e4f3a1c2d5e6f708192a3b4c5d6e7f8091a2b";

    #[test]
    fn quote_request_wire_shape() {
        let sender = Address::repeat_byte(0x11);
        let params = TradeParameters::native_for_erc20(
            address_from_hex(COIN).unwrap(),
            U256::exp10(15),
            0.1,
            sender,
        );
        let json = serde_json::to_value(params.quote_request(8453)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tokenIn": { "type": "eth" },
                "tokenOut": { "type": "erc20", "address": COIN },
                "amountIn": "1000000000000000",
                "slippage": 0.1,
                "sender": format!("0x{}", "11".repeat(20)),
                "recipient": format!("0x{}", "11".repeat(20)),
                "chainId": 8453
            })
        );
    }

    #[test]
    fn decodes_swap_call() {
        let body = format!(
            r#"{{"success":true,"call":{{"target":"{}","data":"0xdeadbeef","value":"1000000000000000"}}}}"#,
            COIN
        );
        let call = decode_quote_response(StatusCode::OK, &body).unwrap();
        assert_eq!(call.to, address_from_hex(COIN).unwrap());
        assert_eq!(call.data.to_vec(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(call.value, U256::exp10(15));
    }

    #[test]
    fn hex_value_is_accepted() {
        assert_eq!(parse_quantity("0x38d7ea4c68000"), Some(U256::exp10(15)));
        assert_eq!(parse_quantity(""), Some(U256::zero()));
        assert_eq!(parse_quantity("abc"), None);
    }

    #[test]
    fn rejected_quote_keeps_reason() {
        let err = decode_quote_response(StatusCode::OK, r#"{"success":false,"error":"no liquidity"}"#).unwrap_err();
        assert_eq!(err.to_string(), "quote rejected: no liquidity");
        let err = decode_quote_response(StatusCode::OK, "{}").unwrap_err();
        assert!(matches!(err, TradeError::QuoteRejected(_)));
    }

    #[test]
    fn quote_http_error() {
        let err = decode_quote_response(StatusCode::BAD_REQUEST, "slippage too low").unwrap_err();
        assert!(matches!(err, TradeError::QuoteStatus { status: 400, .. }));
    }
}

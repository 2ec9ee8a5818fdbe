use ethers::types::U256;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::chain::parse_native_amount;

pub const DEFAULT_AUTOBUY_ETH: &str = "0.001";
pub const DEFAULT_SLIPPAGE: f64 = 0.1;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_ZORA_API_URL: &str = "https://api-sdk.zora.engineering";
pub const DEFAULT_EXPLORER_URL: &str = "https://basescan.org";
/// Base mainnet.
pub const DEFAULT_CHAIN_ID: u64 = 8453;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { key, reason: reason.into() }
    }
}

#[derive(Clone)]
pub struct Config {
    pub zora_api_key: String,
    /// Always `0x` followed by 64 hex characters.
    pub private_key: String,
    pub rpc_url: Url,
    pub target_wallet: String,
    /// Spend amount as configured, kept for messages.
    pub autobuy_eth: String,
    /// Spend amount in wei.
    pub autobuy_wei: U256,
    pub slippage: f64,
    pub telegram_bot_token: String,
    /// Destination as configured; see [`crate::telegram::normalize_destination`].
    pub telegram_destination: String,
    pub chain_id: u64,
    pub zora_api_url: Url,
    pub explorer_url: Url,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub exit_on_fault: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("zora_api_key", &"<redacted>")
            .field("private_key", &"<redacted>")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("target_wallet", &self.target_wallet)
            .field("autobuy_eth", &self.autobuy_eth)
            .field("slippage", &self.slippage)
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_destination", &self.telegram_destination)
            .field("chain_id", &self.chain_id)
            .field("zora_api_url", &self.zora_api_url.as_str())
            .field("explorer_url", &self.explorer_url.as_str())
            .field("poll_interval", &self.poll_interval)
            .field("request_timeout", &self.request_timeout)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .field("exit_on_fault", &self.exit_on_fault)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Values are trimmed and
    /// empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let zora_api_key = required("ZORA_API_KEY")?;
        let private_key = normalize_private_key(&required("PRIVATE_KEY")?)?;
        let rpc_url = parse_http_url("BASE_HTTP_RPC", &required("BASE_HTTP_RPC")?)?;
        let target_wallet = required("TARGET_WALLET")?;
        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let telegram_destination = get("TELEGRAM_CHANNEL")
            .or_else(|| get("TELEGRAM_CHAT_ID"))
            .ok_or(ConfigError::Missing("TELEGRAM_CHANNEL or TELEGRAM_CHAT_ID"))?;

        let autobuy_eth = get("AUTOBUY_ETH").unwrap_or_else(|| DEFAULT_AUTOBUY_ETH.to_string());
        let autobuy_wei = parse_native_amount(&autobuy_eth)
            .map_err(|e| ConfigError::invalid("AUTOBUY_ETH", e.to_string()))?;

        let slippage = match get("AUTOBUY_SLIPPAGE") {
            Some(s) => {
                let v: f64 = s
                    .parse()
                    .map_err(|_| ConfigError::invalid("AUTOBUY_SLIPPAGE", format!("not a number: {}", s)))?;
                if !(v > 0.0 && v < 1.0) {
                    return Err(ConfigError::invalid("AUTOBUY_SLIPPAGE", "must be between 0 and 1"));
                }
                v
            }
            None => DEFAULT_SLIPPAGE,
        };

        let chain_id = parse_u64(get("CHAIN_ID"), "CHAIN_ID", DEFAULT_CHAIN_ID)?;
        let poll_interval = parse_secs(get("POLL_INTERVAL_SECS"), "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let request_timeout =
            parse_secs(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let confirmation_timeout = parse_secs(
            get("CONFIRMATION_TIMEOUT_SECS"),
            "CONFIRMATION_TIMEOUT_SECS",
            DEFAULT_CONFIRMATION_TIMEOUT_SECS,
        )?;

        let zora_api_url = parse_http_url(
            "ZORA_API_URL",
            &get("ZORA_API_URL").unwrap_or_else(|| DEFAULT_ZORA_API_URL.to_string()),
        )?;
        let explorer_url = parse_http_url(
            "EXPLORER_URL",
            &get("EXPLORER_URL").unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string()),
        )?;

        let exit_on_fault = match get("EXIT_ON_FAULT").map(|s| s.to_lowercase()).as_deref() {
            None | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(ConfigError::invalid("EXIT_ON_FAULT", format!("expected true or false, got {}", other)))
            }
        };

        Ok(Config {
            zora_api_key,
            private_key,
            rpc_url,
            target_wallet,
            autobuy_eth,
            autobuy_wei,
            slippage,
            telegram_bot_token,
            telegram_destination,
            chain_id,
            zora_api_url,
            explorer_url,
            poll_interval,
            request_timeout,
            confirmation_timeout,
            exit_on_fault,
        })
    }
}

/// Accepts 64 hex characters with or without a `0x` prefix and returns the
/// canonical `0x`-prefixed form.
pub fn normalize_private_key(raw: &str) -> Result<String, ConfigError> {
    let raw = raw.trim();
    let hex_part = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::invalid("PRIVATE_KEY", "expected 0x followed by 64 hex characters"));
    }
    Ok(format!("0x{}", hex_part))
}

fn parse_http_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::invalid(key, format!("unsupported scheme {}", other))),
    }
}

fn parse_u64(raw: Option<String>, key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match raw {
        Some(s) => s
            .parse()
            .map_err(|_| ConfigError::invalid(key, format!("not an unsigned integer: {}", s))),
        None => Ok(default),
    }
}

fn parse_secs(raw: Option<String>, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let secs = parse_u64(raw, key, default)?;
    if secs == 0 {
        return Err(ConfigError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("ZORA_API_KEY", "zora-key".to_string()),
            ("PRIVATE_KEY", KEY.to_string()),
            ("BASE_HTTP_RPC", "https://mainnet.base.org".to_string()),
            ("TARGET_WALLET", "alice.eth".to_string()),
            ("TELEGRAM_BOT_TOKEN", "123:abc".to_string()),
            ("TELEGRAM_CHANNEL", "alerts".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn loads_with_defaults() {
        let cfg = load(&base_env()).unwrap();
        assert_eq!(cfg.private_key, format!("0x{}", KEY));
        assert_eq!(cfg.autobuy_eth, "0.001");
        assert_eq!(cfg.autobuy_wei, U256::from(1_000_000_000_000_000u64));
        assert_eq!(cfg.slippage, DEFAULT_SLIPPAGE);
        assert_eq!(cfg.chain_id, 8453);
        assert_eq!(cfg.poll_interval, Duration::from_secs(60));
        assert_eq!(cfg.zora_api_url.as_str(), "https://api-sdk.zora.engineering/");
        assert!(!cfg.exit_on_fault);
    }

    #[test]
    fn every_required_key_is_enforced() {
        for key in ["ZORA_API_KEY", "PRIVATE_KEY", "BASE_HTTP_RPC", "TARGET_WALLET", "TELEGRAM_BOT_TOKEN"] {
            let mut env = base_env();
            env.remove(key);
            assert_eq!(load(&env).unwrap_err(), ConfigError::Missing(key));
        }
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut env = base_env();
        env.insert("TARGET_WALLET", "   ".to_string());
        assert_eq!(load(&env).unwrap_err(), ConfigError::Missing("TARGET_WALLET"));
    }

    #[test]
    fn telegram_destination_falls_back_to_chat_id() {
        let mut env = base_env();
        env.remove("TELEGRAM_CHANNEL");
        assert_eq!(
            load(&env).unwrap_err(),
            ConfigError::Missing("TELEGRAM_CHANNEL or TELEGRAM_CHAT_ID")
        );
        env.insert("TELEGRAM_CHAT_ID", "-1001234".to_string());
        assert_eq!(load(&env).unwrap().telegram_destination, "-1001234");
    }

    #[test]
    fn private_key_normalization() {
        assert_eq!(normalize_private_key(KEY).unwrap(), format!("0x{}", KEY));
        assert_eq!(normalize_private_key(&format!("0x{}", KEY)).unwrap(), format!("0x{}", KEY));
        assert!(normalize_private_key(&KEY[..63]).is_err());
        assert!(normalize_private_key(&format!("{}zz", &KEY[..62])).is_err());
        assert!(normalize_private_key(&format!("0x{}00", KEY)).is_err());
    }

    #[test]
    fn rejects_malformed_optionals() {
        let cases = [
            ("AUTOBUY_ETH", "abc"),
            ("AUTOBUY_ETH", "-1"),
            ("AUTOBUY_SLIPPAGE", "1.5"),
            ("POLL_INTERVAL_SECS", "0"),
            ("BASE_HTTP_RPC", "not a url"),
            ("EXIT_ON_FAULT", "maybe"),
        ];
        for (key, value) in cases {
            let mut env = base_env();
            env.insert(key, value.to_string());
            match load(&env) {
                Err(ConfigError::Invalid { key: k, .. }) => assert_eq!(k, key),
                other => panic!("{}={} should be invalid, got {:?}", key, value, other),
            }
        }
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = load(&base_env()).unwrap();
        let out = format!("{:?}", cfg);
        assert!(!out.contains(KEY));
        assert!(!out.contains("zora-key"));
        assert!(!out.contains("123:abc"));
    }

    #[test]
    fn reads_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let mut contents = String::new();
        for (k, v) in base_env() {
            contents.push_str(&format!("{}={}\n", k, v));
        }
        contents.push_str("AUTOBUY_ETH=0.25\n");
        std::fs::write(&path, contents).unwrap();

        let vars: HashMap<String, String> = dotenvy::from_path_iter(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let cfg = Config::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(cfg.autobuy_eth, "0.25");
        assert_eq!(cfg.target_wallet, "alice.eth");
    }
}

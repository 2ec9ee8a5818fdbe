use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::ZoraClient;

/// Placeholder for display-only coin fields the API leaves out.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub creator_coin: Option<CreatorCoin>,
}

impl Profile {
    /// Display name, else handle. Empty strings are skipped.
    pub fn label(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.handle.as_deref().filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorCoin {
    pub address: String,
    #[serde(default = "unknown", deserialize_with = "display_field")]
    pub symbol: String,
    #[serde(default = "unknown", deserialize_with = "display_field")]
    pub name: String,
    #[serde(default = "unknown", deserialize_with = "display_field")]
    pub market_cap: String,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Strings pass through, numbers are rendered, anything else is [`UNKNOWN`].
fn display_field<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => unknown(),
    })
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    profile: Option<Profile>,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Zora API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Zora API error: {status} {body}")]
    Status { status: u16, body: String },
    #[error("unexpected Zora profile response: {0}")]
    Decode(#[source] serde_json::Error),
}

#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// `Ok(None)` when the identity has no profile.
    async fn get_profile(&self, identifier: &str) -> Result<Option<Profile>, ProfileError>;
}

#[async_trait]
impl ProfileSource for ZoraClient {
    async fn get_profile(&self, identifier: &str) -> Result<Option<Profile>, ProfileError> {
        let (status, body) = self.fetch_profile(identifier).await?;
        debug!("Profile lookup for {}: {}", identifier, status);
        decode_profile_response(status, &body)
    }
}

pub fn decode_profile_response(status: StatusCode, body: &str) -> Result<Option<Profile>, ProfileError> {
    if !status.is_success() {
        return Err(ProfileError::Status {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }
    let parsed: ProfileResponse = serde_json::from_str(body).map_err(ProfileError::Decode)?;
    Ok(parsed.profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_profile_with_coin() {
        let body = r#"{"profile":{"handle":"alice","creatorCoin":{"address":"0xCoin","symbol":"ALC","name":"Alice Coin","marketCap":"1000"}}}"#;
        let profile = decode_profile_response(StatusCode::OK, body).unwrap().unwrap();
        assert_eq!(profile.label(), Some("alice"));
        let coin = profile.creator_coin.unwrap();
        assert_eq!(coin.address, "0xCoin");
        assert_eq!(coin.symbol, "ALC");
        assert_eq!(coin.name, "Alice Coin");
        assert_eq!(coin.market_cap, "1000");
    }

    #[test]
    fn missing_display_fields_use_placeholder() {
        let body = r#"{"profile":{"displayName":"Alice","creatorCoin":{"address":"0xCoin","symbol":null,"marketCap":1234.5}}}"#;
        let coin = decode_profile_response(StatusCode::OK, body)
            .unwrap()
            .unwrap()
            .creator_coin
            .unwrap();
        assert_eq!(coin.symbol, UNKNOWN);
        assert_eq!(coin.name, UNKNOWN);
        assert_eq!(coin.market_cap, "1234.5");
    }

    #[test]
    fn absent_profile_is_none() {
        assert_eq!(decode_profile_response(StatusCode::OK, "{}").unwrap(), None);
        assert_eq!(decode_profile_response(StatusCode::OK, r#"{"profile":null}"#).unwrap(), None);
    }

    #[test]
    fn profile_without_coin() {
        let profile = decode_profile_response(StatusCode::OK, r#"{"profile":{"handle":"bob","creatorCoin":null}}"#)
            .unwrap()
            .unwrap();
        assert!(profile.creator_coin.is_none());
    }

    #[test]
    fn non_success_status_carries_body() {
        let err = decode_profile_response(StatusCode::UNAUTHORIZED, "bad key").unwrap_err();
        assert!(matches!(err, ProfileError::Status { status: 401, .. }));
        assert_eq!(err.to_string(), "Zora API error: 401 bad key");
    }

    #[test]
    fn malformed_shape_is_decode_error() {
        let err = decode_profile_response(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, ProfileError::Decode(_)));
        let err = decode_profile_response(StatusCode::OK, r#"{"profile":{"creatorCoin":{"symbol":"X"}}}"#).unwrap_err();
        assert!(matches!(err, ProfileError::Decode(_)));
    }

    #[test]
    fn label_skips_empty_display_name() {
        let profile = Profile {
            display_name: Some(String::new()),
            handle: Some("alice".into()),
            creator_coin: None,
        };
        assert_eq!(profile.label(), Some("alice"));
    }
}

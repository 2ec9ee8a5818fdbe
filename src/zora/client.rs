use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Transport for the Zora SDK API. Decoding lives with the callers in
/// [`super::profile`] and [`super::trade`].
#[derive(Clone)]
pub struct ZoraClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ZoraClient {
    pub fn new(base_url: Url, api_key: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req.header("accept", "application/json");
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }

    /// `GET /profile?identifier=...`, returning status and raw body.
    pub async fn fetch_profile(&self, identifier: &str) -> Result<(StatusCode, String), reqwest::Error> {
        let req = self
            .http
            .get(self.endpoint("profile"))
            .query(&[("identifier", identifier)]);
        let res = self.authorized(req).send().await?;
        let status = res.status();
        let body = res.text().await?;
        Ok((status, body))
    }

    /// `POST /quote` with a JSON body, returning status and raw body.
    pub async fn post_quote<B: Serialize + ?Sized>(&self, body: &B) -> Result<(StatusCode, String), reqwest::Error> {
        let req = self.http.post(self.endpoint("quote")).json(body);
        let res = self.authorized(req).send().await?;
        let status = res.status();
        let body = res.text().await?;
        Ok((status, body))
    }
}

//! REST backend client.
//!
//! Blocking `reqwest` client with a request timeout; one GET per call, no
//! retries. Path segments are percent-encoded by `Url`, so run ids with
//! reserved characters are safe.

use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{BacktestApi, FetchError};
use crate::domain::{MetricSet, PortfolioFinal, RawSignal, RawTrade, Run, RunId};

pub struct HttpApi {
    client: reqwest::blocking::Client,
    base: Url,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base =
            Url::parse(base_url).map_err(|_| FetchError::InvalidBaseUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(FetchError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `base` joined with `segments`, keeping any path prefix on the base.
    pub fn endpoint_url(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, endpoint: &str, segments: &[&str]) -> Result<T, FetchError> {
        let url = self.endpoint_url(segments)?;
        debug!(url = %url, "GET");

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().map_err(|e| FetchError::Network(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

impl BacktestApi for HttpApi {
    fn name(&self) -> &str {
        "http"
    }

    fn runs(&self) -> Result<Vec<Run>, FetchError> {
        self.get_json("runs", &["runs"])
    }

    fn signals(&self, run_id: &RunId) -> Result<Vec<RawSignal>, FetchError> {
        self.get_json("signals", &["signals", run_id.as_str()])
    }

    fn trades(&self, run_id: &RunId) -> Result<Vec<RawTrade>, FetchError> {
        self.get_json("trades", &["trades", run_id.as_str()])
    }

    fn metrics(&self, run_id: &RunId) -> Result<MetricSet, FetchError> {
        self.get_json("metrics", &["metrics", run_id.as_str()])
    }

    fn portfolio_final(&self, run_id: &RunId) -> Result<PortfolioFinal, FetchError> {
        self.get_json("portfolio_final", &["portfolio_final", run_id.as_str()])
    }
}

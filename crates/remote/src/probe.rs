use std::{future::Future, time::Duration};

use engine::ConnectivitySignal;
use reqwest::Url;

use crate::{ClientError, build_http, parse_base_url};

/// Connectivity probe: the backend counts as reachable while
/// `GET {base}/health` answers with a success status.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: Url,
    http: reqwest::Client,
}

impl HttpProbe {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let url = parse_base_url(base_url)?
            .join("health")
            .map_err(|err| ClientError::InvalidBaseUrl(err.to_string()))?;
        Ok(Self {
            url,
            http: build_http(None, timeout)?,
        })
    }

    pub async fn check(&self) -> bool {
        match self.http.get(self.url.clone()).send().await {
            Ok(res) => res.status().is_success(),
            Err(err) => {
                tracing::debug!("health check failed: {err}");
                false
            }
        }
    }

    /// Probe every `interval` and publish the result to `signal` until
    /// `shutdown` completes.
    pub async fn run<F>(&self, signal: &ConnectivitySignal, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => signal.set_online(self.check().await),
            }
        }
    }
}

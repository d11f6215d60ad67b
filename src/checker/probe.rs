//! HTTP probe issuing.

use std::time::Duration;

/// Error type for a single probe.
///
/// A response with any status code is not an error at this level; errors
/// mean the exchange itself broke down.
#[derive(Debug)]
pub enum ProbeError {
    /// No status line arrived: DNS, connect, TLS or timeout failure.
    Transport(reqwest::Error),
    /// Status line arrived but the body could not be drained.
    BodyRead { status: u16, source: reqwest::Error },
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Transport(e) => write!(f, "request failed: {}", e),
            ProbeError::BodyRead { status, source } => {
                write!(f, "body discard error after status {}: {}", status, source)
            }
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Transport(e) => Some(e),
            ProbeError::BodyRead { source, .. } => Some(source),
        }
    }
}

/// HTTP client for target probes.
///
/// Wraps one `reqwest::Client` sized to the sweep: the connection pool is
/// bounded to the worker count and every request carries the per-probe
/// timeout. The handle is cheap to clone and safe to share across workers.
#[derive(Clone)]
pub struct ProbeClient {
    client: reqwest::Client,
}

impl ProbeClient {
    /// Build a client for `concurrency` parallel probes with the given
    /// per-request timeout.
    pub fn new(concurrency: usize, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(concurrency)
            .build()?;
        Ok(Self { client })
    }

    /// GET one URL and report the final status code, following redirects.
    ///
    /// The body is always drained before returning so the connection goes
    /// back to the pool instead of being torn down.
    pub async fn probe(&self, url: &str) -> Result<u16, ProbeError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ProbeError::Transport)?;
        let status = resp.status().as_u16();
        if let Err(source) = resp.bytes().await {
            return Err(ProbeError::BodyRead { status, source });
        }
        Ok(status)
    }
}

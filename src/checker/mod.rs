//! Target URL validation.
//!
//! `UrlChecker` probes a batch of URLs with a bounded pool of workers and
//! reports how many were processed and how many failed. A URL counts as
//! failed when the request itself broke down (DNS, connect, timeout, body
//! read) or when it answered with a status other than 200. The sweep is
//! best-effort: failures are logged per URL and summed, never raised.

mod probe;

pub use probe::{ProbeClient, ProbeError};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::warn;

/// Workers spun up when none are requested.
pub const DEFAULT_WORKERS: usize = 12;

/// Per-probe timeout when none is requested.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// Counts for one completed sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// URLs probed to completion, successful or not.
    pub processed: usize,
    /// Probes that broke down or answered non-200.
    pub failed: usize,
}

/// One probe outcome travelling from a worker to the aggregator.
struct Outcome {
    url: String,
    result: Result<u16, ProbeError>,
}

/// Bounded-concurrency URL checker.
pub struct UrlChecker {
    client: ProbeClient,
    workers: usize,
    timeout: Duration,
}

impl UrlChecker {
    /// Create a checker with the given worker count and per-probe timeout.
    /// Zero selects the default for either value.
    pub fn new(workers: usize, timeout: Duration) -> Result<Self, reqwest::Error> {
        let workers = if workers == 0 { DEFAULT_WORKERS } else { workers };
        let timeout = if timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            timeout
        };
        let client = ProbeClient::new(workers, timeout)?;
        Ok(Self {
            client,
            workers,
            timeout,
        })
    }

    /// Number of workers a sweep will use.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Per-probe timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe every URL in the batch and wait for the full summary.
    ///
    /// Workers are spawned per call and wind down on their own once the
    /// batch is drained; duplicates are probed once per occurrence. An
    /// empty batch completes immediately without spawning anything.
    pub async fn run(&self, urls: &[String]) -> Summary {
        let total = urls.len();
        if total == 0 {
            return Summary::default();
        }

        // Work queue sized to the batch so dispatch below never waits on
        // a slow worker; results sized the same so workers never block on
        // a busy aggregator.
        let (work_tx, work_rx) = mpsc::channel::<String>(total);
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<Outcome>(total);

        for _ in 0..self.workers {
            let client = self.client.clone();
            let rx = Arc::clone(&work_rx);
            let tx = result_tx.clone();
            tokio::spawn(async move {
                loop {
                    let url = {
                        let mut guard = rx.lock().await;
                        guard.recv().await
                    };
                    match url {
                        Some(url) => {
                            let result = client.probe(&url).await;
                            if tx.send(Outcome { url, result }).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            });
        }
        drop(result_tx);

        for url in urls {
            if work_tx.send(url.clone()).await.is_err() {
                break;
            }
        }
        drop(work_tx);

        let mut summary = Summary::default();
        while let Some(Outcome { url, result }) = result_rx.recv().await {
            summary.processed += 1;
            match result {
                Ok(200) => {}
                Ok(status) => {
                    summary.failed += 1;
                    warn!(url = %url, status, "target answered non-200");
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!(url = %url, error = %err, "target probe failed");
                }
            }
            if summary.processed == total {
                break;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values_select_defaults() {
        let checker = UrlChecker::new(0, Duration::ZERO).unwrap();
        assert_eq!(checker.workers(), DEFAULT_WORKERS);
        assert_eq!(checker.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_explicit_values_kept() {
        let checker = UrlChecker::new(3, Duration::from_secs(1)).unwrap();
        assert_eq!(checker.workers(), 3);
        assert_eq!(checker.timeout(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_empty_batch_returns_immediately() {
        let checker = UrlChecker::new(2, Duration::from_secs(2)).unwrap();
        let summary = checker.run(&[]).await;
        assert_eq!(summary, Summary::default());
    }
}

//! Preflight check that the application under test answers at all

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Bounds for the reachability poll
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Total time to keep polling
    pub timeout: Duration,

    /// Timeout of each individual request
    pub request_timeout: Duration,

    /// Pause between attempts
    pub interval: Duration,

    /// Accept invalid TLS certificates (QA hosts often use self-signed ones)
    pub ignore_https_errors: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(5),
            interval: Duration::from_millis(500),
            ignore_https_errors: true,
        }
    }
}

/// Poll `base_url` until it answers with anything other than a server error
///
/// Client errors count as reachable: a sign-in redirect or a 404 on `/` still
/// proves the host is serving.
pub async fn wait_until_reachable(base_url: &str, config: &ProbeConfig) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .danger_accept_invalid_certs(config.ignore_https_errors)
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    while start.elapsed() < config.timeout {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                info!("Target {} is reachable ({})", base_url, resp.status());
                return Ok(());
            }
            Ok(resp) => {
                warn!("Target returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to answer...", base_url);
                }
                // Connection refused is expected while the host comes up
                if !e.is_connect() {
                    warn!("Reachability check error: {}", e);
                }
            }
        }

        sleep(config.interval).await;
    }

    Err(E2eError::TargetUnreachable(attempts))
}

//! HTTP pre-flight check for the target site

use std::time::Duration;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};
use crate::wait::RetryPolicy;

/// HTTP client for the pre-flight check
pub fn probe_client(request_timeout: Duration) -> E2eResult<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(request_timeout).build()?)
}

/// Check that `url` answers with a non-server-error status.
///
/// Connection failures and 5xx responses count as unreachable. A 4xx still
/// means something is serving the page, which is enough for a browser run.
pub async fn probe_site(client: &reqwest::Client, url: &str, policy: RetryPolicy) -> E2eResult<()> {
    policy
        .run(|attempt| async move {
            let resp = client.get(url).send().await?;
            let status = resp.status();
            if status.is_server_error() {
                warn!("Pre-flight attempt {} got {}", attempt, status);
                return Err(E2eError::ServerError {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            Ok::<_, E2eError>(status)
        })
        .await
        .map(|status| info!("Pre-flight {} -> {}", url, status))
        .map_err(|e| E2eError::SiteUnreachable {
            attempts: e.attempts,
            last: e.last.to_string(),
        })
}

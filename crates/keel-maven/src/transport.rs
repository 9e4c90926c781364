//! Uploading files to HTTP repositories.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use keel_util::errors::KeelError;

use crate::auth::{self, Credentials};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the shared client used for uploads.
pub fn build_client() -> miette::Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("keel/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            KeelError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// PUT `body` to `url`, retrying server errors and dropped connections.
///
/// Client errors (401, 403, 409 ...) fail immediately with the status.
pub async fn put_bytes(
    client: &Client,
    url: &str,
    body: Vec<u8>,
    credentials: Option<&Credentials>,
) -> Result<(), String> {
    let mut last_err = String::new();

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_DELAY * attempt).await;
        }

        let req = auth::apply_auth(client.put(url).body(body.clone()), credentials);
        match req.send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(());
                }
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    last_err = format!("HTTP {status} from {url}");
                    tracing::debug!("attempt {} failed: {last_err}", attempt + 1);
                    continue;
                }
                return Err(format!("HTTP {status} uploading {url}"));
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_err = e.to_string();
                continue;
            }
            Err(e) => return Err(format!("request to {url} failed: {e}")),
        }
    }

    Err(format!("gave up after {MAX_RETRIES} attempts for {url}: {last_err}"))
}

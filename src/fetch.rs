use std::time::Duration;

use thiserror::Error;
use tracing::info;

/// IGP page listing recently reported seismic events.
pub const SOURCE_URL: &str = "https://ultimosismo.igp.gob.pe/ultimo-sismo/sismos-reportados";

// The source rejects obviously non-browser clients, so identify as one.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
}

/// Single GET of the source page. No retries, no caching; any network
/// error, timeout, or non-2xx status aborts the run.
pub async fn fetch_page(url: &str) -> Result<String, FetchError> {
    let client = reqwest::Client::builder()
        .timeout(TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?;

    info!("Fetching source page: {}", url);
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let body = response.text().await?;
    info!("Fetched {} bytes", body.len());
    Ok(body)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_url_fails_without_touching_network() {
        let err = fetch_page("http://invalid url with spaces/").await.unwrap_err();
        assert!(matches!(err, FetchError::Request(_)));
    }

    #[test]
    fn status_error_names_the_code() {
        let err = FetchError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "unexpected status 503 Service Unavailable");
    }
}

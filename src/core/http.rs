use std::time::Duration;

use reqwest::{
    blocking::{
        Client,
        Response,
    },
    header::{
        ACCEPT,
        USER_AGENT,
    },
};

use crate::core::{
    LookupError,
    TuneDeckError,
};

/// Per-request timeout for every lookup call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const CLIENT_USER_AGENT: &str = concat!("tunedeck/", env!("CARGO_PKG_VERSION"), " (+reqwest)");

pub fn http_client() -> Result<Client, TuneDeckError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| TuneDeckError::Custom(format!("HTTP client build failed: {e}")))
}

/// Single GET, no retries. Non-2xx statuses are network errors.
pub fn get_text(client: &Client, url: &str) -> Result<String, LookupError> {
    let resp = client
        .get(url)
        .header(USER_AGENT, CLIENT_USER_AGENT)
        .header(ACCEPT, "text/html")
        .send()
        .map_err(|e| LookupError::Network(format!("Failed HTTP GET {}: {}", url, e)))?;

    ensure_success(&resp)?;

    resp.text().map_err(|e| LookupError::Network(format!("Failed to read body of {}: {}", url, e)))
}

fn ensure_success(resp: &Response) -> Result<(), LookupError> {
    if !resp.status().is_success() {
        return Err(LookupError::Network(format!(
            "HTTP error {} from {}",
            resp.status(),
            resp.url()
        )));
    }
    Ok(())
}

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;

/// Default `User-Agent`; the catalog asks clients to identify themselves.
pub const APP_USER_AGENT: &str = concat!("modsync/", env!("CARGO_PKG_VERSION"));

/// Shared client for catalog calls and downloads.
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Client::builder()
        .user_agent(user_agent)
        .default_headers(default_headers)
        .build()
}

use crate::app::ports::{HttpClientPort, HttpGetResult};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::time::Duration;

pub struct ReqwestHttp {
    client: Client,
}

impl ReqwestHttp {
    /// `None` leaves the client without a timeout.
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        // reqwest::blocking defaults to 30s; None disables it
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl HttpClientPort for ReqwestHttp {
    // Errors are stripped of the URL: the query string carries the API key.
    fn get(&self, url: &Url) -> Result<HttpGetResult, String> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| e.without_url().to_string())?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = resp
            .bytes()
            .map_err(|e| e.without_url().to_string())?
            .to_vec();
        Ok(HttpGetResult {
            status,
            bytes,
            content_type,
        })
    }
}

use reqwest::Url;

/// Outbound HTTP seam. Calls are blocking; the pipeline makes them one at a time.
pub trait HttpClientPort {
    fn get(&self, url: &Url) -> Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

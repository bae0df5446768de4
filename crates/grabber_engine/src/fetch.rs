use std::time::Duration;

use bytes::Bytes;
use engine_logging::engine_debug;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use crate::decode::{decode_html, DecodedHtml};
use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Timeout for listing, item and download pages.
    pub page_timeout: Duration,
    /// Longest a binary download may go without receiving data. Payloads
    /// are large, so there is no deadline on the whole transfer.
    pub download_timeout: Duration,
    pub redirect_limit: usize,
    pub max_page_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub accept_invalid_certs: bool,
    /// Sent with every request.
    pub page_headers: Vec<(String, String)>,
    /// Added on top of `page_headers` for binary downloads.
    pub download_headers: Vec<(String, String)>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            page_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(120),
            redirect_limit: 5,
            max_page_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
            accept_invalid_certs: false,
            page_headers: header_pairs(&[
                ("User-Agent", BROWSER_USER_AGENT),
                (
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
                ),
                ("Accept-Language", "zh-TW,zh;q=0.9,en;q=0.8"),
                ("Upgrade-Insecure-Requests", "1"),
            ]),
            download_headers: header_pairs(&[
                (
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
                ),
                ("DNT", "1"),
                ("Sec-Fetch-Dest", "document"),
                ("Sec-Fetch-Mode", "navigate"),
                ("Sec-Fetch-Site", "none"),
                ("Cache-Control", "max-age=0"),
            ]),
        }
    }
}

fn header_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// An open download: the declared length and the body as a chunk stream.
pub struct DownloadBody {
    pub content_length: Option<u64>,
    pub chunks: BoxStream<'static, Result<Bytes, FetchError>>,
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a whole HTML page into memory.
    async fn fetch_page(&self, url: &str) -> Result<FetchOutput, FetchError>;

    /// Start a streamed binary download. Non-success statuses are errors.
    async fn open_download(&self, url: &str) -> Result<DownloadBody, FetchError>;

    /// Fetch a page and decode it to UTF-8.
    async fn fetch_html(&self, url: &str) -> Result<(DecodedHtml, FetchMetadata), FetchError> {
        let output = self.fetch_page(url).await?;
        let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref());
        Ok((decoded, output.metadata))
    }
}

/// `reqwest`-backed fetcher. One client is shared by every request so
/// connections are reused across workers.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
    download_headers: HeaderMap,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let page_headers = build_header_map(&settings.page_headers)?;
        let download_headers = build_header_map(&settings.download_headers)?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .default_headers(page_headers)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|err| FetchError::new(FailureKind::InvalidConfig, err.to_string()))?;

        Ok(Self {
            settings,
            client,
            download_headers,
        })
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }
}

fn build_header_map(pairs: &[(String, String)]) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
            FetchError::new(FailureKind::InvalidConfig, format!("header {name}: {err}"))
        })?;
        let value = HeaderValue::from_str(value).map_err(|err| {
            FetchError::new(FailureKind::InvalidConfig, format!("header {name}: {err}"))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn parse_url(url: &str) -> Result<reqwest::Url, FetchError> {
    reqwest::Url::parse(url).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch_page(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let parsed = parse_url(url)?;
        let response = self
            .client
            .get(parsed)
            .timeout(self.settings.page_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_page_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        engine_debug!("Fetched page {} ({} bytes)", final_url, bytes.len());

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            content_type,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchOutput { bytes, metadata })
    }

    async fn open_download(&self, url: &str) -> Result<DownloadBody, FetchError> {
        let parsed = parse_url(url)?;
        let stall = self.settings.download_timeout;
        let request = self
            .client
            .get(parsed)
            .headers(self.download_headers.clone())
            .send();
        let response = tokio::time::timeout(stall, request)
            .await
            .map_err(|_| stalled(stall))?
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_length = response.content_length().filter(|len| *len > 0);
        Ok(DownloadBody {
            content_length,
            chunks: stall_guarded(response, stall),
        })
    }
}

/// Body chunks of `response`, failing with a timeout when a single read
/// waits longer than `stall`. The stream ends after the first error.
fn stall_guarded(
    response: reqwest::Response,
    stall: Duration,
) -> BoxStream<'static, Result<Bytes, FetchError>> {
    futures_util::stream::unfold(Some(response), move |response| async move {
        let Some(mut response) = response else {
            return None;
        };
        match tokio::time::timeout(stall, response.chunk()).await {
            Ok(Ok(Some(chunk))) => Some((Ok(chunk), Some(response))),
            Ok(Ok(None)) => None,
            Ok(Err(err)) => Some((Err(map_reqwest_error(err)), None)),
            Err(_) => Some((Err(stalled(stall)), None)),
        }
    })
    .boxed()
}

fn stalled(stall: Duration) -> FetchError {
    FetchError::new(
        FailureKind::Timeout,
        format!("no data received for {:.1}s", stall.as_secs_f32()),
    )
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

static PATH_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"page-\d+").unwrap_or_else(|err| panic!("invalid page token pattern: {err}"))
});
static QUERY_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([?&])page=\d+").unwrap_or_else(|err| panic!("invalid page query pattern: {err}"))
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("invalid listing url {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("start page {start} is after end page {end}")]
    InvertedRange { start: u32, end: u32 },
}

/// A paginated listing to scan. Fields are fixed once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingDescriptor {
    base_url: String,
    start_page: u32,
    end_page: u32,
}

impl ListingDescriptor {
    pub fn new(
        base_url: impl Into<String>,
        start_page: u32,
        end_page: u32,
    ) -> Result<Self, ListingError> {
        let base_url = base_url.into().trim().to_string();
        Url::parse(&base_url).map_err(|err| ListingError::InvalidUrl {
            url: base_url.clone(),
            message: err.to_string(),
        })?;
        if start_page > end_page {
            return Err(ListingError::InvertedRange {
                start: start_page,
                end: end_page,
            });
        }
        Ok(Self {
            base_url,
            start_page,
            end_page,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    pub fn end_page(&self) -> u32 {
        self.end_page
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.start_page..=self.end_page
    }

    pub fn page_count(&self) -> usize {
        (self.end_page - self.start_page) as usize + 1
    }

    pub fn page_url(&self, page: u32) -> String {
        page_url(&self.base_url, page)
    }
}

/// Build the URL of one listing page.
///
/// An existing `page-N` path token wins over a `page=N` query parameter; with
/// neither present a `page` parameter is appended.
pub fn page_url(template: &str, page: u32) -> String {
    if PATH_TOKEN.is_match(template) {
        return PATH_TOKEN
            .replace(template, format!("page-{page}").as_str())
            .into_owned();
    }
    if QUERY_TOKEN.is_match(template) {
        return QUERY_TOKEN
            .replace(template, format!("${{1}}page={page}").as_str())
            .into_owned();
    }
    let separator = if template.contains('?') { '&' } else { '?' };
    format!("{template}{separator}page={page}")
}

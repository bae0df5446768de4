use std::sync::Arc;

use engine_logging::{engine_debug, engine_warn};
use grabber_core::{EventSink, Resolution, SelectorProfile, SelectorStrategy};

use crate::filename::{fallback_title, sanitize_title};
use crate::parse::{first_links, first_text, PageParser};
use crate::{Fetcher, Hop, ResolveError};

/// A fetched item page, kept so the download-link hop can reuse it.
#[derive(Debug, Clone)]
pub struct ItemPage {
    url: String,
    content: Option<PageContent>,
}

#[derive(Debug, Clone)]
struct PageContent {
    html: String,
    /// Post-redirect URL; relative links resolve against it.
    base_url: String,
}

impl ItemPage {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_fetched(&self) -> bool {
        self.content.is_some()
    }
}

/// Chases listing → item → download page → binary links.
pub struct LinkResolver {
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn PageParser>,
    profile: Arc<SelectorProfile>,
    sink: Arc<dyn EventSink>,
}

impl LinkResolver {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn PageParser>,
        profile: Arc<SelectorProfile>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            fetcher,
            parser,
            profile,
            sink,
        }
    }

    /// Item links on one listing page. A page no strategy matches yields an
    /// empty list; only fetch failures are errors.
    pub async fn listing_links(&self, page_url: &str) -> Result<Vec<String>, ResolveError> {
        let content = self.fetch(page_url).await?;
        let found = first_links(
            self.parser.as_ref(),
            &content.html,
            &content.base_url,
            &self.profile.listing_links,
        );
        Ok(match found {
            Some((strategy, links)) => {
                engine_debug!("{} item links on {} via {}", links.len(), page_url, strategy);
                links
            }
            None => Vec::new(),
        })
    }

    /// Hop 1: fetch the item page. Failure is reported and remembered; the
    /// title then falls back to the URL and hop 2 refetches.
    pub async fn open_item(&self, item_url: &str) -> ItemPage {
        let content = match self.fetch(item_url).await {
            Ok(content) => Some(content),
            Err(err) => {
                self.report_failure(Hop::ItemPage, item_url, &err);
                None
            }
        };
        ItemPage {
            url: item_url.to_string(),
            content,
        }
    }

    pub fn title(&self, page: &ItemPage) -> String {
        page.content
            .as_ref()
            .and_then(|content| first_text(self.parser.as_ref(), &content.html, &self.profile.title))
            .map(|raw| sanitize_title(&raw))
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| fallback_title(&page.url))
    }

    /// Hops 2 and 3: the intermediate download page, then the binary link on it.
    pub async fn final_url(&self, page: &ItemPage) -> Option<String> {
        let refetched;
        let content = match &page.content {
            Some(content) => content,
            None => match self.fetch(&page.url).await {
                Ok(content) => {
                    refetched = content;
                    &refetched
                }
                Err(err) => {
                    self.report_failure(Hop::DownloadPage, &page.url, &err);
                    return None;
                }
            },
        };

        let Some(download_page) = self.first_link(content, &self.profile.download_link) else {
            self.report_failure(
                Hop::DownloadPage,
                &page.url,
                &ResolveError::NoMatch {
                    task: "download page link",
                },
            );
            return None;
        };

        let download_content = match self.fetch(&download_page).await {
            Ok(content) => content,
            Err(err) => {
                self.report_failure(Hop::FinalLink, &page.url, &err);
                return None;
            }
        };
        let final_url = self.first_link(&download_content, &self.profile.final_link);
        if final_url.is_none() {
            self.report_failure(
                Hop::FinalLink,
                &page.url,
                &ResolveError::NoMatch {
                    task: "final download link",
                },
            );
        }
        final_url
    }

    pub async fn resolve(&self, item_url: &str) -> Resolution {
        let page = self.open_item(item_url).await;
        let title = self.title(&page);
        let final_url = self.final_url(&page).await;
        Resolution { title, final_url }
    }

    async fn fetch(&self, url: &str) -> Result<PageContent, ResolveError> {
        let (decoded, metadata) = self.fetcher.fetch_html(url).await?;
        if decoded.lossy {
            engine_debug!("Page {} decoded lossily as {}", url, decoded.encoding_label);
        }
        Ok(PageContent {
            html: decoded.html,
            base_url: metadata.final_url,
        })
    }

    fn first_link(
        &self,
        content: &PageContent,
        strategies: &[SelectorStrategy],
    ) -> Option<String> {
        let (strategy, links) =
            first_links(self.parser.as_ref(), &content.html, &content.base_url, strategies)?;
        engine_debug!("Link on {} matched via {}", content.base_url, strategy);
        links.into_iter().next()
    }

    fn report_failure(&self, hop: Hop, item_url: &str, err: &ResolveError) {
        engine_warn!("{} failed for {}: {}", hop, item_url, err);
        self.sink.log(format!("{hop} failed for {item_url}: {err}"));
    }
}

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use grabber_core::{BatchState, EventSink, ItemRef, ListingDescriptor};

use crate::pace::Pacer;
use crate::resolver::LinkResolver;

/// Walks the listing pages and collects unique item links.
pub struct PaginationDriver {
    resolver: Arc<LinkResolver>,
    pacer: Arc<dyn Pacer>,
    sink: Arc<dyn EventSink>,
    page_delay: Duration,
}

impl PaginationDriver {
    pub fn new(
        resolver: Arc<LinkResolver>,
        pacer: Arc<dyn Pacer>,
        sink: Arc<dyn EventSink>,
        page_delay: Duration,
    ) -> Self {
        Self {
            resolver,
            pacer,
            sink,
            page_delay,
        }
    }

    /// Items in discovery order, each URL at most once per job.
    ///
    /// A page that fails to load counts as empty. Cancellation is checked
    /// before every page and returns what was found so far.
    pub async fn discover(&self, listing: &ListingDescriptor, state: &BatchState) -> Vec<ItemRef> {
        let mut items: Vec<ItemRef> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (index, page) in listing.pages().enumerate() {
            if state.is_cancelled() {
                engine_info!("Discovery cancelled before page {}", page);
                break;
            }
            if index > 0 {
                self.pacer.pause(self.page_delay).await;
                if state.is_cancelled() {
                    engine_info!("Discovery cancelled before page {}", page);
                    break;
                }
            }

            let page_url = listing.page_url(page);
            self.sink.log(format!("Analysing page: {page_url}"));
            match self.resolver.listing_links(&page_url).await {
                Ok(links) => {
                    let before = items.len();
                    for link in links {
                        if seen.insert(link.clone()) {
                            items.push(link);
                        }
                    }
                    self.sink.log(format!(
                        "Found {} new items on page {page}",
                        items.len() - before
                    ));
                }
                Err(err) => {
                    engine_warn!("Listing page {} failed: {}", page_url, err);
                    self.sink
                        .log(format!("Page analysis failed {page_url}: {err}"));
                }
            }
        }

        self.sink.log(format!("Discovered {} items in total", items.len()));
        items
    }
}

use engine_logging::engine_warn;
use grabber_core::{SelectorStrategy, StrategyKind};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Locates links and text fields in a page for one named strategy.
pub trait PageParser: Send + Sync {
    /// Absolute link targets in document order, without duplicates.
    fn extract_links(&self, html: &str, base_url: &str, strategy: &SelectorStrategy)
        -> Vec<String>;

    /// Whitespace-collapsed text of the first matching element that has any.
    fn extract_text(&self, html: &str, strategy: &SelectorStrategy) -> Option<String>;
}

/// Run `strategies` in order; return the first non-empty link list and the
/// name of the strategy that produced it.
pub fn first_links<'s>(
    parser: &dyn PageParser,
    html: &str,
    base_url: &str,
    strategies: &'s [SelectorStrategy],
) -> Option<(&'s str, Vec<String>)> {
    strategies.iter().find_map(|strategy| {
        let links = parser.extract_links(html, base_url, strategy);
        (!links.is_empty()).then_some((strategy.name.as_str(), links))
    })
}

pub fn first_text(
    parser: &dyn PageParser,
    html: &str,
    strategies: &[SelectorStrategy],
) -> Option<String> {
    strategies
        .iter()
        .find_map(|strategy| parser.extract_text(html, strategy))
}

/// `scraper`-backed parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScraperPageParser;

impl PageParser for ScraperPageParser {
    fn extract_links(
        &self,
        html: &str,
        base_url: &str,
        strategy: &SelectorStrategy,
    ) -> Vec<String> {
        let document = Html::parse_document(html);
        let base = Url::parse(base_url).ok();
        let mut links: Vec<String> = Vec::new();

        for element in matching_elements(&document, strategy) {
            let Some(href) = element_href(element) else {
                continue;
            };
            if let Some(url) = resolve_url(href, base.as_ref()) {
                let url = String::from(url);
                if !links.contains(&url) {
                    links.push(url);
                }
            }
        }
        links
    }

    fn extract_text(&self, html: &str, strategy: &SelectorStrategy) -> Option<String> {
        let document = Html::parse_document(html);
        let text = matching_elements(&document, strategy)
            .into_iter()
            .map(element_text)
            .find(|text| !text.is_empty());
        text
    }
}

fn matching_elements<'a>(document: &'a Html, strategy: &SelectorStrategy) -> Vec<ElementRef<'a>> {
    match &strategy.kind {
        StrategyKind::Css(css) => match Selector::parse(css) {
            Ok(selector) => document.select(&selector).collect(),
            Err(err) => {
                engine_warn!("Skipping invalid selector {}: {}", strategy.name, err);
                Vec::new()
            }
        },
        StrategyKind::LinkText(needle) => match Selector::parse("a") {
            Ok(anchors) => document
                .select(&anchors)
                .filter(|anchor| element_text(*anchor).contains(needle.as_str()))
                .collect(),
            Err(_) => Vec::new(),
        },
    }
}

/// The element's own `href`, or that of its first descendant anchor.
fn element_href(element: ElementRef<'_>) -> Option<&str> {
    if let Some(href) = element.value().attr("href") {
        return Some(href);
    }
    let anchors = Selector::parse("a[href]").ok()?;
    element
        .select(&anchors)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_url(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with('?') || lower.starts_with("javascript:") {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    base.and_then(|base| base.join(trimmed).ok())
}

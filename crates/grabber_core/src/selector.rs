/// How a strategy picks elements out of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyKind {
    /// CSS selector.
    Css(String),
    /// Anchors whose visible text contains the needle.
    LinkText(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorStrategy {
    pub name: String,
    pub kind: StrategyKind,
}

impl SelectorStrategy {
    pub fn css(selector: impl Into<String>) -> Self {
        let selector = selector.into();
        Self {
            name: format!("css:{selector}"),
            kind: StrategyKind::Css(selector),
        }
    }

    pub fn link_text(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        Self {
            name: format!("text:{needle}"),
            kind: StrategyKind::LinkText(needle),
        }
    }
}

/// Ordered strategy lists, one per extraction task. The first strategy that
/// yields a non-empty result wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorProfile {
    pub listing_links: Vec<SelectorStrategy>,
    pub download_link: Vec<SelectorStrategy>,
    pub final_link: Vec<SelectorStrategy>,
    pub title: Vec<SelectorStrategy>,
}

impl Default for SelectorProfile {
    fn default() -> Self {
        Self {
            listing_links: vec![
                SelectorStrategy::css(r#"a[href*="/photos-index-aid-"]"#),
                SelectorStrategy::css(".pic_box a"),
                SelectorStrategy::css(".gallery a"),
                SelectorStrategy::css(".thumb a"),
                SelectorStrategy::css(r#"a[href*="aid"]"#),
                SelectorStrategy::css(".list-item a"),
            ],
            download_link: vec![
                SelectorStrategy::css(r#"a[href*="download"]"#),
                SelectorStrategy::link_text("下載"),
                SelectorStrategy::link_text("本地下載"),
                SelectorStrategy::css(".download-btn"),
                SelectorStrategy::css("#download"),
                SelectorStrategy::css(r#"a[href*="down"]"#),
            ],
            // Local mirrors first, generic download links last.
            final_link: vec![
                SelectorStrategy::link_text("本地下載一"),
                SelectorStrategy::link_text("本地下載二"),
                SelectorStrategy::link_text("本地下載"),
                SelectorStrategy::css(r#"a[href*=".zip"]"#),
                SelectorStrategy::css(r#"a[href*="download"]"#),
                SelectorStrategy::css(".download-link"),
            ],
            title: vec![
                SelectorStrategy::css("h1"),
                SelectorStrategy::css("h2"),
                SelectorStrategy::css(".title"),
                SelectorStrategy::css("#title"),
                SelectorStrategy::css(".manga-title"),
            ],
        }
    }
}

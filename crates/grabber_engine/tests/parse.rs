use grabber_core::{SelectorProfile, SelectorStrategy};
use grabber_engine::{first_links, first_text, PageParser, ScraperPageParser};
use pretty_assertions::assert_eq;

const BASE: &str = "https://example.com/albums-index-page-1.html";

#[test]
fn css_links_resolve_against_base_and_dedupe() {
    let html = r#"
        <a href="/photos-index-aid-1.html">one</a>
        <a href="photos-index-aid-2.html">two</a>
        <a href="/photos-index-aid-1.html">one again</a>
        <a href="https://cdn.example.org/photos-index-aid-3.html">three</a>
    "#;
    let links = ScraperPageParser.extract_links(
        html,
        BASE,
        &SelectorStrategy::css(r#"a[href*="photos-index-aid-"]"#),
    );
    assert_eq!(
        links,
        vec![
            "https://example.com/photos-index-aid-1.html".to_string(),
            "https://example.com/photos-index-aid-2.html".to_string(),
            "https://cdn.example.org/photos-index-aid-3.html".to_string(),
        ]
    );
}

#[test]
fn fragments_and_script_links_are_ignored() {
    let html = r##"
        <div class="list-item"><a href="#top">top</a></div>
        <div class="list-item"><a href="javascript:void(0)">js</a></div>
        <div class="list-item"><a href="/real">real</a></div>
    "##;
    let links =
        ScraperPageParser.extract_links(html, BASE, &SelectorStrategy::css(".list-item a"));
    assert_eq!(links, vec!["https://example.com/real".to_string()]);
}

#[test]
fn container_match_uses_descendant_anchor() {
    let html = r#"<div class="download-btn"><span><a href="/get/1">Get</a></span></div>"#;
    let links =
        ScraperPageParser.extract_links(html, BASE, &SelectorStrategy::css(".download-btn"));
    assert_eq!(links, vec!["https://example.com/get/1".to_string()]);
}

#[test]
fn link_text_matches_on_collapsed_text() {
    let html = r#"
        <a href="/mirror/1">本地下載一</a>
        <a href="/mirror/2">
            本地下載二 </a>
    "#;
    let links = ScraperPageParser.extract_links(
        html,
        BASE,
        &SelectorStrategy::link_text("本地下載二"),
    );
    assert_eq!(links, vec!["https://example.com/mirror/2".to_string()]);
}

#[test]
fn invalid_selector_yields_nothing() {
    let links = ScraperPageParser.extract_links(
        "<a href='/x'>x</a>",
        BASE,
        &SelectorStrategy::css("a[[["),
    );
    assert!(links.is_empty());
}

#[test]
fn first_links_reports_winning_strategy() {
    engine_logging::initialize_for_tests();
    let html = r#"<div class="pic_box"><a href="/photos-index-aid-9.html">x</a></div>"#;
    let profile = SelectorProfile::default();
    let (strategy, links) =
        first_links(&ScraperPageParser, html, BASE, &profile.listing_links).expect("a match");
    assert_eq!(strategy, r#"css:a[href*="/photos-index-aid-"]"#);
    assert_eq!(links, vec!["https://example.com/photos-index-aid-9.html".to_string()]);

    let only_box = r#"<div class="pic_box"><a href="/view/9">x</a></div>"#;
    let (strategy, _) =
        first_links(&ScraperPageParser, only_box, BASE, &profile.listing_links).expect("a match");
    assert_eq!(strategy, "css:.pic_box a");

    assert!(first_links(&ScraperPageParser, "<p>none</p>", BASE, &profile.listing_links).is_none());
}

#[test]
fn final_link_prefers_first_local_mirror() {
    let html = r#"
        <a href="/cdn/file.zip">direct zip</a>
        <a href="/mirror/2">本地下載二</a>
        <a href="/mirror/1">本地下載一</a>
    "#;
    let profile = SelectorProfile::default();
    let (strategy, links) =
        first_links(&ScraperPageParser, html, BASE, &profile.final_link).expect("a match");
    assert_eq!(strategy, "text:本地下載一");
    assert_eq!(links[0], "https://example.com/mirror/1");
}

#[test]
fn title_text_is_collapsed_and_falls_through_empty_matches() {
    let html = r#"<h1>   </h1><h2>  My
        Album </h2>"#;
    let profile = SelectorProfile::default();
    assert_eq!(
        first_text(&ScraperPageParser, html, &profile.title),
        Some("My Album".to_string())
    );
    assert_eq!(first_text(&ScraperPageParser, "<p>x</p>", &profile.title), None);
}

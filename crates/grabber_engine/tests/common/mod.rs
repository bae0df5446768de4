#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use grabber_core::{EngineEvent, EventSink, ProgressEvent};
use grabber_engine::{FetchSettings, Fetcher, Pacer, ReqwestFetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
pub struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::Progress(ProgressEvent::Log(text)) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn has_log(&self, needle: &str) -> bool {
        self.logs().iter().any(|line| line.contains(needle))
    }

    pub fn named(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::Progress(ProgressEvent::NamedProgress { id, text }) => Some((id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn aggregates(&self) -> Vec<(usize, usize)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::Progress(ProgressEvent::AggregateProgress { completed, total }) => {
                    Some((completed, total))
                }
                _ => None,
            })
            .collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Records requested pauses instead of sleeping.
#[derive(Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPacer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

pub fn fetcher() -> Arc<dyn Fetcher> {
    Arc::new(ReqwestFetcher::new(FetchSettings::default()).unwrap())
}

pub fn listing_html(item_paths: &[&str]) -> String {
    let links: String = item_paths
        .iter()
        .map(|p| format!(r#"<li><a href="{p}">item</a></li>"#))
        .collect();
    format!("<html><body><ul>{links}</ul></body></html>")
}

pub fn item_html(title: Option<&str>, download_page: &str) -> String {
    let heading = title.map(|t| format!("<h1>{t}</h1>")).unwrap_or_default();
    format!(
        r#"<html><body>{heading}<p>Pages: 20</p><a href="{download_page}">Go to download</a></body></html>"#
    )
}

pub fn download_page_html(binary: &str) -> String {
    format!(
        r#"<html><body><a href="/">首頁</a><a href="{binary}">本地下載一</a></body></html>"#
    )
}

pub async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

pub async fn mount_binary(server: &MockServer, at: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), "application/zip"))
        .mount(server)
        .await;
}

/// Mount item page, download page and binary for one item.
pub async fn mount_item(server: &MockServer, id: u32, title: Option<&str>, body: &[u8]) {
    mount_html(
        server,
        &format!("/photos-index-aid-{id}.html"),
        item_html(title, &format!("/download-index-aid-{id}.html")),
    )
    .await;
    mount_html(
        server,
        &format!("/download-index-aid-{id}.html"),
        download_page_html(&format!("/files/{id}.zip")),
    )
    .await;
    mount_binary(server, &format!("/files/{id}.zip"), body).await;
}

pub async fn request_count(server: &MockServer, at: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == at)
        .count()
}

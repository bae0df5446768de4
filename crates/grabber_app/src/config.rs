use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use engine_logging::engine_info;
use grabber_core::{ListingDescriptor, SelectorProfile, SelectorStrategy};
use grabber_engine::{BatchSettings, FetchSettings};
use serde::{Deserialize, Serialize};

use crate::cli::Args;

const DEFAULT_OUTPUT_DIR: &str = "downloads";
const DEFAULT_CONCURRENCY: usize = 3;

/// On-disk job description. Every field is optional; absent fields take the
/// engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobFile {
    pub url: Option<String>,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
    pub output: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub delays: DelaysFile,
    pub retry: RetryFile,
    pub batch_size: Option<usize>,
    pub accept_invalid_certs: Option<bool>,
    pub selectors: SelectorsFile,
}

/// Milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelaysFile {
    pub page_ms: Option<u64>,
    pub batch_ms: Option<u64>,
    pub politeness_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryFile {
    pub max_attempts: Option<u32>,
    pub backoff_ms: Option<u64>,
}

/// Replacement strategy lists; an empty list keeps the built-in one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorsFile {
    pub listing_links: Vec<StrategyFile>,
    pub download_link: Vec<StrategyFile>,
    pub final_link: Vec<StrategyFile>,
    pub title: Vec<StrategyFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StrategyFile {
    Css(String),
    Text(String),
}

impl StrategyFile {
    fn to_strategy(&self) -> SelectorStrategy {
        match self {
            StrategyFile::Css(selector) => SelectorStrategy::css(selector.as_str()),
            StrategyFile::Text(needle) => SelectorStrategy::link_text(needle.as_str()),
        }
    }
}

pub fn load_job_file(path: &Path) -> Result<JobFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read job file {}", path.display()))?;
    let job: JobFile = ron::from_str(&content)
        .with_context(|| format!("cannot parse job file {}", path.display()))?;
    engine_info!("Loaded job file {:?}", path);
    Ok(job)
}

/// Everything one run needs, after merging flags over the job file.
#[derive(Debug)]
pub struct JobPlan {
    pub listing: ListingDescriptor,
    pub output: PathBuf,
    pub concurrency: usize,
    pub fetch: FetchSettings,
    pub batch: BatchSettings,
    pub profile: SelectorProfile,
}

impl JobPlan {
    pub fn resolve(args: &Args, file: JobFile) -> Result<Self> {
        let Some(url) = args.url.clone().or(file.url) else {
            bail!("no listing URL given; pass --url or set `url` in the job file");
        };
        let start_page = args.start_page.or(file.start_page).unwrap_or(1);
        let end_page = args.end_page.or(file.end_page).unwrap_or(start_page);
        let listing = ListingDescriptor::new(url, start_page, end_page)?;

        let mut fetch = FetchSettings::default();
        if args.insecure {
            fetch.accept_invalid_certs = true;
        } else if let Some(accept) = file.accept_invalid_certs {
            fetch.accept_invalid_certs = accept;
        }

        let mut batch = BatchSettings::default();
        if let Some(size) = file.batch_size {
            batch.batch_size = size.max(1);
        }
        if let Some(ms) = args.page_delay_ms.or(file.delays.page_ms) {
            batch.page_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = args.batch_delay_ms.or(file.delays.batch_ms) {
            batch.batch_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.delays.politeness_ms {
            batch.politeness_delay = Duration::from_millis(ms);
        }
        if let Some(attempts) = args.max_attempts.or(file.retry.max_attempts) {
            batch.download.max_attempts = attempts.max(1);
        }
        if let Some(ms) = file.retry.backoff_ms {
            batch.download.backoff_unit = Duration::from_millis(ms);
        }

        Ok(Self {
            listing,
            output: args
                .output
                .clone()
                .or(file.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            concurrency: args
                .concurrency
                .or(file.concurrency)
                .unwrap_or(DEFAULT_CONCURRENCY),
            fetch,
            batch,
            profile: build_profile(&file.selectors),
        })
    }
}

fn build_profile(selectors: &SelectorsFile) -> SelectorProfile {
    let mut profile = SelectorProfile::default();
    replace_if_given(&mut profile.listing_links, &selectors.listing_links);
    replace_if_given(&mut profile.download_link, &selectors.download_link);
    replace_if_given(&mut profile.final_link, &selectors.final_link);
    replace_if_given(&mut profile.title, &selectors.title);
    profile
}

fn replace_if_given(target: &mut Vec<SelectorStrategy>, given: &[StrategyFile]) {
    if !given.is_empty() {
        *target = given.iter().map(StrategyFile::to_strategy).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const JOB: &str = r#"(
        url: Some("https://example.com/albums-index-page-1-cate-3.html"),
        start_page: Some(2),
        end_page: Some(5),
        output: Some("archives"),
        concurrency: Some(2),
        delays: (page_ms: Some(500), politeness_ms: Some(0)),
        retry: (max_attempts: Some(4), backoff_ms: Some(250)),
        accept_invalid_certs: Some(true),
        selectors: (
            listing_links: [Css(".cards a")],
            final_link: [Text("Mirror"), Css("a.zip")],
        ),
    )"#;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["grabber"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn job_file_is_read_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("job.ron");
        fs::write(&path, JOB).unwrap();

        let job = load_job_file(&path).unwrap();
        assert_eq!(job.start_page, Some(2));
        assert_eq!(job.delays.page_ms, Some(500));
        assert_eq!(job.delays.batch_ms, None);
        assert_eq!(
            job.selectors.final_link,
            vec![
                StrategyFile::Text("Mirror".to_string()),
                StrategyFile::Css("a.zip".to_string())
            ]
        );
    }

    #[test]
    fn missing_or_malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(load_job_file(&temp.path().join("absent.ron")).is_err());

        let path = temp.path().join("bad.ron");
        fs::write(&path, "(url: 42").unwrap();
        assert!(load_job_file(&path).is_err());
    }

    #[test]
    fn file_values_fill_the_plan() {
        let file: JobFile = ron::from_str(JOB).unwrap();
        let plan = JobPlan::resolve(&args(&[]), file).unwrap();

        assert_eq!(plan.listing.start_page(), 2);
        assert_eq!(plan.listing.end_page(), 5);
        assert_eq!(plan.output, PathBuf::from("archives"));
        assert_eq!(plan.concurrency, 2);
        assert!(plan.fetch.accept_invalid_certs);
        assert_eq!(plan.batch.page_delay, Duration::from_millis(500));
        assert_eq!(plan.batch.batch_delay, Duration::from_secs(3));
        assert_eq!(plan.batch.politeness_delay, Duration::ZERO);
        assert_eq!(plan.batch.download.max_attempts, 4);
        assert_eq!(plan.batch.download.backoff_unit, Duration::from_millis(250));
        assert_eq!(
            plan.profile.listing_links,
            vec![SelectorStrategy::css(".cards a")]
        );
        assert_eq!(plan.profile.title, SelectorProfile::default().title);
    }

    #[test]
    fn flags_override_file() {
        let file: JobFile = ron::from_str(JOB).unwrap();
        let plan = JobPlan::resolve(
            &args(&[
                "--url",
                "https://other.example/list?page=1",
                "--end-page",
                "9",
                "-c",
                "8",
                "--page-delay-ms",
                "0",
            ]),
            file,
        )
        .unwrap();

        assert_eq!(plan.listing.base_url(), "https://other.example/list?page=1");
        assert_eq!(plan.listing.start_page(), 2);
        assert_eq!(plan.listing.end_page(), 9);
        assert_eq!(plan.concurrency, 8);
        assert_eq!(plan.batch.page_delay, Duration::ZERO);
    }

    #[test]
    fn defaults_without_file() {
        let plan = JobPlan::resolve(
            &args(&["--url", "https://example.com/albums-index-page-1.html"]),
            JobFile::default(),
        )
        .unwrap();
        assert_eq!(plan.listing.start_page(), 1);
        assert_eq!(plan.listing.end_page(), 1);
        assert_eq!(plan.output, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(plan.concurrency, DEFAULT_CONCURRENCY);
        assert!(!plan.fetch.accept_invalid_certs);
        assert_eq!(plan.profile, SelectorProfile::default());
    }

    #[test]
    fn missing_url_and_inverted_range_are_rejected() {
        assert!(JobPlan::resolve(&args(&[]), JobFile::default()).is_err());

        let err = JobPlan::resolve(
            &args(&["--url", "https://example.com/p-page-1", "--start-page", "4", "--end-page", "2"]),
            JobFile::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains('4'));
    }
}

use std::path::PathBuf;

use grabber_core::{DownloadJob, JobStatus, TransitionError};

fn job() -> DownloadJob {
    DownloadJob::new("Title", PathBuf::from("out/Title.zip"))
}

#[test]
fn happy_path_runs_pending_to_succeeded() {
    let mut job = job();
    assert_eq!(job.status(), JobStatus::Pending);
    job.start().unwrap();
    job.set_source_url("https://ex.com/a.zip");
    job.record_attempts(2);
    job.succeed().unwrap();

    assert_eq!(job.status(), JobStatus::Succeeded);
    assert!(job.status().is_terminal());
    assert_eq!(job.source_url(), Some("https://ex.com/a.zip"));
    assert_eq!(job.attempts(), 2);
}

#[test]
fn skip_is_only_possible_from_pending() {
    let mut job = job();
    job.skip_existing().unwrap();
    assert_eq!(job.status(), JobStatus::SkippedExists);

    let mut running = self::job();
    running.start().unwrap();
    assert_eq!(
        running.skip_existing(),
        Err(TransitionError {
            from: JobStatus::InProgress,
            to: JobStatus::SkippedExists,
        })
    );
    assert_eq!(running.status(), JobStatus::InProgress);
}

#[test]
fn terminal_states_cannot_be_left() {
    let mut job = job();
    job.start().unwrap();
    job.cancel().unwrap();

    assert!(job.succeed().is_err());
    assert!(job.fail().is_err());
    assert!(job.start().is_err());
    assert_eq!(job.status(), JobStatus::Cancelled);
}

#[test]
fn failure_requires_in_progress() {
    let mut job = job();
    assert!(job.fail().is_err());
    job.start().unwrap();
    job.fail().unwrap();
    assert_eq!(job.status(), JobStatus::Failed);
}

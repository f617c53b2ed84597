//! Wire type tests.

use easel_provider::{Asset, Job, JobEnvelope, JobStatus, with_query};
use serde_json::json;

fn job(value: serde_json::Value) -> Job {
    serde_json::from_value::<JobEnvelope>(json!({ "job": value }))
        .unwrap()
        .job
}

#[test]
fn status_spellings_fold_into_four_states() {
    let parse = |s: &str| serde_json::from_value::<JobStatus>(json!(s)).unwrap();
    assert_eq!(parse("pending"), JobStatus::Pending);
    assert_eq!(parse("queued"), JobStatus::Pending);
    assert_eq!(parse("running"), JobStatus::Running);
    assert_eq!(parse("in-progress"), JobStatus::Running);
    assert_eq!(parse("success"), JobStatus::Success);
    assert_eq!(parse("failed"), JobStatus::Failed);
    assert_eq!(parse("failure"), JobStatus::Failed);
    assert_eq!(parse("canceled"), JobStatus::Failed);
    assert_eq!(parse("something-new"), JobStatus::Unknown);
}

#[test]
fn only_success_and_failed_are_terminal() {
    assert!(JobStatus::Success.is_terminal());
    assert!(JobStatus::Failed.is_terminal());
    assert!(!JobStatus::Pending.is_terminal());
    assert!(!JobStatus::Running.is_terminal());
    assert!(!JobStatus::Unknown.is_terminal());
}

#[test]
fn output_ids_only_on_success() {
    let done = job(json!({
        "jobId": "j1",
        "status": "success",
        "metadata": { "assetIds": ["a1", "a2"] },
    }));
    assert_eq!(done.output_ids(), ["a1", "a2"]);

    let running = job(json!({
        "jobId": "j1",
        "status": "running",
        "metadata": { "assetIds": ["a1"] },
    }));
    assert!(running.output_ids().is_empty());
}

#[test]
fn error_detail_only_on_failure() {
    let failed = job(json!({
        "jobId": "j2",
        "status": "failure",
        "metadata": { "error": "nsfw content detected" },
    }));
    assert_eq!(failed.error_detail(), Some(&json!("nsfw content detected")));

    let ok = job(json!({ "jobId": "j2", "status": "success" }));
    assert_eq!(ok.error_detail(), None);
}

#[test]
fn unknown_job_fields_are_kept() {
    let job = job(json!({
        "jobId": "j3",
        "status": "failed",
        "progress": 0.4,
        "metadata": { "input": { "prompt": "x" } },
    }));
    assert_eq!(job.extra["progress"], json!(0.4));
    assert_eq!(job.metadata.extra["input"]["prompt"], "x");
}

#[test]
fn asset_properties_are_optional() {
    let image: Asset = serde_json::from_value(json!({
        "id": "a1",
        "url": "https://x/a1.png",
        "properties": { "width": 1024, "height": 768 },
        "createdAt": "2024-01-01T00:00:00Z",
    }))
    .unwrap();
    let props = image.properties.unwrap();
    assert_eq!((props.width, props.height), (Some(1024), Some(768)));
    assert_eq!(image.created_at.as_deref(), Some("2024-01-01T00:00:00Z"));

    let bare: Asset = serde_json::from_value(json!({ "id": "a2", "url": "u" })).unwrap();
    assert!(bare.properties.is_none());
    assert!(bare.description.is_none());
}

#[test]
fn with_query_encodes_pairs() {
    assert_eq!(with_query("/assets", &[]), "/assets");
    assert_eq!(
        with_query(
            "/assets",
            &[("pageSize", "10".to_owned()), ("type", "inference image".to_owned())]
        ),
        "/assets?pageSize=10&type=inference+image"
    );
}

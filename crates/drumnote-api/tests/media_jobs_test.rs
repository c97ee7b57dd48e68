//! Video upload, audio files and processing jobs against a real database.
//!
//! Run with: cargo test -p drumnote-api --test media_jobs_test -- --ignored
//! Requires Docker.

mod helpers;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use helpers::{api_path, register_and_login, setup_test_app, upload_video};
use serde_json::{json, Value};

#[tokio::test]
#[ignore]
async fn upload_list_and_download_video() {
    let app = setup_test_app().await;
    let (_, token) = register_and_login(&app.server, "uploader@example.com").await;
    let video_id = upload_video(&app.server, &token, "groove.mp4").await;

    let list = app
        .server
        .get(&api_path("/videos"))
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(list["total"], 1);
    assert_eq!(list["videos"][0]["id"], video_id.as_str());
    assert_eq!(list["videos"][0]["filename"], "groove.mp4");

    let download = app
        .server
        .get(&api_path(&format!("/videos/{}/download", video_id)))
        .authorization_bearer(&token)
        .await;
    download.assert_status_ok();
    assert_eq!(download.header("content-type"), "video/mp4");
    assert!(download.as_bytes().ends_with(b"fake-video"));
}

#[tokio::test]
#[ignore]
async fn upload_rejects_duplicates_and_wrong_types() {
    let app = setup_test_app().await;
    let (_, token) = register_and_login(&app.server, "careful@example.com").await;
    upload_video(&app.server, &token, "take1.mp4").await;

    let duplicate = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"second copy".to_vec())
            .file_name("take1.mp4")
            .mime_type("video/mp4"),
    );
    let response = app
        .server
        .post(&api_path("/videos"))
        .authorization_bearer(&token)
        .multipart(duplicate)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"]
        .as_str()
        .unwrap()
        .contains("already exists"));

    let text = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"not a video".to_vec())
            .file_name("notes.txt")
            .mime_type("text/plain"),
    );
    app.server
        .post(&api_path("/videos"))
        .authorization_bearer(&token)
        .multipart(text)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn videos_are_private_to_their_owner() {
    let app = setup_test_app().await;
    let (_, owner) = register_and_login(&app.server, "owner@example.com").await;
    let (_, stranger) = register_and_login(&app.server, "stranger@example.com").await;
    let video_id = upload_video(&app.server, &owner, "private.mp4").await;

    app.server
        .get(&api_path(&format!("/videos/{}", video_id)))
        .authorization_bearer(&stranger)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .get(&api_path("/videos/00000000-0000-0000-0000-000000000000"))
        .authorization_bearer(&owner)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn soft_delete_and_restore_video() {
    let app = setup_test_app().await;
    let (_, token) = register_and_login(&app.server, "restorer@example.com").await;
    let video_id = upload_video(&app.server, &token, "oops.mp4").await;

    app.server
        .delete(&api_path(&format!("/videos/{}", video_id)))
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    app.server
        .get(&api_path(&format!("/videos/{}", video_id)))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let restored = app
        .server
        .post(&api_path(&format!("/videos/{}/restore", video_id)))
        .authorization_bearer(&token)
        .await;
    restored.assert_status_ok();
    assert_eq!(restored.json::<Value>()["id"], video_id.as_str());
}

#[tokio::test]
#[ignore]
async fn register_audio_file_for_video() {
    let app = setup_test_app().await;
    let (_, token) = register_and_login(&app.server, "audio@example.com").await;
    let video_id = upload_video(&app.server, &token, "with-audio.mp4").await;

    let form = MultipartForm::new()
        .add_text("sample_rate", "44100")
        .add_text("channels", "1")
        .add_text("duration_seconds", "12.5")
        .add_part(
            "file",
            Part::bytes(b"RIFF....WAVEfmt ".to_vec())
                .file_name("track.wav")
                .mime_type("audio/wav"),
        );
    let created = app
        .server
        .post(&api_path(&format!("/videos/{}/audio-files", video_id)))
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    created.assert_status(StatusCode::CREATED);
    let audio = created.json::<Value>();
    assert_eq!(audio["video_id"], video_id.as_str());
    assert_eq!(audio["sample_rate"], 44100);

    let files = app
        .server
        .get(&api_path(&format!("/videos/{}/audio-files", video_id)))
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(files.as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn job_prerequisites_follow_the_pipeline() {
    let app = setup_test_app().await;
    let (_, token) = register_and_login(&app.server, "pipeline@example.com").await;
    let video_id = upload_video(&app.server, &token, "pipeline.mp4").await;

    // Analysis needs a completed extraction
    let early = app
        .server
        .post(&api_path(&format!("/jobs/audio-analysis/{}", video_id)))
        .authorization_bearer(&token)
        .await;
    early.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        early.json::<Value>()["error"],
        "Audio must be extracted before analysis"
    );

    let extraction = app
        .server
        .post(&api_path(&format!("/jobs/audio-extraction/{}", video_id)))
        .authorization_bearer(&token)
        .await;
    extraction.assert_status(StatusCode::CREATED);
    let job = extraction.json::<Value>();
    assert_eq!(job["status"], "pending");
    assert_eq!(job["job_type"], "audio_extraction");
    let job_id = job["id"].as_str().unwrap().to_string();

    app.server
        .post(&api_path(&format!("/jobs/audio-extraction/{}", video_id)))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let running = app
        .server
        .patch(&api_path(&format!("/jobs/{}", job_id)))
        .authorization_bearer(&token)
        .json(&json!({ "status": "running", "progress": 40.0 }))
        .await;
    running.assert_status_ok();
    assert!(running.json::<Value>()["started_at"].is_string());

    let completed = app
        .server
        .patch(&api_path(&format!("/jobs/{}", job_id)))
        .authorization_bearer(&token)
        .json(&json!({ "status": "completed" }))
        .await
        .json::<Value>();
    assert_eq!(completed["status"], "completed");
    assert_eq!(completed["progress"], 100.0);

    // Terminal jobs are frozen
    app.server
        .patch(&api_path(&format!("/jobs/{}", job_id)))
        .authorization_bearer(&token)
        .json(&json!({ "progress": 10.0 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let pipeline = app
        .server
        .get(&api_path(&format!("/jobs/video/{}/pipeline", video_id)))
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(pipeline["pipeline_stages"]["audio_extraction"]["status"], "completed");
    assert_eq!(pipeline["pipeline_stages"]["audio_analysis"]["status"], "not_started");
    assert_eq!(pipeline["next_available_action"], "audio_analysis");

    app.server
        .post(&api_path(&format!("/jobs/audio-analysis/{}", video_id)))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::CREATED);

    // A fresh extraction supersedes the completed one
    let rerun = app
        .server
        .post(&api_path(&format!("/jobs/audio-extraction/{}", video_id)))
        .authorization_bearer(&token)
        .await;
    rerun.assert_status(StatusCode::CREATED);
    let rerun_id = rerun.json::<Value>()["id"].as_str().unwrap().to_string();

    let blocked = app
        .server
        .post(&api_path(&format!("/jobs/drum-detection/{}", video_id)))
        .authorization_bearer(&token)
        .await;
    blocked.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        blocked.json::<Value>()["error"],
        "Audio must be extracted before drum detection"
    );

    // Cancel and complete race on the same pending job: the loser sees the new status
    let (cancel, complete) = tokio::join!(
        async {
            app.server
                .delete(&api_path(&format!("/jobs/{}", rerun_id)))
                .authorization_bearer(&token)
                .await
        },
        async {
            app.server
                .patch(&api_path(&format!("/jobs/{}", rerun_id)))
                .authorization_bearer(&token)
                .json(&json!({ "status": "completed" }))
                .await
        }
    );
    let ok_count = [cancel.status_code(), complete.status_code()]
        .iter()
        .filter(|s| s.is_success())
        .count();
    assert_eq!(ok_count, 1);

    let stored = app
        .server
        .get(&api_path(&format!("/jobs/{}", rerun_id)))
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    let expected = if cancel.status_code().is_success() {
        "failed"
    } else {
        "completed"
    };
    assert_eq!(stored["status"], expected);
}

#[tokio::test]
#[ignore]
async fn generic_job_creation_validates_type() {
    let app = setup_test_app().await;
    let (_, token) = register_and_login(&app.server, "generic@example.com").await;
    let video_id = upload_video(&app.server, &token, "generic.mp4").await;

    let response = app
        .server
        .post(&api_path("/jobs"))
        .authorization_bearer(&token)
        .json(&json!({ "video_id": video_id, "job_type": "transcode" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Invalid job type");

    app.server
        .post(&api_path("/jobs"))
        .authorization_bearer(&token)
        .json(&json!({ "video_id": video_id, "job_type": "audio_extraction" }))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
#[ignore]
async fn cancel_then_retry_job() {
    let app = setup_test_app().await;
    let (_, token) = register_and_login(&app.server, "retry@example.com").await;
    let video_id = upload_video(&app.server, &token, "retry.mp4").await;

    let job_id = app
        .server
        .post(&api_path(&format!("/audio/extract/{}", video_id)))
        .authorization_bearer(&token)
        .await
        .json::<Value>()["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let cancelled = app
        .server
        .delete(&api_path(&format!("/jobs/{}", job_id)))
        .authorization_bearer(&token)
        .await;
    cancelled.assert_status_ok();
    assert_eq!(cancelled.json::<Value>()["message"], "Job cancelled successfully");

    let retried = app
        .server
        .post(&api_path(&format!("/jobs/{}/retry", job_id)))
        .authorization_bearer(&token)
        .await;
    retried.assert_status_ok();
    let job = retried.json::<Value>();
    assert_eq!(job["status"], "pending");
    assert_eq!(job["progress"], 0.0);
}

#[tokio::test]
#[ignore]
async fn job_admin_endpoints_require_admin() {
    let app = setup_test_app().await;
    let (_, token) = register_and_login(&app.server, "plain@example.com").await;
    let (_, admin) = register_and_login(&app.server, helpers::ADMIN_EMAIL).await;

    app.server
        .get(&api_path("/jobs/admin/statistics"))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .get(&api_path("/jobs/admin/statistics"))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();

    let cleanup = app
        .server
        .post(&api_path("/jobs/admin/cleanup"))
        .add_query_param("days_old", 0)
        .authorization_bearer(&admin)
        .await;
    cleanup.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        cleanup.json::<Value>()["error"],
        "days_old must be between 1 and 365"
    );
}

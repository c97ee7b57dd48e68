//! Route groups per feature area.

use crate::constants::{API_PREFIX, MULTIPART_OVERHEAD_BYTES};
use crate::handlers;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Registration and login; mounted without the auth layer.
pub fn auth_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(&format!("{}/auth/register", API_PREFIX), post(handlers::auth::register))
        .route(&format!("{}/auth/login", API_PREFIX), post(handlers::auth::login))
        .with_state(state)
}

pub fn user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use handlers::users;

    Router::new()
        .route(
            &format!("{}/users", API_PREFIX),
            get(users::list_users).post(users::create_user),
        )
        .route(&format!("{}/users/count", API_PREFIX), get(users::count_users))
        .route(&format!("{}/users/me", API_PREFIX), get(users::get_me))
        .route(&format!("{}/users/me/password", API_PREFIX), put(users::change_password))
        .route(
            &format!("{}/users/{{id}}", API_PREFIX),
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(&format!("{}/users/{{id}}/restore", API_PREFIX), post(users::restore_user))
        .route(
            &format!("{}/users/{{id}}/permanent", API_PREFIX),
            delete(users::hard_delete_user),
        )
        .with_state(state)
}

pub fn role_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use handlers::roles;

    Router::new()
        .route(
            &format!("{}/roles", API_PREFIX),
            get(roles::list_roles).post(roles::create_role),
        )
        .route(&format!("{}/roles/count", API_PREFIX), get(roles::count_roles))
        .route(&format!("{}/roles/name/{{name}}", API_PREFIX), get(roles::get_role_by_name))
        .route(
            &format!("{}/roles/users/{{user_id}}", API_PREFIX),
            get(roles::roles_for_user),
        )
        .route(
            &format!("{}/roles/users/{{user_id}}/check/{{role_name}}", API_PREFIX),
            get(roles::check_user_role),
        )
        .route(
            &format!("{}/roles/{{id}}", API_PREFIX),
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        )
        .route(&format!("{}/roles/{{id}}/restore", API_PREFIX), post(roles::restore_role))
        .route(
            &format!("{}/roles/{{id}}/permanent", API_PREFIX),
            delete(roles::hard_delete_role),
        )
        .route(&format!("{}/roles/{{id}}/users", API_PREFIX), get(roles::users_with_role))
        .route(
            &format!("{}/roles/{{id}}/users/{{user_id}}", API_PREFIX),
            post(roles::assign_role).delete(roles::remove_role),
        )
        .with_state(state)
}

/// Body limits for a multipart upload of at most `max_file_bytes`.
fn upload_limits(max_file_bytes: usize) -> (DefaultBodyLimit, RequestBodyLimitLayer) {
    let max = max_file_bytes + MULTIPART_OVERHEAD_BYTES;
    (DefaultBodyLimit::max(max), RequestBodyLimitLayer::new(max))
}

pub fn video_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use handlers::{audio_files, videos};

    let (video_extractor_limit, video_body_limit) =
        upload_limits(state.media.video_max_file_size);
    let (audio_extractor_limit, audio_body_limit) =
        upload_limits(state.media.audio_max_file_size);

    Router::new()
        .route(
            &format!("{}/videos", API_PREFIX),
            get(videos::list_videos).merge(
                post(videos::upload_video)
                    .layer::<_, std::convert::Infallible>(video_extractor_limit)
                    .layer(video_body_limit),
            ),
        )
        .route(&format!("{}/videos/stats", API_PREFIX), get(videos::video_stats))
        .route(&format!("{}/videos/formats", API_PREFIX), get(videos::supported_formats))
        .route(
            &format!("{}/videos/admin/cleanup-orphans", API_PREFIX),
            post(videos::cleanup_orphans),
        )
        .route(
            &format!("{}/videos/{{id}}", API_PREFIX),
            get(videos::get_video)
                .put(videos::update_video)
                .delete(videos::delete_video),
        )
        .route(&format!("{}/videos/{{id}}/restore", API_PREFIX), post(videos::restore_video))
        .route(&format!("{}/videos/{{id}}/download", API_PREFIX), get(videos::download_video))
        .route(
            &format!("{}/videos/{{id}}/processing-status", API_PREFIX),
            get(videos::processing_status),
        )
        .route(
            &format!("{}/videos/{{id}}/audio-files", API_PREFIX),
            get(audio_files::list_audio_files).merge(
                post(audio_files::register_audio_file)
                    .layer::<_, std::convert::Infallible>(audio_extractor_limit)
                    .layer(audio_body_limit),
            ),
        )
        .route(
            &format!("{}/audio-files/{{id}}", API_PREFIX),
            get(audio_files::get_audio_file).delete(audio_files::delete_audio_file),
        )
        .route(
            &format!("{}/audio-files/{{id}}/download", API_PREFIX),
            get(audio_files::download_audio_file),
        )
        .with_state(state)
}

pub fn job_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use handlers::jobs;

    Router::new()
        .route(
            &format!("{}/jobs", API_PREFIX),
            get(jobs::list_jobs).post(jobs::create_processing_job),
        )
        .route(&format!("{}/jobs/health", API_PREFIX), get(jobs::jobs_health))
        .route(&format!("{}/jobs/queue-status", API_PREFIX), get(jobs::queue_status))
        .route(&format!("{}/jobs/admin/statistics", API_PREFIX), get(jobs::job_statistics))
        .route(&format!("{}/jobs/admin/cleanup", API_PREFIX), post(jobs::cleanup_jobs))
        .route(
            &format!("{}/jobs/audio-extraction/{{video_id}}", API_PREFIX),
            post(jobs::create_audio_extraction_job),
        )
        .route(
            &format!("{}/jobs/audio-analysis/{{video_id}}", API_PREFIX),
            post(jobs::create_audio_analysis_job),
        )
        .route(
            &format!("{}/jobs/drum-detection/{{video_id}}", API_PREFIX),
            post(jobs::create_drum_detection_job),
        )
        .route(&format!("{}/jobs/video/{{video_id}}", API_PREFIX), get(jobs::video_jobs))
        .route(
            &format!("{}/jobs/video/{{video_id}}/pipeline", API_PREFIX),
            get(jobs::video_pipeline),
        )
        .route(
            &format!("{}/jobs/{{id}}", API_PREFIX),
            get(jobs::get_job)
                .patch(jobs::update_job)
                .delete(jobs::cancel_job),
        )
        .route(&format!("{}/jobs/{{id}}/retry", API_PREFIX), post(jobs::retry_job))
        .with_state(state)
}

pub fn audio_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use handlers::audio_processing as audio;

    Router::new()
        .route(&format!("{}/audio/extract/{{video_id}}", API_PREFIX), post(audio::extract_audio))
        .route(
            &format!("{}/audio/extract/{{video_id}}/status", API_PREFIX),
            get(audio::extraction_status),
        )
        .route(&format!("{}/audio/info/{{video_id}}", API_PREFIX), get(audio::audio_info))
        .route(&format!("{}/audio/analyze/{{video_id}}", API_PREFIX), post(audio::analyze_audio))
        .route(
            &format!("{}/audio/detect-drums/{{video_id}}", API_PREFIX),
            post(audio::detect_drums),
        )
        .route(&format!("{}/audio/pipeline/{{video_id}}", API_PREFIX), get(audio::audio_pipeline))
        .route(&format!("{}/audio/jobs/my-jobs", API_PREFIX), get(audio::my_jobs))
        .route(
            &format!("{}/audio/settings/recommended", API_PREFIX),
            get(audio::recommended_settings),
        )
        .route(
            &format!("{}/audio/settings/supported-formats", API_PREFIX),
            get(audio::supported_formats),
        )
        .route(&format!("{}/audio/admin/statistics", API_PREFIX), get(audio::audio_statistics))
        .with_state(state)
}

pub fn notation_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use handlers::{enrichment, notations};

    Router::new()
        .route(
            &format!("{}/notations", API_PREFIX),
            get(notations::list_notations).post(notations::create_notation),
        )
        .route(
            &format!("{}/notations/from-events", API_PREFIX),
            post(notations::create_notation_from_events),
        )
        .route(
            &format!("{}/notations/stats/overview", API_PREFIX),
            get(notations::notation_stats),
        )
        .route(
            &format!("{}/notations/{{id}}", API_PREFIX),
            get(notations::get_notation)
                .put(notations::update_notation)
                .delete(notations::delete_notation),
        )
        .route(
            &format!("{}/notations/{{id}}/restore", API_PREFIX),
            post(notations::restore_notation),
        )
        .route(
            &format!("{}/notations/{{id}}/timeline", API_PREFIX),
            get(notations::notation_timeline),
        )
        .route(
            &format!("{}/notations/{{id}}/export", API_PREFIX),
            get(notations::export_notation),
        )
        .route(
            &format!("{}/notations/{{id}}/validate", API_PREFIX),
            get(notations::validate_stored_notation),
        )
        .route(
            &format!("{}/notations/{{id}}/enhance", API_PREFIX),
            post(enrichment::enhance_notation),
        )
        .route(
            &format!("{}/notations/{{id}}/variations", API_PREFIX),
            post(enrichment::notation_variations),
        )
        .route(
            &format!("{}/notations/{{id}}/with-enhancements", API_PREFIX),
            get(enrichment::notation_with_enhancements),
        )
        .route(&format!("{}/ai/status", API_PREFIX), get(enrichment::ai_status))
        .with_state(state)
}

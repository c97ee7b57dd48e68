//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use drumnote_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Drumnote API",
        version = "0.1.0",
        description = "Drum transcription backend: accounts and roles, video and audio file management, processing job tracking, notation documents built from detected drum events, and optional LLM enrichment. All application endpoints are under /api/v1/ and require a bearer token except registration and login."
    ),
    paths(
        // Auth
        handlers::auth::register,
        handlers::auth::login,
        // Users
        handlers::users::get_me,
        handlers::users::change_password,
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::count_users,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::users::restore_user,
        handlers::users::hard_delete_user,
        // Roles
        handlers::roles::create_role,
        handlers::roles::list_roles,
        handlers::roles::count_roles,
        handlers::roles::get_role,
        handlers::roles::get_role_by_name,
        handlers::roles::update_role,
        handlers::roles::delete_role,
        handlers::roles::restore_role,
        handlers::roles::hard_delete_role,
        handlers::roles::assign_role,
        handlers::roles::remove_role,
        handlers::roles::users_with_role,
        handlers::roles::roles_for_user,
        handlers::roles::check_user_role,
        // Videos
        handlers::videos::upload_video,
        handlers::videos::list_videos,
        handlers::videos::get_video,
        handlers::videos::update_video,
        handlers::videos::delete_video,
        handlers::videos::restore_video,
        handlers::videos::download_video,
        handlers::videos::video_stats,
        handlers::videos::supported_formats,
        handlers::videos::processing_status,
        handlers::videos::cleanup_orphans,
        // Audio files
        handlers::audio_files::register_audio_file,
        handlers::audio_files::list_audio_files,
        handlers::audio_files::get_audio_file,
        handlers::audio_files::delete_audio_file,
        handlers::audio_files::download_audio_file,
        // Jobs
        handlers::jobs::create_processing_job,
        handlers::jobs::create_audio_extraction_job,
        handlers::jobs::create_audio_analysis_job,
        handlers::jobs::create_drum_detection_job,
        handlers::jobs::list_jobs,
        handlers::jobs::get_job,
        handlers::jobs::update_job,
        handlers::jobs::retry_job,
        handlers::jobs::cancel_job,
        handlers::jobs::video_jobs,
        handlers::jobs::video_pipeline,
        handlers::jobs::job_statistics,
        handlers::jobs::jobs_health,
        handlers::jobs::queue_status,
        handlers::jobs::cleanup_jobs,
        // Audio processing
        handlers::audio_processing::extract_audio,
        handlers::audio_processing::extraction_status,
        handlers::audio_processing::audio_info,
        handlers::audio_processing::analyze_audio,
        handlers::audio_processing::detect_drums,
        handlers::audio_processing::audio_pipeline,
        handlers::audio_processing::my_jobs,
        handlers::audio_processing::recommended_settings,
        handlers::audio_processing::supported_formats,
        handlers::audio_processing::audio_statistics,
        // Notations
        handlers::notations::create_notation,
        handlers::notations::create_notation_from_events,
        handlers::notations::list_notations,
        handlers::notations::get_notation,
        handlers::notations::update_notation,
        handlers::notations::delete_notation,
        handlers::notations::restore_notation,
        handlers::notations::notation_timeline,
        handlers::notations::export_notation,
        handlers::notations::validate_stored_notation,
        handlers::notations::notation_stats,
        // Enrichment
        handlers::enrichment::enhance_notation,
        handlers::enrichment::notation_variations,
        handlers::enrichment::notation_with_enhancements,
        handlers::enrichment::ai_status,
    ),
    components(
        schemas(
            error::ErrorResponse,
            models::MessageResponse,
            // Users and roles
            models::UserRead,
            models::UserCreate,
            models::UserUpdate,
            models::UserCount,
            models::PasswordChange,
            models::LoginRequest,
            models::Token,
            models::Role,
            models::UserRole,
            models::RoleCreate,
            models::RoleUpdate,
            models::RoleCount,
            models::RoleRemoval,
            models::RoleCheck,
            // Media
            models::Video,
            models::VideoUploadResponse,
            models::VideoUpdate,
            models::VideoList,
            models::VideoStats,
            models::ProcessingStatusResponse,
            models::OrphanCleanupResponse,
            models::SupportedFormats,
            models::AudioFile,
            // Jobs
            models::JobType,
            models::JobStatus,
            models::ProcessingJob,
            models::JobCreate,
            models::JobUpdate,
            models::JobDetail,
            models::JobStatistics,
            models::QueueStatus,
            models::StageStatus,
            models::PipelineStages,
            models::PipelineStatus,
            handlers::jobs::JobsHealth,
            handlers::jobs::JobCleanupResponse,
            // Audio processing
            handlers::audio_processing::ProcessingJobCreated,
            handlers::audio_processing::ExtractionSettings,
            handlers::audio_processing::ExtractionStatus,
            handlers::audio_processing::AudioInfo,
            handlers::audio_processing::AudioBasicInfo,
            handlers::audio_processing::AudioDetailedInfo,
            handlers::audio_processing::MyJobs,
            handlers::audio_processing::JobFilters,
            handlers::audio_processing::RecommendedSettings,
            handlers::audio_processing::AudioFormatInfo,
            handlers::audio_processing::AudioServiceInfo,
            handlers::audio_processing::AudioStatistics,
            // Notations
            models::Notation,
            models::NotationCreate,
            models::NotationUpdate,
            models::DrumEvent,
            models::NotationFromEvents,
            models::NotationList,
            models::NotationDetail,
            models::NotationValidationError,
            models::NotationValidationReport,
            models::TimeSignatureCount,
            models::ConfidenceDistribution,
            models::NotationStats,
            // Enrichment
            models::Enrichment,
            models::EnhancementType,
            models::DifficultyLevel,
            models::EnhanceRequest,
            models::VariationsRequest,
            models::EnhancementMetadata,
            models::NotationAnalysisResponse,
            models::EnhancementRead,
            models::NotationWithEnhancements,
            models::AiStatus,
        )
    ),
    modifiers(&BearerAuth),
    security(("bearer_auth" = [])),
    tags(
        (name = "auth", description = "Registration and token issuance"),
        (name = "users", description = "User accounts"),
        (name = "roles", description = "Roles and role assignment"),
        (name = "videos", description = "Video upload, listing and soft delete"),
        (name = "audio-files", description = "Audio tracks registered for a video"),
        (name = "jobs", description = "Processing job tracking"),
        (name = "audio", description = "Audio processing orchestration over jobs"),
        (name = "notations", description = "Drum notation documents"),
        (name = "enrichment", description = "LLM analysis of notations, cached per input"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_versioned_paths() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/v1/notations/from-events"));
        assert!(spec.paths.paths.contains_key("/api/v1/jobs/{id}"));
        assert!(spec
            .paths
            .paths
            .keys()
            .all(|path| path.starts_with("/api/v1/")));
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let spec = get_openapi_spec();
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}

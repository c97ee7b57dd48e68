//! Application state and sub-states.
//!
//! AppState is split into domain sub-states so handlers reach for only what they need.

use drumnote_core::Config;
use drumnote_db::{
    AudioFileRepository, EnrichmentRepository, JobRepository, NotationRepository,
    RoleRepository, UserRepository, VideoRepository,
};
use drumnote_services::DrumInsightService;
use drumnote_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

// ----- Sub-state types -----

/// Database pool and every repository.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub user_repository: UserRepository,
    pub role_repository: RoleRepository,
    pub video_repository: VideoRepository,
    pub audio_file_repository: AudioFileRepository,
    pub job_repository: JobRepository,
    pub notation_repository: NotationRepository,
    pub enrichment_repository: EnrichmentRepository,
}

impl DbState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_repository: UserRepository::new(pool.clone()),
            role_repository: RoleRepository::new(pool.clone()),
            video_repository: VideoRepository::new(pool.clone()),
            audio_file_repository: AudioFileRepository::new(pool.clone()),
            job_repository: JobRepository::new(pool.clone()),
            notation_repository: NotationRepository::new(pool.clone()),
            enrichment_repository: EnrichmentRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Object storage plus upload limits.
#[derive(Clone)]
pub struct MediaConfig {
    pub storage: Arc<dyn Storage>,
    pub video_max_file_size: usize,
    pub audio_max_file_size: usize,
    pub user_storage_quota_bytes: i64,
}

/// Token signing and admin bootstrap settings.
#[derive(Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub admin_emails: Vec<String>,
}

impl SecurityConfig {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

// ----- Application state -----

#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub media: MediaConfig,
    pub security: SecurityConfig,
    pub insights: DrumInsightService,
    pub is_production: bool,
}

impl AppState {
    pub fn new(
        config: &Config,
        pool: PgPool,
        storage: Arc<dyn Storage>,
        insights: DrumInsightService,
    ) -> Self {
        Self {
            db: DbState::new(pool),
            media: MediaConfig {
                storage,
                video_max_file_size: config.max_video_size_bytes,
                audio_max_file_size: config.max_audio_size_bytes,
                user_storage_quota_bytes: config.user_storage_quota_bytes,
            },
            security: SecurityConfig {
                jwt_secret: config.jwt_secret.clone(),
                jwt_expiry_hours: config.jwt_expiry_hours,
                admin_emails: config.admin_emails.clone(),
            },
            insights,
            is_production: config.is_production(),
        }
    }
}

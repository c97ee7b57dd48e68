use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Uploaded video metadata. The file itself lives in storage under `storage_path`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Video {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    #[serde(skip_serializing)]
    pub storage_path: String,
    pub content_type: String,
    pub file_size_bytes: i64,
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Video {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VideoUploadResponse {
    pub message: String,
    pub video: Video,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct VideoUpdate {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct VideoListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl VideoListQuery {
    pub const DEFAULT_PER_PAGE: i64 = 20;
    pub const MAX_PER_PAGE: i64 = 100;

    /// 1-based page; anything below 1 is treated as the first page.
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p >= 1).unwrap_or(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .filter(|n| (1..=Self::MAX_PER_PAGE).contains(n))
            .unwrap_or(Self::DEFAULT_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VideoList {
    pub videos: Vec<Video>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub pages: i64,
}

impl VideoList {
    pub fn new(videos: Vec<Video>, total: i64, page: i64, per_page: i64) -> Self {
        let pages = if per_page > 0 {
            ((total + per_page - 1) / per_page).max(1)
        } else {
            1
        };
        Self {
            videos,
            total,
            page,
            per_page,
            pages,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VideoDeleteQuery {
    #[serde(default)]
    pub hard: bool,
}

/// Aggregates over a user's non-deleted videos.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct VideoAggregates {
    pub total_videos: i64,
    pub total_size_bytes: i64,
    pub total_duration_seconds: Option<f64>,
    pub videos_with_audio: i64,
    pub videos_with_notation: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VideoStats {
    pub total_videos: i64,
    pub total_size_bytes: i64,
    pub total_size_mb: f64,
    pub total_duration_seconds: Option<f64>,
    pub total_duration_minutes: Option<f64>,
    pub videos_with_audio: i64,
    pub videos_with_notation: i64,
    pub storage_quota_bytes: i64,
    pub storage_quota_mb: f64,
    pub storage_used_percentage: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn bytes_to_mb(bytes: i64) -> f64 {
    round2(bytes as f64 / (1024.0 * 1024.0))
}

impl VideoStats {
    pub fn from_aggregates(agg: VideoAggregates, quota_bytes: i64) -> Self {
        let used_pct = if quota_bytes > 0 {
            round2(agg.total_size_bytes as f64 / quota_bytes as f64 * 100.0)
        } else {
            0.0
        };
        Self {
            total_videos: agg.total_videos,
            total_size_bytes: agg.total_size_bytes,
            total_size_mb: bytes_to_mb(agg.total_size_bytes),
            total_duration_seconds: agg.total_duration_seconds.map(round2),
            total_duration_minutes: agg.total_duration_seconds.map(|s| round2(s / 60.0)),
            videos_with_audio: agg.videos_with_audio,
            videos_with_notation: agg.videos_with_notation,
            storage_quota_bytes: quota_bytes,
            storage_quota_mb: bytes_to_mb(quota_bytes),
            storage_used_percentage: used_pct,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessingStatusResponse {
    pub video_id: Uuid,
    pub filename: String,
    pub has_audio_extracted: bool,
    pub audio_files_count: i64,
    pub processing_status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrphanCleanupResponse {
    pub message: String,
    pub orphaned_video_files_removed: usize,
    pub orphaned_audio_files_removed: usize,
    pub total_orphaned_files_removed: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SupportedFormats {
    pub extensions: Vec<String>,
    pub content_types: Vec<String>,
    pub max_file_size_bytes: usize,
    pub max_file_size_mb: usize,
    pub storage_quota_bytes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_coerces_out_of_range_values() {
        let q = VideoListQuery {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), 20);
        assert_eq!(q.offset(), 0);

        let q = VideoListQuery {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(q.offset(), 20);
    }

    #[test]
    fn page_count_rounds_up_with_minimum_one() {
        assert_eq!(VideoList::new(vec![], 0, 1, 20).pages, 1);
        assert_eq!(VideoList::new(vec![], 20, 1, 20).pages, 1);
        assert_eq!(VideoList::new(vec![], 21, 1, 20).pages, 2);
    }

    #[test]
    fn stats_compute_megabytes_and_percentage() {
        let agg = VideoAggregates {
            total_videos: 2,
            total_size_bytes: 512 * 1024 * 1024,
            total_duration_seconds: Some(90.0),
            videos_with_audio: 1,
            videos_with_notation: 0,
        };
        let stats = VideoStats::from_aggregates(agg, 1024 * 1024 * 1024);
        assert_eq!(stats.total_size_mb, 512.0);
        assert_eq!(stats.storage_quota_mb, 1024.0);
        assert_eq!(stats.storage_used_percentage, 50.0);
        assert_eq!(stats.total_duration_minutes, Some(1.5));
    }

    #[test]
    fn stats_without_durations() {
        let stats = VideoStats::from_aggregates(VideoAggregates::default(), 1024);
        assert_eq!(stats.total_duration_seconds, None);
        assert_eq!(stats.storage_used_percentage, 0.0);
    }
}

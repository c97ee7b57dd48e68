use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Audio track extracted from a video.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AudioFile {
    pub id: Uuid,
    pub video_id: Uuid,
    pub sample_rate: i32,
    pub channels: i32,
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing)]
    pub storage_path: String,
    pub file_size_bytes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Metadata fields sent alongside the audio file in a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFileMetadata {
    pub sample_rate: i32,
    pub channels: i32,
    pub duration_seconds: Option<f64>,
}

impl AudioFileMetadata {
    pub const MAX_SAMPLE_RATE: i32 = 192_000;
    pub const MAX_CHANNELS: i32 = 8;

    pub fn validate(&self) -> Result<(), crate::AppError> {
        if !(1..=Self::MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(crate::AppError::InvalidInput(format!(
                "sample_rate must be between 1 and {}",
                Self::MAX_SAMPLE_RATE
            )));
        }
        if !(1..=Self::MAX_CHANNELS).contains(&self.channels) {
            return Err(crate::AppError::InvalidInput(format!(
                "channels must be between 1 and {}",
                Self::MAX_CHANNELS
            )));
        }
        if let Some(d) = self.duration_seconds {
            if !d.is_finite() || d < 0.0 {
                return Err(crate::AppError::InvalidInput(
                    "duration_seconds must be a non-negative number".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_bounds() {
        let ok = AudioFileMetadata {
            sample_rate: 44_100,
            channels: 1,
            duration_seconds: Some(12.5),
        };
        assert!(ok.validate().is_ok());

        let bad_rate = AudioFileMetadata {
            sample_rate: 0,
            ..ok.clone()
        };
        assert!(bad_rate.validate().is_err());

        let bad_channels = AudioFileMetadata {
            channels: 9,
            ..ok.clone()
        };
        assert!(bad_channels.validate().is_err());

        let bad_duration = AudioFileMetadata {
            duration_seconds: Some(-1.0),
            ..ok
        };
        assert!(bad_duration.validate().is_err());
    }
}

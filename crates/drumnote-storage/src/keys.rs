//! Shared key generation for stored media.

use uuid::Uuid;

pub const VIDEO_PREFIX: &str = "videos";
pub const AUDIO_PREFIX: &str = "audio";

/// `videos/{user_id}/{object_id}.{extension}`
pub fn video_key(user_id: Uuid, object_id: Uuid, extension: &str) -> String {
    format!("{}/{}/{}.{}", VIDEO_PREFIX, user_id, object_id, extension)
}

/// `audio/{video_id}/{object_id}.{extension}`
pub fn audio_key(video_id: Uuid, object_id: Uuid, extension: &str) -> String {
    format!("{}/{}/{}.{}", AUDIO_PREFIX, video_id, object_id, extension)
}

/// Whether a key is safe to resolve below a storage root.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key.split('/').all(|part| !part.is_empty() && part != ".." && part != ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        let user = Uuid::nil();
        let object = Uuid::nil();
        assert_eq!(
            video_key(user, object, "mp4"),
            format!("videos/{}/{}.mp4", user, object)
        );
        assert!(audio_key(user, object, "wav").starts_with("audio/"));
    }

    #[test]
    fn key_validation() {
        assert!(is_valid_key("videos/a/b.mp4"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("/etc/passwd"));
        assert!(!is_valid_key("videos/../../etc/passwd"));
        assert!(!is_valid_key("videos\\a.mp4"));
        assert!(!is_valid_key("videos//a.mp4"));
    }
}

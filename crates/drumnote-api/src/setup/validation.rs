//! Startup configuration checks

use anyhow::Result;
use drumnote_core::Config;

/// Fail fast on settings the server cannot run safely with.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() && config.cors_origins.iter().any(|o| o == "*") {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production. \
            Set specific allowed origins via CORS_ORIGINS."
        ));
    }

    if config.max_video_size_bytes == 0 || config.max_audio_size_bytes == 0 {
        return Err(anyhow::anyhow!("Upload size limits cannot be 0"));
    }

    if config.max_concurrent_requests == 0 {
        return Err(anyhow::anyhow!("Concurrent request limit cannot be 0"));
    }

    if config.admin_emails.is_empty() {
        tracing::warn!("ADMIN_EMAILS is empty - no account will receive the admin role on registration");
    }

    if !config.openai.is_enabled() {
        tracing::warn!("OPENAI_API_KEY not set - enrichment endpoints will return fallback content");
    }

    tracing::info!("Configuration validation passed");
    Ok(())
}

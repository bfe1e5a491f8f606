use crate::story::config::StoryConfig;
use std::path::Path;

/// Candidate locations searched when no explicit configuration path is given.
pub const CANDIDATE_PATHS: [&str; 3] = ["src/config/story.yaml", "config/story.yaml", "story.yaml"];

/// Try loading the story configuration from an explicit path or the common candidate paths.
/// On any error or missing file it falls back to defaults. Environment overrides always apply.
pub fn load_app_config(explicit: Option<&str>) -> StoryConfig {
    let mut config = explicit
        .map(|path| StoryConfig::load_or_default(path))
        .or_else(|| {
            CANDIDATE_PATHS
                .iter()
                .find(|p| Path::new(p).exists())
                .map(|p| StoryConfig::load_or_default(p))
        })
        .unwrap_or_else(|| {
            log::info!("[config] using default story config");
            StoryConfig::default()
        });

    config.apply_env_overrides();
    if let Err(e) = config.validate() {
        log::warn!("[config] {}; falling back to defaults", e);
        let mut fallback = StoryConfig::default();
        fallback.apply_env_overrides();
        return fallback;
    }
    config
}

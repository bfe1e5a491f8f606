use crate::story::errors::{ConfigurationError, StoryResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the story editor
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StoryConfig {
    /// Backend connection settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Editor defaults and save behaviour
    #[serde(default)]
    pub editor: EditorConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for the REST backend
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every `/project-story/...` route is appended to
    pub base_url: String,
    /// Static bearer token; usually supplied through `STORY_API_TOKEN`
    pub token: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string for requests
    pub user_agent: String,
}

/// Editor behaviour
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EditorConfig {
    /// HTML seeded into the story section when nothing is stored
    pub default_story_html: String,
    /// HTML seeded into the risks section when nothing is stored
    pub default_risks_html: String,
    /// Heading text that starts the risks section inside the combined block list
    pub risks_heading: String,
    /// How long a successful save is reported as "saved"
    pub saved_display_ms: u64,
    /// Content of the IMAGE block created while an upload is in flight
    pub image_placeholder_url: String,
    /// Submit the risks section together with the story on publish
    pub publish_includes_risks: bool,
}

/// Configuration for logging behavior
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Include timestamps in log lines
    pub timestamps: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            token: None,
            timeout_seconds: 30,
            user_agent: "story-sync/0.1".to_string(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_story_html: "<h2>About this project</h2>\
                <p>Tell backers what you are making, why it matters and how their support will be used.</p>"
                .to_string(),
            default_risks_html: "<h2>Risks and Challenges</h2>\
                <p>Describe what could delay or change the project and how you plan to handle it.</p>"
                .to_string(),
            risks_heading: "Risks and Challenges".to_string(),
            saved_display_ms: 2000,
            image_placeholder_url: "https://placehold.co/600x400.png".to_string(),
            publish_includes_risks: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            timestamps: true,
        }
    }
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl StoryConfig {
    /// Load configuration from a YAML file
    pub fn load_from_yaml(file_path: &str) -> StoryResult<Self> {
        let config_content = std::fs::read_to_string(file_path)
            .map_err(|_| ConfigurationError::FileNotFound(file_path.to_string()))?;
        let config: StoryConfig = serde_yaml::from_str(&config_content)?;
        Ok(config)
    }

    /// Load configuration with fallback to default if file doesn't exist
    pub fn load_or_default(file_path: &str) -> Self {
        match Self::load_from_yaml(file_path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", file_path);
                config
            }
            Err(e) => {
                log::warn!(
                    "Failed to load configuration from {}: {}. Using default configuration.",
                    file_path,
                    e
                );
                Self::default()
            }
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml(&self, file_path: &str) -> StoryResult<()> {
        let yaml_content = serde_yaml::to_string(self)?;

        if let Some(parent) = PathBuf::from(file_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigurationError::WriteFailed(e.to_string()))?;
        }

        std::fs::write(file_path, yaml_content)
            .map_err(|e| ConfigurationError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    /// Apply `STORY_API_BASE_URL` / `STORY_API_TOKEN` on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("STORY_API_BASE_URL") {
            if !base_url.trim().is_empty() {
                self.api.base_url = base_url;
            }
        }
        if let Ok(token) = std::env::var("STORY_API_TOKEN") {
            if !token.trim().is_empty() {
                self.api.token = Some(token);
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> StoryResult<()> {
        let fail = |msg: String| -> StoryResult<()> {
            Err(ConfigurationError::ValidationFailed(msg).into())
        };

        if url::Url::parse(&self.api.base_url).is_err() {
            return fail(format!("Invalid API base URL '{}'", self.api.base_url));
        }
        if self.api.timeout_seconds == 0 {
            return fail("Timeout must be greater than 0 seconds".to_string());
        }
        if self.api.user_agent.is_empty() {
            return fail("User agent cannot be empty".to_string());
        }
        if self.editor.risks_heading.trim().is_empty() {
            return fail("Risks heading cannot be empty".to_string());
        }
        if self.editor.saved_display_ms > 60_000 {
            return fail("Saved status should not be displayed for more than a minute".to_string());
        }
        if self.editor.image_placeholder_url.trim().is_empty() {
            return fail("Image placeholder URL cannot be empty".to_string());
        }
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigurationError::InvalidLogLevel(self.logging.level.clone()).into());
        }
        Ok(())
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> StoryResult<()> {
        use log::LevelFilter;

        let log_level = match self.logging.level.as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            other => return Err(ConfigurationError::InvalidLogLevel(other.to_string()).into()),
        };

        let mut builder = env_logger::Builder::from_default_env();
        builder.filter_level(log_level);
        if !self.logging.timestamps {
            builder.format_timestamp(None);
        }
        // A second initialisation (tests, embedding apps) keeps the first logger.
        let _ = builder.try_init();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = StoryConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.editor.saved_display_ms, 2000);
        assert_eq!(config.editor.risks_heading, "Risks and Challenges");
        assert!(config.editor.default_risks_html.contains("Risks and Challenges"));
        assert!(!config.editor.publish_includes_risks);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        let mut config = StoryConfig::default();
        assert!(config.validate().is_ok());

        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config = StoryConfig::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());

        config = StoryConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("story.yaml");

        let mut original = StoryConfig::default();
        original.api.base_url = "https://api.example.com".to_string();
        original.save_to_yaml(config_path.to_str().unwrap()).unwrap();

        let loaded = StoryConfig::load_from_yaml(config_path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.api.base_url, "https://api.example.com");
        assert_eq!(loaded.editor.saved_display_ms, original.editor.saved_display_ms);
    }

    #[test]
    fn test_load_or_default_with_partial_file() {
        let config = StoryConfig::load_or_default("non_existent_file.yaml");
        assert_eq!(config.api.base_url, "http://localhost:8080");

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("story.yaml");
        let yaml_content = r#"
api:
  base_url: "https://crowdfund.example.com/api"
  timeout_seconds: 10
editor:
  saved_display_ms: 0
logging:
  level: "debug"
"#;
        fs::write(&config_path, yaml_content).unwrap();

        let config = StoryConfig::load_or_default(config_path.to_str().unwrap());
        assert_eq!(config.api.base_url, "https://crowdfund.example.com/api");
        assert_eq!(config.api.timeout_seconds, 10);
        assert_eq!(config.api.user_agent, "story-sync/0.1");
        assert_eq!(config.editor.saved_display_ms, 0);
        assert_eq!(config.logging.level, "debug");
    }
}

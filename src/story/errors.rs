use std::fmt;

/// Error types for the story editor core
#[derive(Debug)]
pub enum StoryError {
    /// Block/HTML conversion errors
    Conversion(ConversionError),
    /// Backend responded with something we could not use
    Api(ApiError),
    /// Transport level failures
    Network(NetworkError),
    /// Configuration related errors
    Configuration(ConfigurationError),
    /// Validation related errors
    Validation(ValidationError),
    /// Session context persistence errors
    Session(SessionError),
}

/// Block/HTML conversion specific errors
#[derive(Debug)]
pub enum ConversionError {
    InvalidVideoUrl(String),
    InvalidImageUrl(String),
    MalformedMetadata(String),
    SerializationFailed(String),
}

/// Errors reported by the story backend
#[derive(Debug)]
pub enum ApiError {
    Status { status: u16, message: String },
    UnexpectedResponse(String),
    Unauthorized,
    MissingStoryId,
    BlockNotFound(String),
}

/// Network specific errors
#[derive(Debug)]
pub enum NetworkError {
    ConnectionFailed(String),
    TimeoutError(String),
    RequestFailed(String),
}

/// Configuration specific errors
#[derive(Debug)]
pub enum ConfigurationError {
    FileNotFound(String),
    ParseError(String),
    ValidationFailed(String),
    InvalidLogLevel(String),
    WriteFailed(String),
}

/// Validation specific errors
#[derive(Debug)]
pub enum ValidationError {
    InvalidUrl(String),
    MissingProjectId,
    InvalidInput(String),
}

/// Session context specific errors
#[derive(Debug)]
pub enum SessionError {
    ReadFailed(std::io::Error),
    WriteFailed(std::io::Error),
    Corrupted(String),
}

impl fmt::Display for StoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoryError::Conversion(e) => write!(f, "Conversion error: {}", e),
            StoryError::Api(e) => write!(f, "API error: {}", e),
            StoryError::Network(e) => write!(f, "Network error: {}", e),
            StoryError::Configuration(e) => write!(f, "Configuration error: {}", e),
            StoryError::Validation(e) => write!(f, "Validation error: {}", e),
            StoryError::Session(e) => write!(f, "Session error: {}", e),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::InvalidVideoUrl(url) => write!(f, "Unrecognized video URL: {}", url),
            ConversionError::InvalidImageUrl(url) => write!(f, "Unusable image URL: {}", url),
            ConversionError::MalformedMetadata(msg) => write!(f, "Malformed block metadata: {}", msg),
            ConversionError::SerializationFailed(msg) => {
                write!(f, "Block serialization failed: {}", msg)
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Status { status, message } => {
                write!(f, "Backend returned {}: {}", status, message)
            }
            ApiError::UnexpectedResponse(msg) => write!(f, "Unexpected response shape: {}", msg),
            ApiError::Unauthorized => write!(f, "No valid access token available"),
            ApiError::MissingStoryId => write!(f, "Story has not been created yet"),
            ApiError::BlockNotFound(what) => write!(f, "Story block not found: {}", what),
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ConnectionFailed(url) => write!(f, "Connection failed to: {}", url),
            NetworkError::TimeoutError(url) => write!(f, "Network timeout for: {}", url),
            NetworkError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigurationError::ParseError(msg) => write!(f, "Configuration parse error: {}", msg),
            ConfigurationError::ValidationFailed(msg) => {
                write!(f, "Configuration validation failed: {}", msg)
            }
            ConfigurationError::InvalidLogLevel(level) => {
                write!(f, "Invalid log level: {}", level)
            }
            ConfigurationError::WriteFailed(msg) => {
                write!(f, "Failed to write configuration: {}", msg)
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            ValidationError::MissingProjectId => write!(f, "No project selected"),
            ValidationError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::ReadFailed(e) => write!(f, "Failed to read session: {}", e),
            SessionError::WriteFailed(e) => write!(f, "Failed to write session: {}", e),
            SessionError::Corrupted(msg) => write!(f, "Session file is corrupted: {}", msg),
        }
    }
}

impl std::error::Error for StoryError {}
impl std::error::Error for ConversionError {}
impl std::error::Error for ApiError {}
impl std::error::Error for NetworkError {}
impl std::error::Error for ConfigurationError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for SessionError {}

impl From<url::ParseError> for StoryError {
    fn from(err: url::ParseError) -> Self {
        StoryError::Validation(ValidationError::InvalidUrl(err.to_string()))
    }
}

impl From<serde_yaml::Error> for StoryError {
    fn from(err: serde_yaml::Error) -> Self {
        StoryError::Configuration(ConfigurationError::ParseError(err.to_string()))
    }
}

impl From<serde_json::Error> for StoryError {
    fn from(err: serde_json::Error) -> Self {
        StoryError::Api(ApiError::UnexpectedResponse(err.to_string()))
    }
}

impl From<reqwest::Error> for StoryError {
    fn from(err: reqwest::Error) -> Self {
        let target = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        if err.is_timeout() {
            StoryError::Network(NetworkError::TimeoutError(target))
        } else if err.is_connect() {
            StoryError::Network(NetworkError::ConnectionFailed(target))
        } else if err.is_decode() {
            StoryError::Api(ApiError::UnexpectedResponse(err.to_string()))
        } else {
            StoryError::Network(NetworkError::RequestFailed(err.to_string()))
        }
    }
}

impl From<ConversionError> for StoryError {
    fn from(err: ConversionError) -> Self {
        StoryError::Conversion(err)
    }
}

impl From<ApiError> for StoryError {
    fn from(err: ApiError) -> Self {
        StoryError::Api(err)
    }
}

impl From<NetworkError> for StoryError {
    fn from(err: NetworkError) -> Self {
        StoryError::Network(err)
    }
}

impl From<ConfigurationError> for StoryError {
    fn from(err: ConfigurationError) -> Self {
        StoryError::Configuration(err)
    }
}

impl From<ValidationError> for StoryError {
    fn from(err: ValidationError) -> Self {
        StoryError::Validation(err)
    }
}

impl From<SessionError> for StoryError {
    fn from(err: SessionError) -> Self {
        StoryError::Session(err)
    }
}

/// Result type alias for story operations
pub type StoryResult<T> = Result<T, StoryError>;

/// Error recovery strategies
pub struct ErrorRecovery;

impl ErrorRecovery {
    /// Determine if an error is worth retrying
    pub fn is_recoverable(error: &StoryError) -> bool {
        match error {
            StoryError::Network(_) => true,
            StoryError::Api(ApiError::Status { status, .. }) => *status >= 500,
            StoryError::Api(ApiError::BlockNotFound(_)) => true,
            _ => false,
        }
    }

    /// Get retry count for recoverable errors
    pub fn get_retry_count(error: &StoryError) -> usize {
        match error {
            StoryError::Network(NetworkError::TimeoutError(_)) => 3,
            StoryError::Network(_) => 2,
            StoryError::Api(ApiError::Status { .. }) => 1,
            StoryError::Api(ApiError::BlockNotFound(_)) => 1,
            _ => 0,
        }
    }

    /// Get delay before retry (in milliseconds)
    pub fn get_retry_delay(error: &StoryError, attempt: usize) -> u64 {
        let base_delay = match error {
            StoryError::Network(_) => 1000,
            StoryError::Api(_) => 500,
            _ => 0,
        };

        // Exponential backoff
        base_delay * (2_u64.pow(attempt as u32))
    }

    /// Suggest fallback action for non-recoverable errors
    pub fn suggest_fallback(error: &StoryError) -> Option<String> {
        match error {
            StoryError::Api(ApiError::Unauthorized) => {
                Some("Sign in again to refresh the access token".to_string())
            }
            StoryError::Api(ApiError::MissingStoryId) => {
                Some("Save the story once before uploading media".to_string())
            }
            StoryError::Configuration(_) => Some("Use default configuration values".to_string()),
            StoryError::Validation(ValidationError::MissingProjectId) => {
                Some("Select a project before editing its story".to_string())
            }
            _ => None,
        }
    }
}

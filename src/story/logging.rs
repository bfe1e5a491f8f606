use crate::story::errors::{ErrorRecovery, StoryError};
use log::{debug, error, info, trace, warn};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Structured logging utilities for the story editor
pub struct StoryLogger {
    start_time: Instant,
    operation_timers: HashMap<String, Instant>,
    stats: LoggingStats,
    project_id: Option<String>,
    story_id: Option<String>,
}

/// Statistics for logging operations
#[derive(Debug, Default, Clone)]
pub struct LoggingStats {
    pub total_operations: usize,
    pub successful_operations: usize,
    pub failed_operations: usize,
    pub warnings_count: usize,
    pub errors_count: usize,
    pub api_calls: usize,
}

#[derive(Debug, Clone, Copy)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Context information for structured logging
#[derive(Debug, Clone)]
pub struct LogContext {
    pub operation: String,
    pub project_id: Option<String>,
    pub story_id: Option<String>,
    pub additional_data: HashMap<String, String>,
}

impl LogContext {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            project_id: None,
            story_id: None,
            additional_data: HashMap::new(),
        }
    }

    pub fn with_ids(mut self, project_id: Option<&str>, story_id: Option<&str>) -> Self {
        self.project_id = project_id.map(str::to_string);
        self.story_id = story_id.map(str::to_string);
        self
    }

    pub fn with_data(mut self, key: &str, value: impl ToString) -> Self {
        self.additional_data.insert(key.to_string(), value.to_string());
        self
    }
}

impl StoryLogger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            operation_timers: HashMap::new(),
            stats: LoggingStats::default(),
            project_id: None,
            story_id: None,
        }
    }

    /// Remember which project and story later log lines belong to.
    pub fn set_story_ids(&mut self, project_id: Option<&str>, story_id: Option<&str>) {
        self.project_id = project_id.map(str::to_string);
        self.story_id = story_id.map(str::to_string);
    }

    pub(crate) fn context(&self, operation: &str) -> LogContext {
        LogContext::new(operation).with_ids(self.project_id.as_deref(), self.story_id.as_deref())
    }

    /// Start timing an operation
    pub fn start_operation(&mut self, operation_name: &str) {
        self.operation_timers
            .insert(operation_name.to_string(), Instant::now());
        info!("🚀 Starting operation: {}", operation_name);
    }

    /// End timing an operation and log the duration
    pub fn end_operation(&mut self, operation_name: &str, success: bool) {
        if let Some(start_time) = self.operation_timers.remove(operation_name) {
            let duration = start_time.elapsed();
            let status = if success { "✅ SUCCESS" } else { "❌ FAILED" };

            info!("{} Operation '{}' completed in {:?}", status, operation_name, duration);

            self.stats.total_operations += 1;
            if success {
                self.stats.successful_operations += 1;
            } else {
                self.stats.failed_operations += 1;
            }
        }
    }

    /// Log a blocks <-> HTML conversion
    pub fn log_conversion(&mut self, direction: &str, input_size: usize, block_count: usize) {
        let context = self.context("conversion")
            .with_data("direction", direction)
            .with_data("input_size_bytes", input_size)
            .with_data("blocks", block_count);

        info!("📝 Conversion {}: {} bytes <-> {} block(s)", direction, input_size, block_count);
        self.log_structured(LogLevel::Debug, "Conversion completed", &context);
    }

    /// Log a backend call
    pub fn log_api_call(&mut self, method: &str, route: &str, success: bool, details: Option<&str>) {
        self.stats.api_calls += 1;
        let mut context = self.context("api_call")
            .with_data("method", method)
            .with_data("route", route)
            .with_data("success", success);
        if let Some(detail) = details {
            context = context.with_data("details", detail);
        }

        if success {
            info!("🌐 {} {}", method, route);
        } else {
            warn!("⚠️  {} {} failed - {}", method, route, details.unwrap_or("no details"));
            self.stats.warnings_count += 1;
        }

        let level = if success { LogLevel::Debug } else { LogLevel::Warn };
        self.log_structured(level, "API call completed", &context);
    }

    /// Log configuration activity
    pub fn log_configuration(&mut self, operation: &str, config_path: Option<&str>, success: bool) {
        let context = self.context(&format!("config_{}", operation))
            .with_data("path", config_path.unwrap_or("default"))
            .with_data("success", success);

        if success {
            info!("⚙️  Configuration {}: {}", operation, config_path.unwrap_or("default"));
        } else {
            error!(
                "❌ Configuration {} failed: {}",
                operation,
                config_path.unwrap_or("default")
            );
            self.stats.errors_count += 1;
        }

        let level = if success { LogLevel::Info } else { LogLevel::Error };
        self.log_structured(level, &format!("Configuration {} completed", operation), &context);
    }

    /// Log error with recovery information
    pub fn log_error_with_recovery(&mut self, error: &StoryError, recovery_attempted: bool) {
        error!("❌ Error occurred: {}", error);

        if ErrorRecovery::is_recoverable(error) {
            info!(
                "🔄 Error is recoverable (max retries: {})",
                ErrorRecovery::get_retry_count(error)
            );
            if recovery_attempted {
                info!("🔄 Recovery was attempted");
            }
        } else {
            warn!("⚠️  Error is not recoverable");
            if let Some(suggestion) = ErrorRecovery::suggest_fallback(error) {
                info!("💡 Suggested fallback: {}", suggestion);
            }
        }

        self.stats.errors_count += 1;
        let context = self
            .context("error")
            .with_data("recovery_attempted", recovery_attempted);
        self.log_structured(LogLevel::Debug, &error.to_string(), &context);
    }

    pub fn get_stats(&self) -> &LoggingStats {
        &self.stats
    }

    /// Get total elapsed time since logger creation
    pub fn get_total_elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn log_final_summary(&self) {
        let total_time = self.get_total_elapsed();

        info!("🏁 Story session completed in {:?}", total_time);
        info!("📊 Final statistics:");
        info!("   Total operations: {}", self.stats.total_operations);
        info!("   Successful: {}", self.stats.successful_operations);
        info!("   Failed: {}", self.stats.failed_operations);
        info!("   API calls: {}", self.stats.api_calls);
        info!("   Warnings: {}", self.stats.warnings_count);
        info!("   Errors: {}", self.stats.errors_count);

        let success_rate = if self.stats.total_operations > 0 {
            (self.stats.successful_operations as f64 / self.stats.total_operations as f64) * 100.0
        } else {
            0.0
        };

        info!("   Success rate: {:.1}%", success_rate);
    }

    fn log_structured(&self, level: LogLevel, message: &str, context: &LogContext) {
        let log_entry = format!(
            "[{}] {} | Project: {} | Story: {} | Data: {:?}",
            context.operation,
            message,
            context.project_id.as_deref().unwrap_or("N/A"),
            context.story_id.as_deref().unwrap_or("N/A"),
            context.additional_data
        );

        match level {
            LogLevel::Trace => trace!("{}", log_entry),
            LogLevel::Debug => debug!("{}", log_entry),
            LogLevel::Info => info!("{}", log_entry),
            LogLevel::Warn => warn!("{}", log_entry),
            LogLevel::Error => error!("{}", log_entry),
        }
    }
}

impl Default for StoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::errors::{ApiError, NetworkError};

    #[test]
    fn test_story_logger_creation() {
        let logger = StoryLogger::new();
        assert_eq!(logger.stats.total_operations, 0);
        assert_eq!(logger.stats.api_calls, 0);
    }

    #[test]
    fn test_operation_timing() {
        let mut logger = StoryLogger::new();

        logger.start_operation("save");
        std::thread::sleep(Duration::from_millis(5));
        logger.end_operation("save", true);
        logger.start_operation("publish");
        logger.end_operation("publish", false);
        // never started
        logger.end_operation("upload", true);

        assert_eq!(logger.stats.total_operations, 2);
        assert_eq!(logger.stats.successful_operations, 1);
        assert_eq!(logger.stats.failed_operations, 1);
    }

    #[test]
    fn test_logging_stats() {
        let mut logger = StoryLogger::new();

        logger.log_conversion("html->blocks", 120, 3);
        logger.log_api_call("GET", "/project-story/project/1", true, None);
        logger.log_api_call("PUT", "/project-story/9", false, Some("503"));
        logger.log_configuration("load", Some("story.yaml"), false);
        logger.log_error_with_recovery(&StoryError::Api(ApiError::Unauthorized), false);
        logger.log_error_with_recovery(
            &StoryError::Network(NetworkError::TimeoutError("x".into())),
            true,
        );

        let stats = logger.get_stats();
        assert_eq!(stats.api_calls, 2);
        assert_eq!(stats.warnings_count, 1);
        assert_eq!(stats.errors_count, 3);
        assert!(logger.get_total_elapsed() > Duration::from_nanos(1));
    }

    #[test]
    fn test_log_context_builder() {
        let context = LogContext::new("save").with_data("blocks", 4);
        assert_eq!(context.operation, "save");
        assert_eq!(context.additional_data.get("blocks").map(String::as_str), Some("4"));
        assert!(context.project_id.is_none());
    }

    #[test]
    fn test_contexts_carry_story_ids() {
        let mut logger = StoryLogger::new();
        assert!(logger.context("save").story_id.is_none());

        logger.set_story_ids(Some("p-1"), None);
        let context = logger.context("save");
        assert_eq!(context.project_id.as_deref(), Some("p-1"));
        assert!(context.story_id.is_none());

        logger.set_story_ids(Some("p-1"), Some("s-9"));
        let context = logger.context("publish");
        assert_eq!(context.operation, "publish");
        assert_eq!(context.story_id.as_deref(), Some("s-9"));
    }
}

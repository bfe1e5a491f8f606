use crate::story::errors::{SessionError, StoryResult, ValidationError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where to send the backer once an external payment page returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRedirect {
    pub project_id: String,
    pub amount: Option<u64>,
    pub return_url: Option<String>,
}

/// Cross-page state shared by the editor and payment flows.
///
/// Every field has explicit read, write and clear operations; nothing is global.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    selected_project_id: Option<String>,
    #[serde(default)]
    terms_agreed: bool,
    payment_redirect: Option<PaymentRedirect>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a file-backed session. A missing file starts an empty session.
    pub fn open(path: impl AsRef<Path>) -> StoryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut session = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(SessionError::ReadFailed)?;
            serde_yaml::from_str::<SessionContext>(&content)
                .map_err(|e| SessionError::Corrupted(e.to_string()))?
        } else {
            debug!("No session file at {:?}, starting fresh", path);
            Self::default()
        };
        session.path = Some(path);
        Ok(session)
    }

    /// Write the session back to its file, if it has one.
    pub fn persist(&self) -> StoryResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(SessionError::WriteFailed)?;
        }
        let content =
            serde_yaml::to_string(self).map_err(|e| SessionError::Corrupted(e.to_string()))?;
        std::fs::write(path, content).map_err(SessionError::WriteFailed)?;
        debug!("Session persisted to {:?}", path);
        Ok(())
    }

    pub fn selected_project_id(&self) -> Option<&str> {
        self.selected_project_id.as_deref()
    }

    pub fn select_project(&mut self, project_id: &str) -> StoryResult<()> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(ValidationError::InvalidInput("empty project id".to_string()).into());
        }
        info!("Selected project {}", project_id);
        self.selected_project_id = Some(project_id.to_string());
        Ok(())
    }

    pub fn clear_selected_project(&mut self) {
        self.selected_project_id = None;
    }

    pub fn terms_agreed(&self) -> bool {
        self.terms_agreed
    }

    pub fn set_terms_agreed(&mut self, agreed: bool) {
        self.terms_agreed = agreed;
    }

    pub fn payment_redirect(&self) -> Option<&PaymentRedirect> {
        self.payment_redirect.as_ref()
    }

    pub fn set_payment_redirect(&mut self, redirect: PaymentRedirect) {
        self.payment_redirect = Some(redirect);
    }

    /// Read-once semantics: the redirect is consumed by whoever handles the return.
    pub fn take_payment_redirect(&mut self) -> Option<PaymentRedirect> {
        self.payment_redirect.take()
    }

    /// Forget everything, e.g. on sign-out.
    pub fn clear(&mut self) {
        let path = self.path.take();
        *self = Self::default();
        self.path = path;
    }

    /// Explicit id wins over the selected one.
    pub fn resolve_project_id(&self, explicit: Option<&str>) -> StoryResult<String> {
        explicit
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .or(self.selected_project_id())
            .map(str::to_string)
            .ok_or_else(|| ValidationError::MissingProjectId.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::errors::StoryError;
    use tempfile::TempDir;

    #[test]
    fn test_project_resolution() {
        let mut session = SessionContext::new();
        assert!(session.resolve_project_id(None).is_err());

        session.select_project("p-7").unwrap();
        assert_eq!(session.resolve_project_id(None).unwrap(), "p-7");
        assert_eq!(session.resolve_project_id(Some("p-9")).unwrap(), "p-9");
        assert_eq!(session.resolve_project_id(Some("  ")).unwrap(), "p-7");

        assert!(session.select_project(" ").is_err());
        session.clear_selected_project();
        assert!(session.selected_project_id().is_none());
    }

    #[test]
    fn test_payment_redirect_is_read_once() {
        let mut session = SessionContext::new();
        session.set_payment_redirect(PaymentRedirect {
            project_id: "p-1".to_string(),
            amount: Some(2500),
            return_url: None,
        });
        assert!(session.payment_redirect().is_some());
        assert_eq!(session.take_payment_redirect().unwrap().amount, Some(2500));
        assert!(session.take_payment_redirect().is_none());
    }

    #[test]
    fn test_persist_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.yaml");

        let mut session = SessionContext::open(&path).unwrap();
        session.select_project("p-3").unwrap();
        session.set_terms_agreed(true);
        session.persist().unwrap();

        let reopened = SessionContext::open(&path).unwrap();
        assert_eq!(reopened.selected_project_id(), Some("p-3"));
        assert!(reopened.terms_agreed());

        let mut cleared = reopened.clone();
        cleared.clear();
        cleared.persist().unwrap();
        let reopened = SessionContext::open(&path).unwrap();
        assert!(reopened.selected_project_id().is_none());
        assert!(!reopened.terms_agreed());
    }

    #[test]
    fn test_corrupted_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.yaml");
        std::fs::write(&path, "terms_agreed: [not, a, bool]").unwrap();
        assert!(SessionContext::open(&path).is_err());
    }

    #[test]
    fn test_io_failures_keep_their_direction() {
        let temp_dir = TempDir::new().unwrap();
        // A directory exists but cannot be read as a file.
        match SessionContext::open(temp_dir.path()) {
            Err(StoryError::Session(SessionError::ReadFailed(_))) => {}
            other => panic!("Expected a read failure, got {:?}", other),
        }

        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let session = SessionContext::open(blocker.join("session.yaml")).unwrap();
        match session.persist() {
            Err(StoryError::Session(SessionError::WriteFailed(_))) => {}
            other => panic!("Expected a write failure, got {:?}", other),
        }
    }
}

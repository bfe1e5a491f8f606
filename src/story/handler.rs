//! Story lifecycle: load, save, update, publish and image upload against a `StoryApi`.
//!
//! Public operations never fail outward. Errors are logged, reflected in the saving status or the
//! error banner, and the operation reports success as a plain `bool` / `Option`.

use crate::story::api::StoryApi;
use crate::story::block::{ContentBlock, PublishStatus, StoryDocument, StoryPayload};
use crate::story::config::EditorConfig;
use crate::story::errors::{ApiError, StoryResult};
use crate::story::logging::StoryLogger;
use crate::story::normalizer::normalize_youtube_embeds;
use crate::story::parser::parse_html_to_blocks;
use crate::story::reconcile::{
    combine_sections, find_uploaded_block, preserve_media, split_sections, strip_server_fields,
};
use crate::story::renderer::{render_block, render_blocks};
use crate::story::session::SessionContext;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavingStatus {
    Idle,
    Saving,
    Saved,
    Error,
}

pub struct StoryHandler<A: StoryApi> {
    api: A,
    config: EditorConfig,
    session: SessionContext,
    project_id: Option<String>,
    story_id: Option<String>,
    story_html: String,
    risks_html: String,
    saving_status: SavingStatus,
    saved_at: Option<Instant>,
    publish_status: PublishStatus,
    error: Option<String>,
    fetch_attempted: bool,
    logger: StoryLogger,
}

impl<A: StoryApi> StoryHandler<A> {
    pub fn new(api: A, config: EditorConfig) -> Self {
        Self {
            api,
            story_html: config.default_story_html.clone(),
            risks_html: config.default_risks_html.clone(),
            config,
            session: SessionContext::new(),
            project_id: None,
            story_id: None,
            saving_status: SavingStatus::Idle,
            saved_at: None,
            publish_status: PublishStatus::Draft,
            error: None,
            fetch_attempted: false,
            logger: StoryLogger::new(),
        }
    }

    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn logger(&self) -> &StoryLogger {
        &self.logger
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn story_id(&self) -> Option<&str> {
        self.story_id.as_deref()
    }

    pub fn story_html(&self) -> &str {
        &self.story_html
    }

    pub fn risks_html(&self) -> &str {
        &self.risks_html
    }

    pub fn set_story_html(&mut self, html: impl Into<String>) {
        self.story_html = html.into();
    }

    pub fn set_risks_html(&mut self, html: impl Into<String>) {
        self.risks_html = html.into();
    }

    pub fn publish_status(&self) -> PublishStatus {
        self.publish_status
    }

    /// Local toggle only; it is sent with the next save or update of an existing story.
    pub fn set_publish_status(&mut self, status: PublishStatus) {
        self.publish_status = status;
    }

    /// `Saved` reads as `Idle` once the display delay has passed.
    pub fn saving_status(&self) -> SavingStatus {
        match (self.saving_status, self.saved_at) {
            (SavingStatus::Saved, Some(at))
                if at.elapsed() >= Duration::from_millis(self.config.saved_display_ms) =>
            {
                SavingStatus::Idle
            }
            (status, _) => status,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn fetch_attempted(&self) -> bool {
        self.fetch_attempted
    }

    /// Fetch the story for `project_id`, or for the session's selected project.
    ///
    /// Only the first call per project hits the backend; `retry_load` forces another attempt.
    pub async fn load(&mut self, project_id: Option<&str>) {
        let project_id = match self.session.resolve_project_id(project_id) {
            Ok(id) => id,
            Err(e) => {
                self.logger.log_error_with_recovery(&e, false);
                self.error = Some(e.to_string());
                return;
            }
        };
        if self.fetch_attempted && self.project_id.as_deref() == Some(project_id.as_str()) {
            debug!("Story for project {} already fetched", project_id);
            return;
        }

        self.logger.start_operation("load");
        self.fetch_attempted = true;
        self.project_id = Some(project_id.clone());
        self.track_ids();
        let route = format!("/project-story/project/{}", project_id);

        match self.api.fetch_story(&project_id).await {
            Ok(Some(document)) => {
                self.logger.log_api_call("GET", &route, true, None);
                self.apply_document(document);
                self.error = None;
                self.logger.end_operation("load", true);
            }
            Ok(None) => {
                self.logger.log_api_call("GET", &route, true, Some("no story yet"));
                info!("Project {} has no story, seeding placeholders", project_id);
                self.seed_defaults();
                self.error = None;
                self.logger.end_operation("load", true);
            }
            Err(e) => {
                self.logger.log_api_call("GET", &route, false, Some(e.to_string().as_str()));
                self.logger.log_error_with_recovery(&e, false);
                self.seed_defaults();
                self.error = Some(format!("Failed to load story: {}", e));
                self.logger.end_operation("load", false);
            }
        }
    }

    pub async fn retry_load(&mut self) {
        self.fetch_attempted = false;
        self.error = None;
        let project_id = self.project_id.clone();
        self.load(project_id.as_deref()).await;
    }

    /// Create the story as a draft, or overwrite the existing one keeping its publish status.
    pub async fn save(&mut self) -> bool {
        self.begin("save");
        let result = self.try_save().await;
        self.finish("save", result)
    }

    /// Like `save`, but keeps persisted media the editor no longer shows.
    pub async fn update(&mut self) -> bool {
        self.begin("update");
        let result = self.try_update().await;
        self.finish("update", result)
    }

    pub async fn publish(&mut self) -> bool {
        self.begin("publish");
        let result = self.try_publish().await;
        let published = self.finish("publish", result);
        if published {
            self.publish_status = PublishStatus::Published;
        }
        published
    }

    /// Upload an image into the story and return its hosted URL.
    ///
    /// On success the image markup is appended to the story section. On failure the backend may
    /// be left holding a placeholder block; the next save replaces it.
    pub async fn upload_image(&mut self, file_name: &str, bytes: Vec<u8>) -> Option<String> {
        self.logger.start_operation("upload_image");
        match self.try_upload_image(file_name, bytes).await {
            Ok(url) => {
                let markup = render_block(&ContentBlock::image(url.clone()));
                if !self.story_html.trim().is_empty() {
                    self.story_html.push('\n');
                }
                self.story_html.push_str(&markup);
                self.logger.end_operation("upload_image", true);
                Some(url)
            }
            Err(e) => {
                warn!("Image upload for {} failed: {}", file_name, e);
                self.logger.log_error_with_recovery(&e, false);
                self.logger.end_operation("upload_image", false);
                None
            }
        }
    }

    fn begin(&mut self, operation: &str) {
        self.logger.start_operation(operation);
        self.saving_status = SavingStatus::Saving;
        self.saved_at = None;
    }

    fn finish(&mut self, operation: &str, result: StoryResult<()>) -> bool {
        match result {
            Ok(()) => {
                self.saving_status = SavingStatus::Saved;
                self.saved_at = Some(Instant::now());
                self.error = None;
                self.logger.end_operation(operation, true);
                true
            }
            Err(e) => {
                self.logger.log_error_with_recovery(&e, false);
                self.saving_status = SavingStatus::Error;
                self.error = Some(format!("Failed to {} story: {}", operation, e));
                self.logger.end_operation(operation, false);
                false
            }
        }
    }

    fn seed_defaults(&mut self) {
        self.story_id = None;
        self.publish_status = PublishStatus::Draft;
        self.story_html = self.config.default_story_html.clone();
        self.risks_html = self.config.default_risks_html.clone();
        self.track_ids();
    }

    fn track_ids(&mut self) {
        self.logger
            .set_story_ids(self.project_id.as_deref(), self.story_id.as_deref());
    }

    fn apply_document(&mut self, document: StoryDocument) {
        let (story, risks) = split_sections(&document.blocks, &self.config.risks_heading);
        self.story_id = document.project_story_id;
        self.track_ids();
        self.publish_status = document.status;
        self.story_html = if story.is_empty() {
            self.config.default_story_html.clone()
        } else {
            render_blocks(&story)
        };
        self.risks_html = if risks.is_empty() {
            self.config.default_risks_html.clone()
        } else {
            render_blocks(&risks)
        };
        let size = self.story_html.len() + self.risks_html.len();
        self.logger
            .log_conversion("blocks->html", size, document.blocks.len());
    }

    fn require_project(&self) -> StoryResult<String> {
        self.session.resolve_project_id(self.project_id.as_deref())
    }

    /// Normalize both sections in place and return their combined blocks without server ids.
    fn prepare_blocks(&mut self) -> Vec<ContentBlock> {
        self.story_html = normalize_youtube_embeds(&self.story_html);
        self.risks_html = normalize_youtube_embeds(&self.risks_html);
        let story = parse_html_to_blocks(&self.story_html);
        let risks = parse_html_to_blocks(&self.risks_html);
        let size = self.story_html.len() + self.risks_html.len();
        let blocks = strip_server_fields(combine_sections(story, risks));
        self.logger.log_conversion("html->blocks", size, blocks.len());
        blocks
    }

    async fn create(&mut self, blocks: Vec<ContentBlock>) -> StoryResult<String> {
        let project_id = self.require_project()?;
        let route = format!("/project-story/{}", project_id);
        let payload = StoryPayload {
            blocks,
            status: PublishStatus::Draft,
        };
        let created = match self.api.create_story(&project_id, &payload).await {
            Ok(created) => created,
            Err(e) => {
                self.logger.log_api_call("POST", &route, false, Some(e.to_string().as_str()));
                return Err(e);
            }
        };
        self.logger.log_api_call("POST", &route, true, None);
        let story_id = created.project_story_id.ok_or(ApiError::MissingStoryId)?;
        info!("Created story {} for project {}", story_id, project_id);
        self.project_id = Some(project_id);
        self.story_id = Some(story_id.clone());
        self.track_ids();
        self.publish_status = created.status;
        Ok(story_id)
    }

    async fn put(&mut self, story_id: &str, payload: StoryPayload) -> StoryResult<()> {
        let route = format!("/project-story/{}", story_id);
        let result = self.api.update_story(story_id, &payload).await;
        let details = result.as_ref().err().map(|e| e.to_string());
        self.logger
            .log_api_call("PUT", &route, result.is_ok(), details.as_deref());
        result
    }

    async fn fetch(&mut self, project_id: &str) -> StoryResult<Option<StoryDocument>> {
        let route = format!("/project-story/project/{}", project_id);
        let result = self.api.fetch_story(project_id).await;
        let details = result.as_ref().err().map(|e| e.to_string());
        self.logger
            .log_api_call("GET", &route, result.is_ok(), details.as_deref());
        result
    }

    async fn try_save(&mut self) -> StoryResult<()> {
        let blocks = self.prepare_blocks();
        match self.story_id.clone() {
            None => {
                self.create(blocks).await?;
            }
            Some(story_id) => {
                let payload = StoryPayload {
                    blocks,
                    status: self.publish_status,
                };
                self.put(&story_id, payload).await?;
            }
        }
        Ok(())
    }

    async fn try_update(&mut self) -> StoryResult<()> {
        let Some(story_id) = self.story_id.clone() else {
            debug!("No story yet, update falls back to create");
            return self.try_save().await;
        };
        let project_id = self.require_project()?;
        let fresh = self.prepare_blocks();
        let persisted = self
            .fetch(&project_id)
            .await?
            .map(|document| document.blocks)
            .unwrap_or_default();
        let blocks = strip_server_fields(preserve_media(fresh, &persisted));
        let payload = StoryPayload {
            blocks,
            status: self.publish_status,
        };
        self.put(&story_id, payload).await
    }

    async fn try_publish(&mut self) -> StoryResult<()> {
        let story_id = match self.story_id.clone() {
            Some(id) => id,
            None => {
                let blocks = self.prepare_blocks();
                self.create(blocks).await?
            }
        };

        self.story_html = normalize_youtube_embeds(&self.story_html);
        let story = parse_html_to_blocks(&self.story_html);
        let blocks = if self.config.publish_includes_risks {
            self.risks_html = normalize_youtube_embeds(&self.risks_html);
            combine_sections(story, parse_html_to_blocks(&self.risks_html))
        } else {
            combine_sections(story, Vec::new())
        };
        let payload = StoryPayload {
            blocks: strip_server_fields(blocks),
            status: PublishStatus::Published,
        };
        self.put(&story_id, payload).await
    }

    async fn try_upload_image(&mut self, file_name: &str, bytes: Vec<u8>) -> StoryResult<String> {
        let project_id = self.require_project()?;
        let story_id = match self.story_id.clone() {
            Some(id) => id,
            None => {
                info!("Creating placeholder story before image upload");
                let blocks = self.prepare_blocks();
                self.create(blocks).await?
            }
        };

        // Placeholder goes at the end of the story section, ahead of the risks.
        let placeholder = self.config.image_placeholder_url.clone();
        let story = parse_html_to_blocks(&normalize_youtube_embeds(&self.story_html));
        let risks = parse_html_to_blocks(&normalize_youtube_embeds(&self.risks_html));
        let placeholder_order = story.len();
        let mut with_placeholder = story;
        with_placeholder.push(ContentBlock::image(placeholder.clone()));
        let payload = StoryPayload {
            blocks: strip_server_fields(combine_sections(with_placeholder, risks)),
            status: self.publish_status,
        };
        self.put(&story_id, payload).await?;

        let persisted = self
            .fetch(&project_id)
            .await?
            .map(|document| document.blocks)
            .unwrap_or_default();
        let block_id = find_uploaded_block(&persisted, &placeholder, placeholder_order)
            .and_then(|block| block.story_block_id.clone())
            .ok_or_else(|| ApiError::BlockNotFound(format!("placeholder at {}", placeholder_order)))?;
        debug!("Placeholder image stored as block {}", block_id);

        let route = format!("/project-story/upload-image-to-story-block/{}", block_id);
        let uploaded = match self.api.upload_block_image(&block_id, file_name, bytes).await {
            Ok(url) => url,
            Err(e) => {
                self.logger.log_api_call("POST", &route, false, Some(e.to_string().as_str()));
                return Err(e);
            }
        };
        self.logger.log_api_call("POST", &route, true, None);

        let hosted = self
            .fetch(&project_id)
            .await?
            .and_then(|document| {
                document
                    .blocks
                    .into_iter()
                    .find(|block| block.story_block_id.as_deref() == Some(block_id.as_str()))
            })
            .map(|block| block.content)
            .filter(|content| *content != placeholder && !content.is_empty())
            .unwrap_or(uploaded);
        info!("Image {} hosted at {}", file_name, hosted);
        Ok(hosted)
    }
}

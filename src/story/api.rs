//! REST boundary of the story editor.

use crate::story::block::{CreatedStory, StoryDocument, StoryPayload};
use crate::story::config::ApiConfig;
use crate::story::errors::{ApiError, StoryError, StoryResult};
use async_trait::async_trait;
use log::{debug, error, info, trace};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Source of bearer tokens. Refreshing is the provider's business.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn valid_token(&self) -> Option<String>;
}

/// A fixed token, typically taken from configuration or the environment.
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.trim().is_empty()))
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn valid_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Operations the story handler needs from the backend.
#[async_trait]
pub trait StoryApi: Send + Sync {
    /// `Ok(None)` when the project has no story yet.
    async fn fetch_story(&self, project_id: &str) -> StoryResult<Option<StoryDocument>>;

    async fn create_story(&self, project_id: &str, payload: &StoryPayload) -> StoryResult<CreatedStory>;

    async fn update_story(&self, story_id: &str, payload: &StoryPayload) -> StoryResult<()>;

    /// Upload an image binary into an existing IMAGE block and return its hosted URL.
    async fn upload_block_image(
        &self,
        story_block_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> StoryResult<String>;
}

/// The story body is sometimes wrapped in `data`.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoryEnvelope {
    Wrapped { data: StoryDocument },
    Bare(StoryDocument),
}

impl StoryEnvelope {
    fn into_document(self) -> StoryDocument {
        match self {
            StoryEnvelope::Wrapped { data } | StoryEnvelope::Bare(data) => data,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CreatedEnvelope {
    Wrapped { data: CreatedStory },
    Bare(CreatedStory),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadData {
    url: Option<String>,
    image_url: Option<String>,
}

/// Upload responses carry the URL as `url`, `imageUrl`, `data.url` or `data.imageUrl`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    url: Option<String>,
    image_url: Option<String>,
    data: Option<UploadData>,
}

impl UploadResponse {
    fn hosted_url(self) -> Option<String> {
        let nested = self.data.and_then(|d| d.url.or(d.image_url));
        self.url.or(self.image_url).or(nested).filter(|u| !u.is_empty())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// `StoryApi` over HTTP with bearer authentication.
pub struct HttpStoryApi {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpStoryApi {
    pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenProvider>) -> StoryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;
        info!("Story API client ready for {}", config.base_url);
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, request: RequestBuilder) -> StoryResult<RequestBuilder> {
        match self.tokens.valid_token().await {
            Some(token) => Ok(request.bearer_auth(token)),
            None => {
                error!("No valid access token for story API call");
                Err(ApiError::Unauthorized.into())
            }
        }
    }

    async fn check(response: Response) -> StoryResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or(body);
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        }
        .into())
    }
}

#[async_trait]
impl StoryApi for HttpStoryApi {
    async fn fetch_story(&self, project_id: &str) -> StoryResult<Option<StoryDocument>> {
        let url = self.url(&format!("/project-story/project/{}", project_id));
        trace!("GET {}", url);
        let response = self.authorized(self.client.get(&url)).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No story stored for project {}", project_id);
            return Ok(None);
        }
        let text = Self::check(response).await?.text().await?;
        let envelope: StoryEnvelope = serde_json::from_str(&text)?;
        Ok(Some(envelope.into_document()))
    }

    async fn create_story(&self, project_id: &str, payload: &StoryPayload) -> StoryResult<CreatedStory> {
        let url = self.url(&format!("/project-story/{}", project_id));
        trace!("POST {} ({} blocks)", url, payload.blocks.len());
        let request = self.authorized(self.client.post(&url).json(payload)).await?;
        let text = Self::check(request.send().await?).await?.text().await?;
        let created = match serde_json::from_str::<CreatedEnvelope>(&text)? {
            CreatedEnvelope::Wrapped { data } | CreatedEnvelope::Bare(data) => data,
        };
        if created.project_story_id.is_none() {
            return Err(ApiError::UnexpectedResponse(format!(
                "create response without projectStoryId: {}",
                text
            ))
            .into());
        }
        Ok(created)
    }

    async fn update_story(&self, story_id: &str, payload: &StoryPayload) -> StoryResult<()> {
        let url = self.url(&format!("/project-story/{}", story_id));
        trace!("PUT {} ({} blocks)", url, payload.blocks.len());
        let request = self.authorized(self.client.put(&url).json(payload)).await?;
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn upload_block_image(
        &self,
        story_block_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> StoryResult<String> {
        let url = self.url(&format!(
            "/project-story/upload-image-to-story-block/{}",
            story_block_id
        ));
        trace!("POST {} ({} bytes)", url, bytes.len());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));
        let request = self.authorized(self.client.post(&url).multipart(form)).await?;
        let text = Self::check(request.send().await?).await?.text().await?;
        let parsed: UploadResponse = serde_json::from_str(&text)?;
        parsed
            .hosted_url()
            .ok_or_else(|| StoryError::Api(ApiError::UnexpectedResponse(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::block::PublishStatus;

    #[test]
    fn test_upload_response_shapes() {
        for body in [
            r#"{"url": "https://cdn.example.com/a.png"}"#,
            r#"{"imageUrl": "https://cdn.example.com/a.png"}"#,
            r#"{"data": {"url": "https://cdn.example.com/a.png"}}"#,
            r#"{"data": {"imageUrl": "https://cdn.example.com/a.png"}}"#,
        ] {
            let parsed: UploadResponse = serde_json::from_str(body).unwrap();
            assert_eq!(
                parsed.hosted_url().as_deref(),
                Some("https://cdn.example.com/a.png"),
                "{}",
                body
            );
        }
        let empty: UploadResponse = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(empty.hosted_url().is_none());
    }

    #[test]
    fn test_story_envelopes() {
        let bare = r#"{"projectStoryId": 5, "status": "PUBLISHED", "blocks": []}"#;
        let wrapped = r#"{"data": {"projectStoryId": "5", "status": "PUBLISHED", "blocks": []}}"#;
        for body in [bare, wrapped] {
            let doc = serde_json::from_str::<StoryEnvelope>(body).unwrap().into_document();
            assert_eq!(doc.project_story_id.as_deref(), Some("5"));
            assert_eq!(doc.status, PublishStatus::Published);
        }
    }

    #[test]
    fn test_created_envelope() {
        let body = r#"{"data": {"projectStoryId": 12, "status": "DRAFT"}}"#;
        let created = match serde_json::from_str::<CreatedEnvelope>(body).unwrap() {
            CreatedEnvelope::Wrapped { data } | CreatedEnvelope::Bare(data) => data,
        };
        assert_eq!(created.project_story_id.as_deref(), Some("12"));
    }

    #[tokio::test]
    async fn test_static_token() {
        assert!(StaticToken::new(Some("  ".into())).valid_token().await.is_none());
        assert_eq!(
            StaticToken::new(Some("abc".into())).valid_token().await.as_deref(),
            Some("abc")
        );
    }
}

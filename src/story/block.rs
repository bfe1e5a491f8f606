//! Wire model for story content blocks.
//!
//! A story is persisted as one ordered list of typed blocks. Presentation attributes live in a
//! metadata bag nested under `additionalProp1`, which is the shape the backend hands out.

use crate::story::errors::ConversionError;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Key the backend nests every metadata bag under.
pub const METADATA_ENVELOPE: &str = "additionalProp1";

/// Block type tag. Unknown tags are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Text,
    Heading,
    Image,
    Video,
    Other(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Text => "TEXT",
            BlockType::Heading => "HEADING",
            BlockType::Image => "IMAGE",
            BlockType::Video => "VIDEO",
            BlockType::Other(tag) => tag,
        }
    }
}

impl From<String> for BlockType {
    fn from(tag: String) -> Self {
        match tag.to_ascii_uppercase().as_str() {
            "TEXT" => BlockType::Text,
            "HEADING" => BlockType::Heading,
            "IMAGE" => BlockType::Image,
            "VIDEO" => BlockType::Video,
            _ => BlockType::Other(tag),
        }
    }
}

impl From<BlockType> for String {
    fn from(kind: BlockType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation attributes of a block.
///
/// Accepts an object with or without the envelope, `null`, or a JSON-encoded string. A string
/// that does not parse is flagged as malformed so renderers can fall back to safe defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockMetadata {
    attrs: Map<String, Value>,
    malformed: bool,
}

impl BlockMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn malformed() -> Self {
        Self {
            attrs: Map::new(),
            malformed: true,
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// String view of a scalar attribute; empty strings count as absent.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.attrs.get(key)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Flags arrive as booleans, 0/1 numbers or their string spellings.
    pub fn get_flag(&self, key: &str) -> Option<bool> {
        match self.attrs.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Some(true),
                "0" | "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Small integers such as heading levels; integral floats (`2.0`) count too.
    pub fn get_u8(&self, key: &str) -> Option<u8> {
        let raw = self.get_str(key)?;
        raw.parse().ok().or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(v))
                .map(|v| v as u8)
        })
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::String(raw) if raw.trim().is_empty() => Self::default(),
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::String(_)) | Err(_) => {
                    log::warn!("Discarding {}", ConversionError::MalformedMetadata(raw));
                    Self::malformed()
                }
                Ok(parsed) => Self::from_value(parsed),
            },
            Value::Object(mut map) => match map.remove(METADATA_ENVELOPE) {
                Some(Value::Object(inner)) => Self {
                    attrs: inner,
                    malformed: false,
                },
                Some(inner @ Value::String(_)) => Self::from_value(inner),
                Some(_) | None => Self {
                    attrs: map,
                    malformed: false,
                },
            },
            other => {
                log::warn!("Ignoring {}", ConversionError::MalformedMetadata(other.to_string()));
                Self::malformed()
            }
        }
    }
}

impl Serialize for BlockMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(METADATA_ENVELOPE, &self.attrs)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for BlockMetadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}

/// Server ids show up both as numbers and as strings depending on the endpoint.
fn deserialize_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Explicit `null` reads the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One typed, ordered unit of story content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: BlockType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order: usize,
    #[serde(default)]
    pub metadata: BlockMetadata,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub story_block_id: Option<String>,
}

impl ContentBlock {
    pub fn new(kind: BlockType, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            order: 0,
            metadata: BlockMetadata::default(),
            story_block_id: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(BlockType::Text, content)
    }

    pub fn heading(content: impl Into<String>, level: u8) -> Self {
        Self::new(BlockType::Heading, content).with_metadata(BlockMetadata::new().with("level", level))
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::new(BlockType::Image, url)
    }

    pub fn video(embed_url: impl Into<String>) -> Self {
        Self::new(BlockType::Video, embed_url)
    }

    pub fn with_metadata(mut self, metadata: BlockMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }
}

/// Whether a story is visible on the public project page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishStatus::Draft => f.write_str("DRAFT"),
            PublishStatus::Published => f.write_str("PUBLISHED"),
        }
    }
}

/// A project's persisted story as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryDocument {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub project_story_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: PublishStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub blocks: Vec<ContentBlock>,
}

/// Body of create and update requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryPayload {
    pub blocks: Vec<ContentBlock>,
    pub status: PublishStatus,
}

/// Identity of a freshly created story.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedStory {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub project_story_id: Option<String>,
    #[serde(default)]
    pub status: PublishStatus,
}

//! HTML fragment → ordered content blocks.
//!
//! Detection runs in passes over one parsed tree: videos, images, bare YouTube links, then a
//! structural walk over whatever is left. Every pass records the nodes it claims so no element
//! is emitted twice, and every block remembers the pre-order position of the node that produced
//! it. The final list is sorted by that position and renumbered from zero.

use crate::story::block::{BlockMetadata, BlockType, ContentBlock};
use crate::story::dom::{
    attr, first_descendant, has_class, inner_html, is_block_level, node_key, outer_html,
    parse_fragment, tag_name,
};
use crate::story::errors::{ConversionError, StoryResult};
use crate::story::reconcile::renumber;
use crate::story::renderer::{
    DEFAULT_IMAGE_ALT, DEFAULT_IMAGE_CLASS, IMAGE_CONTAINER_CLASS, VIDEO_CONTAINER_CLASS,
};
use crate::story::style::{escape_text, style_value};
use crate::story::youtube;
use kuchiki::NodeRef;
use log::{debug, trace, warn};
use std::collections::{HashMap, HashSet};
use url::Url;

const MEDIA_TAGS: &[&str] = &["img", "iframe", "video", "audio", "source", "embed", "object"];
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Parse an HTML fragment into blocks with dense `order` values.
pub fn parse_html_to_blocks(html: &str) -> Vec<ContentBlock> {
    let Some(body) = parse_fragment(html) else {
        warn!("HTML fragment produced no body, returning no blocks");
        return Vec::new();
    };

    let mut parser = BlockParser::new(&body);
    prune_whitespace(&body);
    parser.detect_videos(&body);
    parser.detect_images(&body);
    parser.promote_youtube_paragraphs(&body);
    parser.walk(&body);

    let blocks = parser.finish();
    debug!("Parsed {} bytes of HTML into {} blocks", html.len(), blocks.len());
    blocks
}

/// Reduce an image URL to origin and path so signed query strings don't create new blocks.
pub fn canonical_image_url(src: &str) -> String {
    let src = src.trim();
    if src.starts_with("data:") || src.starts_with("blob:") {
        return src.to_string();
    }
    match Url::parse(src) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            format!("{}{}", url.origin().ascii_serialization(), url.path())
        }
        Ok(_) => src.to_string(),
        Err(_) => {
            let end = src.find(['?', '#']).unwrap_or(src.len());
            src[..end].to_string()
        }
    }
}

fn is_media_tag(tag: &str) -> bool {
    MEDIA_TAGS.contains(&tag)
}

fn contains_media(node: &NodeRef) -> bool {
    node.descendants()
        .filter_map(|d| tag_name(&d))
        .any(|tag| is_media_tag(&tag))
}

/// A missing neighbour or a block-level one; whitespace next to it is layout, not content.
fn is_block_boundary(sibling: Option<NodeRef>) -> bool {
    match sibling {
        None => true,
        Some(node) => tag_name(&node).map(|tag| is_block_level(&tag)).unwrap_or(false),
    }
}

/// Drop whitespace-only text between blocks and elements holding nothing but `<br>`s.
/// Spaces separating inline siblings are kept.
fn prune_whitespace(body: &NodeRef) {
    let nodes: Vec<NodeRef> = body.descendants().collect();
    let mut removed = 0usize;
    for node in nodes {
        if let Some(text) = node.as_text() {
            let is_blank = text.borrow().trim().is_empty();
            let at_block_level = node
                .parent()
                .map(|parent| parent == *body || tag_name(&parent).as_deref() == Some("div"))
                .unwrap_or(false);
            let between_blocks = is_block_boundary(node.previous_sibling())
                || is_block_boundary(node.next_sibling());
            if is_blank && at_block_level && between_blocks {
                node.detach();
                removed += 1;
            }
            continue;
        }
        let Some(tag) = tag_name(&node) else {
            continue;
        };
        if is_media_tag(&tag) || tag == "hr" {
            continue;
        }
        let bare_break = tag == "br" && node.parent().map(|p| p == *body).unwrap_or(false);
        let empty = tag != "br"
            && node.text_contents().trim().is_empty()
            && !contains_media(&node)
            && attr(&node, "data-video").is_none();
        if bare_break || empty {
            node.detach();
            removed += 1;
        }
    }
    trace!("Pruned {} empty nodes", removed);
}

fn text_metadata(node: &NodeRef) -> BlockMetadata {
    let mut metadata = BlockMetadata::new();
    if let Some(style) = attr(node, "style") {
        if let Some(align) = style_value(&style, "text-align") {
            metadata.insert("align", align);
        }
        if let Some(color) = style_value(&style, "color") {
            metadata.insert("color", color);
        }
    }
    metadata
}

fn heading_level(tag: &str) -> Option<u8> {
    let digit = tag.strip_prefix('h')?;
    match digit.parse::<u8>() {
        Ok(level @ 1..=6) => Some(level),
        _ => None,
    }
}

fn is_video_container(node: &NodeRef) -> bool {
    has_class(node, VIDEO_CONTAINER_CLASS)
        || has_class(node, "video-container")
        || attr(node, "data-type").as_deref() == Some("video")
        || attr(node, "data-video").is_some()
}

fn is_image_container(node: &NodeRef) -> bool {
    has_class(node, IMAGE_CONTAINER_CLASS) || attr(node, "data-type").as_deref() == Some("image")
}

fn video_metadata(width: &str, height: &str, flags: youtube::PlayerFlags) -> BlockMetadata {
    BlockMetadata::new()
        .with("width", width)
        .with("height", height)
        .with("autoplay", flags.autoplay)
        .with("controls", flags.controls)
}

struct BlockParser {
    positions: HashMap<usize, usize>,
    processed: HashSet<usize>,
    found: Vec<(usize, ContentBlock)>,
}

impl BlockParser {
    fn new(body: &NodeRef) -> Self {
        let positions = body
            .descendants()
            .enumerate()
            .map(|(index, node)| (node_key(&node), index))
            .collect();
        Self {
            positions,
            processed: HashSet::new(),
            found: Vec::new(),
        }
    }

    fn position(&self, node: &NodeRef) -> usize {
        self.positions
            .get(&node_key(node))
            .copied()
            .unwrap_or(usize::MAX)
    }

    fn is_processed(&self, node: &NodeRef) -> bool {
        self.processed.contains(&node_key(node))
    }

    fn has_processed_descendant(&self, node: &NodeRef) -> bool {
        node.descendants().any(|d| self.is_processed(&d))
    }

    fn claim(&mut self, node: &NodeRef) {
        for claimed in node.inclusive_descendants() {
            self.processed.insert(node_key(&claimed));
        }
    }

    fn emit(&mut self, node: &NodeRef, block: ContentBlock) {
        trace!("Emitting {} block at position {}", block.kind, self.position(node));
        self.found.push((self.position(node), block));
        self.claim(node);
    }

    fn elements(&self, body: &NodeRef) -> Vec<NodeRef> {
        body.descendants()
            .filter(|node| node.as_element().is_some())
            .collect()
    }

    fn detect_videos(&mut self, body: &NodeRef) {
        for node in self.elements(body) {
            if self.is_processed(&node) {
                continue;
            }
            let is_bare_iframe = tag_name(&node).as_deref() == Some("iframe")
                && attr(&node, "src")
                    .map(|src| youtube::is_youtube_url(&src))
                    .unwrap_or(false);
            if !is_bare_iframe && !is_video_container(&node) {
                continue;
            }
            match Self::extract_video(&node) {
                Ok(block) => self.emit(&node, block),
                Err(e) => warn!("Skipping video element: {}", e),
            }
        }
    }

    fn extract_video(node: &NodeRef) -> StoryResult<ContentBlock> {
        let iframe = first_descendant(node, "iframe");
        let src = iframe
            .as_ref()
            .and_then(|frame| attr(frame, "src"))
            .or_else(|| attr(node, "data-video"))
            .unwrap_or_default();
        let embed = youtube::canonical_embed_url(&src)
            .ok_or_else(|| ConversionError::InvalidVideoUrl(src.clone()))?;

        let (default_width, default_height) = youtube::default_dimensions();
        let width = iframe
            .as_ref()
            .and_then(|frame| attr(frame, "width"))
            .unwrap_or_else(|| default_width.to_string());
        let height = iframe
            .as_ref()
            .and_then(|frame| attr(frame, "height"))
            .unwrap_or_else(|| default_height.to_string());

        Ok(ContentBlock::video(embed).with_metadata(video_metadata(
            &width,
            &height,
            youtube::player_flags(&src),
        )))
    }

    fn detect_images(&mut self, body: &NodeRef) {
        for node in self.elements(body) {
            if self.is_processed(&node) {
                continue;
            }
            let img = if is_image_container(&node) {
                first_descendant(&node, "img")
            } else if tag_name(&node).as_deref() == Some("img") {
                Some(node.clone())
            } else {
                continue;
            };
            let Some(img) = img else {
                warn!("Skipping image container without an <img>");
                continue;
            };
            match Self::extract_image(&img) {
                Ok(block) => self.emit(&node, block),
                Err(e) => warn!("Skipping image element: {}", e),
            }
        }
    }

    fn extract_image(img: &NodeRef) -> StoryResult<ContentBlock> {
        let src = attr(img, "src")
            .or_else(|| attr(img, "data-src"))
            .filter(|src| !src.trim().is_empty())
            .ok_or_else(|| ConversionError::InvalidImageUrl("<missing src>".to_string()))?;

        let mut metadata = BlockMetadata::new();
        let style = attr(img, "style").unwrap_or_default();
        if let Some(width) = style_value(&style, "width").or_else(|| attr(img, "width")) {
            metadata.insert("width", width);
        }
        if let Some(float) = style_value(&style, "float") {
            metadata.insert("float", float);
        }
        // Renderer defaults are left implicit so a render/parse cycle adds nothing.
        if let Some(class) = attr(img, "class")
            .filter(|c| !c.trim().is_empty() && c.as_str() != DEFAULT_IMAGE_CLASS)
        {
            metadata.insert("class", class);
        }
        if let Some(alt) = attr(img, "alt").filter(|a| a.as_str() != DEFAULT_IMAGE_ALT) {
            metadata.insert("alt", alt);
        }

        Ok(ContentBlock::image(canonical_image_url(&src)).with_metadata(metadata))
    }

    fn promote_youtube_paragraphs(&mut self, body: &NodeRef) {
        for node in self.elements(body) {
            if self.is_processed(&node) || tag_name(&node).as_deref() != Some("p") {
                continue;
            }
            let text = node.text_contents();
            let text = text.trim();
            if !youtube::is_youtube_url(text) {
                continue;
            }
            match youtube::extract_video_id(text) {
                Some(id) => {
                    let (width, height) = youtube::default_dimensions();
                    let block = ContentBlock::video(youtube::embed_url_for_id(&id)).with_metadata(
                        video_metadata(width, height, youtube::PlayerFlags::default()),
                    );
                    self.emit(&node, block);
                }
                None => warn!("Skipping paragraph with unrecognized YouTube link: {}", text),
            }
        }
    }

    fn walk(&mut self, parent: &NodeRef) {
        let children: Vec<NodeRef> = parent.children().collect();
        for child in children {
            if self.is_processed(&child) {
                continue;
            }
            if let Some(text) = child.as_text() {
                let text = text.borrow().trim().to_string();
                if !text.is_empty() {
                    self.emit(&child, ContentBlock::text(escape_text(&text)));
                }
                continue;
            }
            let Some(tag) = tag_name(&child) else {
                continue;
            };
            if SKIPPED_TAGS.contains(&tag.as_str()) {
                self.claim(&child);
                continue;
            }
            // Anything wrapping media that an earlier pass claimed gets descended into so the
            // media isn't serialized a second time.
            if self.has_processed_descendant(&child) {
                self.walk(&child);
                continue;
            }
            self.classify(&child, &tag);
        }
    }

    fn classify(&mut self, node: &NodeRef, tag: &str) {
        if let Some(level) = heading_level(tag) {
            let content = inner_html(node).trim().to_string();
            let metadata = text_metadata(node).with("level", level);
            self.emit(
                node,
                ContentBlock::new(BlockType::Heading, content).with_metadata(metadata),
            );
            return;
        }
        match tag {
            "p" => {
                let content = inner_html(node).trim().to_string();
                self.emit(node, ContentBlock::text(content).with_metadata(text_metadata(node)));
            }
            "ul" | "ol" => {
                if node.children().any(|c| c.as_element().is_some()) {
                    let metadata = text_metadata(node).with("listType", tag);
                    self.emit(node, ContentBlock::text(outer_html(node)).with_metadata(metadata));
                } else {
                    self.claim(node);
                }
            }
            "blockquote" => {
                let metadata = text_metadata(node).with("quote", true);
                self.emit(node, ContentBlock::text(outer_html(node)).with_metadata(metadata));
            }
            _ => {
                if node.text_contents().trim().is_empty() {
                    self.walk(node);
                } else {
                    self.emit(node, ContentBlock::text(outer_html(node)));
                }
            }
        }
    }

    fn finish(mut self) -> Vec<ContentBlock> {
        self.found.sort_by_key(|(position, _)| *position);
        renumber(self.found.into_iter().map(|(_, block)| block).collect())
    }
}

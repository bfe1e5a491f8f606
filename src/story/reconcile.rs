use crate::story::block::{BlockType, ContentBlock};
use crate::story::dom::parse_fragment;
use crate::story::parser::canonical_image_url;
use crate::story::youtube;
use log::{debug, info};
use std::collections::HashSet;

/// Rewrite `order` as 0..n-1 following the current vector order.
pub fn renumber(blocks: Vec<ContentBlock>) -> Vec<ContentBlock> {
    blocks
        .into_iter()
        .enumerate()
        .map(|(index, block)| block.with_order(index))
        .collect()
}

/// Drop server-assigned ids before a block list is submitted again.
pub fn strip_server_fields(blocks: Vec<ContentBlock>) -> Vec<ContentBlock> {
    blocks
        .into_iter()
        .map(|mut block| {
            block.story_block_id = None;
            block
        })
        .collect()
}

/// Story blocks first, then risk blocks, numbered as one list.
pub fn combine_sections(story: Vec<ContentBlock>, risks: Vec<ContentBlock>) -> Vec<ContentBlock> {
    let mut combined = story;
    combined.extend(risks);
    renumber(combined)
}

/// Comparison key for media so signed URLs and player parameters don't look like new content.
fn media_key(block: &ContentBlock) -> Option<(BlockType, String)> {
    match block.kind {
        BlockType::Image => Some((BlockType::Image, canonical_image_url(&block.content))),
        BlockType::Video => Some((
            BlockType::Video,
            youtube::canonical_embed_url(&block.content).unwrap_or_else(|| block.content.clone()),
        )),
        _ => None,
    }
}

/// Keep persisted media that the freshly parsed HTML no longer mentions.
///
/// Missing media is read as "the editor lost it" rather than "the user deleted it", so such
/// blocks are appended after the fresh ones instead of being dropped.
pub fn preserve_media(fresh: Vec<ContentBlock>, persisted: &[ContentBlock]) -> Vec<ContentBlock> {
    let present: HashSet<(BlockType, String)> = fresh.iter().filter_map(media_key).collect();

    let mut merged = fresh;
    let mut kept = 0;
    for block in persisted {
        let Some(key) = media_key(block) else {
            continue;
        };
        if present.contains(&key) {
            continue;
        }
        debug!("Preserving persisted {} block: {}", block.kind, block.content);
        let mut preserved = block.clone();
        preserved.story_block_id = None;
        merged.push(preserved);
        kept += 1;
    }
    if kept > 0 {
        info!("Preserved {} persisted media block(s) missing from the editor", kept);
    }
    renumber(merged)
}

fn heading_text(block: &ContentBlock) -> Option<String> {
    if block.kind != BlockType::Heading {
        return None;
    }
    let text = parse_fragment(&block.content)
        .map(|body| body.text_contents())
        .unwrap_or_else(|| block.content.clone());
    Some(text.trim().to_string())
}

/// Split a combined list at the first heading whose text matches `risks_heading`.
pub fn split_sections(
    blocks: &[ContentBlock],
    risks_heading: &str,
) -> (Vec<ContentBlock>, Vec<ContentBlock>) {
    let mut sorted = blocks.to_vec();
    sorted.sort_by_key(|block| block.order);

    let boundary = sorted.iter().position(|block| {
        heading_text(block)
            .map(|text| text.eq_ignore_ascii_case(risks_heading.trim()))
            .unwrap_or(false)
    });
    match boundary {
        Some(index) => {
            let risks = sorted.split_off(index);
            (sorted, risks)
        }
        None => (sorted, Vec::new()),
    }
}

fn is_real_url(content: &str) -> bool {
    content.starts_with("http://") || content.starts_with("https://")
}

/// Locate the block created for an upload placeholder.
///
/// Exact match on placeholder content and order first; otherwise the most recent IMAGE with a
/// real URL that has a server id.
pub fn find_uploaded_block<'a>(
    blocks: &'a [ContentBlock],
    placeholder: &str,
    order: usize,
) -> Option<&'a ContentBlock> {
    let exact = blocks.iter().find(|block| {
        block.kind == BlockType::Image
            && block.content == placeholder
            && block.order == order
            && block.story_block_id.is_some()
    });
    if exact.is_some() {
        return exact;
    }
    debug!("No exact placeholder match at order {}, falling back to latest image", order);
    blocks
        .iter()
        .filter(|block| {
            block.kind == BlockType::Image
                && block.story_block_id.is_some()
                && is_real_url(&block.content)
        })
        .max_by_key(|block| block.order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_id(block: ContentBlock, id: &str) -> ContentBlock {
        ContentBlock {
            story_block_id: Some(id.to_string()),
            ..block
        }
    }

    #[test]
    fn test_renumber_and_combine() {
        let story = vec![ContentBlock::text("a").with_order(7), ContentBlock::text("b").with_order(2)];
        let risks = vec![ContentBlock::text("c").with_order(0)];
        let combined = combine_sections(story, risks);
        let contents: Vec<_> = combined.iter().map(|b| (b.order, b.content.as_str())).collect();
        assert_eq!(contents, vec![(0, "a"), (1, "b"), (2, "c")]);
    }

    #[test]
    fn test_strip_server_fields() {
        let blocks = strip_server_fields(vec![with_id(ContentBlock::text("x"), "9")]);
        assert!(blocks[0].story_block_id.is_none());
    }

    #[test]
    fn test_preserve_media_appends_missing() {
        let fresh = vec![
            ContentBlock::text("Hello"),
            ContentBlock::image("https://cdn.example.com/keep.png"),
        ];
        let persisted = vec![
            with_id(ContentBlock::image("https://cdn.example.com/keep.png?sig=old"), "1"),
            with_id(ContentBlock::image("https://cdn.example.com/lost.png"), "2"),
            with_id(ContentBlock::video("https://www.youtube.com/embed/abc123"), "3"),
            with_id(ContentBlock::text("old text"), "4"),
        ];
        let merged = preserve_media(fresh, &persisted);
        let contents: Vec<_> = merged.iter().map(|b| b.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "Hello",
                "https://cdn.example.com/keep.png",
                "https://cdn.example.com/lost.png",
                "https://www.youtube.com/embed/abc123",
            ]
        );
        assert!(merged.iter().all(|b| b.story_block_id.is_none()));
        assert!(merged.iter().enumerate().all(|(i, b)| b.order == i));
    }

    #[test]
    fn test_split_sections() {
        let blocks = renumber(vec![
            ContentBlock::text("Story"),
            ContentBlock::heading("<strong>Risks and Challenges</strong>", 2),
            ContentBlock::text("Risky"),
        ]);
        let (story, risks) = split_sections(&blocks, "Risks and challenges");
        assert_eq!(story.len(), 1);
        assert_eq!(risks.len(), 2);

        let (story, risks) = split_sections(&blocks[..1], "Risks and challenges");
        assert_eq!(story.len(), 1);
        assert!(risks.is_empty());
    }

    #[test]
    fn test_find_uploaded_block() {
        let placeholder = "https://placehold.co/uploading.png";
        let blocks = vec![
            with_id(ContentBlock::image("https://cdn.example.com/a.png").with_order(0), "10"),
            with_id(ContentBlock::image(placeholder).with_order(1), "11"),
        ];
        assert_eq!(
            find_uploaded_block(&blocks, placeholder, 1).and_then(|b| b.story_block_id.as_deref()),
            Some("11")
        );
        // order drifted on the server side
        assert_eq!(
            find_uploaded_block(&blocks, placeholder, 5).and_then(|b| b.story_block_id.as_deref()),
            Some("11")
        );
        assert!(find_uploaded_block(&[], placeholder, 0).is_none());
    }
}

use crate::story::block::{BlockMetadata, BlockType, ContentBlock};
use crate::story::dom::is_block_level;
use crate::story::style::{build_style, escape_attr};
use crate::story::youtube;
use log::{debug, trace, warn};

/// Class marking the wrapper of a rendered image.
pub const IMAGE_CONTAINER_CLASS: &str = "image-container";
/// Class given to images that carry no class of their own.
pub const DEFAULT_IMAGE_CLASS: &str = "story-image";
pub const DEFAULT_IMAGE_ALT: &str = "Story image";
/// Class marking the wrapper of a rendered video embed.
pub const VIDEO_CONTAINER_CLASS: &str = "video-embed";

const IFRAME_ALLOW: &str =
    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture; web-share";
const FLOAT_GAP: &str = "16px";

/// Render blocks in ascending `order` into one HTML fragment.
pub fn render_blocks(blocks: &[ContentBlock]) -> String {
    let mut sorted: Vec<&ContentBlock> = blocks.iter().collect();
    sorted.sort_by_key(|block| block.order);

    let html = sorted
        .into_iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n");
    debug!("Rendered {} blocks into {} bytes of HTML", blocks.len(), html.len());
    html
}

pub fn render_block(block: &ContentBlock) -> String {
    trace!("Rendering {} block #{}", block.kind, block.order);
    match &block.kind {
        BlockType::Text => render_text(&block.content, &block.metadata),
        BlockType::Heading => render_heading(&block.content, &block.metadata),
        BlockType::Image => render_image(&block.content, &block.metadata),
        BlockType::Video => render_video(&block.content, &block.metadata),
        BlockType::Other(_) => block.content.clone(),
    }
}

/// Content that already opens with a block-level element is left alone; inline markup and
/// plain text still get a paragraph around them.
fn starts_with_block_element(content: &str) -> bool {
    let Some(rest) = content.trim_start().strip_prefix('<') else {
        return false;
    };
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    is_block_level(&name)
}

fn text_style(metadata: &BlockMetadata) -> String {
    let align = metadata.get_str("align");
    let color = metadata.get_str("color");
    build_style(&[("text-align", align.as_deref()), ("color", color.as_deref())])
}

fn style_attr(style: &str) -> String {
    if style.is_empty() {
        String::new()
    } else {
        format!(" style=\"{}\"", escape_attr(style))
    }
}

fn render_text(content: &str, metadata: &BlockMetadata) -> String {
    if starts_with_block_element(content) {
        return content.to_string();
    }
    format!("<p{}>{}</p>", style_attr(&text_style(metadata)), content)
}

fn render_heading(content: &str, metadata: &BlockMetadata) -> String {
    let level = metadata.get_u8("level").unwrap_or(1).clamp(1, 6);
    format!(
        "<h{level}{}>{}</h{level}>",
        style_attr(&text_style(metadata)),
        content
    )
}

fn render_image(url: &str, metadata: &BlockMetadata) -> String {
    let width = metadata.get_str("width");
    let float = metadata.get_str("float").map(|f| f.to_ascii_lowercase());
    let (margin_prop, margin) = match float.as_deref() {
        Some("left") => ("margin-right", Some(FLOAT_GAP)),
        Some("right") => ("margin-left", Some(FLOAT_GAP)),
        _ => ("margin", None),
    };
    let style = build_style(&[
        ("width", width.as_deref()),
        ("float", float.as_deref()),
        (margin_prop, margin),
    ]);
    let class = metadata
        .get_str("class")
        .unwrap_or_else(|| DEFAULT_IMAGE_CLASS.to_string());
    let alt = metadata
        .get_str("alt")
        .unwrap_or_else(|| DEFAULT_IMAGE_ALT.to_string());

    format!(
        "<div class=\"{}\" data-type=\"image\"><img src=\"{}\" class=\"{}\" alt=\"{}\"{}></div>",
        IMAGE_CONTAINER_CLASS,
        escape_attr(url),
        escape_attr(&class),
        escape_attr(&alt),
        style_attr(&style)
    )
}

/// Iframe markup for a video. `flags` only ever land on the rendered `src`.
pub fn render_video(url: &str, metadata: &BlockMetadata) -> String {
    let (default_width, default_height) = youtube::default_dimensions();
    let (width, height, flags) = if metadata.is_malformed() {
        (
            default_width.to_string(),
            default_height.to_string(),
            youtube::PlayerFlags::default(),
        )
    } else {
        let defaults = youtube::PlayerFlags::default();
        (
            metadata
                .get_str("width")
                .unwrap_or_else(|| default_width.to_string()),
            metadata
                .get_str("height")
                .unwrap_or_else(|| default_height.to_string()),
            youtube::PlayerFlags {
                autoplay: metadata.get_flag("autoplay").unwrap_or(defaults.autoplay),
                controls: metadata.get_flag("controls").unwrap_or(defaults.controls),
            },
        )
    };

    let embed = if youtube::is_canonical_embed(url) {
        url.to_string()
    } else {
        youtube::canonical_embed_url(url).unwrap_or_else(|| {
            warn!("Video URL {} is not a YouTube link, embedding it as is", url);
            url.to_string()
        })
    };
    let separator = if embed.contains('?') { '&' } else { '?' };
    let src = format!(
        "{}{}controls={}&autoplay={}",
        embed,
        separator,
        u8::from(flags.controls),
        u8::from(flags.autoplay)
    );

    format!(
        "<div class=\"{}\" data-type=\"video\"><iframe width=\"{}\" height=\"{}\" src=\"{}\" title=\"YouTube video player\" frameborder=\"0\" allow=\"{}\" allowfullscreen></iframe></div>",
        VIDEO_CONTAINER_CLASS,
        escape_attr(&width),
        escape_attr(&height),
        escape_attr(&src),
        IFRAME_ALLOW
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_wrapped() {
        let block = ContentBlock::text("Hello");
        assert_eq!(render_block(&block), "<p>Hello</p>");

        let styled = ContentBlock::text("Hi").with_metadata(
            BlockMetadata::new()
                .with("align", "center")
                .with("color", "#333"),
        );
        assert_eq!(
            render_block(&styled),
            "<p style=\"text-align: center; color: #333\">Hi</p>"
        );
    }

    #[test]
    fn test_block_markup_passes_through() {
        let list = ContentBlock::text("<ul><li>One</li></ul>");
        assert_eq!(render_block(&list), "<ul><li>One</li></ul>");

        let inline = ContentBlock::text("Some <strong>bold</strong> text");
        assert_eq!(
            render_block(&inline),
            "<p>Some <strong>bold</strong> text</p>"
        );
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(
            render_block(&ContentBlock::new(BlockType::Heading, "Top")),
            "<h1>Top</h1>"
        );
        let block = ContentBlock::heading("Sub", 3)
            .with_metadata(BlockMetadata::new().with("level", 3).with("align", "right"));
        assert_eq!(
            render_block(&block),
            "<h3 style=\"text-align: right\">Sub</h3>"
        );
        let clamped = ContentBlock::new(BlockType::Heading, "Deep")
            .with_metadata(BlockMetadata::new().with("level", 9));
        assert_eq!(render_block(&clamped), "<h6>Deep</h6>");
        let float_level = ContentBlock::new(BlockType::Heading, "Mid")
            .with_metadata(BlockMetadata::new().with("level", 2.0));
        assert_eq!(render_block(&float_level), "<h2>Mid</h2>");
    }

    #[test]
    fn test_image_float_margins() {
        let left = ContentBlock::image("https://cdn.example.com/a.png").with_metadata(
            BlockMetadata::new()
                .with("width", "50%")
                .with("float", "left"),
        );
        let html = render_block(&left);
        assert!(html.starts_with("<div class=\"image-container\" data-type=\"image\">"));
        assert!(html.contains("style=\"width: 50%; float: left; margin-right: 16px\""));
        assert!(html.contains("class=\"story-image\""));
        assert!(html.contains("alt=\"Story image\""));

        let right = ContentBlock::image("https://cdn.example.com/a.png")
            .with_metadata(BlockMetadata::new().with("float", "right").with("alt", "Team"));
        let html = render_block(&right);
        assert!(html.contains("float: right; margin-left: 16px"));
        assert!(html.contains("alt=\"Team\""));

        let plain = render_block(&ContentBlock::image("https://cdn.example.com/a.png"));
        assert!(!plain.contains("style="));
    }

    #[test]
    fn test_video_flags_stay_on_src() {
        let block = ContentBlock::video("https://www.youtube.com/embed/abc123").with_metadata(
            BlockMetadata::new()
                .with("autoplay", true)
                .with("controls", false)
                .with("width", 640),
        );
        let html = render_block(&block);
        assert!(html.contains(
            "src=\"https://www.youtube.com/embed/abc123?controls=0&amp;autoplay=1\""
        ));
        assert!(html.contains("width=\"640\""));
        assert!(html.contains("height=\"315\""));
        assert!(html.contains("allowfullscreen"));
        assert_eq!(block.content, "https://www.youtube.com/embed/abc123");
    }

    #[test]
    fn test_video_url_is_rewritten_and_malformed_metadata_falls_back() {
        let block = ContentBlock::video("https://youtu.be/abc123")
            .with_metadata(BlockMetadata::malformed());
        let html = render_block(&block);
        assert!(html.contains(
            "src=\"https://www.youtube.com/embed/abc123?controls=1&amp;autoplay=0\""
        ));
        assert!(html.contains("width=\"560\" height=\"315\""));
    }

    #[test]
    fn test_foreign_video_url_keeps_its_query() {
        let html = render_block(&ContentBlock::video("https://player.vimeo.com/video/76979871?h=8272103f6e"));
        assert!(html.contains(
            "src=\"https://player.vimeo.com/video/76979871?h=8272103f6e&amp;controls=1&amp;autoplay=0\""
        ));
        assert_eq!(html.matches('?').count(), 1);
    }

    #[test]
    fn test_unknown_type_and_order() {
        let blocks = vec![
            ContentBlock::new(BlockType::Other("EMBED".into()), "<aside>raw</aside>").with_order(1),
            ContentBlock::text("first").with_order(0),
        ];
        assert_eq!(render_blocks(&blocks), "<p>first</p>\n<aside>raw</aside>");
    }
}

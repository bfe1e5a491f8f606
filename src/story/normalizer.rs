use crate::story::block::BlockMetadata;
use crate::story::dom::{attr, fragment_nodes, has_class, inner_html, parse_fragment, tag_name};
use crate::story::renderer::{render_video, VIDEO_CONTAINER_CLASS};
use crate::story::youtube;
use kuchiki::NodeRef;
use log::{debug, warn};

/// Rewrite pasted YouTube iframes and links into the wrapped embed form the parser expects.
pub fn normalize_youtube_embeds(html: &str) -> String {
    let Some(body) = parse_fragment(html) else {
        return html.to_string();
    };

    let wrapped = wrap_bare_iframes(&body);
    let promoted = promote_link_paragraphs(&body);
    if wrapped + promoted > 0 {
        debug!(
            "Normalized YouTube content: {} iframe(s) wrapped, {} link(s) embedded",
            wrapped, promoted
        );
    }
    inner_html(&body)
}

fn inside_video_container(node: &NodeRef) -> bool {
    node.ancestors().any(|ancestor| {
        has_class(&ancestor, VIDEO_CONTAINER_CLASS)
            || attr(&ancestor, "data-type").as_deref() == Some("video")
    })
}

fn container_node() -> Option<NodeRef> {
    let markup = format!(
        "<div class=\"{}\" data-type=\"video\"></div>",
        VIDEO_CONTAINER_CLASS
    );
    fragment_nodes(&markup).into_iter().next()
}

fn wrap_bare_iframes(body: &NodeRef) -> usize {
    let iframes: Vec<NodeRef> = body
        .descendants()
        .filter(|node| tag_name(node).as_deref() == Some("iframe"))
        .filter(|node| {
            attr(node, "src")
                .map(|src| youtube::is_youtube_url(&src))
                .unwrap_or(false)
        })
        .filter(|node| !inside_video_container(node))
        .collect();

    let mut wrapped = 0;
    for iframe in iframes {
        let Some(container) = container_node() else {
            warn!("Could not build a video container, leaving iframe untouched");
            continue;
        };
        iframe.insert_before(container.clone());
        iframe.detach();
        container.append(iframe);
        wrapped += 1;
    }
    wrapped
}

/// Paragraphs are replaced back to front so earlier handles stay attached to the tree.
fn promote_link_paragraphs(body: &NodeRef) -> usize {
    let paragraphs: Vec<NodeRef> = body
        .descendants()
        .filter(|node| tag_name(node).as_deref() == Some("p"))
        .collect();

    let mut promoted = 0;
    for paragraph in paragraphs.into_iter().rev() {
        let text = paragraph.text_contents();
        let text = text.trim();
        if !youtube::is_youtube_url(text) {
            continue;
        }
        let Some(embed) = youtube::canonical_embed_url(text) else {
            warn!("Leaving paragraph with unrecognized YouTube link: {}", text);
            continue;
        };
        for node in fragment_nodes(&render_video(&embed, &BlockMetadata::new())) {
            paragraph.insert_before(node);
        }
        paragraph.detach();
        promoted += 1;
    }
    promoted
}

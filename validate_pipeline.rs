use std::time::Instant;

use story_sync::story::block::{BlockMetadata, BlockType, ContentBlock};
use story_sync::story::config::StoryConfig;
use story_sync::story::normalizer::normalize_youtube_embeds;
use story_sync::story::parser::parse_html_to_blocks;
use story_sync::story::reconcile::{preserve_media, split_sections};
use story_sync::story::renderer::render_blocks;
use story_sync::story::youtube;

fn main() {
    println!("🧪 Starting Story Pipeline Validation");

    let _ = env_logger::try_init();

    println!("\n1️⃣ Testing Blocks -> HTML -> Blocks round trip...");
    test_round_trip();

    println!("\n2️⃣ Testing YouTube normalization...");
    test_youtube_normalization();

    println!("\n3️⃣ Testing empty paragraph pruning...");
    test_pruning();

    println!("\n4️⃣ Testing media preservation and section split...");
    test_reconciliation();

    println!("\n5️⃣ Testing configuration defaults...");
    test_configuration();

    println!("\n6️⃣ Testing performance...");
    test_performance();

    println!("\n✅ All Story Pipeline Validation Tests Completed Successfully!");
}

fn sample_blocks() -> Vec<ContentBlock> {
    vec![
        ContentBlock::heading("Our project", 2),
        ContentBlock::text("We build <strong>modular</strong> synthesizers.")
            .with_metadata(BlockMetadata::new().with("align", "center")),
        ContentBlock::image("https://cdn.example.com/hero.png")
            .with_metadata(BlockMetadata::new().with("width", "50%").with("float", "left")),
        ContentBlock::video("https://www.youtube.com/embed/dQw4w9WgXcQ"),
        ContentBlock::text("<ul><li>Kit</li><li>Manual</li></ul>"),
    ]
    .into_iter()
    .enumerate()
    .map(|(order, block)| block.with_order(order))
    .collect()
}

fn test_round_trip() {
    let blocks = sample_blocks();
    let html = render_blocks(&blocks);
    let parsed = parse_html_to_blocks(&html);

    assert_eq!(parsed.len(), blocks.len(), "Block count should survive a round trip");
    for (original, reparsed) in blocks.iter().zip(&parsed) {
        assert_eq!(original.kind, reparsed.kind);
        assert_eq!(original.content, reparsed.content);
        assert_eq!(original.order, reparsed.order);
    }
    assert_eq!(render_blocks(&parsed), html, "Rendering should be stable");
    println!("   ✅ {} blocks survived render -> parse -> render", parsed.len());
}

fn test_youtube_normalization() {
    let html = "<p>Watch this:</p><p>https://www.youtube.com/watch?v=dQw4w9WgXcQ</p>";
    let normalized = normalize_youtube_embeds(html);
    assert!(normalized.contains("https://www.youtube.com/embed/dQw4w9WgXcQ"));
    assert_eq!(normalize_youtube_embeds(&normalized), normalized, "Normalization is idempotent");

    let blocks = parse_html_to_blocks(&normalized);
    let videos: Vec<_> = blocks.iter().filter(|b| b.kind == BlockType::Video).collect();
    assert_eq!(videos.len(), 1);
    assert!(youtube::is_canonical_embed(&videos[0].content));
    println!("   ✅ Link paragraph promoted to {}", videos[0].content);
}

fn test_pruning() {
    let blocks = parse_html_to_blocks("<p><br></p><p>Hello</p><p> </p><br>");
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].content, "Hello");
    assert_eq!(blocks[0].order, 0);
    println!("   ✅ Empty paragraphs pruned");
}

fn test_reconciliation() {
    let persisted = sample_blocks();
    let fresh = parse_html_to_blocks("<h2>Our project</h2><p>Shorter now.</p>");
    let merged = preserve_media(fresh, &persisted);
    assert_eq!(merged.len(), 4, "Image and video should be kept");
    assert!(merged.iter().enumerate().all(|(index, block)| block.order == index));
    println!("   ✅ {} persisted media blocks preserved", merged.len() - 2);

    let mut combined = persisted.clone();
    combined.push(ContentBlock::heading("Risks and Challenges", 2).with_order(5));
    combined.push(ContentBlock::text("Supply chains.").with_order(6));
    let (story, risks) = split_sections(&combined, "Risks and Challenges");
    assert_eq!(story.len(), persisted.len());
    assert_eq!(risks.len(), 2);
    println!("   ✅ Story/risks split at the risks heading");
}

fn test_configuration() {
    let config = StoryConfig::default();
    assert!(config.validate().is_ok(), "Default configuration should be valid");
    let blocks = parse_html_to_blocks(&config.editor.default_risks_html);
    let (_, risks) = split_sections(&blocks, &config.editor.risks_heading);
    assert_eq!(risks.len(), blocks.len(), "Default risks HTML starts the risks section");
    println!("   ✅ Default configuration is consistent");
}

fn test_performance() {
    let html = render_blocks(&sample_blocks()).repeat(200);
    let start = Instant::now();
    let blocks = parse_html_to_blocks(&html);
    let elapsed = start.elapsed();
    assert_eq!(blocks.len(), 1000);
    println!("   ✅ Parsed {} blocks from {} bytes in {:?}", blocks.len(), html.len(), elapsed);
}

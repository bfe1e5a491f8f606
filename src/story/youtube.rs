use url::Url;

/// Canonical prefix every stored VIDEO block points at.
pub const EMBED_BASE: &str = "https://www.youtube.com/embed/";

const DEFAULT_WIDTH: &str = "560";
const DEFAULT_HEIGHT: &str = "315";

/// Player options carried on an embed URL's query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerFlags {
    pub autoplay: bool,
    pub controls: bool,
}

impl Default for PlayerFlags {
    fn default() -> Self {
        Self {
            autoplay: false,
            controls: true,
        }
    }
}

/// Default iframe size used when neither markup nor metadata provide one.
pub fn default_dimensions() -> (&'static str, &'static str) {
    (DEFAULT_WIDTH, DEFAULT_HEIGHT)
}

fn parse_loose(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return None;
    }
    let candidate = if trimmed.starts_with("//") {
        format!("https:{}", trimmed)
    } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    Url::parse(&candidate).ok()
}

fn is_youtube_host(host: &str) -> bool {
    let host = host.trim_start_matches("www.").trim_start_matches("m.");
    matches!(host, "youtube.com" | "youtu.be" | "youtube-nocookie.com")
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// True when `raw` points at a YouTube host, in any of the accepted spellings.
pub fn is_youtube_url(raw: &str) -> bool {
    parse_loose(raw)
        .and_then(|url| url.host_str().map(is_youtube_host))
        .unwrap_or(false)
}

/// Pull the video id out of a watch, short-link, shorts or embed URL.
pub fn extract_video_id(raw: &str) -> Option<String> {
    let url = parse_loose(raw)?;
    let host = url.host_str()?.to_ascii_lowercase();
    if !is_youtube_host(&host) {
        return None;
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let id = if host.ends_with("youtu.be") {
        segments.next().map(str::to_string)
    } else {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed") | Some("shorts") | Some("v") | Some("live") => {
                segments.next().map(str::to_string)
            }
            _ => None,
        }
    }?;

    if is_valid_id(&id) {
        Some(id)
    } else {
        log::debug!("Rejecting YouTube id '{}' from {}", id, raw);
        None
    }
}

/// `https://www.youtube.com/embed/<id>` with no query string.
pub fn embed_url_for_id(id: &str) -> String {
    format!("{}{}", EMBED_BASE, id)
}

pub fn canonical_embed_url(raw: &str) -> Option<String> {
    extract_video_id(raw).map(|id| embed_url_for_id(&id))
}

pub fn is_canonical_embed(raw: &str) -> bool {
    raw.strip_prefix(EMBED_BASE)
        .map(|id| is_valid_id(id))
        .unwrap_or(false)
}

/// Read `autoplay` / `controls` from the query string, keeping defaults for anything absent.
pub fn player_flags(raw: &str) -> PlayerFlags {
    let mut flags = PlayerFlags::default();
    let Some(url) = parse_loose(raw) else {
        return flags;
    };
    for (key, value) in url.query_pairs() {
        let on = matches!(value.as_ref(), "1" | "true");
        match key.as_ref() {
            "autoplay" => flags.autoplay = on,
            "controls" => flags.controls = on,
            _ => {}
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_forms_resolve_to_same_id() {
        let inputs = [
            "https://www.youtube.com/watch?v=abc123",
            "https://youtu.be/abc123",
            "https://www.youtube.com/embed/abc123?controls=0",
        ];
        for input in inputs {
            assert_eq!(extract_video_id(input).as_deref(), Some("abc123"), "{}", input);
            assert_eq!(
                canonical_embed_url(input).as_deref(),
                Some("https://www.youtube.com/embed/abc123")
            );
        }
    }

    #[test]
    fn test_loose_spellings() {
        assert_eq!(
            extract_video_id("//www.youtube.com/embed/xyz_9-Q").as_deref(),
            Some("xyz_9-Q")
        );
        assert_eq!(
            extract_video_id("youtube.com/watch?feature=share&v=abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            extract_video_id("https://m.youtube.com/shorts/abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            extract_video_id("https://www.youtube-nocookie.com/embed/abc123").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_rejects_non_youtube() {
        assert!(extract_video_id("https://vimeo.com/12345").is_none());
        assert!(extract_video_id("https://www.youtube.com/channel/abc").is_none());
        assert!(extract_video_id("https://www.youtube.com/watch?v=").is_none());
        assert!(extract_video_id("check this https://youtu.be/abc123").is_none());
        assert!(!is_youtube_url("https://notyoutube.com/watch?v=abc123"));
        assert!(is_youtube_url("https://youtu.be/abc123"));
    }

    #[test]
    fn test_player_flags() {
        let flags = player_flags("https://www.youtube.com/embed/abc123?controls=0&autoplay=1");
        assert!(flags.autoplay);
        assert!(!flags.controls);

        assert_eq!(
            player_flags("https://www.youtube.com/embed/abc123"),
            PlayerFlags::default()
        );
    }

    #[test]
    fn test_canonical_detection() {
        assert!(is_canonical_embed("https://www.youtube.com/embed/abc123"));
        assert!(!is_canonical_embed("https://www.youtube.com/embed/abc123?autoplay=1"));
        assert!(!is_canonical_embed("https://youtu.be/abc123"));
    }
}

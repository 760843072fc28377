/**
 * YouTube URL handling
 * Extracts video ids from the URL shapes editors paste into the admin panel
 * and rewrites them onto the privacy-enhanced embed domain.
 */
use url::Url;

const EMBED_BASE: &str = "https://www.youtube-nocookie.com/embed/";

/// Pull a video id out of a pasted YouTube URL. Recognized shapes:
/// `youtu.be/<id>`, `youtube.com/watch?v=<id>`, `youtube.com/shorts/<id>`
/// and `youtube.com/embed/<id>` (with or without a `www.`/`m.` prefix).
/// Anything else, including unparseable input, yields `None`.
pub fn extract_video_id(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();

    if host == "youtu.be" {
        let id = parsed.path_segments()?.next()?.to_string();
        return if id.is_empty() { None } else { Some(id) };
    }

    if host != "youtube.com" && !host.ends_with(".youtube.com") {
        return None;
    }

    let segments: Vec<&str> = parsed.path_segments()?.collect();
    match segments.as_slice() {
        ["watch"] => parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
            .filter(|id| !id.is_empty()),
        ["shorts", id, ..] | ["embed", id, ..] if !id.is_empty() => Some((*id).to_string()),
        _ => None,
    }
}

/// The embed URL served to the player, or `None` when no id can be
/// extracted. Never errors.
pub fn embed_url(raw: &str) -> Option<String> {
    extract_video_id(raw).map(|id| format!("{}{}", EMBED_BASE, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(
            embed_url("https://www.youtube.com/watch?v=abc123").as_deref(),
            Some("https://www.youtube-nocookie.com/embed/abc123")
        );
    }

    #[test]
    fn test_short_link() {
        assert_eq!(
            embed_url("https://youtu.be/abc123").as_deref(),
            Some("https://www.youtube-nocookie.com/embed/abc123")
        );
    }

    #[test]
    fn test_shorts_path() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/xYz_9").as_deref(),
            Some("xYz_9")
        );
    }

    #[test]
    fn test_embed_path() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/abc123").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_mobile_host() {
        assert_eq!(
            extract_video_id("https://m.youtube.com/watch?v=abc123").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_watch_with_extra_params() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?t=90&v=abc123").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_other_host_rejected() {
        assert_eq!(extract_video_id("https://vimeo.com/12345"), None);
        assert_eq!(
            extract_video_id("https://notyoutube.com/watch?v=abc123"),
            None
        );
    }

    #[test]
    fn test_unknown_path_shape() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/playlist?list=PL1"),
            None
        );
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(extract_video_id("not a url"), None);
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("https://youtu.be/"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch"), None);
    }
}

/**
 * Link resolution
 * Turns stored lesson links into client-consumable href/embed URLs, and
 * owns the lazy duration backfill for hosted videos.
 */
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::db::models::{LessonLink, KIND_FILE, KIND_YOUTUBE};
use crate::youtube;

/// A lesson link as serialized into lesson/course responses.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedLink {
    pub id: i64,
    pub title: String,
    pub kind: String,
    pub role: String,
    pub href: Option<String>,
    pub embed_url: Option<String>,
    pub duration_seconds: Option<i32>,
    pub duration_fetched_at: Option<DateTime<Utc>>,
}

/// Resolve a stored link. For uploaded files the href points under the
/// media mount; for everything else the stored url is passed through
/// verbatim. Only youtube links get an embed URL, and a shape we cannot
/// parse degrades to `embed_url: None` rather than an error.
pub fn resolve(link: &LessonLink, media_url: &str) -> ResolvedLink {
    let href = if link.kind == KIND_FILE {
        link.file_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| format!("{}/{}", media_url.trim_end_matches('/'), p))
    } else if link.url.is_empty() {
        None
    } else {
        Some(link.url.clone())
    };

    let embed = if link.kind == KIND_YOUTUBE {
        youtube::embed_url(&link.url)
    } else {
        None
    };

    ResolvedLink {
        id: link.id,
        title: link.title.clone(),
        kind: link.kind.clone(),
        role: link.role.clone(),
        href,
        embed_url: embed,
        duration_seconds: link.duration_seconds,
        duration_fetched_at: link.duration_fetched_at,
    }
}

/// Persist a fetched duration. Overwrites any previously stored value and
/// stamps `duration_fetched_at`.
pub async fn mark_duration(pool: &PgPool, link_id: i64, seconds: i32) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE lesson_links
        SET duration_seconds = $1, duration_fetched_at = now()
        WHERE id = $2
        "#,
    )
    .bind(seconds)
    .bind(link_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Backfill the duration of a hosted-video link via a caller-supplied
/// metadata fetcher. Returns `Ok(false)` for links that are not youtube
/// links, have no extractable video id, or where the fetcher comes back
/// empty; the caller gets no finer-grained reason. Must never run on a
/// request-serving path.
pub async fn backfill_duration<F, Fut>(
    pool: &PgPool,
    link: &LessonLink,
    fetch: F,
) -> Result<bool, sqlx::Error>
where
    F: FnOnce(String) -> Fut,
    Fut: std::future::Future<Output = Option<i32>>,
{
    if link.kind != KIND_YOUTUBE || link.url.is_empty() {
        return Ok(false);
    }
    let video_id = match youtube::extract_video_id(&link.url) {
        Some(id) => id,
        None => return Ok(false),
    };
    let seconds = match fetch(video_id).await {
        Some(s) => s,
        None => return Ok(false),
    };
    mark_duration(pool, link.id, seconds).await?;
    tracing::info!(link_id = link.id, seconds, "lesson link duration backfilled");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{KIND_EXTERNAL, ROLE_MAIN, ROLE_SIGN};

    fn link(kind: &str, url: &str, file_path: Option<&str>) -> LessonLink {
        LessonLink {
            id: 1,
            lesson_id: 1,
            title: "intro".to_string(),
            kind: kind.to_string(),
            role: ROLE_MAIN.to_string(),
            url: url.to_string(),
            file_path: file_path.map(|p| p.to_string()),
            duration_seconds: None,
            duration_fetched_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_youtube_link_gets_embed() {
        let resolved = resolve(
            &link(KIND_YOUTUBE, "https://www.youtube.com/watch?v=abc123", None),
            "/media",
        );
        assert_eq!(
            resolved.href.as_deref(),
            Some("https://www.youtube.com/watch?v=abc123")
        );
        assert_eq!(
            resolved.embed_url.as_deref(),
            Some("https://www.youtube-nocookie.com/embed/abc123")
        );
    }

    #[test]
    fn test_external_link_never_gets_embed() {
        let resolved = resolve(
            &link(KIND_EXTERNAL, "https://www.youtube.com/watch?v=abc123", None),
            "/media",
        );
        assert_eq!(resolved.embed_url, None);
        assert_eq!(
            resolved.href.as_deref(),
            Some("https://www.youtube.com/watch?v=abc123")
        );
    }

    #[test]
    fn test_file_link_href_is_under_media_mount() {
        let resolved = resolve(
            &link(KIND_FILE, "", Some("lesson_assets/worksheet.pdf")),
            "/media/",
        );
        assert_eq!(
            resolved.href.as_deref(),
            Some("/media/lesson_assets/worksheet.pdf")
        );
        assert_eq!(resolved.embed_url, None);
    }

    #[test]
    fn test_unparseable_youtube_url_degrades_to_null_embed() {
        let resolved = resolve(&link(KIND_YOUTUBE, "not a url", None), "/media");
        assert_eq!(resolved.embed_url, None);
        assert_eq!(resolved.href.as_deref(), Some("not a url"));
    }

    #[test]
    fn test_role_is_passed_through() {
        let mut l = link(KIND_EXTERNAL, "https://example.com/doc", None);
        l.role = ROLE_SIGN.to_string();
        let resolved = resolve(&l, "/media");
        assert_eq!(resolved.role, ROLE_SIGN);
    }

    // A lazy pool never connects; the skip paths below return before any
    // query runs.
    fn lazy_pool() -> PgPool {
        PgPool::connect_lazy("postgresql://localhost/unused").unwrap()
    }

    #[tokio::test]
    async fn test_backfill_skips_non_youtube_kind() {
        let l = link(KIND_EXTERNAL, "https://example.com/video", None);
        let updated = backfill_duration(&lazy_pool(), &l, |_| async { Some(120) })
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_backfill_skips_unextractable_url() {
        let l = link(KIND_YOUTUBE, "https://www.youtube.com/playlist?list=PL1", None);
        let updated = backfill_duration(&lazy_pool(), &l, |_| async { Some(120) })
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_backfill_reports_fetch_miss_as_false() {
        let l = link(KIND_YOUTUBE, "https://youtu.be/abc123", None);
        let updated = backfill_duration(&lazy_pool(), &l, |video_id| async move {
            assert_eq!(video_id, "abc123");
            None
        })
        .await
        .unwrap();
        assert!(!updated);
    }
}

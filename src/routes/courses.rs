/**
 * Course Routes
 * Course catalog, lesson detail with navigation, and per-user progress.
 */
use axum::{
    extract::{Path, Query},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::config;
use crate::db::{
    self,
    models::{Course, Lesson, LessonLink},
};
use crate::error::ApiError;
use crate::links::{self, ResolvedLink};
use crate::progress;
use crate::routes::auth::{authenticate, maybe_authenticate};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /api/courses/ (list)
#[derive(Debug, Deserialize)]
pub struct CourseListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

/// Response for GET /api/courses/ (list)
#[derive(Debug, Serialize)]
pub struct CourseListResponse {
    pub items: Vec<CourseSummary>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

/// Course summary (for list view)
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CourseSummary {
    pub id: i64,
    pub name: String,
    pub level: String,
    pub category: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub video_url: Option<String>,
    pub lesson_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full course response with nested lessons
#[derive(Debug, Serialize)]
pub struct CourseDetailResponse {
    pub id: i64,
    pub name: String,
    pub level: String,
    pub category: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lessons: Vec<LessonSummary>,
}

/// A lesson as nested in the course detail
#[derive(Debug, Serialize)]
pub struct LessonSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "order")]
    pub ord: i32,
    pub cover_image: Option<String>,
    pub completed: bool,
    pub links: Vec<ResolvedLink>,
}

/// Response for GET /api/courses/{course_id}/lessons/{lesson_id}/
#[derive(Debug, Serialize)]
pub struct LessonDetailResponse {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "order")]
    pub ord: i32,
    pub cover_image: Option<String>,
    pub video_url: Option<String>,
    pub links: Vec<ResolvedLink>,
    pub next_lesson_id: Option<i64>,
    pub is_last_lesson: bool,
    pub completed: bool,
}

/// Response for POST .../complete/
#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub course_id: i64,
    pub lesson_id: i64,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub percent: f64,
}

/// Response for GET .../progress/
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub course_id: i64,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub percent: f64,
}

/// Response for POST .../reset_progress/
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub ok: bool,
    pub deleted_count: u64,
}

/// Response for POST .../enroll/
#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub message: String,
    pub course_id: i64,
}

// ============================================================================
// Query helpers
// ============================================================================

async fn fetch_course(pool: &sqlx::PgPool, course_id: i64) -> Result<Course, ApiError> {
    sqlx::query_as::<_, Course>(
        r#"
        SELECT id, name, level, category, description, cover_image, video_url,
               created_at, updated_at
        FROM courses
        WHERE id = $1
        "#,
    )
    .bind(course_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("course"))
}

/// A lesson scoped to its stated course; a lesson id that exists under a
/// different course is a 404, same as a missing one.
async fn fetch_lesson(
    pool: &sqlx::PgPool,
    course_id: i64,
    lesson_id: i64,
) -> Result<Lesson, ApiError> {
    sqlx::query_as::<_, Lesson>(
        r#"
        SELECT id, course_id, title, description, ord, cover_image,
               created_at, updated_at
        FROM lessons
        WHERE id = $1 AND course_id = $2
        "#,
    )
    .bind(lesson_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("lesson"))
}

async fn fetch_links_for_lessons(
    pool: &sqlx::PgPool,
    lesson_ids: &[i64],
) -> Result<Vec<LessonLink>, ApiError> {
    if lesson_ids.is_empty() {
        return Ok(vec![]);
    }
    Ok(sqlx::query_as::<_, LessonLink>(
        r#"
        SELECT id, lesson_id, title, kind, role, url, file_path,
               duration_seconds, duration_fetched_at, created_at
        FROM lesson_links
        WHERE lesson_id = ANY($1)
        ORDER BY lesson_id, id
        "#,
    )
    .bind(lesson_ids)
    .fetch_all(pool)
    .await?)
}

/// Ids of the lessons the viewer completed in a course; empty for anonymous
/// viewers.
async fn fetch_completed_set(
    pool: &sqlx::PgPool,
    user_id: Option<Uuid>,
    course_id: i64,
) -> Result<HashSet<i64>, ApiError> {
    let Some(uid) = user_id else {
        return Ok(HashSet::new());
    };
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT lesson_id FROM lesson_progress
        WHERE user_id = $1 AND course_id = $2 AND completed = true
        "#,
    )
    .bind(uid)
    .bind(course_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/courses/ - List courses with pagination, newest first
pub async fn list_courses(
    Query(query): Query<CourseListQuery>,
) -> Result<Json<CourseListResponse>, ApiError> {
    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;

    let page_size = query.page_size.clamp(1, 100);
    let page = query.page.max(1);
    let offset = (page - 1) * page_size;

    let items = sqlx::query_as::<_, CourseSummary>(
        r#"
        SELECT c.id, c.name, c.level, c.category, c.description, c.cover_image,
               c.video_url, c.created_at, c.updated_at,
               (SELECT COUNT(*) FROM lessons l WHERE l.course_id = c.id) AS lesson_count
        FROM courses c
        ORDER BY c.created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(page_size)
    .bind(offset)
    .fetch_all(pool.as_ref())
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
        .fetch_one(pool.as_ref())
        .await?;

    Ok(Json(CourseListResponse {
        items,
        page,
        page_size,
        total,
    }))
}

/// GET /api/courses/{course_id}/ - Course detail with nested lessons and
/// viewer-scoped completion flags
pub async fn course_detail(
    headers: HeaderMap,
    Path(course_id): Path<i64>,
) -> Result<Json<CourseDetailResponse>, ApiError> {
    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;
    let viewer = maybe_authenticate(&headers);

    let course = fetch_course(pool.as_ref(), course_id).await?;

    let lessons = sqlx::query_as::<_, Lesson>(
        r#"
        SELECT id, course_id, title, description, ord, cover_image,
               created_at, updated_at
        FROM lessons
        WHERE course_id = $1
        ORDER BY ord, id
        "#,
    )
    .bind(course_id)
    .fetch_all(pool.as_ref())
    .await?;

    let lesson_ids: Vec<i64> = lessons.iter().map(|l| l.id).collect();
    let all_links = fetch_links_for_lessons(pool.as_ref(), &lesson_ids).await?;
    let completed =
        fetch_completed_set(pool.as_ref(), viewer.map(|v| v.id), course_id).await?;

    let media_url = &config::get().media_url;
    let mut links_by_lesson: HashMap<i64, Vec<ResolvedLink>> = HashMap::new();
    for link in &all_links {
        links_by_lesson
            .entry(link.lesson_id)
            .or_default()
            .push(links::resolve(link, media_url));
    }

    let lessons = lessons
        .into_iter()
        .map(|l| LessonSummary {
            completed: completed.contains(&l.id),
            links: links_by_lesson.remove(&l.id).unwrap_or_default(),
            id: l.id,
            title: l.title,
            description: l.description,
            ord: l.ord,
            cover_image: l.cover_image,
        })
        .collect();

    Ok(Json(CourseDetailResponse {
        id: course.id,
        name: course.name,
        level: course.level,
        category: course.category,
        description: course.description,
        cover_image: course.cover_image,
        video_url: course.video_url,
        created_at: course.created_at,
        updated_at: course.updated_at,
        lessons,
    }))
}

/// GET /api/courses/{course_id}/lessons/{lesson_id}/ - Lesson detail with
/// resolved links, navigation and viewer-scoped completion
pub async fn lesson_detail(
    headers: HeaderMap,
    Path((course_id, lesson_id)): Path<(i64, i64)>,
) -> Result<Json<LessonDetailResponse>, ApiError> {
    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;
    let viewer = maybe_authenticate(&headers);

    let course = fetch_course(pool.as_ref(), course_id).await?;
    let lesson = fetch_lesson(pool.as_ref(), course_id, lesson_id).await?;

    let raw_links = fetch_links_for_lessons(pool.as_ref(), &[lesson_id]).await?;
    let media_url = &config::get().media_url;
    let links: Vec<ResolvedLink> = raw_links
        .iter()
        .map(|l| links::resolve(l, media_url))
        .collect();

    let order = progress::lesson_order(pool.as_ref(), course_id).await?;
    let next_lesson_id = progress::next_lesson_id(&order, lesson.ord);
    let is_last_lesson = progress::is_last_lesson(&order, lesson.ord);

    let completed = match viewer {
        Some(v) => {
            sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM lesson_progress
                    WHERE user_id = $1 AND lesson_id = $2 AND completed = true
                )
                "#,
            )
            .bind(v.id)
            .bind(lesson_id)
            .fetch_one(pool.as_ref())
            .await?
        }
        None => false,
    };

    Ok(Json(LessonDetailResponse {
        id: lesson.id,
        course_id,
        title: lesson.title,
        description: lesson.description,
        ord: lesson.ord,
        cover_image: lesson.cover_image,
        video_url: course.video_url,
        links,
        next_lesson_id,
        is_last_lesson,
        completed,
    }))
}

/// POST /api/courses/{course_id}/enroll/ - Acknowledge enrollment
pub async fn enroll_course(
    Path(course_id): Path<i64>,
) -> Result<Json<EnrollResponse>, ApiError> {
    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;
    let course = fetch_course(pool.as_ref(), course_id).await?;

    Ok(Json(EnrollResponse {
        message: format!("Successfully enrolled in course: {}", course.name),
        course_id,
    }))
}

/// POST /api/courses/{course_id}/lessons/{lesson_id}/complete/ - Mark a
/// lesson complete for the caller (auth required)
pub async fn lesson_complete(
    headers: HeaderMap,
    Path((course_id, lesson_id)): Path<(i64, i64)>,
) -> Result<Json<CompleteResponse>, ApiError> {
    let user = authenticate(&headers)?;
    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;

    fetch_course(pool.as_ref(), course_id).await?;
    let lesson = fetch_lesson(pool.as_ref(), course_id, lesson_id).await?;

    progress::mark_complete(pool.as_ref(), user.id, course_id, lesson.id).await?;
    let counts = progress::course_counts(pool.as_ref(), Some(user.id), course_id).await?;

    tracing::info!(
        user_id = %user.id,
        course_id,
        lesson_id,
        percent = counts.percent,
        "lesson completed"
    );

    Ok(Json(CompleteResponse {
        course_id,
        lesson_id,
        completed_lessons: counts.completed_lessons,
        total_lessons: counts.total_lessons,
        percent: counts.percent,
    }))
}

/// GET /api/courses/{course_id}/progress/ - Course progress for the caller;
/// anonymous callers see zero completions
pub async fn course_progress(
    headers: HeaderMap,
    Path(course_id): Path<i64>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;
    let viewer = maybe_authenticate(&headers);

    fetch_course(pool.as_ref(), course_id).await?;
    let counts =
        progress::course_counts(pool.as_ref(), viewer.map(|v| v.id), course_id).await?;

    Ok(Json(ProgressResponse {
        course_id,
        completed_lessons: counts.completed_lessons,
        total_lessons: counts.total_lessons,
        percent: counts.percent,
    }))
}

/// POST /api/courses/{course_id}/reset_progress/ - Delete the caller's
/// progress rows for a course (auth required, idempotent)
pub async fn reset_course_progress(
    headers: HeaderMap,
    Path(course_id): Path<i64>,
) -> Result<Json<ResetResponse>, ApiError> {
    let user = authenticate(&headers)?;
    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;

    fetch_course(pool.as_ref(), course_id).await?;
    let deleted_count = progress::reset_course(pool.as_ref(), user.id, course_id).await?;

    tracing::info!(user_id = %user.id, course_id, deleted_count, "course progress reset");

    Ok(Json(ResetResponse {
        ok: true,
        deleted_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    fn test_router() -> Router {
        Router::new()
            .route("/api/courses/", get(list_courses))
            .route("/api/courses/{course_id}/", get(course_detail))
            .route(
                "/api/courses/{course_id}/lessons/{lesson_id}/complete/",
                post(lesson_complete),
            )
            .route(
                "/api/courses/{course_id}/reset_progress/",
                post(reset_course_progress),
            )
    }

    #[tokio::test]
    async fn test_list_courses_without_pool_is_unavailable() {
        let req = Request::get("/api/courses/").body(Body::empty()).unwrap();
        let res = test_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_complete_requires_auth() {
        // 401 comes before any database access
        let req = Request::post("/api/courses/1/lessons/2/complete/")
            .body(Body::empty())
            .unwrap();
        let res = test_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_reset_requires_auth() {
        let req = Request::post("/api/courses/1/reset_progress/")
            .body(Body::empty())
            .unwrap();
        let res = test_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_course_detail_without_pool_is_unavailable() {
        let req = Request::get("/api/courses/1/").body(Body::empty()).unwrap();
        let res = test_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

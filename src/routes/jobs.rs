/**
 * Job Routes
 * Job postings associated with courses, with substring search.
 */
use axum::{
    extract::{Path, Query},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::{self, models::Job};
use crate::error::ApiError;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /api/jobs/
#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    /// Case-insensitive substring over title, description, or any
    /// associated course name.
    pub q: Option<String>,
    /// Case-insensitive substring over position_type.
    pub position_type: Option<String>,
}

/// A course as referenced from a job posting
#[derive(Debug, Clone, Serialize)]
pub struct JobCourseRef {
    pub id: i64,
    pub name: String,
}

/// Job response (list items and detail share the shape)
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub position_type: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub image: Option<String>,
    pub courses: Vec<JobCourseRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Query helpers
// ============================================================================

/// LIKE/ILIKE treat % and _ as wildcards; a literal search term must not.
fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Course refs for a set of jobs, keyed by job id.
async fn fetch_course_refs(
    pool: &sqlx::PgPool,
    job_ids: &[i64],
) -> Result<HashMap<i64, Vec<JobCourseRef>>, ApiError> {
    if job_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i64, i64, String)> = sqlx::query_as(
        r#"
        SELECT jc.job_id, c.id, c.name
        FROM job_courses jc
        JOIN courses c ON c.id = jc.course_id
        WHERE jc.job_id = ANY($1)
        ORDER BY jc.job_id, c.id
        "#,
    )
    .bind(job_ids)
    .fetch_all(pool)
    .await?;

    let mut by_job: HashMap<i64, Vec<JobCourseRef>> = HashMap::new();
    for (job_id, id, name) in rows {
        by_job
            .entry(job_id)
            .or_default()
            .push(JobCourseRef { id, name });
    }
    Ok(by_job)
}

fn to_response(job: Job, courses: Vec<JobCourseRef>) -> JobResponse {
    JobResponse {
        id: job.id,
        title: job.title,
        description: job.description,
        position_type: job.position_type,
        company: job.company,
        location: job.location,
        salary: job.salary,
        image: job.image,
        courses,
        created_at: job.created_at,
        updated_at: job.updated_at,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/jobs/ - List jobs, newest first, optionally filtered. The join
/// against courses can match one job several times; DISTINCT collapses the
/// duplicates.
pub async fn list_jobs(
    Query(query): Query<JobListQuery>,
) -> Result<Json<Vec<JobResponse>>, ApiError> {
    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;

    let q_pattern = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);
    let pos_pattern = query
        .position_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);

    let jobs = sqlx::query_as::<_, Job>(
        r#"
        SELECT DISTINCT j.id, j.title, j.description, j.position_type, j.company,
               j.location, j.salary, j.image, j.created_at, j.updated_at
        FROM jobs j
        LEFT JOIN job_courses jc ON jc.job_id = j.id
        LEFT JOIN courses c ON c.id = jc.course_id
        WHERE ($1::text IS NULL
               OR j.title ILIKE $1
               OR j.description ILIKE $1
               OR c.name ILIKE $1)
          AND ($2::text IS NULL OR j.position_type ILIKE $2)
        ORDER BY j.created_at DESC, j.id DESC
        "#,
    )
    .bind(&q_pattern)
    .bind(&pos_pattern)
    .fetch_all(pool.as_ref())
    .await?;

    let job_ids: Vec<i64> = jobs.iter().map(|j| j.id).collect();
    let mut course_refs = fetch_course_refs(pool.as_ref(), &job_ids).await?;

    Ok(Json(
        jobs.into_iter()
            .map(|j| {
                let courses = course_refs.remove(&j.id).unwrap_or_default();
                to_response(j, courses)
            })
            .collect(),
    ))
}

/// GET /api/jobs/{job_id}/ - Job detail
pub async fn job_detail(Path(job_id): Path<i64>) -> Result<Json<JobResponse>, ApiError> {
    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;

    let job = sqlx::query_as::<_, Job>(
        r#"
        SELECT id, title, description, position_type, company, location,
               salary, image, created_at, updated_at
        FROM jobs
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(|| ApiError::not_found("job"))?;

    let mut course_refs = fetch_course_refs(pool.as_ref(), &[job_id]).await?;
    let courses = course_refs.remove(&job_id).unwrap_or_default();

    Ok(Json(to_response(job, courses)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[tokio::test]
    async fn test_list_jobs_without_pool_is_unavailable() {
        let app = Router::new().route("/api/jobs/", get(list_jobs));
        let req = Request::get("/api/jobs/?q=designer")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_job_detail_without_pool_is_unavailable() {
        let app = Router::new().route("/api/jobs/{job_id}/", get(job_detail));
        let req = Request::get("/api/jobs/7/").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

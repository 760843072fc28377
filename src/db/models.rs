//! Database Models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Link kinds stored in `lesson_links.kind`.
pub const KIND_YOUTUBE: &str = "youtube";
pub const KIND_EXTERNAL: &str = "external";
pub const KIND_FILE: &str = "file";

/// Link roles stored in `lesson_links.role`: the primary content track or the
/// sign-language interpretation track.
pub const ROLE_MAIN: &str = "main";
pub const ROLE_SIGN: &str = "sign";

/// Platform user
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Course model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub level: String,
    pub category: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lesson model. `ord` is the position of the lesson within its course,
/// unique per course.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub ord: i32,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lesson media link model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LessonLink {
    pub id: i64,
    pub lesson_id: i64,
    pub title: String,
    pub kind: String,
    pub role: String,
    pub url: String,
    pub file_path: Option<String>,
    pub duration_seconds: Option<i32>,
    pub duration_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Per-user, per-lesson completion record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LessonProgress {
    pub id: i64,
    pub user_id: Uuid,
    pub course_id: i64,
    pub lesson_id: i64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Job posting model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub position_type: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Word-reordering quiz question model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub course_id: i64,
    pub prompt: String,
    pub words: Vec<String>,
    pub correct_order: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

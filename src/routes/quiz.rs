/**
 * Quiz Routes
 * Word-reordering questions per course and answer checking.
 */
use axum::{
    extract::{Path, Query},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::ApiError;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /api/quiz/questions/
#[derive(Debug, Deserialize)]
pub struct QuizListQuery {
    pub course: Option<i64>,
}

/// A question as served to the frontend. The correct ordering never leaves
/// the server through list or detail responses.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct QuizQuestionResponse {
    pub id: i64,
    pub course_id: i64,
    pub prompt: String,
    pub words: Vec<String>,
}

/// Response for POST /api/quiz/questions/{id}/check/
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub question_id: i64,
    pub correct: bool,
    pub expected: Vec<String>,
    pub your_answer: Vec<String>,
}

// ============================================================================
// Answer validation
// ============================================================================

/// The submitted answer must be a non-empty array of strings. Accepting the
/// body as raw JSON keeps malformed payloads a 400 instead of a rejection
/// from the extractor.
fn parse_answer(body: &serde_json::Value) -> Result<Vec<String>, ApiError> {
    let answer = body
        .get("answer")
        .ok_or_else(|| ApiError::Validation("answer is required".to_string()))?;
    let items = answer
        .as_array()
        .ok_or_else(|| ApiError::Validation("answer must be a list of words".to_string()))?;
    if items.is_empty() {
        return Err(ApiError::Validation("answer must not be empty".to_string()));
    }
    items
        .iter()
        .map(|v| {
            v.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| ApiError::Validation("answer must be a list of words".to_string()))
        })
        .collect()
}

/// Element-wise, order-sensitive comparison. No case or whitespace
/// normalization.
fn is_correct(expected: &[String], submitted: &[String]) -> bool {
    expected == submitted
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/quiz/questions/ - List questions, optionally for one course
pub async fn quiz_list(
    Query(query): Query<QuizListQuery>,
) -> Result<Json<Vec<QuizQuestionResponse>>, ApiError> {
    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;

    let questions = sqlx::query_as::<_, QuizQuestionResponse>(
        r#"
        SELECT id, course_id, prompt, words
        FROM quiz_questions
        WHERE ($1::bigint IS NULL OR course_id = $1)
        ORDER BY id
        "#,
    )
    .bind(query.course)
    .fetch_all(pool.as_ref())
    .await?;

    Ok(Json(questions))
}

/// GET /api/quiz/questions/{id}/ - Question detail
pub async fn quiz_detail(
    Path(question_id): Path<i64>,
) -> Result<Json<QuizQuestionResponse>, ApiError> {
    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;

    let question = sqlx::query_as::<_, QuizQuestionResponse>(
        r#"
        SELECT id, course_id, prompt, words
        FROM quiz_questions
        WHERE id = $1
        "#,
    )
    .bind(question_id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(|| ApiError::not_found("question"))?;

    Ok(Json(question))
}

/// POST /api/quiz/questions/{id}/check/ - Check a submitted ordering.
/// Pure read: nothing is persisted.
pub async fn quiz_check(
    Path(question_id): Path<i64>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<CheckResponse>, ApiError> {
    let submitted = parse_answer(&body)?;

    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;

    let expected: Vec<String> =
        sqlx::query_scalar("SELECT correct_order FROM quiz_questions WHERE id = $1")
            .bind(question_id)
            .fetch_optional(pool.as_ref())
            .await?
            .ok_or_else(|| ApiError::not_found("question"))?;

    Ok(Json(CheckResponse {
        question_id,
        correct: is_correct(&expected, &submitted),
        expected,
        your_answer: submitted,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_exact_order_is_correct() {
        let expected = strings(&["a", "b", "c"]);
        assert!(is_correct(&expected, &strings(&["a", "b", "c"])));
    }

    #[test]
    fn test_wrong_order_is_incorrect() {
        let expected = strings(&["a", "b", "c"]);
        assert!(!is_correct(&expected, &strings(&["b", "a", "c"])));
        assert!(!is_correct(&expected, &strings(&["a", "b"])));
    }

    #[test]
    fn test_no_normalization() {
        let expected = strings(&["Hello"]);
        assert!(!is_correct(&expected, &strings(&["hello"])));
        assert!(!is_correct(&expected, &strings(&["Hello "])));
    }

    #[test]
    fn test_parse_answer_happy_path() {
        let body = serde_json::json!({ "answer": ["a", "b"] });
        assert_eq!(parse_answer(&body).unwrap(), strings(&["a", "b"]));
    }

    #[test]
    fn test_parse_answer_rejects_empty() {
        let body = serde_json::json!({ "answer": [] });
        assert!(parse_answer(&body).is_err());
    }

    #[test]
    fn test_parse_answer_rejects_missing_and_non_strings() {
        assert!(parse_answer(&serde_json::json!({})).is_err());
        assert!(parse_answer(&serde_json::json!({ "answer": "abc" })).is_err());
        assert!(parse_answer(&serde_json::json!({ "answer": ["a", 1] })).is_err());
    }

    #[tokio::test]
    async fn test_check_with_empty_answer_is_bad_request() {
        // Validation happens before the question lookup, so no pool is needed
        let app = Router::new().route("/api/quiz/questions/{id}/check/", post(quiz_check));
        let req = Request::post("/api/quiz/questions/1/check/")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"answer": []}"#))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}

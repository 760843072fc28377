/**
 * Progress tracking
 * Completion upsert, derived percent computation and lesson navigation.
 * Percent is always computed from the lesson table at call time, never
 * stored, so it stays correct as administrators add or remove lessons.
 */
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProgressCounts {
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub percent: f64,
}

/// completed/total as a percentage rounded to 2 decimal places; 0 when the
/// course has no lessons.
pub fn percent(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (completed as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
}

/// Count a course's lessons and the viewer's completed rows in it.
/// Anonymous viewers own no progress rows, so their completed count is 0.
pub async fn course_counts(
    pool: &PgPool,
    user_id: Option<Uuid>,
    course_id: i64,
) -> Result<ProgressCounts, sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons WHERE course_id = $1")
        .bind(course_id)
        .fetch_one(pool)
        .await?;

    let completed: i64 = match user_id {
        Some(uid) => {
            sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM lesson_progress
                WHERE user_id = $1 AND course_id = $2 AND completed = true
                "#,
            )
            .bind(uid)
            .bind(course_id)
            .fetch_one(pool)
            .await?
        }
        None => 0,
    };

    Ok(ProgressCounts {
        completed_lessons: completed,
        total_lessons: total,
        percent: percent(completed, total),
    })
}

/// Upsert the (user, lesson) progress row to completed. A single
/// ON CONFLICT statement, so concurrent completions by the same user
/// cannot race the uniqueness constraint into duplicate rows.
pub async fn mark_complete(
    pool: &PgPool,
    user_id: Uuid,
    course_id: i64,
    lesson_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO lesson_progress (user_id, course_id, lesson_id, completed, completed_at)
        VALUES ($1, $2, $3, true, now())
        ON CONFLICT (user_id, lesson_id)
        DO UPDATE SET completed = true, completed_at = now()
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .bind(lesson_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete all of a user's progress rows in a course. Returns the number of
/// rows removed; 0 on a course with no prior progress.
pub async fn reset_course(
    pool: &PgPool,
    user_id: Uuid,
    course_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM lesson_progress WHERE user_id = $1 AND course_id = $2")
        .bind(user_id)
        .bind(course_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// All (id, ord) pairs of a course, in canonical (ord, id) order.
pub async fn lesson_order(pool: &PgPool, course_id: i64) -> Result<Vec<(i64, i32)>, sqlx::Error> {
    sqlx::query_as("SELECT id, ord FROM lessons WHERE course_id = $1 ORDER BY ord, id")
        .bind(course_id)
        .fetch_all(pool)
        .await
}

/// Id of the lesson with the smallest ord strictly greater than the current
/// one, ties broken by ascending id. None when the current lesson is last.
pub fn next_lesson_id(lessons: &[(i64, i32)], current_ord: i32) -> Option<i64> {
    lessons
        .iter()
        .filter(|(_, ord)| *ord > current_ord)
        .min_by_key(|(id, ord)| (*ord, *id))
        .map(|(id, _)| *id)
}

/// True iff no lesson in the course has a strictly greater ord.
pub fn is_last_lesson(lessons: &[(i64, i32)], current_ord: i32) -> bool {
    !lessons.iter().any(|(_, ord)| *ord > current_ord)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_zero_total_is_zero() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(5, 0), 0.0);
    }

    #[test]
    fn test_percent_rounds_to_two_decimals() {
        assert_eq!(percent(1, 3), 33.33);
        assert_eq!(percent(2, 3), 66.67);
        assert_eq!(percent(3, 3), 100.0);
        assert_eq!(percent(0, 4), 0.0);
    }

    #[test]
    fn test_next_lesson_in_order() {
        // ords [1, 2, 3]
        let lessons = vec![(10, 1), (11, 2), (12, 3)];
        assert_eq!(next_lesson_id(&lessons, 1), Some(11));
        assert_eq!(next_lesson_id(&lessons, 2), Some(12));
        assert_eq!(next_lesson_id(&lessons, 3), None);
    }

    #[test]
    fn test_next_lesson_skips_gaps() {
        let lessons = vec![(10, 0), (11, 5), (12, 9)];
        assert_eq!(next_lesson_id(&lessons, 0), Some(11));
        assert_eq!(next_lesson_id(&lessons, 5), Some(12));
    }

    #[test]
    fn test_next_lesson_tie_broken_by_id() {
        // The constraint keeps ords unique per course, but a stale snapshot
        // might not be; the lowest id wins.
        let lessons = vec![(20, 2), (15, 2), (10, 1)];
        assert_eq!(next_lesson_id(&lessons, 1), Some(15));
    }

    #[test]
    fn test_is_last_lesson() {
        let lessons = vec![(10, 1), (11, 2), (12, 3)];
        assert!(!is_last_lesson(&lessons, 1));
        assert!(!is_last_lesson(&lessons, 2));
        assert!(is_last_lesson(&lessons, 3));
    }

    #[test]
    fn test_single_lesson_course() {
        let lessons = vec![(10, 0)];
        assert_eq!(next_lesson_id(&lessons, 0), None);
        assert!(is_last_lesson(&lessons, 0));
    }
}

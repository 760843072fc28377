/**
 * Authentication Routes
 * JWT bearer-token identity: register, login and verify. Progress mutations
 * require a valid token; catalog reads treat a missing or invalid token as
 * an anonymous caller.
 */
use axum::{http::HeaderMap, Json};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;
use crate::db;
use crate::error::ApiError;

/// Access token lifetime.
const ACCESS_TOKEN_EXPIRY_HOURS: i64 = 24;

// ============================================================================
// Types
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,   // User ID
    pub email: String, // User email
    pub exp: i64,      // Expiry timestamp
    pub iat: i64,      // Issued at timestamp
}

/// The authenticated caller, as decoded from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// User info returned to the frontend
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserInfo {
    pub user_id: String,
    pub email: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub user: Option<UserInfo>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserInfo>,
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub is_valid: bool,
    pub user: Option<UserInfo>,
}

// ============================================================================
// Token helpers
// ============================================================================

fn create_access_token(
    user_id: &str,
    email: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::hours(ACCESS_TOKEN_EXPIRY_HOURS);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config::get().jwt_secret.as_bytes()),
    )
}

pub fn verify_access_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config::get().jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// The caller's identity, required. 401 on a missing, malformed or expired
/// token.
pub fn authenticate(headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("authorization required".to_string()))?;
    let claims = verify_access_token(&token)
        .map_err(|_| ApiError::Unauthorized("invalid or expired token".to_string()))?;
    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("invalid or expired token".to_string()))?;
    Ok(AuthUser {
        id,
        email: claims.email,
    })
}

/// The caller's identity, if any. Invalid tokens are treated the same as no
/// token: an anonymous viewer.
pub fn maybe_authenticate(headers: &HeaderMap) -> Option<AuthUser> {
    authenticate(headers).ok()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
pub async fn register(
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "email and password are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("invalid email format".to_string()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;

    let password_hash = hash(&payload.password, DEFAULT_COST)
        .map_err(|e| ApiError::Database(e.to_string()))?;

    let user_id: Uuid = match sqlx::query_scalar(
        "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id",
    )
    .bind(&email)
    .bind(&password_hash)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(id) => id,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::Validation(
                "email already registered".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(%email, "user registered");

    Ok(Json(RegisterResponse {
        success: true,
        user: Some(UserInfo {
            user_id: user_id.to_string(),
            email,
        }),
    }))
}

/// POST /api/auth/login
pub async fn login(Json(payload): Json<LoginRequest>) -> Result<Json<LoginResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "email and password are required".to_string(),
        ));
    }

    let pool = db::get_pool().ok_or_else(ApiError::no_database)?;

    let row: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, password_hash FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(pool.as_ref())
            .await?;

    let (user_id, password_hash) = row.ok_or_else(|| {
        ApiError::Unauthorized("invalid email or password".to_string())
    })?;

    let valid = verify(&payload.password, &password_hash).unwrap_or(false);
    if !valid {
        tracing::warn!(%email, "failed login attempt");
        return Err(ApiError::Unauthorized(
            "invalid email or password".to_string(),
        ));
    }

    let token = create_access_token(&user_id.to_string(), &email)
        .map_err(|e| ApiError::Database(e.to_string()))?;

    tracing::info!(%email, "user logged in");

    Ok(Json(LoginResponse {
        success: true,
        user: Some(UserInfo {
            user_id: user_id.to_string(),
            email,
        }),
        access_token: Some(token),
    }))
}

/// POST /api/auth/verify
pub async fn verify_token(Json(payload): Json<VerifyRequest>) -> Json<VerifyResponse> {
    match verify_access_token(&payload.token) {
        Ok(claims) => Json(VerifyResponse {
            success: true,
            is_valid: true,
            user: Some(UserInfo {
                user_id: claims.sub,
                email: claims.email,
            }),
        }),
        Err(_) => Json(VerifyResponse {
            success: false,
            is_valid: false,
            user: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = create_access_token(&user_id.to_string(), "a@b.com").unwrap();
        let claims = verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "a@b.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(verify_access_token("not-a-token").is_err());
    }

    #[test]
    fn test_authenticate_without_header() {
        let headers = HeaderMap::new();
        assert!(authenticate(&headers).is_err());
        assert!(maybe_authenticate(&headers).is_none());
    }

    #[test]
    fn test_authenticate_with_valid_bearer() {
        let user_id = Uuid::new_v4();
        let token = create_access_token(&user_id.to_string(), "a@b.com").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        let user = authenticate(&headers).unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.email, "a@b.com");
    }

    #[test]
    fn test_authenticate_rejects_non_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(authenticate(&headers).is_err());
    }
}

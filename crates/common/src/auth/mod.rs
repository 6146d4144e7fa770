//! Authentication utilities
//!
//! Provides:
//! - JWT token issuing and validation (HS256, `sub` = user id)
//! - The `AuthContext` extractor that scopes every request to one user

use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Owner of every document the request touches
    pub user_id: String,

    /// Request ID for tracing
    pub request_id: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: i64::try_from(expiration_secs).unwrap_or(i64::MAX),
        }
    }

    /// Issue a token for `user_id`. Sign-in itself happens elsewhere; this
    /// is for tooling and tests.
    pub fn issue(&self, user_id: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }
}

/// Token part of an `Authorization: Bearer <token>` header
pub fn bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = bearer_token(auth_header).ok_or_else(|| AppError::Unauthorized {
            message: "Expected a Bearer token".to_string(),
        })?;

        let claims = Arc::<JwtManager>::from_ref(state).validate_token(token)?;
        if claims.sub.trim().is_empty() {
            return Err(AppError::InvalidToken);
        }

        Ok(AuthContext {
            user_id: claims.sub,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Clone)]
    struct TestState {
        jwt: Arc<JwtManager>,
    }

    impl FromRef<TestState> for Arc<JwtManager> {
        fn from_ref(state: &TestState) -> Self {
            state.jwt.clone()
        }
    }

    async fn extract(state: &TestState, auth: Option<&str>) -> Result<AuthContext> {
        let mut builder = Request::builder().uri("/v1/materials").header("x-request-id", "req-1");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthContext::from_request_parts(&mut parts, state).await
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);
        let token = assert_ok!(manager.issue("user-42"));
        let claims = assert_ok!(manager.validate_token(&token));
        assert_eq!(claims.sub, "user-42");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let token = assert_ok!(JwtManager::new("one", 3600).issue("user-42"));
        let err = assert_err!(JwtManager::new("two", 3600).validate_token(&token));
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn test_extractor_scopes_request_to_subject() {
        let state = TestState {
            jwt: Arc::new(JwtManager::new("secret", 3600)),
        };
        let token = state.jwt.issue("alice").unwrap();

        let ctx = extract(&state, Some(&format!("Bearer {token}"))).await.unwrap();
        assert_eq!(ctx.user_id, "alice");
        assert_eq!(ctx.request_id, "req-1");

        assert!(matches!(
            extract(&state, None).await,
            Err(AppError::Unauthorized { .. })
        ));
        assert!(matches!(
            extract(&state, Some("Bearer not-a-jwt")).await,
            Err(AppError::InvalidToken)
        ));
    }
}

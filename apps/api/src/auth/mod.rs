//! Bearer-token authentication: HMAC-SHA256 JWTs, the auth middleware, and
//! user registration.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::errors::AppError;
use crate::state::AppState;
use crate::store::models::{ActivityEvent, Tier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub tier: String,
    pub iat: u64,
    pub exp: u64,
}

/// Authenticated caller, extracted from validated claims and inserted into
/// request extensions by the middleware.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub tier: Tier,
}

/// Stable opaque user id: SHA-256 of the lowercased email, hex encoded.
pub fn user_id_for_email(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase());
    format!("{:x}", hasher.finalize())
}

pub fn create_token(
    secret: &str,
    user_id: &str,
    tier: Tier,
    ttl_min: u64,
) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = Claims {
        sub: user_id.to_string(),
        tier: tier.as_str().to_string(),
        iat: now,
        exp: now + ttl_min * 60,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn validate_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Bearer-token middleware for every protected route. Valid claims become
/// an [`AuthedUser`] extension; anything else is a uniform 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty());

    let Some(token) = token else {
        return AppError::Unauthorized.into_response();
    };

    match validate_token(&state.config.jwt_secret, token) {
        Ok(claims) => {
            let tier = Tier::parse(&claims.tier).unwrap_or(Tier::Free);
            req.extensions_mut().insert(AuthedUser {
                id: claims.sub.clone(),
                tier,
            });
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Token validation failed");
            AppError::Unauthorized.into_response()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Registration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub token: String,
    pub tier: Tier,
    pub credits: i64,
}

/// POST /auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::Validation(format!("Invalid email: {}", req.email)));
    }

    let user_id = user_id_for_email(&email);
    let user = state
        .store
        .create_user(&user_id, &email, state.config.free_tier_credits)
        .await?;

    let token = create_token(
        &state.config.jwt_secret,
        &user_id,
        user.tier(),
        state.config.token_ttl_min,
    )?;

    state
        .store
        .record_activity(
            &user_id,
            ActivityEvent::Register,
            serde_json::json!({ "tier": user.tier }),
        )
        .await;
    info!(user_id, "User registered");

    Ok(Json(RegisterResponse {
        token,
        tier: user.tier(),
        credits: user.credits,
    }))
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
        && email.len() <= 254
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_is_stable_and_case_insensitive() {
        let a = user_id_for_email("User@Example.com");
        let b = user_id_for_email("user@example.com ");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_token_roundtrip() {
        let token = create_token("secret", "uid-1", Tier::Starter, 60).unwrap();
        let claims = validate_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "uid-1");
        assert_eq!(claims.tier, "starter");
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_rejects_wrong_secret() {
        let token = create_token("secret-a", "uid-1", Tier::Free, 60).unwrap();
        assert!(validate_token("secret-b", &token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Expiry must be back-dated past the default 60 s validation leeway.
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: "uid-1".to_string(),
            tier: "free".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(validate_token("secret", &token).is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@sub.example.co"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("a b@example.com"));
    }
}

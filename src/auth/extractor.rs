// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated callers.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use super::{AccessClaims, AuthError, AuthenticatedUser, Role};
use crate::config::AuthSettings;
use crate::state::AppState;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Extractor for authenticated callers.
///
/// Validates the HS256 bearer token from the Authorization header against
/// `AUTH_JWT_SECRET` and the configured audience.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_wallet(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<WalletResponse>, ApiError> {
///     // user.user_id contains the caller's ID
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = verify_jwt(token, &state.config.auth)?;

        Ok(Auth(user))
    }
}

/// Verify an access token and extract the caller.
pub fn verify_jwt(token: &str, settings: &AuthSettings) -> Result<AuthenticatedUser, AuthError> {
    match settings.jwt_secret.as_deref() {
        Some(secret) => verify_hs256(token, secret, &settings.audience),
        None => verify_unsigned(token),
    }
}

fn verify_hs256(token: &str, secret: &str, audience: &str) -> Result<AuthenticatedUser, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation.set_audience(&[audience]);

    let token_data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        _ => AuthError::MalformedToken,
    })?;

    Ok(AuthenticatedUser::from_claims(token_data.claims))
}

/// Development decoding (no signature check).
///
/// WARNING: Only compiled with the `dev` feature.
#[cfg(feature = "dev")]
fn verify_unsigned(token: &str) -> Result<AuthenticatedUser, AuthError> {
    tracing::warn!("AUTH_JWT_SECRET not set; accepting unsigned token (dev build)");

    let token_data = jsonwebtoken::dangerous::insecure_decode::<AccessClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;
    let claims = token_data.claims;

    let now = chrono::Utc::now().timestamp();
    if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    Ok(AuthenticatedUser::from_claims(claims))
}

#[cfg(not(feature = "dev"))]
fn verify_unsigned(_token: &str) -> Result<AuthenticatedUser, AuthError> {
    Err(AuthError::NotConfigured)
}

/// Extractor that requires the service role (backend jobs).
pub struct ServiceOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for ServiceOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.has_role(Role::ServiceRole) {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(ServiceOnly(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{test_state, token_for};
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn parts_with(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn settings() -> AuthSettings {
        AuthSettings {
            jwt_secret: Some("test-jwt-secret".to_string()),
            audience: "authenticated".to_string(),
        }
    }

    fn token_with(claims: &AccessClaims, secret: &str) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn claims(exp_offset: i64, aud: &str) -> AccessClaims {
        AccessClaims {
            sub: "user_123".to_string(),
            exp: chrono::Utc::now().timestamp() + exp_offset,
            iat: None,
            aud: Some(aud.to_string()),
            role: None,
            session_id: None,
        }
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _dir) = test_state();
        let mut parts = parts_with(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_signed_token() {
        let (state, _dir) = test_state();
        let token = token_for("user_123", Role::Authenticated);
        let mut parts = parts_with(Some(&token));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.role, Role::Authenticated);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = token_with(&claims(3600, "authenticated"), "someone-else");
        assert!(matches!(
            verify_jwt(&token, &settings()),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = token_with(&claims(-3600, "authenticated"), "test-jwt-secret");
        assert!(matches!(verify_jwt(&token, &settings()), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let token = token_with(&claims(3600, "anon"), "test-jwt-secret");
        assert!(matches!(verify_jwt(&token, &settings()), Err(AuthError::InvalidAudience)));
    }

    #[test]
    fn garbage_token_is_malformed() {
        assert!(matches!(
            verify_jwt("not-a-jwt", &settings()),
            Err(AuthError::MalformedToken)
        ));
    }

    #[cfg(not(feature = "dev"))]
    #[test]
    fn missing_secret_refuses_tokens() {
        let token = token_with(&claims(3600, "authenticated"), "test-jwt-secret");
        let unconfigured = AuthSettings {
            jwt_secret: None,
            audience: "authenticated".to_string(),
        };
        assert!(matches!(verify_jwt(&token, &unconfigured), Err(AuthError::NotConfigured)));
    }

    #[tokio::test]
    async fn service_only_rejects_regular_users() {
        let (state, _dir) = test_state();
        let token = token_for("user_123", Role::Authenticated);
        let mut parts = parts_with(Some(&token));

        let result = ServiceOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));

        let token = token_for("cron", Role::ServiceRole);
        let mut parts = parts_with(Some(&token));
        let ServiceOnly(user) = ServiceOnly::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, "cron");
    }
}

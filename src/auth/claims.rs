// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims carried by an HS256 access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Audience (validated by jsonwebtoken, not read directly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Caller role (`authenticated` or `service_role`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Login session ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Authenticated caller extracted from a verified access token.
///
/// This is the primary type used throughout the application to represent
/// the caller making a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,

    /// Caller role
    pub role: Role,

    /// Login session ID (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Token expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Create from verified claims. Unknown roles fall back to least privilege.
    pub fn from_claims(claims: AccessClaims) -> Self {
        let role = claims
            .role
            .as_deref()
            .and_then(Role::from_claim)
            .unwrap_or_default();

        Self {
            user_id: claims.sub,
            role,
            session_id: claims.session_id,
            expires_at: claims.exp,
        }
    }

    /// Check if the caller has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> AccessClaims {
        AccessClaims {
            sub: "user_123".to_string(),
            exp: 1700003600,
            iat: Some(1700000000),
            aud: Some("authenticated".to_string()),
            role: Some("service_role".to_string()),
            session_id: Some("sess_abc".to_string()),
        }
    }

    #[test]
    fn from_claims_extracts_user_and_role() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.role, Role::ServiceRole);
        assert_eq!(user.session_id.as_deref(), Some("sess_abc"));
        assert!(user.has_role(Role::Authenticated));
    }

    #[test]
    fn unknown_role_defaults_to_authenticated() {
        let mut claims = sample_claims();
        claims.role = Some("anon".to_string());
        let user = AuthenticatedUser::from_claims(claims);
        assert_eq!(user.role, Role::Authenticated);
        assert!(!user.has_role(Role::ServiceRole));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Caller roles carried in the access token's `role` claim.
///
/// ## Role Hierarchy
///
/// - `ServiceRole` - Backend jobs (bank sync); may also act as a user
/// - `Authenticated` - Signed-in user, limited to their own wallet and sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Signed-in end user
    Authenticated,
    /// Trusted backend caller
    ServiceRole,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            (Role::ServiceRole, _) => true,
            (Role::Authenticated, Role::Authenticated) => true,
            _ => false,
        }
    }

    /// Parse role from a claim value (case-insensitive).
    pub fn from_claim(s: &str) -> Option<Role> {
        match s.to_ascii_lowercase().as_str() {
            "authenticated" => Some(Role::Authenticated),
            "service_role" => Some(Role::ServiceRole),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Least privilege for a valid token without a recognised role.
    fn default() -> Self {
        Role::Authenticated
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Authenticated => write!(f, "authenticated"),
            Role::ServiceRole => write!(f, "service_role"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_role_has_all_privileges() {
        assert!(Role::ServiceRole.has_privilege(Role::ServiceRole));
        assert!(Role::ServiceRole.has_privilege(Role::Authenticated));
    }

    #[test]
    fn authenticated_cannot_act_as_service() {
        assert!(Role::Authenticated.has_privilege(Role::Authenticated));
        assert!(!Role::Authenticated.has_privilege(Role::ServiceRole));
    }

    #[test]
    fn from_claim_parses_correctly() {
        assert_eq!(Role::from_claim("service_role"), Some(Role::ServiceRole));
        assert_eq!(Role::from_claim("Authenticated"), Some(Role::Authenticated));
        assert_eq!(Role::from_claim("anon"), None);
    }

    #[test]
    fn default_role_is_authenticated() {
        assert_eq!(Role::default(), Role::Authenticated);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! This module provides bearer-token authentication for the top-up API.
//!
//! ## Auth Flow
//!
//! 1. The identity provider issues an HS256 access token to the app
//! 2. The app sends `Authorization: Bearer <token>`
//! 3. The server:
//!    - Verifies signature (`AUTH_JWT_SECRET`), expiry and audience
//!    - Extracts:
//!      - `sub` → canonical `user_id`
//!      - `role` → `authenticated` or `service_role`
//!
//! ## Security
//!
//! - Wallet and session endpoints require authentication
//! - Bank sync requires the service role
//! - The bank webhook is authenticated by HMAC signature instead
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod roles;

pub use claims::{AccessClaims, AuthenticatedUser};
pub use error::AuthError;
pub use extractor::{Auth, ServiceOnly};
pub use roles::Role;

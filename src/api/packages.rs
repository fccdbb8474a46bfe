// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;

use crate::{models::PackagesResponse, payments::packages};

#[utoipa::path(
    get,
    path = "/v1/packages",
    tag = "Packages",
    responses((status = 200, body = PackagesResponse))
)]
pub async fn list_packages() -> Json<PackagesResponse> {
    Json(PackagesResponse {
        packages: packages::catalogue().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_whole_catalogue() {
        let Json(response) = list_packages().await;
        assert_eq!(response.packages.len(), packages::catalogue().len());
        assert!(response.packages.iter().any(|p| p.id == "pkg_50k"));
    }
}

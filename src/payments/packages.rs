// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Coin package catalogue.

use serde::Serialize;
use utoipa::ToSchema;

/// A purchasable bundle of coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CoinPackage {
    /// Stable package identifier.
    pub id: &'static str,
    /// Transfer amount in VND.
    pub price_vnd: u64,
    /// Base coins.
    pub coins: u64,
    /// Bonus coins on top of the base amount.
    pub bonus: u64,
}

impl CoinPackage {
    /// Coins credited when a session for this package completes.
    pub fn total_coins(&self) -> u64 {
        self.coins + self.bonus
    }
}

const CATALOGUE: &[CoinPackage] = &[
    CoinPackage { id: "pkg_10k", price_vnd: 10_000, coins: 100, bonus: 0 },
    CoinPackage { id: "pkg_20k", price_vnd: 20_000, coins: 200, bonus: 10 },
    CoinPackage { id: "pkg_50k", price_vnd: 50_000, coins: 500, bonus: 50 },
    CoinPackage { id: "pkg_100k", price_vnd: 100_000, coins: 1_000, bonus: 150 },
    CoinPackage { id: "pkg_200k", price_vnd: 200_000, coins: 2_000, bonus: 400 },
    CoinPackage { id: "pkg_500k", price_vnd: 500_000, coins: 5_000, bonus: 1_250 },
];

/// All packages, cheapest first.
pub fn catalogue() -> &'static [CoinPackage] {
    CATALOGUE
}

/// Look up a package by id.
pub fn find(package_id: &str) -> Option<&'static CoinPackage> {
    CATALOGUE.iter().find(|p| p.id == package_id)
}

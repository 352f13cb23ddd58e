//! Revenue split policy
//!
//! Pure computation of the three-way split of a content price into creator,
//! platform, and AI-pool shares. Shares are held in basis points and the
//! arithmetic is all-integer; the AI pool absorbs the rounding remainder so
//! the three shares always sum exactly to the price.

use serde::Serialize;

use crate::types::{BursarError, Result};

/// One hundred percent, in basis points
const BPS_SCALE: i64 = 10_000;

/// Configured revenue shares in basis points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueRates {
    pub creator_bps: i64,
    pub platform_bps: i64,
}

impl Default for RevenueRates {
    fn default() -> Self {
        // 60% creator / 15% platform; remaining 25% funds the AI pool
        Self {
            creator_bps: 6_000,
            platform_bps: 1_500,
        }
    }
}

impl RevenueRates {
    /// Build rates from fractional shares (e.g. 0.60 / 0.15)
    pub fn from_shares(creator: f64, platform: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&creator) || !(0.0..=1.0).contains(&platform) {
            return Err(BursarError::Config(
                "Revenue shares must be within [0, 1]".into(),
            ));
        }

        let creator_bps = (creator * BPS_SCALE as f64).round() as i64;
        let platform_bps = (platform * BPS_SCALE as f64).round() as i64;

        if creator_bps + platform_bps > BPS_SCALE {
            return Err(BursarError::Config(
                "Creator and platform shares exceed 100%".into(),
            ));
        }

        Ok(Self {
            creator_bps,
            platform_bps,
        })
    }
}

/// Exact three-way split of a purchase price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSplit {
    pub creator: i64,
    pub platform: i64,
    pub ai_pool: i64,
}

/// Split a price into creator/platform/AI-pool shares.
///
/// Creator and platform shares round down; the AI pool takes the rest, so
/// `creator + platform + ai_pool == price` for every positive price.
pub fn split(price: i64, rates: &RevenueRates) -> Result<RevenueSplit> {
    if price <= 0 {
        return Err(BursarError::Validation(format!(
            "Invalid price: {} (must be positive)",
            price
        )));
    }

    let creator = price * rates.creator_bps / BPS_SCALE;
    let platform = price * rates.platform_bps / BPS_SCALE;
    let ai_pool = price - creator - platform;

    Ok(RevenueSplit {
        creator,
        platform,
        ai_pool,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_split() {
        // price 15 at 60/15: creator 9, platform 2, pool 4
        let s = split(15, &RevenueRates::default()).unwrap();
        assert_eq!(s.creator, 9);
        assert_eq!(s.platform, 2);
        assert_eq!(s.ai_pool, 4);
    }

    #[test]
    fn test_non_round_price() {
        // price 7: floor(4.2)=4, floor(1.05)=1, pool takes 2
        let s = split(7, &RevenueRates::default()).unwrap();
        assert_eq!(s.creator, 4);
        assert_eq!(s.platform, 1);
        assert_eq!(s.ai_pool, 2);
    }

    #[test]
    fn test_conservation_over_range() {
        let rates = RevenueRates::default();
        for price in 1..=1_000 {
            let s = split(price, &rates).unwrap();
            assert_eq!(s.creator + s.platform + s.ai_pool, price, "price {}", price);
            assert!(s.creator >= 0 && s.platform >= 0 && s.ai_pool >= 0);
        }
    }

    #[test]
    fn test_price_of_one() {
        // Everything rounds down to zero except the pool remainder
        let s = split(1, &RevenueRates::default()).unwrap();
        assert_eq!(s.creator, 0);
        assert_eq!(s.platform, 0);
        assert_eq!(s.ai_pool, 1);
    }

    #[test]
    fn test_invalid_price_rejected() {
        assert!(split(0, &RevenueRates::default()).is_err());
        assert!(split(-5, &RevenueRates::default()).is_err());
    }

    #[test]
    fn test_rates_from_shares() {
        let rates = RevenueRates::from_shares(0.60, 0.15).unwrap();
        assert_eq!(rates, RevenueRates::default());

        assert!(RevenueRates::from_shares(0.9, 0.2).is_err());
        assert!(RevenueRates::from_shares(-0.1, 0.5).is_err());
    }

    #[test]
    fn test_full_creator_share() {
        let rates = RevenueRates::from_shares(1.0, 0.0).unwrap();
        let s = split(42, &rates).unwrap();
        assert_eq!(s.creator, 42);
        assert_eq!(s.platform, 0);
        assert_eq!(s.ai_pool, 0);
    }
}

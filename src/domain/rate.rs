use crate::domain::money::round2;
use crate::domain::profile::{LoyaltyTier, TierSchedule, UserId};
use crate::error::ExchangeError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Currency every rate and wallet figure is denominated in.
pub const DEFAULT_CURRENCY: &str = "NGN";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RateStatus {
    Active,
    Inactive,
}

/// The quoted exchange rate for one gift-card type.
///
/// `buy_rate` is the fraction of face value paid to the user. `sell_rate`
/// is reserved for future selling features and has no behavior yet; its
/// bounds are still validated so the stored data stays coherent.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Rate {
    pub card_type: String,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub currency: String,
    pub status: RateStatus,
    pub last_updated: DateTime<Utc>,
}

impl Rate {
    pub fn is_active(&self) -> bool {
        self.status == RateStatus::Active
    }
}

/// A validated request to change a card type's rate.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RateUpdate {
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    /// Omitted means: keep the previous status, or `active` for a new rate.
    pub status: Option<RateStatus>,
}

impl RateUpdate {
    /// Both rates must be in (0, 1] and the sell rate strictly above the
    /// buy rate.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.buy_rate <= Decimal::ZERO || self.buy_rate > Decimal::ONE {
            return Err(ExchangeError::InvalidRateBounds(
                "buy rate must be between 0 and 1".to_string(),
            ));
        }
        if self.sell_rate <= Decimal::ZERO || self.sell_rate > Decimal::ONE {
            return Err(ExchangeError::InvalidRateBounds(
                "sell rate must be between 0 and 1".to_string(),
            ));
        }
        if self.sell_rate <= self.buy_rate {
            return Err(ExchangeError::InvalidRateBounds(
                "sell rate must be higher than buy rate".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the rate record this update resolves to. Assumes `validate`
    /// has already passed.
    pub fn into_rate(self, card_type: impl Into<String>, previous: Option<&Rate>) -> Rate {
        let currency = previous
            .map(|p| p.currency.clone())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let status = self
            .status
            .or(previous.map(|p| p.status))
            .unwrap_or(RateStatus::Active);
        Rate {
            card_type: card_type.into(),
            buy_rate: self.buy_rate,
            sell_rate: self.sell_rate,
            currency,
            status,
            last_updated: Utc::now(),
        }
    }
}

/// Point-in-time copy of a rate's numbers, embedded in audit records.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
pub struct RateSnapshot {
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub status: RateStatus,
}

impl From<&Rate> for RateSnapshot {
    fn from(rate: &Rate) -> Self {
        Self {
            buy_rate: rate.buy_rate,
            sell_rate: rate.sell_rate,
            status: rate.status,
        }
    }
}

/// Immutable audit record appended for every rate mutation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RateChange {
    pub id: Uuid,
    pub card_type: String,
    pub previous: Option<RateSnapshot>,
    pub new: RateSnapshot,
    pub actor_id: UserId,
    pub recorded_at: DateTime<Utc>,
}

impl RateChange {
    pub fn new(
        card_type: impl Into<String>,
        previous: Option<RateSnapshot>,
        new: RateSnapshot,
        actor_id: UserId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_type: card_type.into(),
            previous,
            new,
            actor_id,
            recorded_at: Utc::now(),
        }
    }
}

/// The result of quoting a gift card against the current rate table.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ExchangeQuote {
    pub card_type: String,
    pub card_value: Decimal,
    /// Buy rate with the tier multiplier applied, unrounded.
    pub exchange_rate: Decimal,
    pub exchange_amount: Decimal,
    pub tier_bonus: Decimal,
    pub tier: LoyaltyTier,
    pub currency: String,
}

impl ExchangeQuote {
    /// Pure quote over a rate snapshot; identical inputs always produce
    /// identical outputs.
    ///
    /// `exchange_amount = round2(card_value * buy_rate * multiplier)` and
    /// `tier_bonus = round2(card_value * buy_rate * (multiplier - 1))`,
    /// clamped at zero.
    pub fn compute(
        rate: &Rate,
        card_value: Decimal,
        tier: LoyaltyTier,
        schedule: &TierSchedule,
    ) -> Result<Self, ExchangeError> {
        if card_value <= Decimal::ZERO {
            return Err(ExchangeError::InvalidAmount(
                "card value must be positive".to_string(),
            ));
        }
        if !rate.is_active() {
            return Err(ExchangeError::RateNotFound(rate.card_type.clone()));
        }

        let multiplier = schedule.multiplier(tier);
        let exchange_rate = rate.buy_rate * multiplier;
        let exchange_amount = round2(card_value * exchange_rate);
        let tier_bonus =
            round2(card_value * rate.buy_rate * (multiplier - Decimal::ONE)).max(Decimal::ZERO);

        Ok(Self {
            card_type: rate.card_type.clone(),
            card_value,
            exchange_rate,
            exchange_amount,
            tier_bonus,
            tier,
            currency: rate.currency.clone(),
        })
    }
}

/// One card type in the versioned default catalog.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CatalogEntry {
    pub card_type: String,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
}

impl CatalogEntry {
    fn new(card_type: &str, buy_rate: Decimal, sell_rate: Decimal) -> Self {
        Self {
            card_type: card_type.to_string(),
            buy_rate,
            sell_rate,
        }
    }

    pub fn to_rate(&self) -> Rate {
        Rate {
            card_type: self.card_type.clone(),
            buy_rate: self.buy_rate,
            sell_rate: self.sell_rate,
            currency: DEFAULT_CURRENCY.to_string(),
            status: RateStatus::Active,
            last_updated: Utc::now(),
        }
    }
}

/// Versioned catalog of supported card types and their launch rates.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RateCatalog {
    pub version: u32,
    pub entries: Vec<CatalogEntry>,
}

impl Default for RateCatalog {
    fn default() -> Self {
        Self {
            version: 1,
            entries: vec![
                CatalogEntry::new("Amazon", dec!(0.82), dec!(0.85)),
                CatalogEntry::new("iTunes", dec!(0.80), dec!(0.83)),
                CatalogEntry::new("Google Play", dec!(0.78), dec!(0.81)),
                CatalogEntry::new("Steam", dec!(0.75), dec!(0.78)),
                CatalogEntry::new("PlayStation", dec!(0.77), dec!(0.80)),
                CatalogEntry::new("Xbox", dec!(0.76), dec!(0.79)),
                CatalogEntry::new("Walmart", dec!(0.74), dec!(0.77)),
                CatalogEntry::new("Target", dec!(0.73), dec!(0.76)),
                CatalogEntry::new("Best Buy", dec!(0.72), dec!(0.75)),
                CatalogEntry::new("eBay", dec!(0.71), dec!(0.74)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amazon() -> Rate {
        Rate {
            card_type: "Amazon".to_string(),
            buy_rate: dec!(0.82),
            sell_rate: dec!(0.85),
            currency: DEFAULT_CURRENCY.to_string(),
            status: RateStatus::Active,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_quote_silver_example() {
        let schedule = TierSchedule::default();
        let quote =
            ExchangeQuote::compute(&amazon(), dec!(100), LoyaltyTier::Silver, &schedule).unwrap();

        assert_eq!(quote.exchange_rate, dec!(0.861));
        assert_eq!(quote.exchange_amount, dec!(86.10));
        assert_eq!(quote.tier_bonus, dec!(4.10));
        assert_eq!(quote.currency, "NGN");
    }

    #[test]
    fn test_quote_bronze_has_no_bonus() {
        let schedule = TierSchedule::default();
        let quote =
            ExchangeQuote::compute(&amazon(), dec!(100), LoyaltyTier::Bronze, &schedule).unwrap();

        assert_eq!(quote.exchange_rate, dec!(0.82));
        assert_eq!(quote.exchange_amount, dec!(82.00));
        assert_eq!(quote.tier_bonus, dec!(0));
    }

    #[test]
    fn test_quote_gold() {
        let schedule = TierSchedule::default();
        let quote =
            ExchangeQuote::compute(&amazon(), dec!(50), LoyaltyTier::Gold, &schedule).unwrap();

        // 50 * 0.82 * 1.1 = 45.10
        assert_eq!(quote.exchange_amount, dec!(45.10));
        assert_eq!(quote.tier_bonus, dec!(4.10));
    }

    #[test]
    fn test_quote_is_deterministic() {
        let schedule = TierSchedule::default();
        let rate = amazon();
        let first =
            ExchangeQuote::compute(&rate, dec!(37.45), LoyaltyTier::Silver, &schedule).unwrap();
        for _ in 0..10 {
            let again =
                ExchangeQuote::compute(&rate, dec!(37.45), LoyaltyTier::Silver, &schedule).unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_quote_rejects_non_positive_value() {
        let schedule = TierSchedule::default();
        assert!(matches!(
            ExchangeQuote::compute(&amazon(), dec!(0), LoyaltyTier::Bronze, &schedule),
            Err(ExchangeError::InvalidAmount(_))
        ));
        assert!(matches!(
            ExchangeQuote::compute(&amazon(), dec!(-5), LoyaltyTier::Bronze, &schedule),
            Err(ExchangeError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_quote_rejects_inactive_rate() {
        let schedule = TierSchedule::default();
        let mut rate = amazon();
        rate.status = RateStatus::Inactive;
        assert!(matches!(
            ExchangeQuote::compute(&rate, dec!(100), LoyaltyTier::Bronze, &schedule),
            Err(ExchangeError::RateNotFound(_))
        ));
    }

    #[test]
    fn test_update_bounds() {
        let ok = RateUpdate {
            buy_rate: dec!(0.82),
            sell_rate: dec!(0.85),
            status: None,
        };
        assert!(ok.validate().is_ok());

        let sell_below_buy = RateUpdate {
            buy_rate: dec!(0.85),
            sell_rate: dec!(0.80),
            status: None,
        };
        assert!(matches!(
            sell_below_buy.validate(),
            Err(ExchangeError::InvalidRateBounds(_))
        ));

        let sell_equal_buy = RateUpdate {
            buy_rate: dec!(0.80),
            sell_rate: dec!(0.80),
            status: None,
        };
        assert!(sell_equal_buy.validate().is_err());

        let buy_zero = RateUpdate {
            buy_rate: dec!(0),
            sell_rate: dec!(0.5),
            status: None,
        };
        assert!(buy_zero.validate().is_err());

        let sell_above_one = RateUpdate {
            buy_rate: dec!(0.9),
            sell_rate: dec!(1.2),
            status: None,
        };
        assert!(sell_above_one.validate().is_err());
    }

    #[test]
    fn test_update_keeps_previous_status() {
        let mut rate = amazon();
        rate.status = RateStatus::Inactive;

        let update = RateUpdate {
            buy_rate: dec!(0.83),
            sell_rate: dec!(0.86),
            status: None,
        };
        let next = update.into_rate("Amazon", Some(&rate));
        assert_eq!(next.status, RateStatus::Inactive);
        assert_eq!(next.buy_rate, dec!(0.83));
    }

    #[test]
    fn test_default_catalog_is_coherent() {
        let catalog = RateCatalog::default();
        assert_eq!(catalog.entries.len(), 10);
        for entry in &catalog.entries {
            let update = RateUpdate {
                buy_rate: entry.buy_rate,
                sell_rate: entry.sell_rate,
                status: None,
            };
            assert!(update.validate().is_ok(), "bad entry {}", entry.card_type);
        }
    }
}

use crate::domain::profile::TierSchedule;
use crate::domain::rate::{DEFAULT_CURRENCY, RateCatalog};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Business configuration handed to the engine at construction.
///
/// Defaults mirror the launch rules; deployments override fields rather
/// than editing constants in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub tiers: TierSchedule,
    pub catalog: RateCatalog,
    /// Fixed credit paid to a referrer when the referred user clears KYC.
    pub referral_bonus: Decimal,
    pub min_card_value: Decimal,
    pub min_withdrawal: Decimal,
    pub currency: String,
    /// Upper bound on optimistic-concurrency retries for wallet updates.
    pub max_update_attempts: u32,
    pub rate_history_limit: usize,
    pub trending_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tiers: TierSchedule::default(),
            catalog: RateCatalog::default(),
            referral_bonus: dec!(5),
            min_card_value: dec!(10),
            min_withdrawal: dec!(10),
            currency: DEFAULT_CURRENCY.to_string(),
            max_update_attempts: 8,
            rate_history_limit: 50,
            trending_limit: 5,
        }
    }
}

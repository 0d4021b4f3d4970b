use crate::domain::money::{Amount, Balance};
use crate::error::ExchangeError;
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque user identifier issued by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Pending,
    Approved,
    Rejected,
}

/// Loyalty tiers, ordered by the transaction-count thresholds that earn them.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoyaltyTier {
    #[default]
    Bronze,
    Silver,
    Gold,
}

impl fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoyaltyTier::Bronze => write!(f, "BRONZE"),
            LoyaltyTier::Silver => write!(f, "SILVER"),
            LoyaltyTier::Gold => write!(f, "GOLD"),
        }
    }
}

/// Versioned tier table: rate multipliers and the transaction counts that
/// promote a user. Changing the business rules means shipping a new version
/// of this value, not editing scattered literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSchedule {
    pub version: u32,
    pub silver_min_transactions: u32,
    pub gold_min_transactions: u32,
    pub bronze_multiplier: Decimal,
    pub silver_multiplier: Decimal,
    pub gold_multiplier: Decimal,
}

impl Default for TierSchedule {
    fn default() -> Self {
        Self {
            version: 1,
            silver_min_transactions: 10,
            gold_min_transactions: 50,
            bronze_multiplier: dec!(1.0),
            silver_multiplier: dec!(1.05),
            gold_multiplier: dec!(1.1),
        }
    }
}

impl TierSchedule {
    pub fn multiplier(&self, tier: LoyaltyTier) -> Decimal {
        match tier {
            LoyaltyTier::Bronze => self.bronze_multiplier,
            LoyaltyTier::Silver => self.silver_multiplier,
            LoyaltyTier::Gold => self.gold_multiplier,
        }
    }

    /// Pure tier recomputation from a transaction count. Idempotent.
    pub fn tier_for(&self, transaction_count: u32) -> LoyaltyTier {
        if transaction_count >= self.gold_min_transactions {
            LoyaltyTier::Gold
        } else if transaction_count >= self.silver_min_transactions {
            LoyaltyTier::Silver
        } else {
            LoyaltyTier::Bronze
        }
    }
}

/// Direction of a wallet mutation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WalletDirection {
    Add,
    Subtract,
}

/// A user's wallet and loyalty state.
///
/// The sole authority for `wallet_balance`: every mutation goes through
/// `apply_delta` (or the combined credit methods below) so the non-negative
/// invariant is enforced in exactly one place.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct UserProfile {
    pub user_id: UserId,
    pub email: String,
    pub wallet_balance: Balance,
    pub loyalty_tier: LoyaltyTier,
    pub transaction_count: u32,
    pub kyc_status: KycStatus,
    pub referral_code: String,
    pub referred_by: Option<UserId>,
    pub referral_earnings: Decimal,
    pub total_referrals: u32,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub const COLLECTION: &'static str = "user_profiles";

    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        let referral_code = generate_referral_code(&user_id);
        Self {
            user_id,
            email: email.into(),
            wallet_balance: Balance::ZERO,
            loyalty_tier: LoyaltyTier::Bronze,
            transaction_count: 0,
            kyc_status: KycStatus::Pending,
            referral_code,
            referred_by: None,
            referral_earnings: Decimal::ZERO,
            total_referrals: 0,
            created_at: Utc::now(),
        }
    }

    /// Applies a wallet delta, rejecting any subtraction that would take the
    /// balance negative. On failure the profile is left untouched.
    pub fn apply_delta(
        &mut self,
        amount: Amount,
        direction: WalletDirection,
    ) -> Result<Balance, ExchangeError> {
        let delta = Balance(amount.value());
        match direction {
            WalletDirection::Add => {
                self.wallet_balance += delta;
            }
            WalletDirection::Subtract => {
                if self.wallet_balance < delta {
                    return Err(ExchangeError::InsufficientBalance {
                        required: amount.value(),
                        available: self.wallet_balance.value(),
                    });
                }
                self.wallet_balance -= delta;
            }
        }
        Ok(self.wallet_balance)
    }

    /// Credits an approved gift-card submission and advances the loyalty
    /// state in the same step, so the whole effect rides one store write.
    pub fn credit_submission(&mut self, amount: Amount, schedule: &TierSchedule) -> LoyaltyTier {
        self.wallet_balance += Balance(amount.value());
        self.transaction_count += 1;
        self.loyalty_tier = schedule.tier_for(self.transaction_count);
        self.loyalty_tier
    }

    /// Credits a settled referral bonus: wallet, lifetime earnings, and the
    /// referral counter move together.
    pub fn credit_referral_bonus(&mut self, bonus: Amount) {
        self.wallet_balance += Balance(bonus.value());
        self.referral_earnings += bonus.value();
        self.total_referrals += 1;
    }
}

const REFERRAL_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a referral code: six random characters plus the last two
/// characters of the user id, uppercased.
pub fn generate_referral_code(user_id: &UserId) -> String {
    let mut rng = rand::thread_rng();
    let mut code: String = (0..6)
        .map(|_| REFERRAL_CHARSET[rng.gen_range(0..REFERRAL_CHARSET.len())] as char)
        .collect();
    let suffix: String = user_id
        .as_str()
        .chars()
        .rev()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(2)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .flat_map(|c| c.to_uppercase())
        .collect();
    code.push_str(&suffix);
    code
}

/// Referral codes are 6 to 8 characters, uppercase letters and digits only.
pub fn is_valid_referral_code(code: &str) -> bool {
    (6..=8).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
